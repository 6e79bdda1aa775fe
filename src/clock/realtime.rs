use super::{Clock, ClockMode};
use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};

/// Clock backed directly by wall time. `advance_to`/`reset` are always
/// rejected, since time moves on its own.
#[derive(Debug, Default)]
pub struct RealtimeClock {
    running: AtomicBool,
}

impl RealtimeClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for RealtimeClock {
    fn current_time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn start(&self) -> EngineResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(EngineError::InvalidArgument(
                "realtime clock already running".into(),
            ));
        }
        Ok(())
    }

    fn stop(&self) -> EngineResult<()> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Err(EngineError::InvalidArgument(
                "realtime clock not running".into(),
            ));
        }
        Ok(())
    }

    fn advance_to(&self, _t: DateTime<Utc>) -> EngineResult<()> {
        Err(EngineError::InvalidArgument(
            "realtime clock does not support advance_to".into(),
        ))
    }

    fn reset(&self, _t: DateTime<Utc>) -> EngineResult<()> {
        Err(EngineError::InvalidArgument(
            "realtime clock does not support reset".into(),
        ))
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn mode(&self) -> ClockMode {
        ClockMode::Realtime
    }
}
