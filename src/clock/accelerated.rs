use super::{Clock, ClockMode};
use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};

/// Clock that scales elapsed wall time by a fixed `factor`, computed on the
/// fly with no background ticking thread:
/// `current_time = sim_start + (wall_now - wall_start) * factor`.
#[derive(Debug)]
pub struct AcceleratedClock {
    sim_start: DateTime<Utc>,
    wall_start_micros: i64,
    factor: f64,
    running: AtomicBool,
}

impl AcceleratedClock {
    pub fn new(sim_start: DateTime<Utc>, factor: f64) -> Self {
        Self {
            sim_start,
            wall_start_micros: Utc::now().timestamp_micros(),
            factor,
            running: AtomicBool::new(false),
        }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl Clock for AcceleratedClock {
    fn current_time(&self) -> DateTime<Utc> {
        let wall_now_micros = Utc::now().timestamp_micros();
        let elapsed_micros = wall_now_micros - self.wall_start_micros;
        let scaled_micros = (elapsed_micros as f64 * self.factor) as i64;
        self.sim_start + ChronoDuration::microseconds(scaled_micros)
    }

    fn start(&self) -> EngineResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(EngineError::InvalidArgument(
                "accelerated clock already running".into(),
            ));
        }
        Ok(())
    }

    fn stop(&self) -> EngineResult<()> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Err(EngineError::InvalidArgument(
                "accelerated clock not running".into(),
            ));
        }
        Ok(())
    }

    fn advance_to(&self, _t: DateTime<Utc>) -> EngineResult<()> {
        Err(EngineError::InvalidArgument(
            "accelerated clock does not support advance_to".into(),
        ))
    }

    fn reset(&self, _t: DateTime<Utc>) -> EngineResult<()> {
        Err(EngineError::InvalidArgument(
            "accelerated clock does not support reset".into(),
        ))
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn mode(&self) -> ClockMode {
        ClockMode::Accelerated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_time;

    #[test]
    fn scales_elapsed_wall_time_by_factor() {
        let clock = AcceleratedClock::new(test_time(0), 10.0);
        std::thread::sleep(std::time::Duration::from_millis(20));
        let advanced = clock.current_time() - test_time(0);
        // at >=10x acceleration, 20ms of wall time should read as >=200ms.
        assert!(advanced.num_milliseconds() >= 150);
    }

    #[test]
    fn advance_to_and_reset_always_fail() {
        let clock = AcceleratedClock::new(test_time(0), 1.0);
        assert!(clock.advance_to(test_time(5)).is_err());
        assert!(clock.reset(test_time(5)).is_err());
    }
}
