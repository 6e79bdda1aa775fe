use super::{Clock, ClockMode};
use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Clock driven by simulated event timestamps rather than wall time.
/// `advance_to` is the only mutator and is rejected if it would move time
/// backwards or past `end`.
#[derive(Debug)]
pub struct BacktestClock {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    /// Nominal replay granularity. Informational only: `advance_to` moves the
    /// clock directly to each scheduled event's timestamp and never rounds to
    /// a `step` boundary.
    step: Duration,
    current: Mutex<DateTime<Utc>>,
    running: AtomicBool,
}

impl BacktestClock {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, step: Duration) -> Self {
        Self {
            start,
            end,
            step,
            current: Mutex::new(start),
            running: AtomicBool::new(false),
        }
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// `true` once `current_time` has reached the configured `end`.
    pub fn is_at_end(&self) -> bool {
        *self.current.lock() >= self.end
    }
}

impl Clock for BacktestClock {
    fn current_time(&self) -> DateTime<Utc> {
        *self.current.lock()
    }

    fn start(&self) -> EngineResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(EngineError::InvalidArgument(
                "backtest clock already running".into(),
            ));
        }
        Ok(())
    }

    fn stop(&self) -> EngineResult<()> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Err(EngineError::InvalidArgument(
                "backtest clock not running".into(),
            ));
        }
        Ok(())
    }

    fn advance_to(&self, t: DateTime<Utc>) -> EngineResult<()> {
        let mut current = self.current.lock();
        if t < *current {
            return Err(EngineError::InvalidArgument(format!(
                "cannot advance backtest clock backwards: {t} < {current}"
            )));
        }
        if t > self.end {
            return Err(EngineError::InvalidArgument(format!(
                "cannot advance backtest clock past end: {t} > {}",
                self.end
            )));
        }
        *current = t;
        Ok(())
    }

    fn reset(&self, t: DateTime<Utc>) -> EngineResult<()> {
        if t < self.start || t > self.end {
            return Err(EngineError::InvalidArgument(format!(
                "reset time {t} outside backtest window [{}, {}]",
                self.start, self.end
            )));
        }
        *self.current.lock() = t;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn mode(&self) -> ClockMode {
        ClockMode::Backtest
    }

    fn is_at_end(&self) -> bool {
        BacktestClock::is_at_end(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_time;

    fn step() -> Duration {
        Duration::seconds(1)
    }

    #[test]
    fn advance_to_rejects_backwards_movement() {
        let clock = BacktestClock::new(test_time(0), test_time(100), step());
        clock.advance_to(test_time(50)).unwrap();

        let err = clock.advance_to(test_time(10)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
        assert_eq!(clock.current_time(), test_time(50));
    }

    #[test]
    fn advance_to_rejects_past_end() {
        let clock = BacktestClock::new(test_time(0), test_time(100), step());
        let err = clock.advance_to(test_time(101)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[test]
    fn start_stop_is_not_idempotent_by_design() {
        let clock = BacktestClock::new(test_time(0), test_time(100), step());
        clock.start().unwrap();
        assert!(clock.start().is_err());
        clock.stop().unwrap();
        assert!(clock.stop().is_err());
    }

    #[test]
    fn is_at_end_tracks_current_time() {
        let clock = BacktestClock::new(test_time(0), test_time(100), step());
        assert!(!clock.is_at_end());
        clock.advance_to(test_time(100)).unwrap();
        assert!(clock.is_at_end());
    }
}
