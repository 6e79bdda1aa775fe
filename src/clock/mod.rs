//! # Clock
//!
//! Authoritative time source for the [`crate::engine::Engine`]. Three
//! concrete forms share one contract: [`BacktestClock`] advances only when
//! told to, [`RealtimeClock`] tracks wall time, [`AcceleratedClock`] scales
//! wall time by a fixed factor. `current_time` is non-failing and constant
//! time in every mode; only `advance_to` may fail, and only outside Backtest
//! mode.

mod accelerated;
mod backtest;
mod realtime;

pub use accelerated::AcceleratedClock;
pub use backtest::BacktestClock;
pub use realtime::RealtimeClock;

use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};

/// Discriminates the four time-advancement strategies a [`Clock`] may
/// implement. `SingleStep` is reserved (ported from the original engine's
/// `Clock::Mode` enum), but no constructor in this crate produces it yet;
/// see `DESIGN.md` Open Question 4.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ClockMode {
    Backtest,
    Realtime,
    Accelerated,
    SingleStep,
}

/// Unified time source driving event ordering and advancement.
///
/// `current_time` must be monotonic non-decreasing within a single instance.
/// Implementations carry a running flag; `start`/`stop` are idempotent state
/// transitions, not data mutations.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time according to this clock. Non-failing, constant time.
    fn current_time(&self) -> DateTime<Utc>;

    /// Start the clock. Fails with [`EngineError::InvalidArgument`] if
    /// already running.
    fn start(&self) -> EngineResult<()>;

    /// Stop the clock. Fails with [`EngineError::InvalidArgument`] if not
    /// running.
    fn stop(&self) -> EngineResult<()>;

    /// Advance to `t`. Only [`BacktestClock`] implements this as a
    /// non-failing mutator within `[current_time, end]`; other clocks reject
    /// every call.
    fn advance_to(&self, t: DateTime<Utc>) -> EngineResult<()>;

    /// Reset to `t`. Only [`BacktestClock`] supports this; other clocks
    /// reject every call.
    fn reset(&self, t: DateTime<Utc>) -> EngineResult<()>;

    fn is_running(&self) -> bool;

    fn mode(&self) -> ClockMode;

    /// `true` once this clock has reached the end of its simulated window.
    /// Only meaningful for [`BacktestClock`]; every other mode has no end and
    /// always reports `false`.
    fn is_at_end(&self) -> bool {
        false
    }
}

/// Test-only helper for building deterministic timestamps, shared by the
/// clock submodules' unit tests.
#[cfg(test)]
pub(crate) fn test_time(secs: i64) -> DateTime<Utc> {
    use chrono::TimeZone;
    Utc.timestamp_opt(secs, 0).unwrap()
}
