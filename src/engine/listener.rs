//! # EngineListener
//!
//! Observer hooks for engine lifecycle and runtime events. Ported from the
//! original engine's `EngineListener`, whose `State`/`Statistics` nested
//! types now live in [`super::state::EngineState`] and
//! [`super::stats::StatisticsSnapshot`] respectively.

use super::state::EngineState;
use super::stats::StatisticsSnapshot;
use crate::error::EngineError;

/// Receives callbacks as the engine's lifecycle state changes, errors occur,
/// and statistics update. All methods have empty default bodies so
/// implementors only override what they care about.
pub trait EngineListener: Send + Sync {
    fn on_state_changed(&self, _old_state: EngineState, _new_state: EngineState) {}

    fn on_error(&self, _error: &EngineError) {}

    fn on_statistics_updated(&self, _stats: &StatisticsSnapshot) {}
}
