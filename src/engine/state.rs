//! Engine lifecycle state machine. Ported from the original engine's
//! `EngineImpl::InternalState` plus its external-state projection: ten
//! internal states capture in-flight transitions (`STARTING`, `PAUSING`,
//! `STOPPING`) that callers never need to see, so `to_external_state`
//! collapses them down to six states callers actually observe.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Internal lifecycle state, including the transient states an in-progress
/// transition passes through.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum InternalState {
    Created = 0,
    Initializing = 1,
    Initialized = 2,
    Starting = 3,
    Running = 4,
    Pausing = 5,
    Paused = 6,
    Stopping = 7,
    Stopped = 8,
    Error = 9,
}

impl InternalState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => InternalState::Created,
            1 => InternalState::Initializing,
            2 => InternalState::Initialized,
            3 => InternalState::Starting,
            4 => InternalState::Running,
            5 => InternalState::Pausing,
            6 => InternalState::Paused,
            7 => InternalState::Stopping,
            8 => InternalState::Stopped,
            9 => InternalState::Error,
            other => unreachable!("invalid InternalState discriminant: {other}"),
        }
    }

    /// Whether `self -> next` is a legal transition. Mirrors the original's
    /// (implicit, call-site-enforced) state graph, made explicit here.
    pub fn can_transition_to(self, next: InternalState) -> bool {
        use InternalState::*;
        match (self, next) {
            (Created, Initializing) => true,
            (Initializing, Initialized) | (Initializing, Error) => true,
            (Initialized, Starting) => true,
            (Starting, Running) | (Starting, Error) => true,
            (Running, Pausing) | (Running, Stopping) | (Running, Error) => true,
            (Pausing, Paused) | (Pausing, Error) => true,
            (Paused, Starting) | (Paused, Stopping) => true,
            (Stopping, Stopped) | (Stopping, Error) => true,
            (Stopped, Initialized) => true,
            (Error, Stopping) => true,
            _ => false,
        }
    }

    /// Collapse a transient internal state down to the external state
    /// callers of [`crate::engine::Engine::state`] observe.
    pub fn to_external(self) -> EngineState {
        match self {
            InternalState::Created => EngineState::Created,
            InternalState::Initializing | InternalState::Initialized => EngineState::Initialized,
            InternalState::Starting | InternalState::Running => EngineState::Running,
            InternalState::Pausing | InternalState::Paused => EngineState::Paused,
            InternalState::Stopping | InternalState::Stopped => EngineState::Stopped,
            InternalState::Error => EngineState::Error,
        }
    }
}

impl fmt::Display for InternalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InternalState::Created => "CREATED",
            InternalState::Initializing => "INITIALIZING",
            InternalState::Initialized => "INITIALIZED",
            InternalState::Starting => "STARTING",
            InternalState::Running => "RUNNING",
            InternalState::Pausing => "PAUSING",
            InternalState::Paused => "PAUSED",
            InternalState::Stopping => "STOPPING",
            InternalState::Stopped => "STOPPED",
            InternalState::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// External, caller-visible lifecycle state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EngineState {
    Created,
    Initialized,
    Running,
    Paused,
    Stopped,
    Error,
}

/// Lock-free holder of the current [`InternalState`], used so reads from
/// the hot event loop never block on a mutex.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(initial: InternalState) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    pub fn get(&self) -> InternalState {
        InternalState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Attempt `current -> next`. Returns `false` (no-op) if the transition
    /// is not legal or the state changed underneath the caller.
    pub fn transition(&self, next: InternalState) -> bool {
        let current = self.get();
        if !current.can_transition_to(next) {
            return false;
        }
        self.0
            .compare_exchange(current as u8, next as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Force a transition to `next` regardless of the state graph; used only
    /// to record an unrecoverable error.
    pub fn force(&self, next: InternalState) {
        self.0.store(next as u8, Ordering::Release);
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new(InternalState::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transition_chain_succeeds() {
        let cell = StateCell::default();
        assert!(cell.transition(InternalState::Initializing));
        assert!(cell.transition(InternalState::Initialized));
        assert!(cell.transition(InternalState::Starting));
        assert!(cell.transition(InternalState::Running));
        assert_eq!(cell.get().to_external(), EngineState::Running);
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let cell = StateCell::default();
        assert!(!cell.transition(InternalState::Running));
        assert_eq!(cell.get(), InternalState::Created);
    }

    #[test]
    fn pause_resume_round_trips_through_paused() {
        let cell = StateCell::new(InternalState::Running);
        assert!(cell.transition(InternalState::Pausing));
        assert!(cell.transition(InternalState::Paused));
        assert_eq!(cell.get().to_external(), EngineState::Paused);
        assert!(cell.transition(InternalState::Starting));
        assert!(cell.transition(InternalState::Running));
    }

    #[test]
    fn internal_states_collapse_to_expected_external_states() {
        assert_eq!(InternalState::Created.to_external(), EngineState::Created);
        assert_eq!(
            InternalState::Initializing.to_external(),
            EngineState::Initialized
        );
        assert_eq!(InternalState::Starting.to_external(), EngineState::Running);
        assert_eq!(InternalState::Pausing.to_external(), EngineState::Paused);
        assert_eq!(
            InternalState::Stopping.to_external(),
            EngineState::Stopped
        );
        assert_eq!(InternalState::Error.to_external(), EngineState::Error);
    }
}
