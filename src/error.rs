//! # Engine Error Types
//!
//! Central, closed error-kind set for the event engine core. Every fallible
//! operation documented in the component contracts (Clock, EventQueue,
//! EventBus, Engine) resolves to one of these variants; there is no exception
//! path through the public API. Subscriber callback panics and trigger
//! failures are caught and logged at the call site rather than surfaced here
//! (see [`crate::dispatch`] and [`crate::engine`]).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Central error type for the `kestrel-engine` core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Error)]
pub enum EngineError {
    /// A null/empty event, an unparsable config field, or an unsupported
    /// clock advancement was supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An unknown subscription id, data-source name, or trigger id.
    #[error("not found: {0}")]
    NotFound(String),

    /// A duplicate data-source name or trigger id was registered.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// An operation was attempted on a stopped `EventBus`.
    #[error("event bus is stopped")]
    BusStopped,

    /// A bounded wait exceeded its deadline. Reserved: not emitted by the
    /// core today, kept so downstream callers can match on it.
    #[error("operation timed out")]
    Timeout,

    /// The advisory event-queue capacity limit was reached.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A state transition was rejected because another transition is in
    /// progress, or the requested edge is not in the transition table.
    #[error("engine busy: {0}")]
    Busy(String),

    /// A data-source operation was attempted while not connected.
    #[error("data source disconnected: {0}")]
    Disconnected(String),
}

/// Convenience alias used throughout the crate's public API.
pub type EngineResult<T> = Result<T, EngineError>;
