//! # DataSource
//!
//! Contract for external feeds the [`super::Engine`] polls or receives
//! pushes from. Ported from the original engine's `DataSource`/
//! `DataListener` pair; `register_listener`/`unregister_listener` collapse
//! to a single `on_data` closure per source here since Rust's ownership
//! model makes the original's raw-listener-pointer bookkeeping unnecessary.

use crate::error::EngineResult;
use crate::event::Event;
use std::time::Duration;

/// Connection state of a [`DataSource`]. Not yet surfaced through
/// [`super::listener::EngineListener`]; callers poll [`DataSource::state`]
/// directly.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DataSourceState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// A feed the engine can connect to, optionally poll, and receive
/// [`Event`]s from via the callback passed to [`DataSource::set_on_data`].
pub trait DataSource: Send + Sync {
    fn name(&self) -> &str;
    fn uri(&self) -> &str;

    fn connect(&self) -> EngineResult<()>;
    fn disconnect(&self) -> EngineResult<()>;

    /// Actively pull data. A no-op `Ok(())` for push-only sources.
    fn poll(&self) -> EngineResult<()>;

    fn state(&self) -> DataSourceState;

    /// Install the callback invoked once per [`Event`] this source produces.
    fn set_on_data(&self, callback: Box<dyn Fn(Event) + Send + Sync>);

    /// Configure how often [`super::Engine`] calls [`DataSource::poll`] for
    /// sources that need active pulling. A no-op for push-only sources.
    fn set_poll_interval(&self, interval: Duration);
}
