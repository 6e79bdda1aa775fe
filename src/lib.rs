#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]
//! # Kestrel Engine
//!
//! Core event engine of an in-process quantitative trading/backtesting
//! runtime: a typed publish/subscribe event bus, an engine lifecycle state
//! machine with a time-ordered priority queue of scheduled events, and a
//! pluggable clock abstraction spanning backtest replay, wall-clock realtime,
//! and accelerated simulation.
//!
//! ```
//! use kestrel_engine::engine::{ClockConfig, Engine, EngineConfig};
//! use kestrel_engine::event::{Event, EventType};
//!
//! let engine = Engine::new(EngineConfig {
//!     clock: ClockConfig::Realtime,
//!     bus: Default::default(),
//!     event_queue_capacity: None,
//!     parameters: Default::default(),
//! })
//! .unwrap();
//!
//! engine.initialize().unwrap();
//! engine.start().unwrap();
//! engine
//!     .publish_event(Event::builder(EventType::System, chrono::Utc::now()).build())
//!     .unwrap();
//! engine.stop().unwrap();
//! ```
//!
//! ## Module map
//!
//! - [`event`]: the [`event::Event`] envelope and its [`event::Payload`] variants.
//! - [`queue`]: FIFO and time-delayed storage backing the bus.
//! - [`subscription`]: subscriber bookkeeping by [`event::EventType`].
//! - [`policy`]: [`policy::DispatchPolicy`] deciding when a batch is worth dispatching.
//! - [`dispatch`]: panic-isolated fan-out to subscribers, plus the
//!   [`dispatch::controller::DispatchController`] background worker.
//! - [`bus`]: the [`bus::EventBus`] façade tying the above together.
//! - [`clock`]: [`clock::Clock`] and its Backtest/Realtime/Accelerated implementations.
//! - [`engine`]: [`engine::Engine`], the lifecycle owner wiring a clock and a bus together.
//! - [`error`]: the crate's closed [`error::EngineError`] set.
//! - [`shutdown`]: [`shutdown::SyncShutdown`]/[`shutdown::AsyncShutdown`] teardown contracts.
//! - [`logging`]: `tracing` subscriber setup for hosts embedding this crate.

pub mod bus;
pub mod clock;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod logging;
pub mod policy;
pub mod queue;
pub mod shutdown;
pub mod subscription;

pub use bus::EventBus;
pub use engine::{Engine, EngineConfig, EngineState};
pub use error::{EngineError, EngineResult};
pub use event::{Event, EventType, Payload};
