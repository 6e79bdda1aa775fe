//! # Logging Configuration
//!
//! Standardized `tracing` subscriber setup for hosts embedding this crate.
//!
//! ## Features
//!
//! - **Configurable Output**: Human-readable or JSON format
//! - **Environment Filtering**: Uses the `RUST_LOG` variable for levels
//! - **Dispatch-Poll Noise Filter**: Drops the dispatch controller's
//!   every-50ms poll-tick span, which is debug-level chatter with nothing
//!   useful to say on most ticks
//! - **Default INFO Level**: Adjustable as needed
//!
//! ## Usage
//!
//! ### Standard Logging (human-readable)
//! ```rust,ignore
//! use kestrel_engine::logging::init_logging;
//!
//! fn main() {
//!     init_logging();
//!     tracing::info!("engine started");
//! }
//! ```
//!
//! ### JSON Logging (aggregators / observability)
//! ```rust,ignore
//! use kestrel_engine::logging::init_json_logging;
//!
//! fn main() {
//!     init_json_logging();
//!     tracing::info!("engine started");
//! }
//! ```
//!
//! ### Environment Configuration
//! ```bash
//! # Debug level for all modules
//! export RUST_LOG=debug
//!
//! # Per-module levels
//! export RUST_LOG=kestrel_engine::engine=info,kestrel_engine::dispatch=warn
//! ```

use crate::dispatch::controller::DISPATCH_POLL_SPAN_NAME;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize human-readable logging, filtering out dispatch-poll-tick noise.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(DispatchPollSpanFilter)
        .init()
}

/// Initialize JSON logging, filtering out dispatch-poll-tick noise.
pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .with(DispatchPollSpanFilter)
        .init()
}

/// Suppresses events emitted while inside the dispatch controller's poll-tick
/// span, which fires every 50ms whether or not there's anything to dispatch.
struct DispatchPollSpanFilter;

impl<S> tracing_subscriber::layer::Layer<S> for DispatchPollSpanFilter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn event_enabled(
        &self,
        _: &tracing::Event<'_>,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> bool {
        if let Some(span) = ctx.lookup_current() {
            span.name() != DISPATCH_POLL_SPAN_NAME
        } else {
            true
        }
    }
}
