//! # Shutdown Management
//!
//! Traits for graceful shutdown of event-engine components. Both patterns
//! exist because not every component can stop for free: [`crate::bus::EventBus`]
//! and [`crate::engine::Engine`] drain in-flight dispatch work synchronously,
//! while a future component backed by an async I/O resource might need
//! [`AsyncShutdown`] instead.
//!
//! ## Shutdown Patterns
//!
//! ### Synchronous Shutdown
//! For components that can shut down immediately without async operations:
//! ```rust,ignore
//! use kestrel_engine::shutdown::SyncShutdown;
//!
//! struct SimpleComponent;
//!
//! impl SyncShutdown for SimpleComponent {
//!     type Result = ();
//!
//!     fn shutdown(&mut self) -> Self::Result {
//!         println!("component shut down");
//!     }
//! }
//! ```
//!
//! ### Asynchronous Shutdown
//! For components that need to perform async operations during shutdown:
//! ```rust,ignore
//! use kestrel_engine::shutdown::AsyncShutdown;
//!
//! struct AsyncComponent;
//!
//! impl AsyncShutdown for AsyncComponent {
//!     type Result = Result<(), String>;
//!
//!     fn shutdown(&mut self) -> impl Future<Output = Self::Result> {
//!         async move {
//!             tokio::time::sleep(std::time::Duration::from_millis(100)).await;
//!             Ok(())
//!         }
//!     }
//! }
//! ```
//!
//! ## Shutdown Signal
//!
//! [`Shutdown`] is a zero-sized marker a host application can route through
//! its own control-plane channel to request that it call
//! [`SyncShutdown::shutdown`] on the engine; the event engine itself never
//! constructs or inspects one.

use serde::{Deserialize, Serialize};
use std::future::Future;

/// Trait for components that can be shut down synchronously.
///
/// Implement this trait for components that can complete their shutdown
/// operations immediately without requiring async operations.
pub trait SyncShutdown {
    /// The result type returned by the shutdown operation
    type Result;
    /// Performs synchronous shutdown of the component
    fn shutdown(&mut self) -> Self::Result;
}

/// Trait for components that require asynchronous shutdown operations.
///
/// Implement this trait for components that need to perform async operations
/// during shutdown, such as flushing buffers, closing network connections,
/// or waiting for pending operations to complete.
pub trait AsyncShutdown {
    /// The result type returned by the shutdown operation
    type Result;
    /// Performs asynchronous shutdown of the component
    fn shutdown(&mut self) -> impl Future<Output = Self::Result>;
}

/// A zero-sized shutdown request marker, for host applications that want to
/// route a shutdown request through their own signaling mechanism alongside
/// other control messages.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize,
)]
pub struct Shutdown;

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u32);

    impl SyncShutdown for Counter {
        type Result = u32;

        fn shutdown(&mut self) -> Self::Result {
            self.0 += 1;
            self.0
        }
    }

    #[test]
    fn sync_shutdown_returns_its_declared_result_type() {
        let mut counter = Counter(0);
        assert_eq!(counter.shutdown(), 1);
    }

    #[test]
    fn shutdown_marker_is_a_unit_value() {
        assert_eq!(Shutdown, Shutdown::default());
    }
}
