//! # EventBus
//!
//! Public façade wiring [`EventQueue`], [`SubscriptionManager`],
//! [`EventDispatcher`] and [`DispatchController`] into the single entry
//! point producers and subscribers actually use. Ported from the original
//! engine's `EventBusImpl`.

use crate::dispatch::controller::ExecutionMode;
use crate::dispatch::{DispatchController, Executor, EventDispatcher};
use crate::error::{EngineError, EngineResult};
use crate::event::{Event, EventType};
use crate::policy::DispatchPolicy;
use crate::queue::EventQueue;
use crate::shutdown::SyncShutdown;
use crate::subscription::{SubscriptionId, SubscriptionManager};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How the bus's background dispatch work is executed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BusMode {
    /// Dispatch runs on the bus's own polling thread.
    Sync,
    /// Dispatch is additionally fanned out onto an executor as events
    /// arrive.
    Async,
}

/// Where [`BusMode::Async`] posts its dispatch work.
#[derive(Debug, Clone)]
pub enum ExecutorConfig {
    /// Run inline, i.e. on whichever thread triggers dispatch.
    Inline,
    /// Run on a dedicated thread pool with the given worker count.
    ThreadPool { threads: usize },
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig::Inline
    }
}

/// Construction-time configuration for an [`EventBus`].
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub mode: BusMode,
    pub executor: ExecutorConfig,
    pub initial_policy: DispatchPolicy,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            mode: BusMode::Sync,
            executor: ExecutorConfig::Inline,
            initial_policy: DispatchPolicy::Immediate,
        }
    }
}

/// Thread-safe publish/subscribe bus over [`Event`], with a pluggable
/// dispatch policy and execution strategy.
pub struct EventBus {
    queue: Arc<EventQueue>,
    subs: Arc<SubscriptionManager>,
    controller: DispatchController,
    stopped: AtomicBool,
}

impl EventBus {
    /// Build a bus per `config` and immediately start its dispatch worker.
    pub fn new(config: BusConfig) -> EngineResult<Self> {
        let queue = Arc::new(EventQueue::new());
        let subs = Arc::new(SubscriptionManager::new());
        let dispatcher = Arc::new(EventDispatcher::new());

        let executor = match config.executor {
            ExecutorConfig::Inline => Executor::Inline,
            ExecutorConfig::ThreadPool { threads } => {
                Executor::thread_pool(threads).map_err(|e| {
                    EngineError::InvalidArgument(format!("failed to build thread pool: {e}"))
                })?
            }
        };
        let mode = match config.mode {
            BusMode::Sync => ExecutionMode::Sync,
            BusMode::Async => ExecutionMode::Async,
        };

        let controller =
            DispatchController::new(queue.clone(), subs.clone(), dispatcher, mode, executor);
        controller.set_policy(config.initial_policy);
        controller.start();

        Ok(Self {
            queue,
            subs,
            controller,
            stopped: AtomicBool::new(false),
        })
    }

    /// Enqueue `event` for dispatch. Rejected once the bus has been
    /// [`EventBus::stop`]ped.
    pub fn publish(&self, event: Event) -> EngineResult<()> {
        if self.is_stopped() {
            return Err(EngineError::BusStopped);
        }
        self.queue.enqueue(event);
        self.controller.notify();
        Ok(())
    }

    /// Enqueue `event` to become due at `scheduled_time`. Rejected once the
    /// bus has been stopped.
    pub fn publish_delayed(
        &self,
        event: Event,
        scheduled_time: chrono::DateTime<chrono::Utc>,
    ) -> EngineResult<()> {
        if self.is_stopped() {
            return Err(EngineError::BusStopped);
        }
        self.queue.enqueue_delayed(event, scheduled_time);
        self.controller.notify();
        Ok(())
    }

    /// Register `callback` for every [`EventType`] in `event_types`.
    pub fn subscribe(
        &self,
        event_types: Vec<EventType>,
        callback: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.subs.add_subscriber(event_types, callback)
    }

    /// Remove the subscription identified by `id`. `Err(NotFound)` if it
    /// doesn't exist (already removed, or never registered).
    pub fn unsubscribe(&self, id: SubscriptionId) -> EngineResult<()> {
        if self.subs.remove_subscriber(id) {
            Ok(())
        } else {
            Err(EngineError::NotFound(format!("subscription {id}")))
        }
    }

    /// Synchronously poll and dispatch whatever is due right now, bypassing
    /// the active [`DispatchPolicy`]. Returns the number of events
    /// dispatched.
    pub fn dispatch(&self) -> usize {
        let due = self.queue.poll_due_events(chrono::Utc::now());
        let count = due.len();
        if count > 0 {
            EventDispatcher::new().dispatch(&due, &self.subs);
        }
        count
    }

    /// Drop every queued and subscribed state. Does not stop the dispatch
    /// worker.
    pub fn clear(&self) {
        self.queue.clear();
        self.subs.clear();
    }

    pub fn set_policy(&self, policy: DispatchPolicy) {
        self.controller.set_policy(policy);
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.controller.policy()
    }

    /// Stop the dispatch worker and refuse all further `publish` calls.
    /// Events already drained for in-flight dispatch still complete.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.controller.stop();
    }

    /// Restart the dispatch worker and resume accepting `publish` calls.
    pub fn start(&self) {
        self.stopped.store(false, Ordering::Release);
        self.controller.start();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Clear the queue and restart the dispatch controller. Subscriptions
    /// are left in place; only `queue_size()` and the controller's internal
    /// dispatch clock are reset.
    pub fn reset(&self) {
        self.queue.clear();
        self.controller.stop();
        self.controller.start();
    }

    pub fn queue_size(&self) -> usize {
        self.queue.size()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subs.subscriber_count()
    }
}

impl SyncShutdown for EventBus {
    type Result = ();

    /// Equivalent to [`EventBus::stop`]; present so the bus can be driven
    /// through the same [`SyncShutdown`] interface as [`crate::engine::Engine`].
    fn shutdown(&mut self) -> Self::Result {
        self.stop();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("stopped", &self.is_stopped())
            .field("queue_size", &self.queue_size())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..100 {
            if check() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(check(), "condition never became true");
    }

    #[test]
    fn publish_before_subscribe_is_not_delivered() {
        let bus = EventBus::new(BusConfig::default()).unwrap();
        bus.publish(Event::builder(EventType::Signal, chrono::Utc::now()).build())
            .unwrap();
        bus.dispatch();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        bus.subscribe(vec![EventType::Signal], move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        bus.publish(Event::builder(EventType::Signal, chrono::Utc::now()).build())
            .unwrap();
        bus.dispatch();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_refuses_further_publish() {
        let bus = EventBus::new(BusConfig::default()).unwrap();
        bus.stop();
        let err = bus
            .publish(Event::builder(EventType::System, chrono::Utc::now()).build())
            .unwrap_err();
        assert!(matches!(err, EngineError::BusStopped));
    }

    #[test]
    fn batch_policy_waits_for_threshold() {
        let bus = EventBus::new(BusConfig {
            initial_policy: DispatchPolicy::Batch(3),
            ..Default::default()
        })
        .unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        bus.subscribe(vec![EventType::System], move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(Event::builder(EventType::System, chrono::Utc::now()).build())
            .unwrap();
        bus.publish(Event::builder(EventType::System, chrono::Utc::now()).build())
            .unwrap();
        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        bus.publish(Event::builder(EventType::System, chrono::Utc::now()).build())
            .unwrap();
        wait_until(|| calls.load(Ordering::SeqCst) == 3);
        bus.stop();
    }

    #[test]
    fn unsubscribe_unknown_id_returns_not_found() {
        let bus = EventBus::new(BusConfig::default()).unwrap();
        let err = bus.unsubscribe(uuid::Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn clear_drops_queue_and_subscribers() {
        let bus = EventBus::new(BusConfig::default()).unwrap();
        bus.subscribe(vec![EventType::System], |_| {});
        bus.publish_delayed(
            Event::builder(EventType::System, chrono::Utc::now()).build(),
            chrono::Utc::now() + chrono::Duration::seconds(60),
        )
        .unwrap();
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.queue_size(), 1);

        bus.clear();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.queue_size(), 0);
    }

    #[test]
    fn reset_clears_queue_but_keeps_subscribers() {
        let bus = EventBus::new(BusConfig::default()).unwrap();
        bus.subscribe(vec![EventType::System], |_| {});
        bus.publish_delayed(
            Event::builder(EventType::System, chrono::Utc::now()).build(),
            chrono::Utc::now() + chrono::Duration::seconds(60),
        )
        .unwrap();
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.queue_size(), 1);

        bus.reset();
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.queue_size(), 0);
        assert!(!bus.is_stopped());
    }
}
