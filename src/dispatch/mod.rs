//! # EventDispatcher
//!
//! Fans a batch of due events out to their subscribers. Ported from the
//! original engine's `EventDispatcher::dispatch`/`notify_subscribers`: one
//! event or one subscriber callback panicking must never prevent the rest
//! of the batch from being delivered, so every callback invocation is
//! isolated behind [`std::panic::catch_unwind`].

pub mod controller;
pub mod executor;

pub use controller::DispatchController;
pub use executor::Executor;

use crate::event::Event;
use crate::subscription::SubscriptionManager;
use std::panic::AssertUnwindSafe;

/// Dispatches due events to their registered subscribers.
#[derive(Debug, Default)]
pub struct EventDispatcher;

impl EventDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Dispatch every event in `events`, each independently clone-isolated
    /// and notified to its subscribers. A panicking subscriber is caught and
    /// logged; it never aborts the batch.
    pub fn dispatch(&self, events: &[Event], subs: &SubscriptionManager) -> usize {
        let mut dispatched = 0;
        for event in events {
            self.notify_subscribers(event, subs);
            dispatched += 1;
        }
        dispatched
    }

    fn notify_subscribers(&self, event: &Event, subs: &SubscriptionManager) {
        for subscriber in subs.get_subscribers(event.kind) {
            let per_subscriber_copy = event.clone_for_dispatch();
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                subscriber.notify(&per_subscriber_copy);
            }));
            if let Err(panic) = result {
                let message = panic_message(&panic);
                tracing::error!(
                    subscriber_id = %subscriber.id(),
                    event_id = %event.id,
                    event_type = ?event.kind,
                    %message,
                    "subscriber callback panicked; continuing with remaining subscribers"
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn event(kind: EventType) -> Event {
        Event::builder(kind, chrono::Utc::now()).build()
    }

    #[test]
    fn dispatch_notifies_every_matching_subscriber() {
        let subs = SubscriptionManager::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c1 = calls.clone();
        subs.add_subscriber(vec![EventType::Signal], move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = calls.clone();
        subs.add_subscriber(vec![EventType::Signal], move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        let dispatcher = EventDispatcher::new();
        let dispatched = dispatcher.dispatch(&[event(EventType::Signal)], &subs);

        assert_eq!(dispatched, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_subscriber_does_not_block_other_subscribers() {
        let subs = SubscriptionManager::new();
        let survived = Arc::new(AtomicUsize::new(0));

        subs.add_subscriber(vec![EventType::Alert], |_| {
            panic!("boom");
        });
        let survived_clone = survived.clone();
        subs.add_subscriber(vec![EventType::Alert], move |_| {
            survived_clone.fetch_add(1, Ordering::SeqCst);
        });

        let dispatcher = EventDispatcher::new();
        dispatcher.dispatch(&[event(EventType::Alert)], &subs);

        assert_eq!(survived.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_skips_events_with_no_subscribers() {
        let subs = SubscriptionManager::new();
        let dispatcher = EventDispatcher::new();
        let dispatched = dispatcher.dispatch(&[event(EventType::News)], &subs);
        assert_eq!(dispatched, 1);
    }
}
