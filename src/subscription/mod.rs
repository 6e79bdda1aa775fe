//! # SubscriptionManager
//!
//! Maps [`EventType`]s to the subscribers interested in them. Ported from the
//! original engine's `SubscriptionManager`: one lock guards the whole
//! registry, `add_subscriber` fans a single subscriber out across every
//! `EventType` it declared interest in, and `get_subscribers` hands back a
//! cloned snapshot so a dispatch in progress never observes a concurrent
//! `remove_subscriber`.

use crate::event::EventType;
use fnv::FnvHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// Identifies a subscription returned by [`SubscriptionManager::add_subscriber`].
pub type SubscriptionId = Uuid;

/// A subscriber callback: invoked once per matching [`crate::event::Event`],
/// independently per subscriber (see [`crate::event::Event::clone_for_dispatch`]).
pub type SubscriberFn = dyn Fn(&crate::event::Event) + Send + Sync;

/// A registered subscriber: an id, the callback, and the set of
/// [`EventType`]s it was registered under (kept so `remove_subscriber` need
/// not scan the full type space).
pub struct Subscriber {
    id: SubscriptionId,
    event_types: Vec<EventType>,
    callback: Box<SubscriberFn>,
}

impl Subscriber {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn event_types(&self) -> &[EventType] {
        &self.event_types
    }

    pub fn notify(&self, event: &crate::event::Event) {
        (self.callback)(event);
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("event_types", &self.event_types)
            .finish_non_exhaustive()
    }
}

/// Registry of subscribers keyed by the [`EventType`]s they declared.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    subs: RwLock<FnvHashMap<EventType, Vec<Arc<Subscriber>>>>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` against every type in `event_types`, returning an
    /// id that later identifies this subscription for removal.
    pub fn add_subscriber(
        &self,
        event_types: Vec<EventType>,
        callback: impl Fn(&crate::event::Event) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let subscriber = Arc::new(Subscriber {
            id: Uuid::new_v4(),
            event_types: event_types.clone(),
            callback: Box::new(callback),
        });

        let mut subs = self.subs.write();
        for event_type in event_types {
            subs.entry(event_type).or_default().push(subscriber.clone());
        }
        subscriber.id
    }

    /// Remove every registration for `id`. Returns `true` if at least one
    /// entry was removed.
    pub fn remove_subscriber(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subs.write();
        let mut removed = false;
        for subscribers in subs.values_mut() {
            let before = subscribers.len();
            subscribers.retain(|s| s.id() != id);
            removed |= subscribers.len() != before;
        }
        removed
    }

    /// Snapshot of the subscribers currently registered for `event_type`.
    pub fn get_subscribers(&self, event_type: EventType) -> Vec<Arc<Subscriber>> {
        self.subs
            .read()
            .get(&event_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Total subscriber registrations across every `EventType` (a subscriber
    /// registered under N types counts N times).
    pub fn subscriber_count(&self) -> usize {
        self.subs.read().values().map(Vec::len).sum()
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.subs.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    fn event(kind: EventType) -> Event {
        Event::builder(kind, chrono::Utc::now()).build()
    }

    #[test]
    fn add_subscriber_fans_out_across_declared_types() {
        let manager = SubscriptionManager::new();
        manager.add_subscriber(vec![EventType::Signal, EventType::Alert], |_| {});

        assert_eq!(manager.get_subscribers(EventType::Signal).len(), 1);
        assert_eq!(manager.get_subscribers(EventType::Alert).len(), 1);
        assert_eq!(manager.get_subscribers(EventType::News).len(), 0);
    }

    #[test]
    fn remove_subscriber_drops_all_its_registrations() {
        let manager = SubscriptionManager::new();
        let id = manager.add_subscriber(vec![EventType::Signal, EventType::Alert], |_| {});

        assert!(manager.remove_subscriber(id));
        assert_eq!(manager.get_subscribers(EventType::Signal).len(), 0);
        assert_eq!(manager.get_subscribers(EventType::Alert).len(), 0);
        assert!(!manager.remove_subscriber(id));
    }

    #[test]
    fn get_subscribers_returns_independent_snapshot() {
        let manager = SubscriptionManager::new();
        let id = manager.add_subscriber(vec![EventType::Signal], |_| {});

        let snapshot = manager.get_subscribers(EventType::Signal);
        manager.remove_subscriber(id);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(manager.get_subscribers(EventType::Signal).len(), 0);
    }

    #[test]
    fn notify_invokes_callback() {
        let manager = SubscriptionManager::new();
        let calls = StdArc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        manager.add_subscriber(vec![EventType::Signal], move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        for subscriber in manager.get_subscribers(EventType::Signal) {
            subscriber.notify(&event(EventType::Signal));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
