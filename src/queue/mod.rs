//! # EventQueue
//!
//! Thread-safe queue holding immediate (FIFO) and delayed (min-heap by
//! scheduled time) entries. Ported from the original engine's
//! `EventQueue`/`EventQueue.cpp`: a single mutex guards both containers, and
//! `poll_due_events` is the only draining operation; no blocking wait lives
//! here, that belongs to [`crate::dispatch::DispatchController`].

use crate::event::Event;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// A delayed entry, ordered by `scheduled_time` ascending (earliest first)
/// when held in a max-heap via `Reverse`-style comparison.
#[derive(Debug)]
struct DelayedEntry {
    event: Event,
    scheduled_time: DateTime<Utc>,
}

impl PartialEq for DelayedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.scheduled_time == other.scheduled_time
    }
}
impl Eq for DelayedEntry {}

impl PartialOrd for DelayedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the earliest
        // `scheduled_time` first.
        other.scheduled_time.cmp(&self.scheduled_time)
    }
}

#[derive(Debug, Default)]
struct QueueState {
    immediate: VecDeque<Event>,
    delayed: BinaryHeap<DelayedEntry>,
}

/// Thread-safe holder of immediate and time-scheduled events.
#[derive(Debug, Default)]
pub struct EventQueue {
    state: Mutex<QueueState>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an immediate (FIFO) event.
    pub fn enqueue(&self, event: Event) {
        self.state.lock().immediate.push_back(event);
    }

    /// Push a delayed event due at `scheduled_time`.
    pub fn enqueue_delayed(&self, event: Event, scheduled_time: DateTime<Utc>) {
        self.state.lock().delayed.push(DelayedEntry {
            event,
            scheduled_time,
        });
    }

    /// Drain every immediate event (FIFO order) followed by every delayed
    /// event whose `scheduled_time <= now` (scheduled-time order).
    ///
    /// Across separate polls, global time order is preserved: a delayed
    /// event cannot become due before its scheduled instant, so a later poll
    /// never observes an earlier-due event that an earlier poll missed.
    pub fn poll_due_events(&self, now: DateTime<Utc>) -> Vec<Event> {
        let mut state = self.state.lock();
        let mut due = Vec::with_capacity(state.immediate.len());
        due.extend(state.immediate.drain(..));

        while let Some(top) = state.delayed.peek() {
            if top.scheduled_time > now {
                break;
            }
            // Safe to unwrap: we just confirmed `peek` returned `Some`.
            due.push(state.delayed.pop().unwrap().event);
        }

        due
    }

    /// Total immediate + delayed entries currently queued.
    pub fn size(&self) -> usize {
        let state = self.state.lock();
        state.immediate.len() + state.delayed.len()
    }

    /// Drop every queued entry, immediate and delayed alike.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.immediate.clear();
        state.delayed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn event(source: &str) -> Event {
        Event::builder(EventType::System, Utc::now())
            .source(source)
            .build()
    }

    #[test]
    fn poll_drains_immediate_in_fifo_order() {
        let queue = EventQueue::new();
        queue.enqueue(event("a"));
        queue.enqueue(event("b"));
        queue.enqueue(event("c"));

        let due = queue.poll_due_events(Utc::now());
        let sources: Vec<_> = due.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "b", "c"]);
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn delayed_event_not_due_before_scheduled_time() {
        let queue = EventQueue::new();
        queue.enqueue_delayed(event("late"), t(200));

        assert!(queue.poll_due_events(t(100)).is_empty());
        let due = queue.poll_due_events(t(250));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].source.as_str(), "late");
    }

    #[test]
    fn poll_orders_immediate_before_delayed() {
        let queue = EventQueue::new();
        queue.enqueue_delayed(event("delayed"), t(10));
        queue.enqueue(event("immediate"));

        let due = queue.poll_due_events(t(20));
        let sources: Vec<_> = due.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec!["immediate", "delayed"]);
    }

    #[test]
    fn delayed_events_drain_in_scheduled_time_order() {
        let queue = EventQueue::new();
        queue.enqueue_delayed(event("third"), t(30));
        queue.enqueue_delayed(event("first"), t(10));
        queue.enqueue_delayed(event("second"), t(20));

        let due = queue.poll_due_events(t(100));
        let sources: Vec<_> = due.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec!["first", "second", "third"]);
    }

    #[test]
    fn clear_drops_everything() {
        let queue = EventQueue::new();
        queue.enqueue(event("a"));
        queue.enqueue_delayed(event("b"), t(100));
        assert_eq!(queue.size(), 2);
        queue.clear();
        assert_eq!(queue.size(), 0);
    }
}
