//! Runtime statistics, ported from the original engine's
//! `EngineImpl::InternalStatistics`. Counters are plain atomics so the hot
//! event loop never takes a lock to record them.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct EngineStatistics {
    total_events_processed: AtomicU64,
    total_triggers_fired: AtomicU64,
    total_errors: AtomicU64,
    start_time: Mutex<Option<DateTime<Utc>>>,
    last_statistics_update: Mutex<DateTime<Utc>>,
}

impl EngineStatistics {
    pub fn new() -> Self {
        Self {
            total_events_processed: AtomicU64::new(0),
            total_triggers_fired: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            start_time: Mutex::new(None),
            last_statistics_update: Mutex::new(Utc::now()),
        }
    }

    /// Record the moment the engine entered `Running`. Idempotent: only the
    /// first call sets `start_time`, so a pause/resume cycle does not reset
    /// uptime.
    pub fn record_start(&self, now: DateTime<Utc>) {
        let mut start_time = self.start_time.lock();
        if start_time.is_none() {
            *start_time = Some(now);
        }
    }

    pub fn record_event_processed(&self) {
        self.total_events_processed.fetch_add(1, Ordering::Relaxed);
        *self.last_statistics_update.lock() = Utc::now();
    }

    pub fn record_trigger_fired(&self) {
        self.total_triggers_fired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        *self.start_time.lock()
    }

    pub fn uptime(&self, now: DateTime<Utc>) -> chrono::Duration {
        match self.start_time() {
            Some(start) => now - start,
            None => chrono::Duration::zero(),
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> StatisticsSnapshot {
        StatisticsSnapshot {
            total_events_processed: self.total_events_processed.load(Ordering::Relaxed),
            total_triggers_fired: self.total_triggers_fired.load(Ordering::Relaxed),
            total_errors: self.total_errors.load(Ordering::Relaxed),
            start_time: self.start_time(),
            uptime_ms: self.uptime(now).num_milliseconds(),
            last_statistics_update: *self.last_statistics_update.lock(),
        }
    }
}

impl Default for EngineStatistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time, serializable view of [`EngineStatistics`], returned by
/// [`crate::engine::Engine::statistics`] and serialized for
/// `EngineContext::runtime_stats_json`.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsSnapshot {
    pub total_events_processed: u64,
    pub total_triggers_fired: u64,
    pub total_errors: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub uptime_ms: i64,
    pub last_statistics_update: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_start_is_idempotent() {
        let stats = EngineStatistics::new();
        let first = Utc::now();
        stats.record_start(first);
        stats.record_start(first + chrono::Duration::seconds(10));
        assert_eq!(stats.start_time(), Some(first));
    }

    #[test]
    fn counters_accumulate() {
        let stats = EngineStatistics::new();
        stats.record_event_processed();
        stats.record_event_processed();
        stats.record_trigger_fired();
        stats.record_error();

        let snapshot = stats.snapshot(Utc::now());
        assert_eq!(snapshot.total_events_processed, 2);
        assert_eq!(snapshot.total_triggers_fired, 1);
        assert_eq!(snapshot.total_errors, 1);
    }

    #[test]
    fn uptime_is_zero_before_start() {
        let stats = EngineStatistics::new();
        assert_eq!(stats.uptime(Utc::now()), chrono::Duration::zero());
    }
}
