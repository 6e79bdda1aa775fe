//! # EngineContext
//!
//! The handle passed to collaborators ([`super::trigger::TriggerAction`]
//! implementations, data source callbacks) that need engine facilities
//! without the full lifecycle API [`super::Engine`] exposes. Ported from the
//! original engine's `EngineContext`; the original's `dynamic_cast<EngineImpl*>`
//! dance (needed because `EngineContext` only held a base `Engine*`) has no
//! counterpart here since the context holds the same shared inner state the
//! `Engine` itself does.

use super::state::EngineState;
use super::EngineInner;
use crate::clock::{Clock, ClockMode};
use crate::error::EngineResult;
use crate::event::Event;
use chrono::{DateTime, Duration, Utc};
use std::any::Any;
use std::sync::Arc;
use uuid::Uuid;

/// Shared runtime context, cheaply cloneable (it's a thin `Arc` wrapper).
#[derive(Clone)]
pub struct EngineContext {
    pub(super) inner: Arc<EngineInner>,
}

impl EngineContext {
    pub fn current_time(&self) -> DateTime<Utc> {
        self.inner.clock.current_time()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.inner.clock.clone()
    }

    pub fn publish_event(&self, event: Event) -> EngineResult<()> {
        self.inner.event_bus.publish(event)
    }

    pub fn find_data_source(&self, name: &str) -> Option<Arc<dyn super::data_source::DataSource>> {
        self.inner.data_sources.read().get(name).cloned()
    }

    pub fn all_data_source_names(&self) -> Vec<String> {
        self.inner.data_sources.read().keys().cloned().collect()
    }

    pub fn set_user_data(&self, key: impl Into<String>, value: Box<dyn Any + Send + Sync>) {
        self.inner.user_data.lock().insert(key.into(), value);
    }

    pub fn get_user_data(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.inner.user_data.lock().get(key).cloned()
    }

    pub fn has_user_data(&self, key: &str) -> bool {
        self.inner.user_data.lock().contains_key(key)
    }

    pub fn remove_user_data(&self, key: &str) -> bool {
        self.inner.user_data.lock().remove(key).is_some()
    }

    pub fn all_user_data_keys(&self) -> Vec<String> {
        self.inner.user_data.lock().keys().cloned().collect()
    }

    pub fn set_engine_flag(&self, flag: impl Into<String>, value: bool) {
        self.inner.engine_flags.lock().insert(flag.into(), value);
    }

    pub fn get_engine_flag(&self, flag: &str) -> bool {
        self.inner
            .engine_flags
            .lock()
            .get(flag)
            .copied()
            .unwrap_or(false)
    }

    pub fn get_config_param(&self, key: &str) -> Option<String> {
        self.inner.config.get_param(key).map(str::to_string)
    }

    /// JSON snapshot of runtime statistics, mirroring the original's
    /// `get_runtime_stats`.
    pub fn runtime_stats_json(&self) -> String {
        let snapshot = self.inner.stats.snapshot(self.current_time());
        serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn is_engine_running(&self) -> bool {
        self.inner.state.get().to_external() == EngineState::Running
    }

    pub fn is_backtest_mode(&self) -> bool {
        self.inner.clock.mode() == ClockMode::Backtest
    }

    pub fn is_realtime_mode(&self) -> bool {
        self.inner.clock.mode() == ClockMode::Realtime
    }

    pub fn context_id(&self) -> Uuid {
        self.inner.context_id
    }

    pub fn engine_start_time(&self) -> Option<DateTime<Utc>> {
        self.inner.stats.start_time()
    }

    pub fn engine_uptime(&self) -> Duration {
        self.inner.stats.uptime(self.current_time())
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("context_id", &self.context_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::super::config::{ClockConfig, EngineConfig};
    use super::super::Engine;
    use super::*;

    fn engine() -> Engine {
        Engine::new(EngineConfig {
            clock: ClockConfig::Realtime,
            bus: Default::default(),
            event_queue_capacity: None,
            parameters: Default::default(),
        })
        .unwrap()
    }

    #[test]
    fn user_data_round_trips_by_key() {
        let context = engine().context();
        assert!(!context.has_user_data("k"));
        context.set_user_data("k", Box::new(42i32));
        assert!(context.has_user_data("k"));
        let value = context.get_user_data("k").unwrap();
        assert_eq!(*value.downcast_ref::<i32>().unwrap(), 42);
        assert!(context.remove_user_data("k"));
        assert!(!context.has_user_data("k"));
    }

    #[test]
    fn engine_flags_default_to_false() {
        let context = engine().context();
        assert!(!context.get_engine_flag("backtesting"));
        context.set_engine_flag("backtesting", true);
        assert!(context.get_engine_flag("backtesting"));
    }

    #[test]
    fn runtime_stats_json_is_valid_json() {
        let context = engine().context();
        let json = context.runtime_stats_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("total_events_processed").is_some());
    }
}
