//! # Engine
//!
//! Top-level lifecycle owner: wires a [`crate::clock::Clock`] and
//! [`crate::bus::EventBus`] together, drains a time-ordered priority queue of
//! scheduled events on its own event-loop thread, evaluates registered
//! [`Trigger`]s against every event that passes through the bus, and tracks
//! data sources, listeners, and runtime statistics. Ported from the original
//! engine's `EngineImpl`, whose `event_queue_`/`event_loop_thread_` pair
//! (`EngineImpl.h`) becomes the `priority_queue`/`loop_handle` pair below.

pub mod config;
pub mod context;
pub mod data_source;
pub mod listener;
pub mod state;
pub mod stats;
pub mod trigger;

pub use config::{ClockConfig, EngineConfig};
pub use context::EngineContext;
pub use data_source::{DataSource, DataSourceState};
pub use listener::EngineListener;
pub use state::EngineState;
pub use stats::StatisticsSnapshot;
pub use trigger::{FnAction, FnCondition, Trigger, TriggerAction, TriggerCondition};

use crate::bus::EventBus;
use crate::clock::{AcceleratedClock, BacktestClock, Clock, ClockMode, RealtimeClock};
use crate::error::{EngineError, EngineResult};
use crate::event::{Event, EventType};
use crate::shutdown::SyncShutdown;
use crate::subscription::SubscriptionId;
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use state::{InternalState, StateCell};
use stats::EngineStatistics;
use std::any::Any;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Weak};
use std::thread::JoinHandle;
use uuid::Uuid;

const ALL_EVENT_TYPES: [EventType; 7] = [
    EventType::System,
    EventType::MarketData,
    EventType::News,
    EventType::Signal,
    EventType::Alert,
    EventType::Warning,
    EventType::UserCustom,
];

const LOOP_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(50);

/// An [`Event`] preloaded into [`Engine`]'s priority queue, ordered earliest
/// `timestamp` first. `seq` breaks ties in insertion order, mirroring the
/// original's `std::priority_queue<EventItem, ..., std::greater<EventItem>>`
/// (which only compared `timestamp`).
struct ScheduledEvent {
    timestamp: DateTime<Utc>,
    seq: u64,
    event: Event,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp && self.seq == other.seq
    }
}
impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the earliest `timestamp`
        // (then lowest `seq`) first.
        (other.timestamp, other.seq).cmp(&(self.timestamp, self.seq))
    }
}

pub(crate) struct EngineInner {
    context_id: Uuid,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    event_bus: Arc<EventBus>,
    state: StateCell,
    stats: EngineStatistics,
    data_sources: RwLock<IndexMap<String, Arc<dyn DataSource>>>,
    triggers: RwLock<FnvHashMap<Uuid, Trigger>>,
    listeners: RwLock<Vec<Arc<dyn EngineListener>>>,
    user_data: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    engine_flags: Mutex<HashMap<String, bool>>,
    internal_subscription: Mutex<Option<SubscriptionId>>,
    priority_queue: Mutex<BinaryHeap<ScheduledEvent>>,
    schedule_seq: AtomicU64,
    loop_stop_flag: Arc<AtomicBool>,
    loop_paused_flag: Arc<AtomicBool>,
    loop_wake: Arc<(std::sync::Mutex<()>, Condvar)>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl EngineInner {
    fn notify_state_changed(&self, old_state: EngineState, new_state: EngineState) {
        if old_state == new_state {
            return;
        }
        for listener in self.listeners.read().iter() {
            listener.on_state_changed(old_state, new_state);
        }
    }

    fn notify_error(&self, error: &EngineError) {
        self.stats.record_error();
        for listener in self.listeners.read().iter() {
            listener.on_error(error);
        }
    }

    fn notify_statistics_updated(&self) {
        let snapshot = self.stats.snapshot(self.clock.current_time());
        for listener in self.listeners.read().iter() {
            listener.on_statistics_updated(&snapshot);
        }
    }

    fn evaluate_triggers(&self, event: &Event) {
        let now = self.clock.current_time();
        for trigger in self.triggers.read().values() {
            match trigger.evaluate(event, now) {
                Ok(true) => self.stats.record_trigger_fired(),
                Ok(false) => {}
                Err(error) => self.notify_error(&error),
            }
        }
    }

    /// Attempt `current -> next`, notifying listeners on success. Shared by
    /// [`Engine`]'s public lifecycle methods and the event-loop thread, which
    /// cannot call back into `Engine::stop` without deadlocking itself.
    fn transition(&self, next: InternalState) -> EngineResult<()> {
        let old_external = self.state.get().to_external();
        if !self.state.transition(next) {
            return Err(EngineError::Busy(format!(
                "cannot transition from {:?} to {next}",
                self.state.get()
            )));
        }
        self.notify_state_changed(old_external, next.to_external());
        Ok(())
    }

    fn wake_loop(&self) {
        let (lock, cvar) = &*self.loop_wake;
        let _guard = lock.lock().unwrap();
        cvar.notify_all();
    }
}

/// Owns a single engine run: one clock, one bus, its data sources, triggers,
/// listeners, and a time-ordered priority queue of scheduled events drained
/// by a dedicated event-loop thread.
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Construct an engine per `config`, in state [`EngineState::Created`].
    /// Call [`Engine::initialize`] and then [`Engine::start`] to run it.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let clock: Arc<dyn Clock> = match &config.clock {
            ClockConfig::Backtest { start, end, step } => {
                Arc::new(BacktestClock::new(*start, *end, *step))
            }
            ClockConfig::Realtime => Arc::new(RealtimeClock::new()),
            ClockConfig::Accelerated { sim_start, factor } => {
                Arc::new(AcceleratedClock::new(*sim_start, *factor))
            }
        };
        let event_bus = Arc::new(EventBus::new((&config.bus).into())?);

        let inner = Arc::new(EngineInner {
            context_id: Uuid::new_v4(),
            config,
            clock,
            event_bus,
            state: StateCell::default(),
            stats: EngineStatistics::new(),
            data_sources: RwLock::new(IndexMap::new()),
            triggers: RwLock::new(FnvHashMap::default()),
            listeners: RwLock::new(Vec::new()),
            user_data: Mutex::new(HashMap::new()),
            engine_flags: Mutex::new(HashMap::new()),
            internal_subscription: Mutex::new(None),
            priority_queue: Mutex::new(BinaryHeap::new()),
            schedule_seq: AtomicU64::new(0),
            loop_stop_flag: Arc::new(AtomicBool::new(true)),
            loop_paused_flag: Arc::new(AtomicBool::new(false)),
            loop_wake: Arc::new((std::sync::Mutex::new(()), Condvar::new())),
            loop_handle: Mutex::new(None),
        });

        // Weak, not a strong Arc: a strong clone here would leave the bus's
        // subscriber list holding a reference back into `inner`, keeping the
        // whole engine alive forever even after every external handle to it
        // is dropped.
        let weak_inner = Arc::downgrade(&inner);
        let subscription = inner
            .event_bus
            .subscribe(ALL_EVENT_TYPES.to_vec(), move |event| {
                if let Some(inner) = weak_inner.upgrade() {
                    inner.stats.record_event_processed();
                    inner.evaluate_triggers(event);
                }
            });
        *inner.internal_subscription.lock() = Some(subscription);

        Ok(Self { inner })
    }

    fn transition(&self, next: InternalState) -> EngineResult<()> {
        self.inner.transition(next)
    }

    /// `Created -> Initialized`.
    pub fn initialize(&self) -> EngineResult<()> {
        self.transition(InternalState::Initializing)?;
        self.transition(InternalState::Initialized)
    }

    /// `Initialized | Paused -> Running`. Starts the clock and the event-loop
    /// thread on first entry; clears a pending pause and wakes the loop on
    /// resume.
    pub fn start(&self) -> EngineResult<()> {
        self.transition(InternalState::Starting)?;
        if let Err(error) = self.inner.clock.start() {
            // Already running (e.g. resuming from Paused) is not fatal.
            tracing::debug!(%error, "clock start reported already running");
        }
        self.start_event_loop();
        self.inner
            .loop_paused_flag
            .store(false, AtomicOrdering::Release);
        self.inner.wake_loop();
        self.transition(InternalState::Running)?;
        self.inner.stats.record_start(self.inner.clock.current_time());
        Ok(())
    }

    /// `Running -> Stopping -> Stopped`. The bus finishes in-flight dispatch
    /// before it stops accepting new `publish` calls. Idempotent: calling
    /// `stop` on an already-stopped engine (whether stopped explicitly or
    /// because the event loop reached the end of a backtest window) is a
    /// no-op that returns `Ok(())`.
    pub fn stop(&self) -> EngineResult<()> {
        if self.state() == EngineState::Stopped {
            return Ok(());
        }
        self.stop_event_loop();
        match self.transition(InternalState::Stopping) {
            Ok(()) => {}
            Err(_) if self.state() == EngineState::Stopped => return Ok(()),
            Err(error) => return Err(error),
        }
        self.inner.event_bus.stop();
        let _ = self.inner.clock.stop();
        match self.transition(InternalState::Stopped) {
            Ok(()) => Ok(()),
            Err(_) if self.state() == EngineState::Stopped => Ok(()),
            Err(error) => Err(error),
        }
    }

    /// `Running -> Paused`. The event-loop thread parks on its condvar
    /// instead of draining the priority queue until [`Engine::resume`] clears
    /// the pause flag.
    pub fn pause(&self) -> EngineResult<()> {
        self.transition(InternalState::Pausing)?;
        self.transition(InternalState::Paused)?;
        self.inner
            .loop_paused_flag
            .store(true, AtomicOrdering::Release);
        self.inner.wake_loop();
        Ok(())
    }

    /// `Paused -> Running`.
    pub fn resume(&self) -> EngineResult<()> {
        self.start()
    }

    /// `Stopped -> Initialized`, clearing the bus's queued and subscribed
    /// state and the priority queue so the engine can be started again from
    /// a clean slate.
    pub fn reset(&self) -> EngineResult<()> {
        self.transition(InternalState::Initialized)?;
        self.inner.priority_queue.lock().clear();
        self.inner.event_bus.clear();
        self.inner.event_bus.start();
        Ok(())
    }

    pub fn state(&self) -> EngineState {
        self.inner.state.get().to_external()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.inner.clock.clone()
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.inner.event_bus.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn context(&self) -> EngineContext {
        EngineContext {
            inner: self.inner.clone(),
        }
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        let snapshot = self.inner.stats.snapshot(self.inner.clock.current_time());
        self.inner.notify_statistics_updated();
        snapshot
    }

    pub fn register_data_source(&self, source: Arc<dyn DataSource>) -> EngineResult<()> {
        let name = source.name().to_string();
        let mut sources = self.inner.data_sources.write();
        if sources.contains_key(&name) {
            return Err(EngineError::AlreadyExists(format!(
                "data source '{name}' already registered"
            )));
        }
        sources.insert(name, source);
        Ok(())
    }

    pub fn unregister_data_source(&self, name: &str) -> EngineResult<()> {
        self.inner
            .data_sources
            .write()
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("data source '{name}'")))
    }

    pub fn data_source_names(&self) -> Vec<String> {
        self.inner.data_sources.read().keys().cloned().collect()
    }

    pub fn get_data_source(&self, name: &str) -> Option<Arc<dyn DataSource>> {
        self.inner.data_sources.read().get(name).cloned()
    }

    pub fn register_trigger(&self, trigger: Trigger) -> Uuid {
        let id = trigger.id();
        self.inner.triggers.write().insert(id, trigger);
        id
    }

    pub fn unregister_trigger(&self, id: Uuid) -> EngineResult<()> {
        self.inner
            .triggers
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("trigger {id}")))
    }

    pub fn trigger_ids(&self) -> Vec<Uuid> {
        self.inner.triggers.read().keys().copied().collect()
    }

    pub fn register_listener(&self, listener: Arc<dyn EngineListener>) {
        self.inner.listeners.write().push(listener);
    }

    pub fn unregister_listener(&self, listener: &Arc<dyn EngineListener>) {
        self.inner
            .listeners
            .write()
            .retain(|candidate| !Arc::ptr_eq(candidate, listener));
    }

    /// Publish `event` directly on this engine's bus, bypassing the priority
    /// queue. Useful for live/realtime producers that have no notion of
    /// scheduled replay order; see [`Engine::schedule_event`] for the
    /// backtest-replay path.
    pub fn publish_event(&self, event: Event) -> EngineResult<()> {
        self.inner.event_bus.publish(event)
    }

    /// Preload `event` into the time-ordered priority queue the event-loop
    /// thread drains. In Backtest mode, the loop advances the clock to each
    /// popped event's timestamp before publishing it, so events scheduled out
    /// of order are delivered to the bus in non-decreasing timestamp order
    /// (spec.md §8 "Backtest monotonicity").
    pub fn schedule_event(&self, event: Event) -> EngineResult<()> {
        let seq = self.inner.schedule_seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.inner.priority_queue.lock().push(ScheduledEvent {
            timestamp: event.timestamp,
            seq,
            event,
        });
        self.inner.wake_loop();
        Ok(())
    }

    pub fn scheduled_event_count(&self) -> usize {
        self.inner.priority_queue.lock().len()
    }

    fn start_event_loop(&self) {
        if !self.inner.loop_stop_flag.swap(false, AtomicOrdering::AcqRel) {
            return;
        }
        let weak_inner = Arc::downgrade(&self.inner);
        let stop_flag = self.inner.loop_stop_flag.clone();
        let paused_flag = self.inner.loop_paused_flag.clone();
        let wake = self.inner.loop_wake.clone();

        let handle = std::thread::Builder::new()
            .name("kestrel-engine-event-loop".into())
            .spawn(move || run_event_loop(weak_inner, stop_flag, paused_flag, wake))
            .expect("failed to spawn engine event-loop thread");
        *self.inner.loop_handle.lock() = Some(handle);
    }

    fn stop_event_loop(&self) {
        if self.inner.loop_stop_flag.swap(true, AtomicOrdering::AcqRel) {
            return;
        }
        self.inner.wake_loop();
        if let Some(handle) = self.inner.loop_handle.lock().take() {
            let _ = handle.join();
        }
    }
}

impl SyncShutdown for Engine {
    type Result = EngineResult<()>;

    fn shutdown(&mut self) -> Self::Result {
        self.stop()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state())
            .field("context_id", &self.inner.context_id)
            .finish_non_exhaustive()
    }
}

/// Body of the engine's dedicated event-loop thread: waits for a scheduled
/// event to become available, advances the clock (Backtest mode) and
/// publishes it onto the bus, and detects reaching the end of a Backtest
/// window to self-terminate. While `paused_flag` is set the loop only parks
/// on the condvar; it never pops the priority queue or touches the clock.
/// Ported from the original `EngineImpl::event_loop`.
fn run_event_loop(
    inner: Weak<EngineInner>,
    stop_flag: Arc<AtomicBool>,
    paused_flag: Arc<AtomicBool>,
    wake: Arc<(std::sync::Mutex<()>, Condvar)>,
) {
    while !stop_flag.load(AtomicOrdering::Acquire) {
        {
            let (lock, cvar) = &*wake;
            let guard = lock.lock().unwrap();
            let _ = cvar.wait_timeout(guard, LOOP_POLL_INTERVAL).unwrap();
        }
        if stop_flag.load(AtomicOrdering::Acquire) {
            break;
        }
        if paused_flag.load(AtomicOrdering::Acquire) {
            continue;
        }
        let Some(inner) = inner.upgrade() else {
            break;
        };

        loop {
            if stop_flag.load(AtomicOrdering::Acquire) || paused_flag.load(AtomicOrdering::Acquire)
            {
                break;
            }
            let next = inner.priority_queue.lock().pop();
            let Some(scheduled) = next else { break };

            if let Err(error) = dispatch_scheduled_event(&inner, scheduled.event) {
                inner.notify_error(&error);
                auto_stop(&inner, &stop_flag);
                return;
            }
            if inner.clock.is_at_end() {
                auto_stop(&inner, &stop_flag);
                return;
            }
        }
    }
}

fn dispatch_scheduled_event(inner: &EngineInner, event: Event) -> EngineResult<()> {
    if inner.clock.mode() == ClockMode::Backtest {
        inner.clock.advance_to(event.timestamp)?;
    }
    inner.event_bus.publish(event)
}

/// Transition `Running -> Stopping -> Stopped` from inside the event-loop
/// thread itself (reached the end of a Backtest window, or a fatal
/// scheduling error). Cannot call `Engine::stop`, which would join this very
/// thread and deadlock; duplicates just enough of its teardown instead.
fn auto_stop(inner: &Arc<EngineInner>, stop_flag: &Arc<AtomicBool>) {
    stop_flag.store(true, AtomicOrdering::Release);
    if inner.transition(InternalState::Stopping).is_ok() {
        inner.event_bus.stop();
        let _ = inner.clock.stop();
        let _ = inner.transition(InternalState::Stopped);
    }
}
