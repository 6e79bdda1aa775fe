//! # DispatchController
//!
//! Owns the background worker that periodically polls the [`EventQueue`]
//! and, when the active [`DispatchPolicy`] says so, hands due events to the
//! [`EventDispatcher`]. Ported from the original engine's
//! `DispatchController`/`DispatchWorker`: a condvar-gated loop that ticks on
//! a fixed interval but can also be woken early by [`DispatchController::notify`].
//!
//! Differs from the original in one respect: the polling thread always runs,
//! in both [`ExecutionMode::Sync`] and [`ExecutionMode::Async`], so a delayed
//! event becomes due even if no further `publish` call ever arrives to wake
//! it. In `Async` mode, `notify` additionally posts an opportunistic
//! poll-and-dispatch onto the [`Executor`] so a freshly published event need
//! not wait for the next tick.

use super::executor::Executor;
use super::EventDispatcher;
use crate::policy::{DispatchPolicy, DispatchStrategy};
use crate::queue::EventQueue;
use crate::subscription::SubscriptionManager;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Controls whether dispatch work runs on the controller's own polling
/// thread (`Sync`) or is additionally fanned out to an [`Executor`] (`Async`).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExecutionMode {
    Sync,
    Async,
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Name of the span wrapping each poll tick, exposed so a host's `tracing`
/// subscriber can filter out this (very chatty, every-50ms) span by name; see
/// [`crate::logging`].
pub const DISPATCH_POLL_SPAN_NAME: &str = "dispatch_poll_tick";

/// Background worker driving poll-and-dispatch cycles over an [`EventQueue`].
pub struct DispatchController {
    queue: Arc<EventQueue>,
    subs: Arc<SubscriptionManager>,
    dispatcher: Arc<EventDispatcher>,
    strategy: Arc<DispatchStrategy>,
    mode: ExecutionMode,
    executor: Executor,
    stop_flag: Arc<AtomicBool>,
    wake: Arc<(Mutex<()>, Condvar)>,
    worker: Mutex<Option<JoinHandle<()>>>,
    /// Count of opportunistic poll-and-dispatch tasks posted to `executor`
    /// in [`ExecutionMode::Async`] that have not yet finished running. `stop`
    /// waits for this to reach zero so a subscriber callback can never be
    /// invoked after `stop` has returned, since a task posted to a `rayon`
    /// pool would otherwise outlive `stop` entirely (the pool itself is kept
    /// alive by `executor` and is never torn down here).
    pending_async_tasks: Arc<AtomicUsize>,
}

impl DispatchController {
    pub fn new(
        queue: Arc<EventQueue>,
        subs: Arc<SubscriptionManager>,
        dispatcher: Arc<EventDispatcher>,
        mode: ExecutionMode,
        executor: Executor,
    ) -> Self {
        Self {
            queue,
            subs,
            dispatcher,
            strategy: Arc::new(DispatchStrategy::new(DispatchPolicy::Immediate)),
            mode,
            executor,
            stop_flag: Arc::new(AtomicBool::new(true)),
            wake: Arc::new((Mutex::new(()), Condvar::new())),
            worker: Mutex::new(None),
            pending_async_tasks: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Spawn the polling thread. A no-op if already running.
    pub fn start(&self) {
        if !self.stop_flag.swap(false, Ordering::AcqRel) {
            return;
        }
        let queue = self.queue.clone();
        let subs = self.subs.clone();
        let dispatcher = self.dispatcher.clone();
        let strategy = self.strategy.clone();
        let stop_flag = self.stop_flag.clone();
        let wake = self.wake.clone();

        let handle = std::thread::Builder::new()
            .name("kestrel-dispatch-controller".into())
            .spawn(move || run_loop(queue, subs, dispatcher, strategy, stop_flag, wake))
            .expect("failed to spawn dispatch controller thread");

        *self.worker.lock().unwrap() = Some(handle);
    }

    /// Stop the polling thread, wait for it to exit, and wait for every
    /// in-flight async-executor dispatch task to finish. A no-op if already
    /// stopped.
    pub fn stop(&self) {
        if self.stop_flag.swap(true, Ordering::AcqRel) {
            return;
        }
        let (lock, cvar) = &*self.wake;
        let _guard = lock.lock().unwrap();
        cvar.notify_all();
        drop(_guard);

        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }

        let (lock, cvar) = &*self.wake;
        let mut guard = lock.lock().unwrap();
        while self.pending_async_tasks.load(Ordering::Acquire) != 0 {
            let (next_guard, _) = cvar
                .wait_timeout(guard, Duration::from_millis(10))
                .unwrap();
            guard = next_guard;
        }
    }

    pub fn is_running(&self) -> bool {
        !self.stop_flag.load(Ordering::Acquire)
    }

    /// Wake the polling thread early, and in [`ExecutionMode::Async`], also
    /// post an opportunistic poll-and-dispatch to the executor.
    pub fn notify(&self) {
        let (lock, cvar) = &*self.wake;
        let _guard = lock.lock().unwrap();
        cvar.notify_all();
        drop(_guard);

        if self.mode == ExecutionMode::Async {
            let queue = self.queue.clone();
            let subs = self.subs.clone();
            let dispatcher = self.dispatcher.clone();
            let strategy = self.strategy.clone();
            let pending = self.pending_async_tasks.clone();
            let wake = self.wake.clone();
            pending.fetch_add(1, Ordering::AcqRel);
            self.executor.execute(move || {
                poll_and_maybe_dispatch(&queue, &subs, &dispatcher, &strategy);
                pending.fetch_sub(1, Ordering::AcqRel);
                let (lock, cvar) = &*wake;
                let _guard = lock.lock().unwrap();
                cvar.notify_all();
            });
        }
    }

    pub fn set_policy(&self, policy: DispatchPolicy) {
        self.strategy.set_policy(policy);
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.strategy.policy()
    }
}

impl std::fmt::Debug for DispatchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchController")
            .field("mode", &self.mode)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Drop for DispatchController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(
    queue: Arc<EventQueue>,
    subs: Arc<SubscriptionManager>,
    dispatcher: Arc<EventDispatcher>,
    strategy: Arc<DispatchStrategy>,
    stop_flag: Arc<AtomicBool>,
    wake: Arc<(Mutex<()>, Condvar)>,
) {
    while !stop_flag.load(Ordering::Acquire) {
        {
            let (lock, cvar) = &*wake;
            let guard = lock.lock().unwrap();
            let _ = cvar.wait_timeout(guard, POLL_INTERVAL).unwrap();
        }
        if stop_flag.load(Ordering::Acquire) {
            break;
        }
        let _span = tracing::debug_span!("dispatch_poll_tick").entered();
        poll_and_maybe_dispatch(&queue, &subs, &dispatcher, &strategy);
    }
}

fn poll_and_maybe_dispatch(
    queue: &EventQueue,
    subs: &SubscriptionManager,
    dispatcher: &EventDispatcher,
    strategy: &DispatchStrategy,
) {
    let due = queue.poll_due_events(chrono::Utc::now());
    if due.is_empty() {
        return;
    }
    if strategy.should_dispatch(due.len()) {
        dispatcher.dispatch(&due, subs);
        strategy.update_last_dispatch();
    } else {
        // Policy declined this batch; events are already drained from the
        // queue, so re-enqueue them immediate-first to try again next tick.
        for event in due {
            queue.enqueue(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventType};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration as StdDuration;

    fn controller(mode: ExecutionMode) -> DispatchController {
        DispatchController::new(
            Arc::new(EventQueue::new()),
            Arc::new(SubscriptionManager::new()),
            Arc::new(EventDispatcher::new()),
            mode,
            Executor::Inline,
        )
    }

    #[test]
    fn start_stop_is_idempotent() {
        let controller = controller(ExecutionMode::Sync);
        controller.start();
        controller.start();
        assert!(controller.is_running());
        controller.stop();
        controller.stop();
        assert!(!controller.is_running());
    }

    #[test]
    fn sync_mode_eventually_dispatches_published_events() {
        let queue = Arc::new(EventQueue::new());
        let subs = Arc::new(SubscriptionManager::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        subs.add_subscriber(vec![EventType::System], move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let controller = DispatchController::new(
            queue.clone(),
            subs,
            Arc::new(EventDispatcher::new()),
            ExecutionMode::Sync,
            Executor::Inline,
        );
        controller.set_policy(DispatchPolicy::Immediate);
        controller.start();

        queue.enqueue(Event::builder(EventType::System, chrono::Utc::now()).build());
        controller.notify();

        for _ in 0..50 {
            if calls.load(Ordering::SeqCst) > 0 {
                break;
            }
            std::thread::sleep(StdDuration::from_millis(10));
        }
        controller.stop();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
