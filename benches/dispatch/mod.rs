//! Benchmarks for the event queue and dispatcher hot path: enqueue/poll
//! throughput on [`EventQueue`] and per-subscriber fan-out cost in
//! [`EventDispatcher`], the two pieces `DispatchController` calls every poll
//! tick.

use chrono::Utc;
use criterion::{BatchSize, Criterion, Throughput};
use kestrel_engine::dispatch::EventDispatcher;
use kestrel_engine::event::{Event, EventType};
use kestrel_engine::queue::EventQueue;
use kestrel_engine::subscription::SubscriptionManager;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

criterion::criterion_main!(benchmark_dispatch);

fn benchmark_dispatch() {
    let mut c = Criterion::default().without_plots();
    bench_queue_enqueue_and_poll(&mut c);
    bench_dispatcher_fan_out(&mut c);
}

/// Enqueue/poll throughput on [`EventQueue`], the structure every `publish`
/// call and every dispatch-controller tick goes through.
fn bench_queue_enqueue_and_poll(c: &mut Criterion) {
    let mut group = c.benchmark_group("EventQueue");
    group.throughput(Throughput::Elements(1));

    group.bench_function("enqueue", |b| {
        let queue = EventQueue::new();
        b.iter_batched(
            || Event::builder(EventType::MarketData, Utc::now()).build(),
            |event| queue.enqueue(event),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("enqueue_then_poll_due_1000", |b| {
        b.iter_batched(
            || {
                let queue = EventQueue::new();
                for _ in 0..1000 {
                    queue.enqueue(Event::builder(EventType::MarketData, Utc::now()).build());
                }
                queue
            },
            |queue| queue.poll_due_events(Utc::now()),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Fan-out cost in [`EventDispatcher::dispatch`] as the subscriber count per
/// event type grows, the dominant cost of a dispatch-controller tick once a
/// batch is due.
fn bench_dispatcher_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("EventDispatcher");

    for subscriber_count in [1usize, 8, 64] {
        group.throughput(Throughput::Elements(subscriber_count as u64));
        group.bench_function(format!("dispatch_to_{subscriber_count}_subscribers"), |b| {
            let subs = SubscriptionManager::new();
            let calls = Arc::new(AtomicUsize::new(0));
            for _ in 0..subscriber_count {
                let calls_clone = calls.clone();
                subs.add_subscriber(vec![EventType::Signal], move |_| {
                    calls_clone.fetch_add(1, Ordering::Relaxed);
                });
            }
            let dispatcher = EventDispatcher::new();
            let events = vec![Event::builder(EventType::Signal, Utc::now()).build()];

            b.iter(|| dispatcher.dispatch(&events, &subs));
        });
    }

    group.finish();
}
