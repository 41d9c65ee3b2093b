//! Integration tests for the bounded event dispatcher.
//!
//! Exercise the queue from several producer threads and against a worker
//! that is deliberately stalled.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration as StdDuration, Instant};

use btserver::dispatcher::{
    DEFAULT_SEND_TIMEOUT, Dispatcher, EventHandler, EventQueue, QUEUE_CAPACITY,
};
use btserver::error::DispatchError;
use btserver::events::{Event, GattsEvent};

fn tagged(producer: u8, seq: u16) -> Event {
    Event::Gatts {
        interface: producer,
        event: GattsEvent::Read {
            conn_id: seq,
            handle: 0,
        },
    }
}

struct Collect(Vec<(u8, u16)>);

impl EventHandler for Collect {
    fn handle(&mut self, event: Event) {
        if let Event::Gatts {
            interface,
            event: GattsEvent::Read { conn_id, .. },
        } = event
        {
            self.0.push((interface, conn_id));
        }
    }
}

/// Blocks on every event until the test releases it.
struct Gated {
    gate: mpsc::Receiver<()>,
    seen: usize,
}

impl EventHandler for Gated {
    fn handle(&mut self, _event: Event) {
        let _ = self.gate.recv();
        self.seen += 1;
    }
}

// ── Capacity and bounded wait ─────────────────────────────────

#[test]
fn eleventh_event_fails_after_bounded_wait() {
    let queue = EventQueue::new(DEFAULT_SEND_TIMEOUT);
    for i in 0..QUEUE_CAPACITY {
        assert_eq!(queue.dispatch(tagged(0, i as u16)), Ok(()));
    }
    assert_eq!(queue.len(), QUEUE_CAPACITY);

    let started = Instant::now();
    assert_eq!(queue.dispatch(Event::Heartbeat), Err(DispatchError::QueueFull));
    let waited = started.elapsed();
    assert!(waited >= StdDuration::from_millis(5), "gave up after {:?}", waited);
    assert!(waited < StdDuration::from_secs(1), "blocked for {:?}", waited);

    // The rejected event is gone; the first ten are intact and in order.
    for i in 0..QUEUE_CAPACITY {
        assert_eq!(queue.try_recv(), Some(tagged(0, i as u16)));
    }
    assert_eq!(queue.try_recv(), None);
}

#[test]
fn stalled_worker_backs_up_producers_then_recovers() {
    let (release, gate) = mpsc::channel();
    let dispatcher = Dispatcher::start(Gated { gate, seen: 0 }).unwrap();

    // One event is held by the worker; the rest fill the queue.
    let mut accepted = 0;
    let mut rejected = 0;
    for _ in 0..QUEUE_CAPACITY + 5 {
        match dispatcher.dispatch(Event::Heartbeat) {
            Ok(()) => accepted += 1,
            Err(DispatchError::QueueFull) => rejected += 1,
            Err(e) => panic!("unexpected {:?}", e),
        }
    }
    assert!(accepted >= QUEUE_CAPACITY);
    assert!(rejected >= 1);

    for _ in 0..accepted {
        release.send(()).unwrap();
    }
    let handler = dispatcher.shut_down().unwrap();
    assert_eq!(handler.seen, accepted);
}

// ── Ordering ──────────────────────────────────────────────────

#[test]
fn concurrent_producers_keep_per_producer_order() {
    const PRODUCERS: u8 = 4;
    const PER_PRODUCER: u16 = 50;

    let dispatcher = Dispatcher::start_with_timeout(
        Collect(Vec::new()),
        embassy_time::Duration::from_secs(2),
    )
    .unwrap();

    let workers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let handle = dispatcher.handle();
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    handle.dispatch(tagged(p, seq)).unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let seen = dispatcher.shut_down().unwrap().0;
    assert_eq!(seen.len(), usize::from(PRODUCERS) * usize::from(PER_PRODUCER));
    for p in 0..PRODUCERS {
        let order: Vec<u16> = seen.iter().filter(|(q, _)| *q == p).map(|(_, s)| *s).collect();
        assert_eq!(order, (0..PER_PRODUCER).collect::<Vec<_>>(), "producer {}", p);
    }
}

#[test]
fn handle_outlives_dispatcher_but_is_refused() {
    let dispatcher = Dispatcher::start(Collect(Vec::new())).unwrap();
    let handle = dispatcher.handle();
    handle.dispatch(tagged(1, 1)).unwrap();
    let handler = dispatcher.shut_down().unwrap();
    assert_eq!(handler.0, vec![(1, 1)]);
    assert_eq!(handle.dispatch(tagged(1, 2)), Err(DispatchError::Closed));
}
