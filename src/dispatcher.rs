//! Work dispatcher: one bounded queue, one worker task.
//!
//! Stack callbacks (and the heartbeat timer) call [`DispatchHandle::dispatch`]
//! from whatever context they run on.  The worker blocks on the queue and
//! feeds each event, in FIFO order, to a single [`EventHandler`].  No two
//! events are ever handled concurrently.
//!
//! ```text
//!  producer ─┐                                  ┌─────────────────────┐
//!  producer ─┼─▶ try_send ─▶ [ Channel<_, 10> ] ─▶│ worker: handle(ev)  │
//!  producer ─┘   (≤10 ms wait, then drop)       └─────────────────────┘
//! ```
//!
//! A full queue is not an error the producer can fix: the event is dropped,
//! the failure is logged and returned, and the producer carries on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_time::{Duration, with_timeout};
use futures_lite::future::block_on;
use log::{debug, error, info, warn};

use crate::error::DispatchError;
use crate::events::Event;

/// Queue depth.
pub const QUEUE_CAPACITY: usize = 10;

/// Bounded wait applied when the queue is full.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(10);

const WORKER_NAME: &str = "BtAppT";
const WORKER_STACK_SIZE: usize = 8 * 1024;

// ───────────────────────────────────────────────────────────────
// Message
// ───────────────────────────────────────────────────────────────

/// Signal carried by every queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Run the handler on the payload.
    WorkDispatch,
    /// Stop the worker loop.
    Shutdown,
}

/// One queued unit of work.  The payload is owned by the queue until the
/// worker has handled it, then dropped.
#[derive(Debug)]
pub struct DispatchedEvent {
    pub signal: Signal,
    pub event: Option<Event>,
}

/// The consumer side: receives every dispatched event on the worker task.
pub trait EventHandler {
    fn handle(&mut self, event: Event);
}

// ───────────────────────────────────────────────────────────────
// EventQueue
// ───────────────────────────────────────────────────────────────

/// Bounded FIFO shared between producers and the worker.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, DispatchedEvent, QUEUE_CAPACITY>,
    send_timeout: Duration,
    closed: AtomicBool,
}

impl EventQueue {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            channel: Channel::new(),
            send_timeout,
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueue `event` for the worker.
    ///
    /// Waits at most the send timeout when the queue is full.  On failure
    /// the event has been dropped.
    pub fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        if self.closed.load(Ordering::Acquire) {
            warn!("Dispatch: {} dropped, dispatcher shut down", event.name());
            return Err(DispatchError::Closed);
        }
        debug!("Dispatch: event 0x{:x} ({})", event.id(), event.name());
        self.send(DispatchedEvent {
            signal: Signal::WorkDispatch,
            event: Some(event),
        })
    }

    /// Number of messages waiting for the worker.
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Non-blocking receive, for draining the queue without a worker.
    pub fn try_recv(&self) -> Option<Event> {
        loop {
            let msg = self.channel.try_receive().ok()?;
            if let Some(event) = msg.event {
                return Some(event);
            }
        }
    }

    fn send(&self, msg: DispatchedEvent) -> Result<(), DispatchError> {
        let msg = match self.channel.try_send(msg) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(msg)) => msg,
        };
        if block_on(with_timeout(self.send_timeout, self.channel.send(msg))).is_ok() {
            Ok(())
        } else {
            error!(
                "Dispatch: queue send failed after {} ms (capacity {})",
                self.send_timeout.as_millis(),
                QUEUE_CAPACITY
            );
            Err(DispatchError::QueueFull)
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

// ───────────────────────────────────────────────────────────────
// DispatchHandle
// ───────────────────────────────────────────────────────────────

/// Cheap, cloneable producer handle.  Safe to use from any task.
#[derive(Clone)]
pub struct DispatchHandle {
    queue: Arc<EventQueue>,
}

impl DispatchHandle {
    pub fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        self.queue.dispatch(event)
    }
}

// ───────────────────────────────────────────────────────────────
// Dispatcher
// ───────────────────────────────────────────────────────────────

/// Owns the queue and the single worker task; both live and die together.
pub struct Dispatcher<H: EventHandler + Send + 'static> {
    queue: Arc<EventQueue>,
    worker: Option<JoinHandle<H>>,
}

impl<H: EventHandler + Send + 'static> Dispatcher<H> {
    /// Create the queue and start the worker with the default send timeout.
    pub fn start(handler: H) -> std::io::Result<Self> {
        Self::start_with_timeout(handler, DEFAULT_SEND_TIMEOUT)
    }

    pub fn start_with_timeout(handler: H, send_timeout: Duration) -> std::io::Result<Self> {
        let queue = Arc::new(EventQueue::new(send_timeout));
        let worker_queue = Arc::clone(&queue);
        let worker = std::thread::Builder::new()
            .name(WORKER_NAME.into())
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || run_worker(&worker_queue, handler))?;
        info!("Dispatcher: worker started (capacity {})", QUEUE_CAPACITY);
        Ok(Self {
            queue,
            worker: Some(worker),
        })
    }

    /// A producer handle for callbacks and timers.
    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            queue: Arc::clone(&self.queue),
        }
    }

    pub fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        self.queue.dispatch(event)
    }

    /// Stop the worker after it has drained every event queued so far, and
    /// hand back the handler.
    ///
    /// Only safe once no producer is mid-dispatch; later dispatches fail
    /// with [`DispatchError::Closed`].
    pub fn shut_down(mut self) -> Option<H> {
        self.stop()
    }

    fn stop(&mut self) -> Option<H> {
        let worker = self.worker.take()?;
        self.queue.close();
        // The worker is still draining, so a blocking send always completes.
        block_on(self.queue.channel.send(DispatchedEvent {
            signal: Signal::Shutdown,
            event: None,
        }));
        match worker.join() {
            Ok(handler) => {
                info!("Dispatcher: worker stopped");
                Some(handler)
            }
            Err(_) => {
                error!("Dispatcher: worker panicked");
                None
            }
        }
    }
}

impl<H: EventHandler + Send + 'static> Drop for Dispatcher<H> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn run_worker<H: EventHandler>(queue: &EventQueue, mut handler: H) -> H {
    loop {
        let msg = block_on(queue.channel.receive());
        debug!("Dispatch: worker sig {:?}", msg.signal);
        match (msg.signal, msg.event) {
            (Signal::WorkDispatch, Some(event)) => handler.handle(event),
            (Signal::WorkDispatch, None) => warn!("Dispatch: work item without payload discarded"),
            (Signal::Shutdown, _) => return handler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct Recorder(Vec<u16>);

    impl EventHandler for Recorder {
        fn handle(&mut self, event: Event) {
            self.0.push(event.id());
        }
    }

    #[test]
    fn full_queue_fails_within_bounded_wait() {
        let queue = EventQueue::new(DEFAULT_SEND_TIMEOUT);
        for _ in 0..QUEUE_CAPACITY {
            assert_eq!(queue.dispatch(Event::Heartbeat), Ok(()));
        }
        let started = Instant::now();
        assert_eq!(queue.dispatch(Event::Heartbeat), Err(DispatchError::QueueFull));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert_eq!(queue.len(), QUEUE_CAPACITY);
    }

    #[test]
    fn try_recv_is_fifo() {
        let queue = EventQueue::new(DEFAULT_SEND_TIMEOUT);
        queue.dispatch(Event::StackUp).unwrap();
        queue.dispatch(Event::Heartbeat).unwrap();
        assert_eq!(queue.try_recv(), Some(Event::StackUp));
        assert_eq!(queue.try_recv(), Some(Event::Heartbeat));
        assert_eq!(queue.try_recv(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn worker_handles_events_in_order_then_stops() {
        let dispatcher = Dispatcher::start(Recorder(Vec::new())).unwrap();
        dispatcher.dispatch(Event::StackUp).unwrap();
        dispatcher.dispatch(Event::Heartbeat).unwrap();
        let handler = dispatcher.shut_down().unwrap();
        assert_eq!(handler.0, vec![Event::StackUp.id(), Event::Heartbeat.id()]);
    }

    #[test]
    fn dispatch_after_shutdown_is_rejected() {
        let dispatcher = Dispatcher::start(Recorder(Vec::new())).unwrap();
        let handle = dispatcher.handle();
        dispatcher.shut_down();
        assert_eq!(handle.dispatch(Event::Heartbeat), Err(DispatchError::Closed));
    }
}
