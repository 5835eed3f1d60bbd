//! Dispatch bridge: bounded hand-off from the hook callback to the consumer.
//!
//! The producer side (`EventSender`, `WeakEventSender`) lives on the pump
//! thread and inside the hook callback and never blocks: when the queue is
//! full the event is dropped and counted. The consumer side (`Dispatcher`)
//! is drained on the consumer's own thread, which is where the listener
//! runs.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, warn};

use crate::event::ClassifiedEvent;

/// Default number of outstanding events.
pub const DEFAULT_CAPACITY: usize = 512;

/// Receives classified events as positional values:
/// `(name, x, y, button, aux)`.
///
/// `button` is -1 when the event has no button. A panic inside
/// `on_event` is contained to that one delivery.
pub trait Listener: Send + 'static {
    fn on_event(&mut self, name: &str, x: i32, y: i32, button: i32, aux: u32);
}

impl<F> Listener for F
where
    F: FnMut(&str, i32, i32, i32, u32) + Send + 'static,
{
    fn on_event(&mut self, name: &str, x: i32, y: i32, button: i32, aux: u32) {
        self(name, x, y, button, aux)
    }
}

/// Point-in-time bridge counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    /// Events accepted into the queue.
    pub submitted: u64,
    /// Events dropped because the queue was full.
    pub dropped: u64,
    /// Events handed to the listener without a panic.
    pub delivered: u64,
    /// Deliveries during which the listener panicked.
    pub faults: u64,
    /// Events still queued when the bridge was released.
    pub discarded: u64,
}

#[derive(Debug, Default)]
pub(crate) struct BridgeShared {
    submitted: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    faults: AtomicU64,
    discarded: AtomicU64,
    released: AtomicBool,
}

impl BridgeShared {
    pub(crate) fn snapshot(&self) -> BridgeStats {
        BridgeStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

/// Create a bridge with room for `capacity` outstanding events, bound to
/// `listener` for its whole lifetime.
pub fn channel<L: Listener>(capacity: usize, listener: L) -> (EventSender, Dispatcher<L>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let shared = Arc::new(BridgeShared::default());
    (
        EventSender {
            tx,
            shared: shared.clone(),
        },
        Dispatcher {
            rx,
            listener,
            shared,
            closed: false,
        },
    )
}

fn try_submit(
    tx: &mpsc::Sender<ClassifiedEvent>,
    shared: &BridgeShared,
    event: ClassifiedEvent,
) -> bool {
    match tx.try_send(event) {
        Ok(()) => {
            shared.submitted.fetch_add(1, Ordering::Relaxed);
            true
        }
        Err(TrySendError::Full(_)) => {
            shared.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Owning producer handle. Held by the pump; dropping or releasing it
/// closes the bridge.
pub struct EventSender {
    tx: mpsc::Sender<ClassifiedEvent>,
    shared: Arc<BridgeShared>,
}

impl EventSender {
    /// Non-blocking enqueue. Returns `false` if the event was dropped.
    pub fn submit(&self, event: ClassifiedEvent) -> bool {
        try_submit(&self.tx, &self.shared, event)
    }

    /// Handle for the hook callback that does not keep the bridge open.
    pub fn downgrade(&self) -> WeakEventSender {
        WeakEventSender {
            tx: self.tx.downgrade(),
            shared: self.shared.clone(),
        }
    }

    /// Close the bridge. Anything the dispatcher has not delivered yet is
    /// discarded.
    pub fn release(self) {
        self.shared.released.store(true, Ordering::Release);
        debug!("Dispatch bridge released");
    }

    pub fn stats(&self) -> BridgeStats {
        self.shared.snapshot()
    }

    pub(crate) fn shared(&self) -> Arc<BridgeShared> {
        self.shared.clone()
    }
}

/// Producer handle used inside the hook callback.
#[derive(Clone)]
pub struct WeakEventSender {
    tx: mpsc::WeakSender<ClassifiedEvent>,
    shared: Arc<BridgeShared>,
}

impl WeakEventSender {
    /// Non-blocking enqueue. Returns `false` if the event was dropped or
    /// the bridge is gone.
    pub fn submit(&self, event: ClassifiedEvent) -> bool {
        if self.shared.is_released() {
            return false;
        }
        match self.tx.upgrade() {
            Some(tx) => try_submit(&tx, &self.shared, event),
            None => false,
        }
    }
}

/// Consumer side of the bridge. Owns the listener.
pub struct Dispatcher<L> {
    rx: mpsc::Receiver<ClassifiedEvent>,
    listener: L,
    shared: Arc<BridgeShared>,
    closed: bool,
}

impl<L: Listener> Dispatcher<L> {
    /// Deliver everything queued right now without waiting.
    /// Returns the number of events handed to the listener.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut count = 0;
        while !self.closed {
            match self.rx.try_recv() {
                Ok(event) => {
                    if self.handle(event) {
                        count += 1;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.closed = true,
            }
        }
        count
    }

    /// Block the current thread until one event is delivered.
    ///
    /// Returns `false` once the bridge is closed. Must not be called from
    /// inside an async runtime.
    pub fn dispatch_next_blocking(&mut self) -> bool {
        if self.closed {
            return false;
        }
        match self.rx.blocking_recv() {
            Some(event) => self.handle(event),
            None => {
                self.closed = true;
                false
            }
        }
    }

    /// Wait for one event and deliver it. Returns `false` once the bridge is
    /// closed. Cancel safe.
    pub async fn dispatch_next(&mut self) -> bool {
        if self.closed {
            return false;
        }
        match self.rx.recv().await {
            Some(event) => self.handle(event),
            None => {
                self.closed = true;
                false
            }
        }
    }

    /// Deliver events until the bridge closes.
    pub async fn run(mut self) -> BridgeStats {
        while self.dispatch_next().await {}
        self.stats()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn stats(&self) -> BridgeStats {
        self.shared.snapshot()
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    fn handle(&mut self, event: ClassifiedEvent) -> bool {
        if self.shared.is_released() {
            self.discard_remaining(1);
            return false;
        }
        self.deliver(event);
        true
    }

    fn deliver(&mut self, event: ClassifiedEvent) {
        let listener = &mut self.listener;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            listener.on_event(
                event.name(),
                event.x,
                event.y,
                event.button_code(),
                event.aux,
            )
        }));

        match outcome {
            Ok(()) => {
                self.shared.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                self.shared.faults.fetch_add(1, Ordering::Relaxed);
                warn!(
                    event = event.name(),
                    "Mouse listener panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    fn discard_remaining(&mut self, already: u64) {
        self.rx.close();
        let mut discarded = already;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        self.shared.discarded.fetch_add(discarded, Ordering::Relaxed);
        self.closed = true;
        debug!(discarded, "Dispatcher closed after bridge release");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Button, EventKind};

    type Seen = Vec<(String, i32, i32, i32, u32)>;

    fn recorder() -> impl FnMut(&str, i32, i32, i32, u32) + Send + 'static {
        let mut seen: Seen = Vec::new();
        move |name: &str, x, y, button, aux| {
            seen.push((name.to_string(), x, y, button, aux));
        }
    }

    fn down(x: i32) -> ClassifiedEvent {
        ClassifiedEvent {
            kind: EventKind::Down,
            x,
            y: 0,
            button: Button::Primary,
            aux: 0,
        }
    }

    struct Collect(Seen);

    impl Listener for Collect {
        fn on_event(&mut self, name: &str, x: i32, y: i32, button: i32, aux: u32) {
            self.0.push((name.to_string(), x, y, button, aux));
        }
    }

    #[test]
    fn closures_are_listeners() {
        let (tx, mut rx) = channel(4, recorder());
        assert!(tx.submit(down(1)));
        assert_eq!(rx.dispatch_pending(), 1);
    }

    #[test]
    fn delivers_in_submission_order() {
        let (tx, mut rx) = channel(DEFAULT_CAPACITY, Collect(Vec::new()));
        for x in 0..100 {
            assert!(tx.submit(down(x)));
        }
        assert_eq!(rx.dispatch_pending(), 100);

        let xs: Vec<i32> = rx.listener().0.iter().map(|e| e.1).collect();
        assert_eq!(xs, (0..100).collect::<Vec<_>>());
        assert_eq!(rx.listener().0[0], ("mousedown".to_string(), 0, 0, 1, 0));
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let (tx, mut rx) = channel(2, Collect(Vec::new()));
        assert!(tx.submit(down(1)));
        assert!(tx.submit(down(2)));
        assert!(!tx.submit(down(3)));

        let stats = tx.stats();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.dropped, 1);

        assert_eq!(rx.dispatch_pending(), 2);
        assert!(tx.submit(down(4)));
        assert_eq!(rx.dispatch_pending(), 1);
        let xs: Vec<i32> = rx.listener().0.iter().map(|e| e.1).collect();
        assert_eq!(xs, vec![1, 2, 4]);
    }

    #[test]
    fn listener_panic_is_contained() {
        let listener = move |_: &str, x: i32, _: i32, _: i32, _: u32| {
            if x == 2 {
                panic!("listener failure");
            }
        };
        let (tx, mut rx) = channel(8, listener);
        for x in 1..=3 {
            tx.submit(down(x));
        }

        assert_eq!(rx.dispatch_pending(), 3);
        let stats = rx.stats();
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.faults, 1);
        assert!(!rx.is_closed());

        tx.submit(down(4));
        assert_eq!(rx.dispatch_pending(), 1);
    }

    #[test]
    fn release_discards_pending() {
        let (tx, mut rx) = channel(8, Collect(Vec::new()));
        let weak = tx.downgrade();
        tx.submit(down(1));
        tx.submit(down(2));
        tx.release();

        assert!(!weak.submit(down(3)));
        assert_eq!(rx.dispatch_pending(), 0);
        assert!(rx.is_closed());
        assert!(rx.listener().0.is_empty());
        assert_eq!(rx.stats().discarded, 2);
        assert!(!rx.dispatch_next_blocking());
    }

    #[test]
    fn weak_sender_does_not_keep_bridge_open() {
        let (tx, mut rx) = channel(8, Collect(Vec::new()));
        let weak = tx.downgrade();
        assert!(weak.submit(down(1)));
        drop(tx);

        assert!(!weak.submit(down(2)));
        assert_eq!(rx.dispatch_pending(), 1);
        assert!(rx.is_closed());
    }

    #[tokio::test]
    async fn run_drains_until_closed() {
        let (tx, rx) = channel(8, Collect(Vec::new()));
        let producer = tokio::task::spawn_blocking(move || {
            for x in 0..5 {
                tx.submit(down(x));
            }
        });
        producer.await.unwrap();

        let stats = rx.run().await;
        assert_eq!(stats.submitted, 5);
        assert_eq!(stats.delivered, 5);
    }
}
