//! Event publishers and the handles consumers hold.
//!
//! Publishers are owned by exactly one context and need no locking. Every
//! subscriber gets its own unbounded channel, so a slow or departed consumer
//! never affects the producer or the other subscribers.
//!
//! ```text
//! StatePublisher ──┬── EventStream (replays current value, then updates)
//!                  └── EventStream
//! BroadcastPublisher ── EventStream (only values published after subscribing)
//! ```

use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};

/// Subscription handle returned for every stream the crate exposes.
///
/// Dropping it unsubscribes. [`EventStream::close`] does the same explicitly
/// and may be called any number of times from any thread.
#[derive(Debug)]
pub struct EventStream<T> {
    rx: Option<mpsc::UnboundedReceiver<T>>,
}

impl<T> EventStream<T> {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<T>) -> Self {
        Self { rx: Some(rx) }
    }

    /// A subscription that never yields and finishes immediately.
    pub fn inert() -> Self {
        Self { rx: None }
    }

    /// Create a connected sender/stream pair.
    pub fn channel() -> (mpsc::UnboundedSender<T>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx))
    }

    pub fn close(&mut self) {
        self.rx = None;
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }

    /// Take the next already-delivered value without waiting.
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.as_mut().and_then(|rx| rx.try_recv().ok())
    }
}

impl<T> Stream for EventStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        match self.rx.as_mut() {
            Some(rx) => rx.poll_recv(cx),
            None => Poll::Ready(None),
        }
    }
}

/// Latest-value publisher.
///
/// New subscribers receive the current value before anything published
/// later. Publications are never coalesced.
#[derive(Debug)]
pub struct StatePublisher<T> {
    current: T,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

impl<T: Clone> StatePublisher<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: initial,
            subscribers: Vec::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.current
    }

    /// Register an existing sender; it immediately receives the current value.
    /// Departed subscribers are pruned first.
    pub fn attach(&mut self, tx: mpsc::UnboundedSender<T>) {
        self.subscribers.retain(|held| !held.is_closed());
        if tx.send(self.current.clone()).is_ok() {
            self.subscribers.push(tx);
        }
    }

    pub fn subscribe(&mut self) -> EventStream<T> {
        let (tx, stream) = EventStream::channel();
        self.attach(tx);
        stream
    }

    pub fn publish(&mut self, value: T) {
        self.current = value;
        let current = &self.current;
        self.subscribers.retain(|tx| tx.send(current.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|tx| !tx.is_closed()).count()
    }
}

impl<T: Clone + Default> Default for StatePublisher<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq> StatePublisher<T> {
    /// Publish only when the value differs from the current one.
    /// Returns whether anything was published.
    pub fn publish_if_changed(&mut self, value: T) -> bool {
        if self.current == value {
            return false;
        }
        self.publish(value);
        true
    }
}

/// Publisher without replay: subscribers see only later publications.
#[derive(Debug)]
pub struct BroadcastPublisher<T> {
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

impl<T> Default for BroadcastPublisher<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone> BroadcastPublisher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, tx: mpsc::UnboundedSender<T>) {
        self.subscribers.retain(|held| !held.is_closed());
        if !tx.is_closed() {
            self.subscribers.push(tx);
        }
    }

    pub fn subscribe(&mut self) -> EventStream<T> {
        let (tx, stream) = EventStream::channel();
        self.attach(tx);
        stream
    }

    pub fn publish(&mut self, value: T) {
        self.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|tx| !tx.is_closed()).count()
    }
}

/// Single-value asynchronous result.
///
/// Resolves to `None` when the producer went away without answering, which
/// is how teardown races and collaborator failures surface.
#[derive(Debug)]
pub struct Reply<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Reply<T> {
    pub(crate) fn channel() -> (oneshot::Sender<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }
}

impl<T> Future for Reply<T> {
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[test]
    fn test_state_publisher_replays_current_value() {
        let mut publisher = StatePublisher::new(1);
        publisher.publish(2);
        let mut stream = publisher.subscribe();
        assert_eq!(stream.try_next(), Some(2));
        assert_eq!(stream.try_next(), None);
    }

    #[test]
    fn test_state_publisher_does_not_coalesce() {
        let mut publisher = StatePublisher::new("off");
        let mut stream = publisher.subscribe();
        publisher.publish("on");
        publisher.publish("off");
        let seen: Vec<_> = std::iter::from_fn(|| stream.try_next()).collect();
        assert_eq!(seen, vec!["off", "on", "off"]);
    }

    #[test]
    fn test_publish_if_changed_skips_duplicates() {
        let mut publisher = StatePublisher::new(false);
        let mut stream = publisher.subscribe();
        assert!(!publisher.publish_if_changed(false));
        assert!(publisher.publish_if_changed(true));
        assert!(!publisher.publish_if_changed(true));
        let seen: Vec<_> = std::iter::from_fn(|| stream.try_next()).collect();
        assert_eq!(seen, vec![false, true]);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned_without_affecting_others() {
        let mut publisher = StatePublisher::new(0u32);
        let first = publisher.subscribe();
        let mut second = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 2);

        drop(first);
        publisher.publish(5);
        assert_eq!(publisher.subscriber_count(), 1);
        assert_eq!(second.try_next(), Some(0));
        assert_eq!(second.try_next(), Some(5));
    }

    #[test]
    fn test_subscribe_churn_without_publish_stays_bounded() {
        let mut state = StatePublisher::new(false);
        let mut broadcast = BroadcastPublisher::<u8>::new();
        for _ in 0..10_000 {
            drop(state.subscribe());
            drop(broadcast.subscribe());
        }
        assert!(state.subscribers.len() <= 1);
        assert!(broadcast.subscribers.len() <= 1);

        let _live = state.subscribe();
        assert_eq!(state.subscribers.len(), 1);
    }

    #[test]
    fn test_broadcast_has_no_replay() {
        let mut publisher = BroadcastPublisher::new();
        publisher.publish(1);
        let mut stream = publisher.subscribe();
        publisher.publish(2);
        assert_eq!(stream.try_next(), Some(2));
        assert_eq!(stream.try_next(), None);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut publisher = BroadcastPublisher::new();
        let mut stream = publisher.subscribe();
        stream.close();
        stream.close();
        assert!(stream.is_closed());
        publisher.publish(7);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn test_inert_stream_finishes() {
        let mut stream = task::spawn(EventStream::<u8>::inert());
        assert_ready_eq!(stream.poll_next(), None);
    }

    #[test]
    fn test_stream_pends_until_published() {
        let mut publisher = BroadcastPublisher::new();
        let mut stream = task::spawn(publisher.subscribe());
        assert_pending!(stream.poll_next());
        publisher.publish(3);
        assert!(stream.is_woken());
        assert_ready_eq!(stream.poll_next(), Some(3));
    }

    #[tokio::test]
    async fn test_reply_resolves_none_when_sender_dropped() {
        let (tx, reply) = Reply::<u8>::channel();
        drop(tx);
        assert_eq!(reply.await, None);

        let (tx, reply) = Reply::channel();
        tx.send("done").unwrap();
        assert_eq!(reply.await, Some("done"));
    }

    #[tokio::test]
    async fn test_stream_collects_until_publisher_dropped() {
        let mut publisher = StatePublisher::new(1);
        let stream = publisher.subscribe();
        publisher.publish(2);
        drop(publisher);
        let values: Vec<_> = stream.collect().await;
        assert_eq!(values, vec![1, 2]);
    }
}
