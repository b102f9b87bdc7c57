//! In-memory message queue.

use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify, watch};
use ulid::Ulid;

use super::{OutboundMessage, QueuedMessage};
use crate::error::OutboxError;

struct QueueState {
    messages: VecDeque<QueuedMessage>,
    capacity: Option<usize>,
}

/// Strict-FIFO in-memory outbox.
///
/// Design:
/// - Enqueue order is delivery order, no exceptions. Retries happen in
///   place: a failed head is updated via [`record_failure`] and stays at
///   the head (head-of-line blocking is deliberate).
/// - Producers only enqueue; dequeue is reserved for the delivery loop
///   and only happens after a terminal outcome.
/// - Queue length is published on a watch channel; a message being
///   attempted still counts, so length reaching 0 means everything
///   pending has terminally resolved.
///
/// [`record_failure`]: MessageQueue::record_failure
pub struct MessageQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    len_tx: watch::Sender<usize>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Bounded variant: `enqueue` fails with `QueueFull` at capacity.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            state: Mutex::new(QueueState {
                messages: VecDeque::new(),
                capacity,
            }),
            notify: Notify::new(),
            len_tx,
        }
    }

    /// Append a message at the tail. Safe to call from any number of
    /// producer tasks concurrently; never blocks on delivery activity.
    pub async fn enqueue(&self, message: OutboundMessage) -> Result<Ulid, OutboxError> {
        let (id, len) = {
            let mut state = self.state.lock().await;
            if let Some(capacity) = state.capacity
                && state.messages.len() >= capacity
            {
                return Err(OutboxError::QueueFull { capacity });
            }
            let record = QueuedMessage::new(message);
            let id = record.id;
            state.messages.push_back(record);
            (id, state.messages.len())
        };
        // Publish and wake outside the lock.
        self.len_tx.send_replace(len);
        self.notify.notify_one();
        Ok(id)
    }

    /// Observe the head without removing it.
    pub async fn peek_head(&self) -> Option<QueuedMessage> {
        self.state.lock().await.messages.front().cloned()
    }

    /// Wait until the queue is non-empty and return a snapshot of the
    /// head. Used by the delivery loop when idle.
    pub(crate) async fn head_or_wait(&self) -> QueuedMessage {
        loop {
            if let Some(head) = self.peek_head().await {
                return head;
            }
            self.notify.notified().await;
        }
    }

    /// Remove the head. Only the delivery loop calls this, and only
    /// after the head reached a terminal outcome (ack or drop).
    pub(crate) async fn dequeue_head(&self) -> Option<QueuedMessage> {
        let (record, len) = {
            let mut state = self.state.lock().await;
            let record = state.messages.pop_front();
            (record, state.messages.len())
        };
        if record.is_some() {
            self.len_tx.send_replace(len);
        }
        record
    }

    /// Record a failed attempt against the head message. The message
    /// stays at the head; only its bookkeeping changes. The `id` guards
    /// against racing a concurrent dequeue.
    pub(crate) async fn record_failure(&self, id: Ulid, error: String) {
        let mut state = self.state.lock().await;
        if let Some(head) = state.messages.front_mut()
            && head.id == id
        {
            head.record_failure(error);
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.messages.is_empty()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    /// Queue-length signal. Receivers see every length change; the
    /// transition to 0 is the "outgoing queue empty" event.
    pub fn queue_len(&self) -> watch::Receiver<usize> {
        self.len_tx.subscribe()
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::MessageKind;

    fn message(topic: &str) -> OutboundMessage {
        OutboundMessage::new(MessageKind::Location, topic.to_string(), b"{}".to_vec())
    }

    #[tokio::test]
    async fn preserves_enqueue_order() {
        let queue = MessageQueue::new();
        for i in 0..5 {
            queue.enqueue(message(&format!("t/{i}"))).await.unwrap();
        }

        for i in 0..5 {
            let head = queue.dequeue_head().await.unwrap();
            assert_eq!(head.message.topic, format!("t/{i}"));
        }
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn failed_head_stays_at_the_head() {
        let queue = MessageQueue::new();
        let first = queue.enqueue(message("t/first")).await.unwrap();
        queue.enqueue(message("t/second")).await.unwrap();

        queue.record_failure(first, "transport timeout".to_string()).await;
        queue.record_failure(first, "transport timeout".to_string()).await;

        let head = queue.peek_head().await.unwrap();
        assert_eq!(head.id, first);
        assert_eq!(head.attempts, 2);
        assert_eq!(queue.len().await, 2);
    }

    #[tokio::test]
    async fn stale_failure_does_not_touch_a_new_head() {
        let queue = MessageQueue::new();
        let first = queue.enqueue(message("t/first")).await.unwrap();
        queue.enqueue(message("t/second")).await.unwrap();
        queue.dequeue_head().await.unwrap();

        queue.record_failure(first, "late report".to_string()).await;

        let head = queue.peek_head().await.unwrap();
        assert_eq!(head.attempts, 0);
        assert!(head.last_error.is_none());
    }

    #[tokio::test]
    async fn length_signal_tracks_transitions() {
        let queue = MessageQueue::new();
        let mut len_rx = queue.queue_len();
        assert_eq!(*len_rx.borrow(), 0);

        queue.enqueue(message("t")).await.unwrap();
        len_rx.changed().await.unwrap();
        assert_eq!(*len_rx.borrow_and_update(), 1);

        queue.dequeue_head().await.unwrap();
        len_rx.changed().await.unwrap();
        assert_eq!(*len_rx.borrow_and_update(), 0);
    }

    #[tokio::test]
    async fn bounded_queue_rejects_overflow() {
        let queue = MessageQueue::bounded(2);
        queue.enqueue(message("t/1")).await.unwrap();
        queue.enqueue(message("t/2")).await.unwrap();

        let err = queue.enqueue(message("t/3")).await.unwrap_err();
        assert!(matches!(err, OutboxError::QueueFull { capacity: 2 }));
        assert_eq!(queue.len().await, 2);
    }

    #[tokio::test]
    async fn concurrent_producers_lose_nothing() {
        let queue = Arc::new(MessageQueue::new());

        let a = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                for i in 0..50 {
                    queue.enqueue(message(&format!("a/{i}"))).await.unwrap();
                }
            })
        };
        let b = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                for i in 0..50 {
                    queue.enqueue(message(&format!("b/{i}"))).await.unwrap();
                }
            })
        };
        a.await.unwrap();
        b.await.unwrap();

        assert_eq!(queue.len().await, 100);
    }

    #[tokio::test]
    async fn head_or_wait_wakes_on_enqueue() {
        let queue = Arc::new(MessageQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.head_or_wait().await })
        };

        tokio::task::yield_now().await;
        queue.enqueue(message("t/wake")).await.unwrap();

        let head = tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(head.message.topic, "t/wake");
    }
}
