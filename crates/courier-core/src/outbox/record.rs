//! Queue records: the encoded message plus delivery bookkeeping.

use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::model::MessageKind;

/// A message prepared for the wire: routing information and the encoded
/// payload. Immutable once enqueued; only the bookkeeping around it
/// changes.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub kind: MessageKind,
    pub topic: String,
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl OutboundMessage {
    pub fn new(kind: MessageKind, topic: String, payload: Vec<u8>) -> Self {
        Self {
            kind,
            topic,
            payload,
            created_at: Utc::now(),
        }
    }
}

/// A message sitting in the outbox.
///
/// The queue is the only mutator: `attempts` counts failed attempts so
/// far and is bumped by [`super::MessageQueue::record_failure`]; the
/// payload is never touched after enqueue.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub id: Ulid,
    pub message: OutboundMessage,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl QueuedMessage {
    pub fn new(message: OutboundMessage) -> Self {
        Self {
            id: Ulid::new(),
            message,
            attempts: 0,
            last_error: None,
        }
    }

    pub(crate) fn record_failure(&mut self, error: String) {
        self.attempts += 1;
        self.last_error = Some(error);
    }
}
