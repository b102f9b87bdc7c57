use thiserror::Error;

/// Codec failure. A payload that cannot be decoded is fatal for that
/// payload only; the codec itself carries no state to corrupt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Failure of a single transport attempt, classified for the retry loop.
///
/// Classification drives the delivery state machine: retryable failures
/// keep the message at the head of the queue, fatal ones drop it after
/// surfacing the error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    /// The caller-supplied timeout expired before the endpoint answered.
    #[error("transport timeout")]
    Timeout,

    /// Network-level failure or a server-side error (connection refused,
    /// 5xx, broker unavailable). Worth retrying.
    #[error("endpoint refused: {0}")]
    Refused(String),

    /// The endpoint rejected this message outright. Retrying the same
    /// payload will not help.
    #[error("endpoint rejected message (status {status})")]
    Rejected { status: u16 },
}

impl SendError {
    /// Is this failure worth another attempt with the same payload?
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SendError::Rejected { .. })
    }
}

/// Errors surfaced to producers at enqueue time. Everything past the
/// enqueue boundary is resolved inside the delivery loop and reported
/// via delivery events instead.
#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("outgoing queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error(transparent)]
    Encode(#[from] CodecError),
}
