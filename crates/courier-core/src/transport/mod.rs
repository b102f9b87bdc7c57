//! Transports: one attempt of one message over one protocol.
//!
//! A transport is deliberately dumb: it sends a single already-encoded
//! message and reports what happened. Retry, ordering, and queueing are
//! the coordinator's job.

mod http;
mod mqtt;

pub use http::HttpTransport;
pub use mqtt::MqttTransport;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SendError;
use crate::outbox::OutboundMessage;

/// Successful outcome of one transport attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryAck {
    /// HTTP endpoint answered with a 2xx status.
    HttpResponse(u16),

    /// Broker accepted the publish (QoS 1, at-least-once).
    Published,
}

impl DeliveryAck {
    /// Human-readable status line, e.g. `"Response 200"`. This is the
    /// string status collaborators display.
    pub fn status_message(&self) -> String {
        match self {
            DeliveryAck::HttpResponse(status) => format!("Response {status}"),
            DeliveryAck::Published => "Published".to_string(),
        }
    }
}

/// One-shot send over a configured endpoint.
///
/// `send` may suspend for a full network round trip but must resolve
/// within the caller-supplied timeout, failing with
/// [`SendError::Timeout`] otherwise. Implementations are immutable
/// snapshots of their configuration; reconfiguration swaps the whole
/// transport between attempts, so an attempt already in flight keeps
/// the endpoint it started with.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for logging ("http", "mqtt").
    fn name(&self) -> &'static str;

    async fn send(
        &self,
        message: &OutboundMessage,
        timeout: Duration,
    ) -> Result<DeliveryAck, SendError>;

    /// Release connection state held by this transport. Called when the
    /// coordinator replaces or stops it; the default does nothing.
    async fn shutdown(&self) {}
}
