//! courier-core
//!
//! Reliable, ordered, at-least-once delivery of location and event
//! messages to a remote endpoint over an unreliable network.
//!
//! # Module layout
//! - **model**: typed domain messages (location fix, region transition,
//!   clear-contact) and their wire field sets
//! - **codec**: stateless `DomainMessage` <-> payload-bytes conversion
//! - **config**: endpoint configuration, transport selection, topic scheme
//! - **outbox**: strict-FIFO queue of pending messages + retry policy
//! - **transport**: one-shot send over HTTP or MQTT
//! - **coordinator**: the single-flight delivery loop tying it together
//!
//! # Guarantees
//! - Messages go out in exact enqueue order; a failing head blocks the
//!   queue rather than being skipped (head-of-line).
//! - A message leaves the queue only on a terminal outcome: an endpoint
//!   ack, a fatal rejection, or an exhausted attempt budget.
//! - Producers never see transport failures; outcomes are reported via
//!   delivery events and the queue-length signal.

pub mod codec;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod outbox;
pub mod transport;

pub use config::{ConnectionMode, EndpointConfig};
pub use coordinator::{Coordinator, DeliveryEvent};
pub use error::{CodecError, OutboxError, SendError};
pub use model::{DomainMessage, MessageKind, MessageLocation, MessageTransition, TransitionEvent};
pub use outbox::{MessageQueue, OutboundMessage, RetryPolicy};
pub use transport::{DeliveryAck, Transport};
