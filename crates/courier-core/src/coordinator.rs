//! Delivery coordinator: owns the outbox and the active transport,
//! drives the retry loop, and reports outcomes to collaborators.
//!
//! Single-flight by construction: one delivery task per coordinator, so
//! attempts for distinct messages never overlap and message N+1 is not
//! touched until message N reaches a terminal outcome.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, broadcast, watch};
use tokio::task::JoinHandle;
use ulid::Ulid;

use crate::codec;
use crate::config::{ConfigError, ConnectionMode, EndpointConfig};
use crate::error::{OutboxError, SendError};
use crate::model::{DomainMessage, MessageKind};
use crate::outbox::{MessageQueue, OutboundMessage};
use crate::transport::{DeliveryAck, HttpTransport, MqttTransport, Transport};

/// Terminal outcome of one queued message, fanned out to status
/// collaborators. `status_message()` is the displayable form
/// (e.g. `"Response 200"`).
#[derive(Debug, Clone)]
pub enum DeliveryEvent {
    Delivered {
        id: Ulid,
        kind: MessageKind,
        ack: DeliveryAck,
    },
    Dropped {
        id: Ulid,
        kind: MessageKind,
        error: SendError,
        attempts: u32,
    },
}

impl DeliveryEvent {
    pub fn status_message(&self) -> String {
        match self {
            DeliveryEvent::Delivered { ack, .. } => ack.status_message(),
            DeliveryEvent::Dropped { error, .. } => error.to_string(),
        }
    }
}

struct Inner {
    queue: MessageQueue,
    transport: RwLock<Arc<dyn Transport>>,
    config: RwLock<EndpointConfig>,
    events: broadcast::Sender<DeliveryEvent>,
}

/// Handle to a running delivery coordinator.
///
/// - Producers call [`queue_message`] / [`queue_message_to`]; both are
///   fire-and-forget past the encode step — transport failures never
///   propagate back to the producer's calling context.
/// - Status collaborators [`subscribe`] for delivery events and watch
///   [`queue_len`] for the outgoing-queue-empty signal.
/// - Dropping the handle does not stop the loop; use
///   [`shutdown_and_join`] for a clean stop.
///
/// [`queue_message`]: Coordinator::queue_message
/// [`queue_message_to`]: Coordinator::queue_message_to
/// [`subscribe`]: Coordinator::subscribe
/// [`queue_len`]: Coordinator::queue_len
/// [`shutdown_and_join`]: Coordinator::shutdown_and_join
pub struct Coordinator {
    inner: Arc<Inner>,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl Coordinator {
    /// Build the transport selected by `config` and start the delivery
    /// loop. Must be called from within a tokio runtime.
    pub fn start(config: EndpointConfig) -> Result<Self, ConfigError> {
        let transport = build_transport(&config)?;
        Ok(Self::start_with_transport(config, transport))
    }

    /// Start with an explicit transport (tests inject mocks here).
    pub fn start_with_transport(config: EndpointConfig, transport: Arc<dyn Transport>) -> Self {
        Self::start_parts(config, transport, MessageQueue::new())
    }

    /// Start with an explicit transport and a pre-built queue (e.g. a
    /// bounded one).
    pub fn start_with_queue(
        config: EndpointConfig,
        transport: Arc<dyn Transport>,
        queue: MessageQueue,
    ) -> Self {
        Self::start_parts(config, transport, queue)
    }

    fn start_parts(
        config: EndpointConfig,
        transport: Arc<dyn Transport>,
        queue: MessageQueue,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        let inner = Arc::new(Inner {
            queue,
            transport: RwLock::new(transport),
            config: RwLock::new(config),
            events,
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(delivery_loop(Arc::clone(&inner), shutdown_rx));
        Self {
            inner,
            shutdown_tx,
            join,
        }
    }

    /// Encode and enqueue a message; the topic is resolved from the
    /// current configuration. Never blocks on network activity.
    pub async fn queue_message(&self, message: DomainMessage) -> Result<Ulid, OutboxError> {
        let topic = {
            let config = self.inner.config.read().await;
            config.topic_for(message.kind())
        };
        self.queue_message_to(topic, message).await
    }

    /// Encode and enqueue with an explicit destination topic. This is
    /// the path for clear-contact messages, whose topic belongs to the
    /// contact being cleared rather than to this device.
    pub async fn queue_message_to(
        &self,
        topic: String,
        message: DomainMessage,
    ) -> Result<Ulid, OutboxError> {
        let payload = codec::encode(&message)?;
        let outbound = OutboundMessage::new(message.kind(), topic, payload);
        self.inner.queue.enqueue(outbound).await
    }

    /// Subscribe to terminal delivery outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<DeliveryEvent> {
        self.inner.events.subscribe()
    }

    /// Queue-length signal; reaching 0 means every pending send has
    /// terminally resolved (a message in flight still counts).
    pub fn queue_len(&self) -> watch::Receiver<usize> {
        self.inner.queue.queue_len()
    }

    /// Wait until the outgoing queue is empty. Returns immediately if
    /// it already is.
    pub async fn wait_until_empty(&self) {
        let mut len_rx = self.queue_len();
        // The sender lives in `inner`, which we hold, so this cannot fail.
        let _ = len_rx.wait_for(|len| *len == 0).await;
    }

    /// Swap the endpoint configuration. The transport is rebuilt and
    /// takes effect from the next attempt; an attempt already in flight
    /// keeps its snapshot of the old transport. The old transport is
    /// torn down once it has been replaced, so an in-flight attempt may
    /// fail retryably and re-run over the new endpoint.
    pub async fn reconfigure(&self, config: EndpointConfig) -> Result<(), ConfigError> {
        let transport = build_transport(&config)?;
        let old = {
            let mut guard = self.inner.transport.write().await;
            std::mem::replace(&mut *guard, transport)
        };
        *self.inner.config.write().await = config;
        old.shutdown().await;
        Ok(())
    }

    /// Ask the delivery loop to stop. The in-flight attempt, if any, is
    /// abandoned at its next suspension point; its message stays queued.
    pub fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Shut down, wait for the delivery loop to exit, and tear down the
    /// transport.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
        let transport = Arc::clone(&*self.inner.transport.read().await);
        transport.shutdown().await;
    }
}

fn build_transport(config: &EndpointConfig) -> Result<Arc<dyn Transport>, ConfigError> {
    match config.mode {
        ConnectionMode::Http => {
            let http = config.http.as_ref().ok_or(ConfigError::MissingSection {
                mode: "http",
                section: "http",
            })?;
            Ok(Arc::new(HttpTransport::new(
                http.clone(),
                &config.username,
                &config.device_id,
            )))
        }
        ConnectionMode::Mqtt => {
            let mqtt = config.mqtt.as_ref().ok_or(ConfigError::MissingSection {
                mode: "mqtt",
                section: "mqtt",
            })?;
            Ok(Arc::new(MqttTransport::connect(mqtt, &config.device_id)))
        }
    }
}

/// The delivery state machine: Idle (wait for a head) -> Sending (one
/// attempt against the transport snapshot) -> Idle / Backoff / drop.
async fn delivery_loop(inner: Arc<Inner>, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // Idle: wait for a head message, racing against shutdown.
        let head = tokio::select! {
            _ = shutdown_rx.changed() => continue,
            head = inner.queue.head_or_wait() => head,
        };

        // Per-attempt snapshot: config changes apply from the next
        // attempt, never mid-attempt.
        let (transport, timeout, policy) = {
            let config = inner.config.read().await;
            let transport = inner.transport.read().await.clone();
            let timeout = Duration::from_secs(config.send_timeout_secs);
            (transport, timeout, config.retry.policy())
        };

        let attempt = head.attempts + 1;
        tracing::debug!(
            id = %head.id,
            kind = %head.message.kind,
            topic = %head.message.topic,
            attempt,
            transport = transport.name(),
            "sending message"
        );

        // Sending: shutdown abandons the attempt, the message stays queued.
        let result = tokio::select! {
            _ = shutdown_rx.changed() => break,
            result = transport.send(&head.message, timeout) => result,
        };

        match result {
            Ok(ack) => {
                inner.queue.dequeue_head().await;
                tracing::info!(id = %head.id, status = %ack.status_message(), "message delivered");
                let _ = inner.events.send(DeliveryEvent::Delivered {
                    id: head.id,
                    kind: head.message.kind,
                    ack,
                });
            }
            Err(error) if error.is_retryable() && !policy.attempts_exhausted(attempt) => {
                inner.queue.record_failure(head.id, error.to_string()).await;
                let delay = policy.next_delay(attempt);
                tracing::warn!(
                    id = %head.id,
                    error = %error,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "send failed, backing off"
                );
                // Backoff: interruptible by shutdown.
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(error) => {
                // Fatal classification, or the attempt budget is spent.
                inner.queue.dequeue_head().await;
                tracing::warn!(
                    id = %head.id,
                    error = %error,
                    attempt,
                    "message dropped"
                );
                let _ = inner.events.send(DeliveryEvent::Dropped {
                    id: head.id,
                    kind: head.message.kind,
                    error,
                    attempts: attempt,
                });
            }
        }
    }
    tracing::debug!("delivery loop stopped");
}
