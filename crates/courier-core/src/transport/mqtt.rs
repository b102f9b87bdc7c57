//! MQTT broker transport: QoS-1 publishes to per-device topics.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::{DeliveryAck, Transport};
use crate::config::MqttConfig;
use crate::error::SendError;
use crate::model::MessageKind;
use crate::outbox::OutboundMessage;

/// Connection-level happenings the driver reports back to `send`.
#[derive(Debug, Clone)]
enum BrokerEvent {
    /// A publish went out on the wire with this packet id.
    PublishSent(u16),

    /// The broker acknowledged this packet id.
    Acked(u16),

    /// The connection dropped; anything unacked is in doubt.
    ConnectionLost(String),
}

/// Publishes each message to its record topic with at-least-once QoS.
/// A clear message is the protocol's retained-clear: a zero-length
/// retained publish to the contact's topic.
///
/// `send` resolves only once the broker's PUBACK for the publish comes
/// back — queueing the packet locally is not delivery, and reporting it
/// as such would dequeue a message the broker never saw. The connection
/// is driven by a spawned event-loop task that forwards publish/ack
/// packet ids and connection errors; rumqttc reconnects on poll, so
/// broker outages surface as retryable send failures rather than a dead
/// transport.
pub struct MqttTransport {
    client: AsyncClient,
    events: broadcast::Sender<BrokerEvent>,
    driver: JoinHandle<()>,
}

impl MqttTransport {
    /// Open a connection and spawn its event-loop driver. Must be
    /// called from within a tokio runtime.
    pub fn connect(config: &MqttConfig, device_id: &str) -> Self {
        let client_id = config
            .client_id
            .clone()
            .unwrap_or_else(|| format!("courier-{device_id}"));
        let mut options = MqttOptions::new(client_id, config.host.as_str(), config.port);
        options.set_keep_alive(Duration::from_secs(config.keepalive_secs));
        if let Some(username) = &config.username {
            options.set_credentials(username.as_str(), config.password.clone().unwrap_or_default());
        }

        let (client, mut event_loop) = AsyncClient::new(options, 10);
        let (events, _) = broadcast::channel(32);
        let driver_events = events.clone();
        let driver = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Publish(pkid))) => {
                        let _ = driver_events.send(BrokerEvent::PublishSent(pkid));
                    }
                    Ok(Event::Incoming(Packet::PubAck(ack))) => {
                        let _ = driver_events.send(BrokerEvent::Acked(ack.pkid));
                    }
                    Ok(event) => {
                        tracing::trace!(?event, "mqtt event");
                    }
                    Err(err) => {
                        let _ = driver_events.send(BrokerEvent::ConnectionLost(err.to_string()));
                        tracing::debug!(error = %err, "mqtt connection error, will reconnect");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Self {
            client,
            events,
            driver,
        }
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[async_trait]
impl Transport for MqttTransport {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    async fn send(
        &self,
        message: &OutboundMessage,
        timeout: Duration,
    ) -> Result<DeliveryAck, SendError> {
        // Subscribe before publishing so the outgoing packet id cannot
        // slip past us.
        let mut events = self.events.subscribe();
        let deadline = tokio::time::Instant::now() + timeout;

        let retain = message.kind == MessageKind::Clear;
        let publish = self.client.publish(
            message.topic.as_str(),
            QoS::AtLeastOnce,
            retain,
            message.payload.clone(),
        );
        match tokio::time::timeout_at(deadline, publish).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(SendError::Refused(err.to_string())),
            Err(_) => return Err(SendError::Timeout),
        }

        match tokio::time::timeout_at(deadline, wait_for_ack(&mut events)).await {
            Ok(result) => result,
            Err(_) => Err(SendError::Timeout),
        }
    }

    /// Disconnect cleanly and stop the event-loop driver.
    async fn shutdown(&self) {
        let _ = self.client.disconnect().await;
        self.driver.abort();
    }
}

/// Wait for the broker to acknowledge the publish we just queued.
///
/// Sends are single-flight per coordinator, so the first outgoing
/// publish observed after subscribing is an attempt of the head
/// message — possibly a retransmission of an earlier attempt of that
/// same message, whose ack confirms delivery just as well.
async fn wait_for_ack(
    events: &mut broadcast::Receiver<BrokerEvent>,
) -> Result<DeliveryAck, SendError> {
    let mut pkid = None;
    loop {
        match events.recv().await {
            Ok(BrokerEvent::PublishSent(id)) if pkid.is_none() => pkid = Some(id),
            Ok(BrokerEvent::Acked(id)) if pkid == Some(id) => {
                return Ok(DeliveryAck::Published);
            }
            Ok(BrokerEvent::ConnectionLost(reason)) => {
                return Err(SendError::Refused(reason));
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => {
                // We may have missed the ack; let the outbox retry.
                return Err(SendError::Refused("event stream lagged".to_string()));
            }
            Err(broadcast::error::RecvError::Closed) => {
                return Err(SendError::Refused("connection driver stopped".to_string()));
            }
        }
    }
}
