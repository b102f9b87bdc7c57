//! Endpoint configuration: transport selection, identity, retry tuning.
//!
//! The config is an externally supplied JSON document (the exported
//! settings format); the core only consumes it. Topic resolution lives
//! here because the topic scheme is a function of identity, not of any
//! single transport.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::MessageKind;
use crate::outbox::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("mode \"{mode}\" requires a \"{section}\" section")]
    MissingSection {
        mode: &'static str,
        section: &'static str,
    },
}

/// Which transport delivers outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    Http,
    Mqtt,
}

/// HTTP endpoint settings (private-server mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Full URL the encoded payload is POSTed to.
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Broker settings (MQTT mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Client id presented to the broker. Defaults to
    /// `courier-<device_id>` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_keepalive_secs() -> u64 {
    60
}

/// Retry/backoff tuning. The curve is a policy knob, not a constant:
/// only the qualitative behavior (eventual delivery, ordering) is part
/// of the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub base_secs: f64,
    pub multiplier: f64,
    pub max_delay_secs: f64,

    /// Jitter fraction applied to each computed delay.
    pub jitter: f64,

    /// `None` retries forever on retryable failures.
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_secs: 2.0,
            multiplier: 2.0,
            max_delay_secs: 120.0,
            jitter: 0.1,
            max_attempts: None,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: std::time::Duration::from_secs_f64(self.base_secs),
            multiplier: self.multiplier,
            max_delay: std::time::Duration::from_secs_f64(self.max_delay_secs),
            jitter: self.jitter,
            max_attempts: self.max_attempts,
        }
    }
}

/// Full endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub mode: ConnectionMode,
    pub username: String,
    pub device_id: String,

    /// First segment of the publish topic.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Upper bound on a single transport attempt.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt: Option<MqttConfig>,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_namespace() -> String {
    "owntracks".to_string()
}

fn default_send_timeout_secs() -> u64 {
    30
}

impl EndpointConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Base publish topic: `<namespace>/<username>/<device_id>`.
    pub fn base_topic(&self) -> String {
        format!("{}/{}/{}", self.namespace, self.username, self.device_id)
    }

    /// Destination topic for a message kind. Transitions publish to the
    /// `/event` subtopic; everything else uses the base topic. Clears
    /// normally carry an explicit per-contact topic instead (see
    /// [`crate::coordinator::Coordinator::queue_message_to`]).
    pub fn topic_for(&self, kind: MessageKind) -> String {
        match kind {
            MessageKind::Transition => format!("{}/event", self.base_topic()),
            _ => self.base_topic(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(mode: ConnectionMode) -> EndpointConfig {
        EndpointConfig {
            mode,
            username: "someuser".to_string(),
            device_id: "somedevice".to_string(),
            namespace: default_namespace(),
            send_timeout_secs: default_send_timeout_secs(),
            http: None,
            mqtt: None,
            retry: RetryConfig::default(),
        }
    }

    #[test]
    fn topics_follow_the_scheme() {
        let config = minimal(ConnectionMode::Mqtt);
        assert_eq!(
            config.topic_for(MessageKind::Location),
            "owntracks/someuser/somedevice"
        );
        assert_eq!(
            config.topic_for(MessageKind::Transition),
            "owntracks/someuser/somedevice/event"
        );
    }

    #[test]
    fn parses_a_minimal_http_document() {
        let config = EndpointConfig::from_json_str(
            r#"{
                "mode": "http",
                "username": "u",
                "device_id": "d",
                "http": {"url": "http://localhost:8080/pub"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.mode, ConnectionMode::Http);
        assert_eq!(config.namespace, "owntracks");
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.http.unwrap().url, "http://localhost:8080/pub");
    }

    #[test]
    fn mqtt_defaults_apply() {
        let config = EndpointConfig::from_json_str(
            r#"{
                "mode": "mqtt",
                "username": "u",
                "device_id": "d",
                "mqtt": {"host": "broker.example"}
            }"#,
        )
        .unwrap();
        let mqtt = config.mqtt.unwrap();
        assert_eq!(mqtt.port, 1883);
        assert_eq!(mqtt.keepalive_secs, 60);
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let err = EndpointConfig::from_json_str(
            r#"{"mode": "carrier-pigeon", "username": "u", "device_id": "d"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
