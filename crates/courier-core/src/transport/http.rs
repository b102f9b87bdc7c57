//! HTTP private-server transport: POST the encoded payload to one URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;

use super::{DeliveryAck, Transport};
use crate::config::HttpConfig;
use crate::error::SendError;
use crate::outbox::OutboundMessage;

/// POSTs each message to the configured URL with optional basic auth.
/// The user/device identity rides along as `X-Limit-U` / `X-Limit-D`
/// headers so a multi-user server can attribute the payload.
///
/// Holds an immutable config snapshot; the coordinator swaps the whole
/// transport on reconfiguration.
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpConfig,
    limit_user: String,
    limit_device: String,
}

impl HttpTransport {
    pub fn new(config: HttpConfig, username: &str, device_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            limit_user: username.to_string(),
            limit_device: device_id.to_string(),
        }
    }

    /// Current endpoint configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(
        &self,
        message: &OutboundMessage,
        timeout: Duration,
    ) -> Result<DeliveryAck, SendError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/json")
            .header("X-Limit-U", &self.limit_user)
            .header("X-Limit-D", &self.limit_device)
            .timeout(timeout)
            .body(message.payload.clone());

        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_deref());
        }

        let response = request.send().await.map_err(classify_request_error)?;
        classify_status(response.status())
    }
}

fn classify_request_error(err: reqwest::Error) -> SendError {
    if err.is_timeout() {
        SendError::Timeout
    } else {
        // Connect refusals, DNS failures, resets: all retryable.
        SendError::Refused(err.to_string())
    }
}

/// Map an HTTP status to a delivery outcome.
///
/// 2xx is an ack. 5xx means the server is unhealthy: retry. 404, 408
/// and 429 are also retried — in practice 404 shows up while a server
/// is still coming up behind a proxy, and the observed endpoint
/// contract is that such a message is eventually delivered once the
/// endpoint answers 200. The remaining 4xx are rejections of this
/// specific payload and are fatal for the message only.
fn classify_status(status: StatusCode) -> Result<DeliveryAck, SendError> {
    if status.is_success() {
        return Ok(DeliveryAck::HttpResponse(status.as_u16()));
    }
    match status.as_u16() {
        404 | 408 | 429 => Err(SendError::Refused(format!("status {}", status.as_u16()))),
        code if status.is_server_error() => Err(SendError::Refused(format!("status {code}"))),
        code => Err(SendError::Rejected { status: code }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_statuses_ack() {
        assert_eq!(
            classify_status(StatusCode::OK).unwrap(),
            DeliveryAck::HttpResponse(200)
        );
        assert_eq!(
            classify_status(StatusCode::CREATED).unwrap(),
            DeliveryAck::HttpResponse(201)
        );
    }

    #[test]
    fn server_errors_are_retryable() {
        let err = classify_status(StatusCode::SERVICE_UNAVAILABLE).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn not_found_is_retryable() {
        let err = classify_status(StatusCode::NOT_FOUND).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn bad_request_is_fatal() {
        let err = classify_status(StatusCode::BAD_REQUEST).unwrap_err();
        assert_eq!(err, SendError::Rejected { status: 400 });
        assert!(!err.is_retryable());
    }
}
