use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::errors::{ChatError, ChatResult};
use crate::types::{extract_error_message, GenerateContentRequest};

/// Sends one outbound payload and returns the parsed success body.
///
/// Implementations map non-success statuses to [`ChatError::Relay`].
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn send(&self, request: &GenerateContentRequest) -> ChatResult<Value>;
}

/// HTTP client for the relay endpoint
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: Client,
    url: String,
}

impl RelayClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Builds the error for a non-success relay response.
pub fn relay_error(status: StatusCode, body: &str) -> ChatError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| extract_error_message(&v))
        .unwrap_or_else(|| status_line(status));

    ChatError::Relay {
        status: status.as_u16(),
        message,
    }
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

#[async_trait]
impl RelayTransport for RelayClient {
    #[instrument(skip(self, request), fields(url = %self.url))]
    async fn send(&self, request: &GenerateContentRequest) -> ChatResult<Value> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::Network(format!("Failed to read response: {}", e)))?;
        debug!(status = status.as_u16(), bytes = body.len(), "Relay responded");

        if !status.is_success() {
            return Err(relay_error(status, &body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_error_uses_upstream_message() {
        let err = relay_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"quota exceeded"}}"#,
        );
        match err {
            ChatError::Relay { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn relay_error_falls_back_to_status_line() {
        let err = relay_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.to_string(), "502 Bad Gateway");
    }

    #[test]
    fn relay_error_reads_relay_envelope() {
        let err = relay_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"upstream unreachable"}"#,
        );
        assert_eq!(err.to_string(), "upstream unreachable");
    }
}
