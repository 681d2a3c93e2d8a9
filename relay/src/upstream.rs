use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::config::RelayConfig;
use crate::errors::RelayError;

/// Forwards payloads to the generative-language API with the server-held key
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl UpstreamClient {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.upstream_url(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// POSTs `payload` unchanged and returns the upstream status and JSON body.
    ///
    /// A body that is not JSON is an error, whatever the status.
    #[instrument(skip(self, payload), fields(url = %self.url))]
    pub async fn forward(&self, payload: &Value) -> Result<(StatusCode, Value), RelayError> {
        let started = Instant::now();

        let mut request = self.client.post(&self.url).json(payload);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelayError::Transport(e.without_url().to_string()))?;
        debug!(bytes = bytes.len(), "Read upstream body");

        let body = serde_json::from_slice::<Value>(&bytes)
            .map_err(|e| RelayError::MalformedUpstream(e.to_string()))?;

        info!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Forwarded chat request"
        );
        Ok((status, body))
    }
}
