//! HTTP Transport
//!
//! Talks to the chat service over plain HTTP(S): one `POST` with a JSON body
//! `{"message": "..."}` per user message, response body consumed
//! incrementally through `reqwest`'s `bytes_stream`.

use async_trait::async_trait;
use futures::StreamExt;

use super::traits::{ByteStream, ChatRequest, ChatTransport, TransportError};
use crate::config::TransportConfig;

/// HTTP client for the chat service
#[derive(Clone, Debug)]
pub struct HttpTransport {
    /// Full endpoint URL
    endpoint: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport from configuration
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if the HTTP client cannot be built
    /// (for example when no TLS backend is available).
    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            http_client,
        })
    }

    /// Create a transport for `endpoint` with default timeouts
    ///
    /// # Errors
    ///
    /// See [`HttpTransport::from_config`].
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TransportError> {
        Self::from_config(&TransportConfig {
            endpoint: endpoint.into(),
            ..TransportConfig::default()
        })
    }

    /// The endpoint this transport posts to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        tracing::debug!(endpoint = %self.endpoint, "Opening chat exchange");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Connect {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        // Check for HTTP errors
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Body(e.to_string())));

        Ok(body.boxed())
    }
}
