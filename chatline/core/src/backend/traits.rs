//! Chat Transport Traits
//!
//! The seam between the streaming engine and the network. A transport opens
//! one request/response exchange and hands back the raw response body as a
//! stream of byte chunks; everything above it (framing, error notices,
//! conversation bookkeeping) is transport-agnostic.
//!
//! Tests substitute an in-memory transport; production uses
//! [`HttpTransport`](super::HttpTransport).

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;

/// Raw response body, chunked however the network delivered it
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Request body sent to the chat service
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    /// The user's message text
    pub message: String,
}

impl ChatRequest {
    /// Create a request for one user message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failures while establishing or reading an exchange
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// The connection could not be established or the request not sent
    #[error("Failed to connect to {endpoint}: {reason}")]
    Connect {
        /// Endpoint that was attempted
        endpoint: String,
        /// Underlying failure
        reason: String,
    },

    /// The service answered with a non-success status
    #[error("Chat service returned {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The response body failed mid-stream
    #[error("Response body failed: {0}")]
    Body(String),
}

/// Opens streaming exchanges with the chat service
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Transport name for logs
    fn name(&self) -> &str;

    /// Send `request` and return the response body as it arrives
    ///
    /// Resolves once the response head is in; the body is read lazily by
    /// polling the returned stream. Dropping the stream releases the
    /// underlying connection.
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, TransportError>;
}
