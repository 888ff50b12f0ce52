//! Chat Service Transport
//!
//! Abstracted access to the chat service through the [`ChatTransport`] trait.
//!
//! # Usage
//!
//! ```ignore
//! use chatline_core::backend::{ChatRequest, ChatTransport, HttpTransport};
//!
//! let transport = HttpTransport::new("http://localhost:8080/api/v1/chat")?;
//! let body = transport.open(&ChatRequest::new("Hello!")).await?;
//! ```

mod http;
mod traits;

pub use http::HttpTransport;
pub use traits::{ByteStream, ChatRequest, ChatTransport, TransportError};
