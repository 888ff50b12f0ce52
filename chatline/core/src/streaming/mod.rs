//! Streaming Ingestion
//!
//! Turns a chunked response body into discrete text increments.
//!
//! # Architecture
//!
//! ```text
//! ChatTransport::open ──► ByteStream ──► FrameDecoder ──► StreamSession
//!    (one POST)          (raw chunks)   (data: lines)    (Token / Error)
//! ```
//!
//! The [`FrameDecoder`] knows nothing about conversations or the network; the
//! [`StreamSession`] owns one decoder and one response body for the lifetime
//! of a single exchange.

mod frame;
mod session;

pub use frame::{FrameDecoder, DATA_PREFIX};
pub use session::{StreamSession, StreamingToken, CONNECTION_ERROR_NOTICE};
