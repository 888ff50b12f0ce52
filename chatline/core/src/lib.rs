//! Chatline Core - Streaming Chat Client Engine
//!
//! This crate holds everything a chat front end needs except the front end:
//! it turns chunked network responses into text increments and folds them
//! into an immutable, versioned conversation log that renderers can observe.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Front End                                │
//! │        (CLI, TUI, ...)  renders Snapshot, sends UiEvent          │
//! └───────────────┬───────────────────────────────▲──────────────────┘
//!                 │ UiEvent                       │ watch::Receiver<Snapshot>
//! ┌───────────────▼───────────────────────────────┴──────────────────┐
//! │                        CHATLINE CORE                             │
//! │  ┌────────────────────┐   transitions   ┌──────────────────────┐ │
//! │  │ SessionCoordinator │ ──────────────► │  ConversationStore   │ │
//! │  └─────────┬──────────┘                 └──────────────────────┘ │
//! │            │ one task per submission                             │
//! │  ┌─────────▼──────────┐   ┌──────────────┐   ┌────────────────┐  │
//! │  │   StreamSession    │ ◄─│ FrameDecoder │ ◄─│ ChatTransport  │  │
//! │  └────────────────────┘   └──────────────┘   └────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`SessionCoordinator`]: accepts submissions and binds each reply to its
//!   conversation
//! - [`ConversationStore`]: publishes immutable [`Snapshot`]s
//! - [`StreamSession`]: lazy text increments for one exchange
//! - [`FrameDecoder`]: `data: ` line framing over arbitrary chunks
//! - [`HttpTransport`]: the `reqwest`-based [`ChatTransport`]
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use chatline_core::{
//!     ConversationStore, HttpTransport, SessionCoordinator, Snapshot, UiEvent,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = ConversationStore::new(Snapshot::seeded());
//!     let transport = Arc::new(HttpTransport::new("http://localhost:8080/api/v1/chat")?);
//!     let coordinator = SessionCoordinator::new(store.clone(), transport);
//!
//!     let mut updates = store.subscribe();
//!     coordinator.handle_event(UiEvent::submit("1", "Hello"));
//!
//!     while updates.changed().await.is_ok() {
//!         let snapshot = updates.borrow_and_update().clone();
//!         // render snapshot.selected_messages()
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: transport abstraction and the HTTP implementation
//! - [`config`]: TOML / environment / CLI configuration
//! - [`conversation`]: messages, conversations, identifiers
//! - [`coordinator`]: session lifecycle and routing
//! - [`events`]: events from front ends
//! - [`store`]: snapshots and their transitions
//! - [`streaming`]: frame decoding and stream sessions
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on any terminal or GUI framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod conversation;
pub mod coordinator;
pub mod events;
pub mod store;
pub mod streaming;

// Re-exports for convenience
pub use backend::{ByteStream, ChatRequest, ChatTransport, HttpTransport, TransportError};
pub use config::{
    load_config, load_config_from_path, ChatlineConfig, ClientConfig, ConfigError,
    ConfigOverrides, ConfigSource, TransportConfig,
};
pub use conversation::{Conversation, ConversationId, ConversationSummary, Message, MessageRole};
pub use coordinator::{
    EventOutcome, SessionCoordinator, SessionHandle, SessionOutcome, SubmitError,
};
pub use events::UiEvent;
pub use store::{ConversationStore, Snapshot};
pub use streaming::{
    FrameDecoder, StreamSession, StreamingToken, CONNECTION_ERROR_NOTICE, DATA_PREFIX,
};
