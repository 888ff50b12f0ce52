//! Conversation Data Model
//!
//! Immutable building blocks of the conversation log. A [`Message`] is never
//! edited in place: growing a streamed reply means building a new `Message`
//! and a new [`Conversation`] around it, so anything holding an older
//! `Arc<Conversation>` keeps seeing exactly what it saw before.
//!
//! # Placeholders
//!
//! An assistant reply starts life as an *open placeholder*: an assistant
//! message with empty content and `open == true`, always the last message of
//! its conversation. Stream increments grow it; finalizing closes it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque, stable conversation identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// Generate a fresh unique identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input
    User,
    /// Streamed reply from the chat service
    Assistant,
}

/// A single entry in a conversation log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// Whether this is an assistant placeholder still receiving increments
    #[serde(default)]
    pub open: bool,
}

impl Message {
    /// A finalized user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            open: false,
        }
    }

    /// A finalized assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            open: false,
        }
    }

    /// An empty, open assistant placeholder
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            role: MessageRole::Assistant,
            content: String::new(),
            open: true,
        }
    }

    /// Whether this message is an open assistant placeholder
    #[must_use]
    pub fn is_open_placeholder(&self) -> bool {
        self.open && self.role == MessageRole::Assistant
    }

    /// New placeholder with `delta` appended to the content
    #[must_use]
    pub(crate) fn extended(&self, delta: &str) -> Self {
        let mut content = String::with_capacity(self.content.len() + delta.len());
        content.push_str(&self.content);
        content.push_str(delta);
        Self {
            role: self.role,
            content,
            open: self.open,
        }
    }

    /// Closed copy of this message, optionally with replaced content
    #[must_use]
    pub(crate) fn closed(&self, content: Option<&str>) -> Self {
        Self {
            role: self.role,
            content: content.map_or_else(|| self.content.clone(), str::to_string),
            open: false,
        }
    }
}

// ============================================================================
// Conversations
// ============================================================================

/// A named, ordered message log
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversation {
    /// Unique conversation identifier
    pub id: ConversationId,
    /// Display name
    pub name: String,
    /// Messages in append (chronological) order
    pub messages: Vec<Arc<Message>>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new(id: ConversationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            messages: Vec::new(),
        }
    }

    /// Create a conversation with initial messages
    pub fn with_messages(
        id: ConversationId,
        name: impl Into<String>,
        messages: impl IntoIterator<Item = Message>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            messages: messages.into_iter().map(Arc::new).collect(),
        }
    }

    /// The last message, if any
    #[must_use]
    pub fn last_message(&self) -> Option<&Arc<Message>> {
        self.messages.last()
    }

    /// Whether the conversation currently ends with an open placeholder
    #[must_use]
    pub fn has_open_placeholder(&self) -> bool {
        self.last_message()
            .is_some_and(|m| m.is_open_placeholder())
    }

    /// Copy of this conversation with one more message appended
    ///
    /// Existing messages are shared, not cloned.
    #[must_use]
    pub(crate) fn appended(&self, message: Message) -> Self {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.extend(self.messages.iter().cloned());
        messages.push(Arc::new(message));
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            messages,
        }
    }

    /// Copy of this conversation with the last message replaced
    #[must_use]
    pub(crate) fn with_last_replaced(&self, message: Message) -> Self {
        let mut messages = self.messages.clone();
        if let Some(last) = messages.last_mut() {
            *last = Arc::new(message);
        }
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            messages,
        }
    }
}

/// Lightweight entry for conversation lists
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation identifier
    pub id: ConversationId,
    /// Display name
    pub name: String,
}
