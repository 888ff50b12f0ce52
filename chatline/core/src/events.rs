//! UI Events
//!
//! Events sent from a front end to the [`SessionCoordinator`]. Front ends are
//! "dumb" renderers: they report what the user did and leave every decision
//! to the coordinator.
//!
//! [`SessionCoordinator`]: crate::coordinator::SessionCoordinator

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;

/// Events from a front end to the coordinator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiEvent {
    /// User submitted text for a conversation
    SubmitMessage {
        /// Conversation the text was typed into
        conversation_id: ConversationId,
        /// Message content
        content: String,
    },

    /// User switched to another conversation
    SelectConversation {
        /// Conversation to display
        conversation_id: ConversationId,
    },

    /// User asked for a new conversation
    NewConversation {
        /// Display name
        name: String,
    },
}

impl UiEvent {
    /// Submit `content` to `conversation_id`
    pub fn submit(conversation_id: impl Into<ConversationId>, content: impl Into<String>) -> Self {
        Self::SubmitMessage {
            conversation_id: conversation_id.into(),
            content: content.into(),
        }
    }

    /// Select `conversation_id`
    pub fn select(conversation_id: impl Into<ConversationId>) -> Self {
        Self::SelectConversation {
            conversation_id: conversation_id.into(),
        }
    }

    /// Create a conversation called `name`
    pub fn new_conversation(name: impl Into<String>) -> Self {
        Self::NewConversation { name: name.into() }
    }
}
