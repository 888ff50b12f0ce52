//! Conversation Store
//!
//! The single source of truth for every conversation and the current
//! selection. State lives in immutable [`Snapshot`] values; every transition
//! is a pure function from one snapshot to the next.
//!
//! # Design Philosophy
//!
//! Rendering layers only re-render when they observe a new reference, so a
//! published snapshot must never change underneath them. Transitions therefore
//! rebuild the touched conversation and the top-level list, and share every
//! untouched conversation and message by `Arc`. A transition that has nothing
//! to do returns the input snapshot itself (same references, same version),
//! which is how stale or unknown identifiers degrade into no-ops.
//!
//! [`ConversationStore`] wraps the current snapshot in a `tokio::sync::watch`
//! channel. All writers go through [`ConversationStore::apply`], which runs
//! the transition under the store's writer lock: that lock is the one
//! serialization point, so concurrent writers apply in arrival order.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::conversation::{Conversation, ConversationId, ConversationSummary, Message};

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable view of all conversations at one point in time
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Conversations in display order
    conversations: Arc<Vec<Arc<Conversation>>>,
    /// Selected conversation (may be stale; see [`Snapshot::selected_id`])
    selected_id: Option<ConversationId>,
    /// Bumped by every transition that changes state
    version: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Snapshot {
    /// A snapshot with no conversations and nothing selected
    #[must_use]
    pub fn empty() -> Self {
        Self {
            conversations: Arc::new(Vec::new()),
            selected_id: None,
            version: 0,
        }
    }

    /// Build a snapshot from initial conversations
    ///
    /// Conversations whose id was already seen are dropped so that ids stay
    /// unique. A selection that names no conversation is discarded.
    pub fn from_conversations(
        conversations: impl IntoIterator<Item = Conversation>,
        selected_id: Option<ConversationId>,
    ) -> Self {
        let mut unique: Vec<Arc<Conversation>> = Vec::new();
        for conversation in conversations {
            if unique.iter().any(|c| c.id == conversation.id) {
                tracing::warn!(conversation = %conversation.id, "Dropping duplicate conversation id");
                continue;
            }
            unique.push(Arc::new(conversation));
        }

        let selected_id = selected_id.filter(|id| unique.iter().any(|c| &c.id == id));

        Self {
            conversations: Arc::new(unique),
            selected_id,
            version: 0,
        }
    }

    /// The demo conversations the client starts with
    #[must_use]
    pub fn seeded() -> Self {
        Self::from_conversations(
            [
                Conversation::with_messages(
                    "1".into(),
                    "First Chat",
                    [
                        Message::user("Hello, assistant!"),
                        Message::assistant("Hello! How can I help you today?"),
                    ],
                ),
                Conversation::with_messages(
                    "2".into(),
                    "Deployment Debug",
                    [
                        Message::user("Why is my deployment failing?"),
                        Message::assistant("It seems to be a cache issue."),
                    ],
                ),
            ],
            Some("1".into()),
        )
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// All conversations in display order
    #[must_use]
    pub fn conversations(&self) -> &[Arc<Conversation>] {
        &self.conversations
    }

    /// Shared handle to the conversation list
    ///
    /// A new `Arc` is produced whenever any conversation changes, so renderers
    /// can compare it with `Arc::ptr_eq`.
    #[must_use]
    pub fn conversation_list(&self) -> Arc<Vec<Arc<Conversation>>> {
        Arc::clone(&self.conversations)
    }

    /// Look up a conversation by id
    #[must_use]
    pub fn conversation(&self, id: &ConversationId) -> Option<&Arc<Conversation>> {
        self.conversations.iter().find(|c| &c.id == id)
    }

    /// Whether a conversation exists
    #[must_use]
    pub fn contains(&self, id: &ConversationId) -> bool {
        self.conversation(id).is_some()
    }

    /// Selected conversation id, or `None` if nothing valid is selected
    #[must_use]
    pub fn selected_id(&self) -> Option<&ConversationId> {
        self.selected_id.as_ref().filter(|id| self.contains(id))
    }

    /// The selected conversation
    #[must_use]
    pub fn selected(&self) -> Option<&Arc<Conversation>> {
        self.selected_id().and_then(|id| self.conversation(id))
    }

    /// Messages of the selected conversation (empty when nothing is selected)
    #[must_use]
    pub fn selected_messages(&self) -> &[Arc<Message>] {
        self.selected().map_or(&[], |c| c.messages.as_slice())
    }

    /// `(id, name)` pairs for conversation lists
    #[must_use]
    pub fn summaries(&self) -> Vec<ConversationSummary> {
        self.conversations
            .iter()
            .map(|c| ConversationSummary {
                id: c.id.clone(),
                name: c.name.clone(),
            })
            .collect()
    }

    /// Whether a conversation ends with an open assistant placeholder
    #[must_use]
    pub fn has_open_placeholder(&self, id: &ConversationId) -> bool {
        self.conversation(id)
            .is_some_and(|c| c.has_open_placeholder())
    }

    /// Monotonic version of this snapshot
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether two snapshots are the very same state (reference equality)
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.version == other.version
            && Arc::ptr_eq(&self.conversations, &other.conversations)
            && self.selected_id == other.selected_id
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Append a finalized user message
    ///
    /// Refused while the conversation has an open placeholder, which must stay
    /// the last message until it is finalized.
    #[must_use]
    pub fn append_user_message(&self, id: &ConversationId, text: &str) -> Self {
        self.map_conversation(id, |conv| {
            if conv.has_open_placeholder() {
                tracing::debug!(conversation = %id, "Ignoring user message while a reply is open");
                return None;
            }
            Some(conv.appended(Message::user(text)))
        })
    }

    /// Append an empty assistant placeholder
    ///
    /// Reuses the open placeholder if the conversation already has one.
    #[must_use]
    pub fn open_assistant_placeholder(&self, id: &ConversationId) -> Self {
        self.map_conversation(id, |conv| {
            if conv.has_open_placeholder() {
                None
            } else {
                Some(conv.appended(Message::placeholder()))
            }
        })
    }

    /// Concatenate `delta` onto the open placeholder
    ///
    /// No-op unless the last message is an open assistant placeholder.
    #[must_use]
    pub fn append_to_open_placeholder(&self, id: &ConversationId, delta: &str) -> Self {
        self.map_conversation(id, |conv| {
            let last = conv.last_message().filter(|m| m.is_open_placeholder())?;
            Some(conv.with_last_replaced(last.extended(delta)))
        })
    }

    /// Close the open placeholder, keeping its content
    #[must_use]
    pub fn finalize_placeholder(&self, id: &ConversationId) -> Self {
        self.map_conversation(id, |conv| {
            let last = conv.last_message().filter(|m| m.is_open_placeholder())?;
            Some(conv.with_last_replaced(last.closed(None)))
        })
    }

    /// Replace the open placeholder's content with `error_text` and close it
    ///
    /// Partial streamed content is discarded.
    #[must_use]
    pub fn finalize_with_error(&self, id: &ConversationId, error_text: &str) -> Self {
        self.map_conversation(id, |conv| {
            let last = conv.last_message().filter(|m| m.is_open_placeholder())?;
            Some(conv.with_last_replaced(last.closed(Some(error_text))))
        })
    }

    /// Change the selected conversation
    ///
    /// Unknown ids and re-selecting the current conversation are no-ops.
    #[must_use]
    pub fn select(&self, id: &ConversationId) -> Self {
        if !self.contains(id) {
            tracing::debug!(conversation = %id, "Ignoring selection of unknown conversation");
            return self.clone();
        }
        if self.selected_id.as_ref() == Some(id) {
            return self.clone();
        }

        Self {
            conversations: Arc::clone(&self.conversations),
            selected_id: Some(id.clone()),
            version: self.version + 1,
        }
    }

    /// Append a new empty conversation and select it
    #[must_use]
    pub fn create_conversation(&self, name: &str) -> (Self, ConversationId) {
        let mut id = ConversationId::generate();
        while self.contains(&id) {
            id = ConversationId::generate();
        }

        let mut conversations = Vec::with_capacity(self.conversations.len() + 1);
        conversations.extend(self.conversations.iter().cloned());
        conversations.push(Arc::new(Conversation::new(id.clone(), name)));

        let next = Self {
            conversations: Arc::new(conversations),
            selected_id: Some(id.clone()),
            version: self.version + 1,
        };
        (next, id)
    }

    /// Rebuild one conversation
    ///
    /// `f` returns `None` when there is nothing to change; the snapshot is
    /// then returned as-is.
    fn map_conversation<F>(&self, id: &ConversationId, f: F) -> Self
    where
        F: FnOnce(&Conversation) -> Option<Conversation>,
    {
        let Some(index) = self.conversations.iter().position(|c| &c.id == id) else {
            tracing::debug!(conversation = %id, "Ignoring transition for unknown conversation");
            return self.clone();
        };

        let Some(updated) = f(&self.conversations[index]) else {
            return self.clone();
        };

        let mut conversations: Vec<Arc<Conversation>> = self.conversations.as_ref().clone();
        conversations[index] = Arc::new(updated);

        Self {
            conversations: Arc::new(conversations),
            selected_id: self.selected_id.clone(),
            version: self.version + 1,
        }
    }
}

// ============================================================================
// Store
// ============================================================================

/// Publishes snapshots to subscribers and serializes all writers
#[derive(Clone, Debug)]
pub struct ConversationStore {
    tx: Arc<watch::Sender<Snapshot>>,
    writer: Arc<Mutex<()>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(Snapshot::empty())
    }
}

impl ConversationStore {
    /// Create a store starting from `initial`
    #[must_use]
    pub fn new(initial: Snapshot) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx: Arc::new(tx),
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// The current snapshot
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    /// Observe published snapshots
    ///
    /// Receivers see the latest snapshot; intermediate ones may be skipped if
    /// the receiver falls behind.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    /// Apply a transition and publish the result
    ///
    /// Subscribers are only notified if the transition changed anything.
    /// Returns the snapshot current after the transition.
    pub fn apply<F>(&self, transition: F) -> Snapshot
    where
        F: FnOnce(&Snapshot) -> Snapshot,
    {
        self.apply_with(|current| (transition(current), ())).0
    }

    /// Apply a transition that also yields a value
    pub fn apply_with<F, R>(&self, transition: F) -> (Snapshot, R)
    where
        F: FnOnce(&Snapshot) -> (Snapshot, R),
    {
        let _writer = self.writer.lock();
        let current = self.tx.borrow().clone();
        let (next, value) = transition(&current);
        if !next.ptr_eq(&current) {
            self.tx.send_replace(next.clone());
        }
        (next, value)
    }
    /// Create a conversation, select it, and return its id
    pub fn create_conversation(&self, name: &str) -> ConversationId {
        self.apply_with(|s| s.create_conversation(name)).1
    }

    /// Select a conversation
    pub fn select(&self, id: &ConversationId) -> Snapshot {
        self.apply(|s| s.select(id))
    }
}
