//! Session Coordinator
//!
//! Binds stream sessions to conversations. Every accepted submission gets
//! its own task that owns one [`StreamSession`] and applies each increment
//! to the conversation the message was submitted to. That id is captured
//! when the task is spawned, so switching the selected conversation never
//! redirects a reply.
//!
//! # Submission Flow
//!
//! ```text
//! submit(C, text)
//!   ├─ reject: blank, too long, unknown C, reply already streaming into C
//!   ├─ store: append user message + open placeholder (one transition)
//!   └─ spawn ──► for each Token:  append_to_open_placeholder(C)
//!                on Error:        finalize_with_error(C, notice)
//!                on end:          finalize_placeholder(C)
//! ```
//!
//! At most one session is active per conversation. Sessions for different
//! conversations run concurrently and only ever touch their own conversation.
//! The active-session table is locked around every store write a session
//! makes, so a cancelled session can never write into a placeholder that a
//! later submission opened.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::{AbortHandle, JoinHandle};

use crate::backend::{ChatRequest, ChatTransport};
use crate::config::ClientConfig;
use crate::conversation::ConversationId;
use crate::events::UiEvent;
use crate::store::{ConversationStore, Snapshot};
use crate::streaming::{StreamSession, StreamingToken};

// ============================================================================
// Errors and Outcomes
// ============================================================================

/// Why a submission was rejected
///
/// A rejected submission leaves the store untouched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// Text was empty after trimming
    #[error("Message is empty")]
    EmptyMessage,

    /// Text exceeds the configured limit
    #[error("Message is {length} characters, limit is {limit}")]
    MessageTooLong {
        /// Length of the submitted text in characters
        length: usize,
        /// Configured maximum
        limit: usize,
    },

    /// No conversation with this id exists
    #[error("Unknown conversation: {0}")]
    UnknownConversation(ConversationId),

    /// A reply is still streaming into this conversation
    #[error("A reply is already streaming into conversation {0}")]
    StreamInFlight(ConversationId),
}

/// How a session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Body ended normally; the placeholder kept the streamed content
    Completed {
        /// Number of increments applied
        increments: u32,
    },
    /// The exchange failed; the placeholder holds the error notice
    Failed,
    /// The session was cancelled before it finished
    Cancelled,
}

/// Handle to a running session
#[derive(Debug)]
pub struct SessionHandle {
    conversation_id: ConversationId,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    /// Conversation this session writes to
    #[must_use]
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Whether the session task has ended
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to end
    pub async fn wait(self) -> SessionOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => SessionOutcome::Cancelled,
            Err(e) => {
                tracing::error!(conversation = %self.conversation_id, error = %e, "Session task panicked");
                SessionOutcome::Failed
            }
        }
    }
}

/// Result of [`SessionCoordinator::handle_event`]
#[derive(Debug)]
pub enum EventOutcome {
    /// A session was started
    Submitted(SessionHandle),
    /// The submission was rejected
    Rejected(SubmitError),
    /// Selection handled
    Selected {
        /// Whether the selection actually changed
        changed: bool,
    },
    /// A conversation was created and selected
    Created(ConversationId),
}

// ============================================================================
// Coordinator
// ============================================================================

struct ActiveSession {
    session_id: u64,
    abort: AbortHandle,
}

struct Inner {
    store: ConversationStore,
    transport: Arc<dyn ChatTransport>,
    active: Mutex<HashMap<ConversationId, ActiveSession>>,
    next_session_id: AtomicU64,
    max_message_length: usize,
}

/// Routes user input to stream sessions and session output to the store
///
/// Cheap to clone; clones share the same store and session table.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("transport", &self.inner.transport.name())
            .field("active_sessions", &self.active_sessions())
            .finish_non_exhaustive()
    }
}

impl SessionCoordinator {
    /// Create a coordinator over `store` using `transport` for every exchange
    pub fn new(store: ConversationStore, transport: Arc<dyn ChatTransport>) -> Self {
        Self::with_config(store, transport, &ClientConfig::default())
    }

    /// Create a coordinator with client settings
    pub fn with_config(
        store: ConversationStore,
        transport: Arc<dyn ChatTransport>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                transport,
                active: Mutex::new(HashMap::new()),
                next_session_id: AtomicU64::new(1),
                max_message_length: config.max_message_length,
            }),
        }
    }

    /// The store this coordinator writes to
    #[must_use]
    pub fn store(&self) -> &ConversationStore {
        &self.inner.store
    }

    /// Current snapshot of the store
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.inner.store.snapshot()
    }

    /// Whether a reply is streaming into `conversation_id`
    #[must_use]
    pub fn is_streaming(&self, conversation_id: &ConversationId) -> bool {
        self.inner.active.lock().contains_key(conversation_id)
    }

    /// Number of sessions currently running
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.inner.active.lock().len()
    }

    /// Dispatch a UI event
    ///
    /// Must be called from within a Tokio runtime.
    pub fn handle_event(&self, event: UiEvent) -> EventOutcome {
        match event {
            UiEvent::SubmitMessage {
                conversation_id,
                content,
            } => match self.submit(&conversation_id, &content) {
                Ok(handle) => EventOutcome::Submitted(handle),
                Err(e) => EventOutcome::Rejected(e),
            },

            UiEvent::SelectConversation { conversation_id } => {
                let before = self.inner.store.snapshot();
                let after = self.inner.store.select(&conversation_id);
                EventOutcome::Selected {
                    changed: !after.ptr_eq(&before),
                }
            }

            UiEvent::NewConversation { name } => {
                let id = self.inner.store.create_conversation(&name);
                tracing::info!(conversation = %id, name = %name, "Created conversation");
                EventOutcome::Created(id)
            }
        }
    }

    /// Submit `text` to `conversation_id` and start streaming the reply
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmitError`] if the text is blank or too long, the
    /// conversation does not exist, or a reply is already streaming into it.
    pub fn submit(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<SessionHandle, SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyMessage);
        }
        let length = text.chars().count();
        if length > self.inner.max_message_length {
            return Err(SubmitError::MessageTooLong {
                length,
                limit: self.inner.max_message_length,
            });
        }

        let mut active = self.inner.active.lock();
        if active.contains_key(conversation_id) {
            tracing::warn!(conversation = %conversation_id, "Rejecting submission while a reply is streaming");
            return Err(SubmitError::StreamInFlight(conversation_id.clone()));
        }

        let (_, accepted) = self.inner.store.apply_with(|s| {
            if !s.contains(conversation_id) {
                return (
                    s.clone(),
                    Err(SubmitError::UnknownConversation(conversation_id.clone())),
                );
            }
            if s.has_open_placeholder(conversation_id) {
                return (
                    s.clone(),
                    Err(SubmitError::StreamInFlight(conversation_id.clone())),
                );
            }
            let next = s
                .append_user_message(conversation_id, text)
                .open_assistant_placeholder(conversation_id);
            (next, Ok(()))
        });
        if let Err(e) = accepted {
            tracing::warn!(conversation = %conversation_id, error = %e, "Rejecting submission");
            return Err(e);
        }

        let session_id = self.inner.next_session_id.fetch_add(1, Ordering::Relaxed);
        let session = StreamSession::open(
            Arc::clone(&self.inner.transport),
            ChatRequest::new(text),
        );
        let task = tokio::spawn(Arc::clone(&self.inner).drive(
            conversation_id.clone(),
            session_id,
            session,
        ));

        active.insert(
            conversation_id.clone(),
            ActiveSession {
                session_id,
                abort: task.abort_handle(),
            },
        );
        drop(active);

        tracing::info!(
            conversation = %conversation_id,
            session = session_id,
            chars = length,
            "Started stream session"
        );

        Ok(SessionHandle {
            conversation_id: conversation_id.clone(),
            task,
        })
    }

    /// Abandon the reply streaming into `conversation_id`
    ///
    /// The transport is released and the placeholder is finalized with
    /// whatever content already arrived. Returns `false` if nothing was
    /// streaming.
    pub fn cancel(&self, conversation_id: &ConversationId) -> bool {
        let mut active = self.inner.active.lock();
        let Some(entry) = active.remove(conversation_id) else {
            return false;
        };
        entry.abort.abort();
        self.inner
            .store
            .apply(|s| s.finalize_placeholder(conversation_id));
        drop(active);

        tracing::info!(
            conversation = %conversation_id,
            session = entry.session_id,
            "Cancelled stream session"
        );
        true
    }
}

impl Inner {
    /// Session task body
    async fn drive(
        self: Arc<Self>,
        conversation_id: ConversationId,
        session_id: u64,
        mut session: StreamSession,
    ) -> SessionOutcome {
        let mut increments: u32 = 0;

        let outcome = loop {
            match session.next().await {
                Some(StreamingToken::Token(delta)) => {
                    let applied = self.apply_if_current(&conversation_id, session_id, false, |s| {
                        s.append_to_open_placeholder(&conversation_id, &delta)
                    });
                    if !applied {
                        break SessionOutcome::Cancelled;
                    }
                    increments += 1;
                }
                Some(StreamingToken::Error(notice)) => {
                    let applied = self.apply_if_current(&conversation_id, session_id, true, |s| {
                        s.finalize_with_error(&conversation_id, &notice)
                    });
                    break if applied {
                        SessionOutcome::Failed
                    } else {
                        SessionOutcome::Cancelled
                    };
                }
                None => {
                    let applied = self.apply_if_current(&conversation_id, session_id, true, |s| {
                        s.finalize_placeholder(&conversation_id)
                    });
                    break if applied {
                        SessionOutcome::Completed { increments }
                    } else {
                        SessionOutcome::Cancelled
                    };
                }
            }
        };

        drop(session);
        tracing::info!(
            conversation = %conversation_id,
            session = session_id,
            outcome = ?outcome,
            "Stream session finished"
        );
        outcome
    }

    /// Apply a transition on behalf of a session that still owns its slot
    ///
    /// With `release`, the slot is freed in the same critical section.
    /// Returns `false` if the session was cancelled.
    fn apply_if_current<F>(
        &self,
        conversation_id: &ConversationId,
        session_id: u64,
        release: bool,
        transition: F,
    ) -> bool
    where
        F: FnOnce(&Snapshot) -> Snapshot,
    {
        let mut active = self.active.lock();
        if active.get(conversation_id).map(|a| a.session_id) != Some(session_id) {
            return false;
        }
        self.store.apply(transition);
        if release {
            active.remove(conversation_id);
        }
        true
    }
}
