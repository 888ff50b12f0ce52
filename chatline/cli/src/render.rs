//! Line-oriented snapshot rendering
//!
//! Turns the stream of published snapshots into lines for stdout. Only the
//! selected conversation is shown: switching conversations prints its whole
//! log, and after that each snapshot prints whatever changed at the end of
//! the log (new messages, or the last message re-rendered as it grows).

use std::sync::Arc;

use chatline_core::{ConversationId, Message, MessageRole, Snapshot};

/// Tracks what has been printed so far
#[derive(Debug, Default)]
pub struct Renderer {
    selected: Option<ConversationId>,
    printed: usize,
    last: Option<Arc<Message>>,
}

impl Renderer {
    /// Lines to print for `snapshot`
    pub fn render(&mut self, snapshot: &Snapshot) -> Vec<String> {
        let mut lines = Vec::new();
        let selected = snapshot.selected();

        if selected.map(|c| &c.id) != self.selected.as_ref() {
            self.selected = selected.map(|c| c.id.clone());
            self.printed = 0;
            self.last = None;
            match selected {
                Some(conversation) => {
                    lines.push(format!("== {} [{}] ==", conversation.name, conversation.id));
                }
                None => lines.push("== no conversation selected ==".to_string()),
            }
        }

        let messages = snapshot.selected_messages();
        if messages.len() > self.printed {
            // Updates can coalesce: the previous last message may have
            // changed in the same snapshot that appended new ones
            if let (Some(prev), Some(current)) = (
                self.last.as_ref(),
                self.printed.checked_sub(1).map(|i| &messages[i]),
            ) {
                if !Arc::ptr_eq(prev, current) {
                    lines.push(format_message(current));
                }
            }
            lines.extend(messages[self.printed..].iter().map(|m| format_message(m)));
        } else if let Some(last) = messages.last() {
            let unchanged = self.last.as_ref().is_some_and(|prev| Arc::ptr_eq(prev, last));
            if !unchanged {
                lines.push(format_message(last));
            }
        }

        self.printed = messages.len();
        self.last = messages.last().cloned();
        lines
    }
}

/// One message as a single line
pub fn format_message(message: &Message) -> String {
    let role = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
    };
    if message.open {
        format!("{role} …> {}", message.content)
    } else {
        format!("{role}> {}", message.content)
    }
}

/// Conversation list for `/list`
pub fn format_list(snapshot: &Snapshot, streaming: impl Fn(&ConversationId) -> bool) -> Vec<String> {
    let selected = snapshot.selected_id();
    snapshot
        .summaries()
        .into_iter()
        .map(|summary| {
            let marker = if Some(&summary.id) == selected { '*' } else { ' ' };
            let status = if streaming(&summary.id) { " (replying)" } else { "" };
            format!("{marker} [{}] {}{status}", summary.id, summary.name)
        })
        .collect()
}
