//! Stdin command parsing
//!
//! ```text
//! /new [NAME]   create a conversation and switch to it
//! /select ID    switch conversations
//! /list         show conversations
//! /cancel       stop the reply streaming into the current conversation
//! /quit         exit
//! anything else is sent as a message
//! ```

use chatline_core::ConversationId;

/// Name used by `/new` without an argument
pub const DEFAULT_CONVERSATION_NAME: &str = "New Chat";

/// One parsed input line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Create and select a conversation
    New(String),
    /// Select a conversation
    Select(ConversationId),
    /// List conversations
    List,
    /// Cancel the current reply
    Cancel,
    /// Exit
    Quit,
    /// Print usage
    Help,
    /// Send a message to the selected conversation
    Say(String),
    /// Unrecognized or malformed command
    Invalid(String),
}

/// Parse one line of input
///
/// Returns `None` for blank lines.
pub fn parse(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Some(rest) = trimmed.strip_prefix('/') else {
        return Some(Command::Say(line.trim_end_matches(['\r', '\n']).to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "new" if arg.is_empty() => Command::New(DEFAULT_CONVERSATION_NAME.to_string()),
        "new" => Command::New(arg.to_string()),
        "select" if arg.is_empty() => Command::Invalid("/select needs a conversation id".into()),
        "select" => Command::Select(arg.into()),
        "list" => Command::List,
        "cancel" => Command::Cancel,
        "quit" | "exit" => Command::Quit,
        "help" => Command::Help,
        other => Command::Invalid(format!("Unknown command: /{other}")),
    };
    Some(command)
}

/// Usage text for `/help`
pub const HELP: &str = "\
/new [NAME]   create a conversation and switch to it
/select ID    switch conversations
/list         show conversations
/cancel       stop the current reply
/quit         exit
anything else is sent as a message";
