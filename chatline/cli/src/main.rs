//! Chatline - Headless Streaming Chat Client
//!
//! A line-oriented front end for `chatline-core`: stdin lines become UI
//! events, and every published snapshot is rendered to stdout. Logs go to
//! stderr so stdout stays a clean transcript.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (demo conversations, default endpoint)
//! chatline
//!
//! # Custom endpoint, no demo data
//! chatline --endpoint http://localhost:8080/api/v1/chat --no-seed
//!
//! # With config file
//! chatline --config ~/.config/chatline/chatline.toml
//!
//! # Verbose logging
//! RUST_LOG=debug chatline
//! ```
//!
//! Piped input is supported: at end of input the client waits for replies
//! still streaming, prints them, and exits.

mod commands;
mod render;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chatline_core::config::{load_config, load_config_from_path};
use chatline_core::{
    ChatlineConfig, ConfigOverrides, ConversationStore, EventOutcome, HttpTransport,
    SessionCoordinator, SessionHandle, Snapshot, UiEvent,
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use commands::Command;
use render::Renderer;

/// Chatline - streaming chat client
#[derive(Parser, Debug)]
#[command(name = "chatline")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Chat service endpoint URL
    #[arg(short = 'e', long, value_name = "URL")]
    endpoint: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "CHATLINE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Start without the demo conversations
    #[arg(long)]
    no_seed: bool,

    /// Connection timeout in milliseconds
    #[arg(long, value_name = "MS")]
    connect_timeout_ms: Option<u64>,

    /// Whole-request timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    request_timeout_secs: Option<u64>,

    /// Longest message accepted, in characters
    #[arg(long, value_name = "CHARS")]
    max_message_length: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "CHATLINE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref endpoint) = self.endpoint {
            overrides = overrides.with_endpoint(endpoint.clone());
        }
        if let Some(ms) = self.connect_timeout_ms {
            overrides = overrides.with_connect_timeout_ms(ms);
        }
        if let Some(secs) = self.request_timeout_secs {
            overrides = overrides.with_request_timeout_secs(secs);
        }
        if let Some(length) = self.max_message_length {
            overrides = overrides.with_max_message_length(length);
        }
        if self.no_seed {
            overrides = overrides.with_seed_conversations(false);
        }
        overrides
    }
}

/// Initialize logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("chatline_cli={level},chatline_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(())
}

/// Resolve configuration: CLI > environment > file > defaults
fn load_configuration(args: &Args) -> Result<ChatlineConfig> {
    let loaded = match args.config {
        Some(ref path) => {
            anyhow::ensure!(path.exists(), "Config file not found: {}", path.display());
            load_config_from_path(Some(path.clone()))
        }
        None => load_config(),
    };

    let mut config = loaded.context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        source = %config.source(),
        endpoint = %config.transport.endpoint,
        "Configuration loaded"
    );
    Ok(config)
}

/// Single writer for stdout: snapshot renders and command output
async fn run_output(mut updates: watch::Receiver<Snapshot>, mut notes: mpsc::Receiver<Vec<String>>) {
    let mut renderer = Renderer::default();
    let mut stdout = tokio::io::stdout();

    let initial = updates.borrow_and_update().clone();
    write_lines(&mut stdout, renderer.render(&initial)).await;

    loop {
        let lines = tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                renderer.render(&snapshot)
            }
            note = notes.recv() => match note {
                Some(lines) => lines,
                None => break,
            },
        };
        write_lines(&mut stdout, lines).await;
    }

    // Drain whatever was published before the senders went away
    let last = updates.borrow().clone();
    write_lines(&mut stdout, renderer.render(&last)).await;
}

async fn write_lines(stdout: &mut tokio::io::Stdout, lines: Vec<String>) {
    if lines.is_empty() {
        return;
    }
    let mut text = lines.join("\n");
    text.push('\n');
    if let Err(e) = stdout.write_all(text.as_bytes()).await {
        debug!(error = %e, "Failed to write to stdout");
    }
    let _ = stdout.flush().await;
}

/// What the input loop should do next
enum Flow {
    Continue,
    Quit,
}

/// Apply one parsed command
async fn dispatch(
    coordinator: &SessionCoordinator,
    command: Command,
    pending: &mut Vec<SessionHandle>,
    notes: &mpsc::Sender<Vec<String>>,
) -> Flow {
    let note = match command {
        Command::Say(text) => {
            let Some(id) = coordinator.snapshot().selected_id().cloned() else {
                let _ = notes
                    .send(vec!["! No conversation selected; use /new".to_string()])
                    .await;
                return Flow::Continue;
            };
            match coordinator.handle_event(UiEvent::SubmitMessage {
                conversation_id: id,
                content: text,
            }) {
                EventOutcome::Submitted(handle) => {
                    pending.retain(|h| !h.is_finished());
                    pending.push(handle);
                    None
                }
                EventOutcome::Rejected(e) => Some(format!("! {e}")),
                _ => None,
            }
        }
        Command::New(name) => {
            coordinator.handle_event(UiEvent::NewConversation { name });
            None
        }
        Command::Select(id) => match coordinator.handle_event(UiEvent::SelectConversation {
            conversation_id: id.clone(),
        }) {
            EventOutcome::Selected { changed: false } if !coordinator.snapshot().contains(&id) => {
                Some(format!("! Unknown conversation: {id}"))
            }
            _ => None,
        },
        Command::List => {
            let lines = render::format_list(&coordinator.snapshot(), |id| coordinator.is_streaming(id));
            let _ = notes.send(lines).await;
            None
        }
        Command::Cancel => {
            let snapshot = coordinator.snapshot();
            match snapshot.selected_id() {
                Some(id) if coordinator.cancel(id) => None,
                _ => Some("! Nothing to cancel".to_string()),
            }
        }
        Command::Help => {
            let _ = notes
                .send(commands::HELP.lines().map(str::to_string).collect())
                .await;
            None
        }
        Command::Invalid(message) => Some(format!("! {message}")),
        Command::Quit => return Flow::Quit,
    };

    if let Some(note) = note {
        let _ = notes.send(vec![note]).await;
    }
    Flow::Continue
}

/// Abandon every reply still streaming
fn cancel_all(coordinator: &SessionCoordinator) {
    let snapshot = coordinator.snapshot();
    for conversation in snapshot.conversations() {
        coordinator.cancel(&conversation.id);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging first
    init_logging(&args.log_level)?;

    let config = load_configuration(&args)?;

    let initial = if config.client.seed_conversations {
        Snapshot::seeded()
    } else {
        Snapshot::empty()
    };
    let store = ConversationStore::new(initial);
    let transport =
        Arc::new(HttpTransport::from_config(&config.transport).context("Failed to create transport")?);
    let coordinator = SessionCoordinator::with_config(store.clone(), transport, &config.client);

    let (notes_tx, notes_rx) = mpsc::channel(16);
    let output = tokio::spawn(run_output(store.subscribe(), notes_rx));

    info!("Chatline ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Vec<SessionHandle> = Vec::new();
    let mut interrupted = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    debug!("End of input");
                    break;
                };
                let Some(command) = commands::parse(&line) else {
                    continue;
                };
                if let Flow::Quit = dispatch(&coordinator, command, &mut pending, &notes_tx).await {
                    interrupted = true;
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received interrupt, shutting down");
                interrupted = true;
                break;
            }
        }
    }

    if interrupted {
        cancel_all(&coordinator);
    }
    for handle in pending {
        let conversation_id = handle.conversation_id().clone();
        let mut wait = std::pin::pin!(handle.wait());
        let outcome = tokio::select! {
            outcome = &mut wait => outcome,
            _ = tokio::signal::ctrl_c() => {
                info!("Received interrupt, cancelling replies");
                cancel_all(&coordinator);
                wait.await
            }
        };
        debug!(conversation = %conversation_id, ?outcome, "Session ended");
    }

    drop(coordinator);
    drop(store);
    drop(notes_tx);
    if tokio::time::timeout(Duration::from_secs(2), output).await.is_err() {
        debug!("Output task did not finish in time");
    }

    info!("Chatline stopped");
    Ok(())
}
