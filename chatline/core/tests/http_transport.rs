//! End-to-end tests for the HTTP transport
//!
//! Each test starts a throwaway HTTP/1.1 server on a loopback port, points an
//! [`HttpTransport`] at it, and checks what reaches the conversation store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chatline_core::{
    ChatRequest, ChatTransport, ConversationId, ConversationStore, HttpTransport, MessageRole,
    SessionCoordinator, SessionOutcome, Snapshot, StreamSession, StreamingToken, TransportError,
    CONNECTION_ERROR_NOTICE,
};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

// ============================================================================
// Test Server
// ============================================================================

/// What the server writes after reading the request
enum Reply {
    /// Written in one go, then the connection is closed
    Whole(&'static str),
    /// Head, then each body chunk with a pause in between
    Chunked(&'static [&'static str]),
}

/// Accept one connection, answer it, and return the raw request
async fn serve_once(reply: Reply) -> Result<(String, JoinHandle<Result<String>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let endpoint = format!("http://{}/chat-api-svc/api/v1/chat", listener.local_addr()?);

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await?;
        let request = read_request(&mut socket).await?;

        match reply {
            Reply::Whole(response) => socket.write_all(response.as_bytes()).await?,
            Reply::Chunked(chunks) => {
                socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\n\
                          Content-Type: text/event-stream\r\n\
                          Transfer-Encoding: chunked\r\n\r\n",
                    )
                    .await?;
                for chunk in chunks {
                    let frame = format!("{:x}\r\n{chunk}\r\n", chunk.len());
                    socket.write_all(frame.as_bytes()).await?;
                    socket.flush().await?;
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                socket.write_all(b"0\r\n\r\n").await?;
            }
        }
        socket.shutdown().await.ok();
        Ok::<_, anyhow::Error>(request)
    });

    Ok((endpoint, server))
}

/// Read request head plus a `Content-Length` body
async fn read_request(socket: &mut TcpStream) -> Result<String> {
    let mut buf = Vec::new();
    let mut scratch = [0u8; 1024];

    loop {
        let n = socket.read(&mut scratch).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&scratch[..n]);

        if let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse::<usize>())
                .transpose()
                .context("bad content-length")?
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + length {
                break;
            }
        }
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn coordinator_for(endpoint: &str) -> Result<(SessionCoordinator, ConversationStore)> {
    let store = ConversationStore::new(Snapshot::seeded());
    let transport = Arc::new(HttpTransport::new(endpoint)?);
    Ok((SessionCoordinator::new(store.clone(), transport), store))
}

fn tail(store: &ConversationStore, id: &ConversationId) -> Vec<(MessageRole, String)> {
    let snapshot = store.snapshot();
    let messages = &snapshot.conversation(id).expect("conversation").messages;
    messages[messages.len() - 2..]
        .iter()
        .map(|m| (m.role, m.content.clone()))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_streamed_reply_lands_in_conversation() -> Result<()> {
    let (endpoint, server) = serve_once(Reply::Whole(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/event-stream\r\n\
         Connection: close\r\n\r\n\
         data: Hi\n\
         data:  there\n",
    ))
    .await?;
    let (coordinator, store) = coordinator_for(&endpoint)?;
    let id: ConversationId = "1".into();

    let outcome = coordinator.submit(&id, "Hello")?.wait().await;
    assert_eq!(outcome, SessionOutcome::Completed { increments: 2 });
    assert_eq!(
        tail(&store, &id),
        vec![
            (MessageRole::User, "Hello".to_string()),
            (MessageRole::Assistant, "Hi there".to_string()),
        ]
    );

    let request = server.await??;
    assert!(request.starts_with("POST /chat-api-svc/api/v1/chat HTTP/1.1"));
    assert!(request
        .to_ascii_lowercase()
        .contains("content-type: application/json"));
    assert!(request.ends_with(r#"{"message":"Hello"}"#));
    Ok(())
}

#[tokio::test]
async fn test_chunked_body_is_reassembled() -> Result<()> {
    let (endpoint, server) =
        serve_once(Reply::Chunked(&["data: He", "llo\nda", "ta: World\n", "data: !"])).await?;
    let transport: Arc<dyn ChatTransport> = Arc::new(HttpTransport::new(&endpoint)?);

    let tokens: Vec<_> = StreamSession::open(transport, ChatRequest::new("Hi"))
        .collect()
        .await;
    assert_eq!(
        tokens,
        vec![
            StreamingToken::Token("Hello".into()),
            StreamingToken::Token("World".into()),
            StreamingToken::Token("!".into()),
        ]
    );

    server.await??;
    Ok(())
}

#[tokio::test]
async fn test_server_error_becomes_notice() -> Result<()> {
    let (endpoint, server) = serve_once(Reply::Whole(
        "HTTP/1.1 500 Internal Server Error\r\n\
         Content-Length: 4\r\n\
         Connection: close\r\n\r\n\
         oops",
    ))
    .await?;
    let (coordinator, store) = coordinator_for(&endpoint)?;
    let id: ConversationId = "1".into();

    let outcome = coordinator.submit(&id, "Hello")?.wait().await;
    assert_eq!(outcome, SessionOutcome::Failed);
    assert_eq!(
        tail(&store, &id),
        vec![
            (MessageRole::User, "Hello".to_string()),
            (MessageRole::Assistant, CONNECTION_ERROR_NOTICE.to_string()),
        ]
    );

    // Input stays usable
    assert!(!coordinator.is_streaming(&id));
    server.await??;
    Ok(())
}

#[tokio::test]
async fn test_status_error_from_transport() -> Result<()> {
    let (endpoint, server) = serve_once(Reply::Whole(
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    ))
    .await?;
    let transport = HttpTransport::new(&endpoint)?;

    let result = transport.open(&ChatRequest::new("Hello")).await;
    assert!(matches!(result, Err(TransportError::Status { status: 404 })));

    server.await??;
    Ok(())
}

#[tokio::test]
async fn test_connection_refused_becomes_notice() -> Result<()> {
    // Reserve a port, then free it so nothing is listening
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let endpoint = format!("http://{}/chat", listener.local_addr()?);
    drop(listener);

    let transport = HttpTransport::new(&endpoint)?;
    let result = transport.open(&ChatRequest::new("Hello")).await;
    assert!(matches!(result, Err(TransportError::Connect { .. })));

    let (coordinator, store) = coordinator_for(&endpoint)?;
    let id: ConversationId = "2".into();
    let outcome = coordinator.submit(&id, "Why?")?.wait().await;

    assert_eq!(outcome, SessionOutcome::Failed);
    assert_eq!(
        tail(&store, &id),
        vec![
            (MessageRole::User, "Why?".to_string()),
            (MessageRole::Assistant, CONNECTION_ERROR_NOTICE.to_string()),
        ]
    );
    Ok(())
}
