//! Stream Session
//!
//! Drives one request/response exchange and exposes it as a lazy
//! [`Stream`] of [`StreamingToken`]s.
//!
//! Nothing happens until the session is polled: the first poll opens the
//! exchange, and every later poll either hands out a frame the decoder
//! already produced or awaits the next body chunk. The body is owned by the
//! session itself, so dropping the session drops the connection with it.
//!
//! Every failure (connect, non-success status, broken body) ends the session
//! with exactly one [`StreamingToken::Error`] carrying
//! [`CONNECTION_ERROR_NOTICE`].

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};

use super::frame::FrameDecoder;
use crate::backend::{ByteStream, ChatRequest, ChatTransport, TransportError};

/// Text shown in place of a reply when the exchange fails
pub const CONNECTION_ERROR_NOTICE: &str = "Sorry, I am having trouble connecting to the server.";

/// Events produced by a stream session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamingToken {
    /// A text increment from one `data: ` frame
    Token(String),
    /// The exchange failed; always the last item
    Error(String),
}

#[derive(Clone, Debug, Default)]
struct SessionStats {
    chunks_received: u32,
    tokens_emitted: u32,
    started_at: Option<Instant>,
}

enum Phase {
    /// Not yet sent
    Connecting {
        transport: Arc<dyn ChatTransport>,
        request: ChatRequest,
    },
    /// Reading the response body
    Receiving(ByteStream),
    /// Body done or failed; only queued frames remain
    Finished,
}

struct SessionState {
    phase: Phase,
    decoder: FrameDecoder,
    ready: VecDeque<String>,
    transport_name: String,
    stats: SessionStats,
}

impl SessionState {
    fn fail(&mut self, error: &TransportError) -> StreamingToken {
        // Log the real cause; the conversation only ever shows the notice
        tracing::warn!(
            transport = %self.transport_name,
            error = %error,
            tokens = self.stats.tokens_emitted,
            "Chat exchange failed"
        );
        self.ready.clear();
        self.phase = Phase::Finished;
        StreamingToken::Error(CONNECTION_ERROR_NOTICE.to_string())
    }

    fn finish(&mut self) {
        self.ready.extend(self.decoder.flush());
        let elapsed_ms = self
            .stats
            .started_at
            .map(|t| u64::try_from(t.elapsed().as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        tracing::debug!(
            transport = %self.transport_name,
            chunks = self.stats.chunks_received,
            frames = self.decoder.frames_emitted(),
            discarded = self.decoder.lines_discarded(),
            elapsed_ms,
            "Response body complete"
        );
    }

    /// Produce the next item, suspending only on the transport
    async fn next_token(&mut self) -> Option<StreamingToken> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                self.stats.tokens_emitted += 1;
                return Some(StreamingToken::Token(frame));
            }

            match std::mem::replace(&mut self.phase, Phase::Finished) {
                Phase::Connecting { transport, request } => {
                    self.stats.started_at = Some(Instant::now());
                    match transport.open(&request).await {
                        Ok(body) => self.phase = Phase::Receiving(body),
                        Err(e) => return Some(self.fail(&e)),
                    }
                }
                Phase::Receiving(mut body) => match body.next().await {
                    Some(Ok(chunk)) => {
                        self.stats.chunks_received += 1;
                        let frames = self.decoder.feed_bytes(&chunk);
                        if !frames.is_empty() {
                            tracing::trace!(count = frames.len(), "Decoded frames");
                        }
                        self.ready.extend(frames);
                        self.phase = Phase::Receiving(body);
                    }
                    Some(Err(e)) => return Some(self.fail(&e)),
                    None => self.finish(),
                },
                Phase::Finished => return None,
            }
        }
    }
}

/// Lazy sequence of text increments for one exchange
///
/// Created with [`StreamSession::open`]; yields `Token`s in arrival order,
/// then ends, or ends with a single `Error`.
pub struct StreamSession {
    inner: BoxStream<'static, StreamingToken>,
}

impl StreamSession {
    /// Prepare an exchange; nothing is sent until the session is first polled
    #[must_use]
    pub fn open(transport: Arc<dyn ChatTransport>, request: ChatRequest) -> Self {
        let state = SessionState {
            transport_name: transport.name().to_string(),
            phase: Phase::Connecting { transport, request },
            decoder: FrameDecoder::new(),
            ready: VecDeque::new(),
            stats: SessionStats::default(),
        };

        let inner = stream::unfold(state, |mut state| async move {
            let token = state.next_token().await?;
            Some((token, state))
        })
        .boxed();

        Self { inner }
    }
}

impl Stream for StreamSession {
    type Item = StreamingToken;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession").finish_non_exhaustive()
    }
}
