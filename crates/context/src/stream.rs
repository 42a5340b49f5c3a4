//! Chunk stream for a synthesized answer
//!
//! Replays an [`AskSession`] as paced chunks: every token after one latency
//! interval, one more interval before the sources, then a closing `final`
//! chunk. The stream is a small state machine; `cancel()` moves it to
//! `Cancelled` and nothing is yielded afterwards.

use crate::session::AskSession;
use futures::stream::{FusedStream, Stream};
use paperdesk_common::db::models::Citation;
use paperdesk_common::metrics;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;
use tokio::time::Sleep;
use tracing::debug;

/// Payload of the `sources` chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePayload {
    pub citations: Vec<Citation>,
}

/// Payload of the `error` chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// One unit handed to the stream consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StreamChunk {
    Token(String),
    Sources(SourcePayload),
    Final(String),
    /// Reserved for failures; the mock pipeline never produces it
    Error(ErrorPayload),
}

impl StreamChunk {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamChunk::Token(_) => "token",
            StreamChunk::Sources(_) => "sources",
            StreamChunk::Final(_) => "final",
            StreamChunk::Error(_) => "error",
        }
    }
}

/// Lifecycle of a chunk stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Synthesized,
    StreamingTokens,
    EmittingSources,
    Final,
    Done,
    Cancelled,
}

impl StreamState {
    pub fn is_finished(&self) -> bool {
        matches!(self, StreamState::Done | StreamState::Cancelled)
    }
}

/// Whitespace as the UI's regex engine defines `\s`: Unicode White_Space
/// without U+0085, plus U+FEFF.
fn is_separator(ch: char) -> bool {
    ch == '\u{feff}' || (ch != '\u{0085}' && ch.is_whitespace())
}

/// Split text into alternating whitespace and non-whitespace runs.
///
/// Concatenating the result reproduces the input exactly.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (index, ch) in text.char_indices() {
        let space = is_separator(ch);
        match in_space {
            Some(current) if current != space => {
                tokens.push(text[start..index].to_string());
                start = index;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if start < text.len() {
        tokens.push(text[start..].to_string());
    }
    tokens
}

pub struct ChunkStream {
    state: StreamState,
    tokens: VecDeque<String>,
    citations: Vec<Citation>,
    latency: Duration,
    delay: Option<Pin<Box<Sleep>>>,
}

impl ChunkStream {
    pub fn new(session: AskSession, latency: Duration) -> Self {
        let tokens: VecDeque<String> = tokenize(&session.final_answer).into();
        debug!(
            tokens = tokens.len(),
            citations = session.citations.len(),
            latency_ms = latency.as_millis() as u64,
            "Chunk stream created"
        );
        Self {
            state: StreamState::Synthesized,
            tokens,
            citations: session.citations,
            latency,
            delay: None,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Token chunks not yet yielded
    pub fn remaining_tokens(&self) -> usize {
        self.tokens.len()
    }

    /// Stop the stream; any armed delay is dropped.
    ///
    /// Has no effect once the stream has finished.
    pub fn cancel(&mut self) {
        if self.state.is_finished() {
            return;
        }
        debug!(state = ?self.state, remaining = self.tokens.len(), "Chunk stream cancelled");
        self.state = StreamState::Cancelled;
        self.delay = None;
        self.tokens.clear();
        self.citations.clear();
        metrics::record_stream_cancelled();
    }

    fn poll_delay(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.latency.is_zero() {
            return Poll::Ready(());
        }
        let latency = self.latency;
        let delay = self
            .delay
            .get_or_insert_with(|| Box::pin(tokio::time::sleep(latency)));
        ready!(delay.as_mut().poll(cx));
        self.delay = None;
        Poll::Ready(())
    }

    fn emit(&self, chunk: StreamChunk) -> Poll<Option<StreamChunk>> {
        metrics::record_chunk(chunk.kind());
        Poll::Ready(Some(chunk))
    }
}

impl Stream for ChunkStream {
    type Item = StreamChunk;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.state {
                StreamState::Synthesized => this.state = StreamState::StreamingTokens,
                StreamState::StreamingTokens => {
                    if this.tokens.is_empty() {
                        this.state = StreamState::EmittingSources;
                        continue;
                    }
                    ready!(this.poll_delay(cx));
                    if let Some(token) = this.tokens.pop_front() {
                        return this.emit(StreamChunk::Token(token));
                    }
                }
                StreamState::EmittingSources => {
                    ready!(this.poll_delay(cx));
                    this.state = StreamState::Final;
                    let citations = std::mem::take(&mut this.citations);
                    return this.emit(StreamChunk::Sources(SourcePayload { citations }));
                }
                StreamState::Final => {
                    this.state = StreamState::Done;
                    return this.emit(StreamChunk::Final(String::new()));
                }
                StreamState::Done | StreamState::Cancelled => return Poll::Ready(None),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let tail = match self.state {
            StreamState::Synthesized | StreamState::StreamingTokens | StreamState::EmittingSources => 2,
            StreamState::Final => 1,
            StreamState::Done | StreamState::Cancelled => 0,
        };
        let remaining = self.tokens.len() + tail;
        (remaining, Some(remaining))
    }
}

impl FusedStream for ChunkStream {
    fn is_terminated(&self) -> bool {
        self.state.is_finished()
    }
}

impl std::fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("state", &self.state)
            .field("remaining_tokens", &self.tokens.len())
            .field("latency", &self.latency)
            .finish()
    }
}
