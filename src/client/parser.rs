//! Chunk stream parser
//!
//! Reassembles a chunked `data: <json>` event stream into text deltas. Bytes
//! arrive in arbitrary pieces: a read may end mid-line or in the middle of a
//! multi-byte character, so decoding and line splitting are both incremental.
//!
//! A `data:` line whose payload is not valid JSON is held back as a stalled
//! fragment. Continuation lines are joined onto it and the parse retried, so a
//! payload broken across lines still recovers. A fragment that never parses
//! fails the session once [`ParserLimits`] are exceeded.

use crate::core::config::StreamConfig;
use crate::core::constants::sse;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use memchr::{memchr, memchr_iter};
use serde_json::Value;
use std::fmt::Display;
use thiserror::Error;
use tracing::debug;

/// Characters of a stalled fragment quoted in the error message
const FRAGMENT_PREVIEW_CHARS: usize = 120;

/// Unit produced by a parse session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(String),
    Done,
    Error(String),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error(_))
    }
}

/// Receives the events of one parse session
///
/// Exactly one of `on_done` or `on_error` is called, after every `on_delta`.
pub trait StreamHandler {
    fn on_delta(&mut self, text: &str);
    fn on_done(&mut self);
    fn on_error(&mut self, message: &str);
}

impl StreamHandler for Vec<StreamEvent> {
    fn on_delta(&mut self, text: &str) {
        self.push(StreamEvent::Delta(text.to_string()));
    }

    fn on_done(&mut self) {
        self.push(StreamEvent::Done);
    }

    fn on_error(&mut self, message: &str) {
        self.push(StreamEvent::Error(message.to_string()));
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("Malformed stream payload: {0}")]
    Malformed(String),

    #[error("Stream buffer exceeded {0} bytes")]
    Overflow(usize),

    #[error("Stream read failed: {0}")]
    Transport(String),
}

/// Bounds that turn an unparseable stream into a reported error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserLimits {
    pub max_stalled_lines: u32,
    pub max_pending_bytes: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        StreamConfig::default().into()
    }
}

impl From<StreamConfig> for ParserLimits {
    fn from(config: StreamConfig) -> Self {
        Self {
            max_stalled_lines: config.max_stalled_lines,
            max_pending_bytes: config.max_pending_bytes,
        }
    }
}

/// UTF-8 decoder that carries incomplete trailing sequences between reads
///
/// Invalid bytes decode to U+FFFD; an incomplete sequence is held until the
/// next read completes it.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn decode(&mut self, bytes: &[u8], out: &mut String) {
        let joined;
        let mut rest: &[u8] = if self.pending.is_empty() {
            bytes
        } else {
            let mut carried = std::mem::take(&mut self.pending);
            carried.extend_from_slice(bytes);
            joined = carried;
            &joined
        };

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    return;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        None => {
                            self.pending = after.to_vec();
                            return;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                    }
                }
            }
        }
    }

    /// Flush a sequence left incomplete at end of input
    pub fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            self.pending.clear();
            out.push(char::REPLACEMENT_CHARACTER);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Whether the session should keep reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParserState {
    AwaitingLine,
    /// A `data:` line failed to parse; complete lines queue behind it
    Stalled { fragment: String },
    Finished,
}

#[derive(Debug, PartialEq, Eq)]
enum LineOutcome {
    Skip,
    Done,
    Delta(String),
    Unparseable,
}

/// `choices[0].delta.content` when present and non-empty
fn delta_text(payload: &Value) -> Option<&str> {
    payload
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn classify_line(line: &str) -> LineOutcome {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() || line.starts_with(sse::COMMENT_PREFIX) {
        return LineOutcome::Skip;
    }
    let Some(payload) = line.strip_prefix(sse::DATA_PREFIX) else {
        return LineOutcome::Skip;
    };
    let payload = payload.trim();
    if payload == sse::DONE {
        return LineOutcome::Done;
    }
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => match delta_text(&value) {
            Some(text) => LineOutcome::Delta(text.to_string()),
            None => LineOutcome::Skip,
        },
        Err(_) => LineOutcome::Unparseable,
    }
}

/// A line that may belong to a payload split across lines
fn is_continuation(line: &str) -> bool {
    let line = line.strip_suffix('\r').unwrap_or(line);
    !line.trim().is_empty()
        && !line.starts_with(sse::COMMENT_PREFIX)
        && !line.starts_with(sse::DATA_PREFIX)
}

fn preview(text: &str) -> String {
    text.chars().take(FRAGMENT_PREVIEW_CHARS).collect()
}

/// Incremental parser state for one session
#[derive(Debug)]
pub struct ChunkParser {
    decoder: Utf8Decoder,
    buffer: String,
    state: ParserState,
    limits: ParserLimits,
}

impl Default for ChunkParser {
    fn default() -> Self {
        Self::new(ParserLimits::default())
    }
}

impl ChunkParser {
    pub fn new(limits: ParserLimits) -> Self {
        Self {
            decoder: Utf8Decoder::default(),
            buffer: String::new(),
            state: ParserState::AwaitingLine,
            limits,
        }
    }

    pub fn is_stalled(&self) -> bool {
        matches!(self.state, ParserState::Stalled { .. })
    }

    /// Consume one read of raw bytes
    ///
    /// Returns [`Flow::Done`] once the sentinel is seen; later input is
    /// ignored.
    pub fn feed<H: StreamHandler + ?Sized>(
        &mut self,
        bytes: &[u8],
        handler: &mut H,
    ) -> Result<Flow, StreamError> {
        if self.state == ParserState::Finished {
            return Ok(Flow::Done);
        }

        self.decoder.decode(bytes, &mut self.buffer);
        if self.drain_lines(handler)? == Flow::Done {
            self.state = ParserState::Finished;
            self.buffer.clear();
            return Ok(Flow::Done);
        }

        self.check_limits()?;
        Ok(Flow::Continue)
    }

    /// Fail a session that can no longer make progress
    ///
    /// Only buffered content is measured, so the outcome does not depend on
    /// how the input was split into reads.
    fn check_limits(&self) -> Result<(), StreamError> {
        let max_bytes = self.limits.max_pending_bytes;
        match &self.state {
            ParserState::Stalled { fragment } => {
                let queued = memchr_iter(b'\n', self.buffer.as_bytes()).count();
                if queued > self.limits.max_stalled_lines as usize {
                    return Err(StreamError::Malformed(preview(fragment)));
                }
                if fragment.len() + self.buffer.len() > max_bytes {
                    return Err(StreamError::Overflow(max_bytes));
                }
            }
            ParserState::AwaitingLine if self.buffer.len() > max_bytes => {
                return Err(StreamError::Overflow(max_bytes));
            }
            _ => {}
        }
        Ok(())
    }

    /// Process every complete line currently buffered
    fn drain_lines<H: StreamHandler + ?Sized>(
        &mut self,
        handler: &mut H,
    ) -> Result<Flow, StreamError> {
        while let Some(pos) = memchr(b'\n', self.buffer.as_bytes()) {
            let outcome = match &mut self.state {
                ParserState::Stalled { fragment } => {
                    if !is_continuation(&self.buffer[..pos]) {
                        // Held back until more input arrives or the stream ends.
                        break;
                    }
                    let line = &self.buffer[..pos];
                    fragment.push('\n');
                    fragment.push_str(line.strip_suffix('\r').unwrap_or(line));
                    classify_line(fragment)
                }
                _ if pos > self.limits.max_pending_bytes => {
                    return Err(StreamError::Overflow(self.limits.max_pending_bytes));
                }
                _ => classify_line(&self.buffer[..pos]),
            };

            let line: String = self.buffer.drain(..=pos).collect();
            match outcome {
                LineOutcome::Skip => self.state = ParserState::AwaitingLine,
                LineOutcome::Done => return Ok(Flow::Done),
                LineOutcome::Delta(text) => {
                    self.state = ParserState::AwaitingLine;
                    handler.on_delta(&text);
                }
                LineOutcome::Unparseable => {
                    if !self.is_stalled() {
                        let line = line.trim_end_matches('\n');
                        self.state = ParserState::Stalled {
                            fragment: line.strip_suffix('\r').unwrap_or(line).to_string(),
                        };
                    }
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Best-effort pass over residual input once the source is exhausted
    ///
    /// Payloads that still fail to parse are dropped.
    pub fn finish<H: StreamHandler + ?Sized>(&mut self, handler: &mut H) {
        if self.state == ParserState::Finished {
            return;
        }
        self.decoder.finish(&mut self.buffer);

        let mut residual = match std::mem::replace(&mut self.state, ParserState::Finished) {
            ParserState::Stalled { fragment } => {
                let mut text = fragment;
                text.push('\n');
                text
            }
            _ => String::new(),
        };
        residual.push_str(&std::mem::take(&mut self.buffer));

        for raw in residual.split('\n') {
            match classify_line(raw) {
                LineOutcome::Delta(text) => handler.on_delta(&text),
                LineOutcome::Unparseable => {
                    debug!("Dropping unparseable trailing payload: {}", preview(raw));
                }
                LineOutcome::Skip | LineOutcome::Done => {}
            }
        }
    }
}

/// Advance a session by one source item; true once the session has ended
fn step<E, H>(parser: &mut ChunkParser, item: Option<Result<Bytes, E>>, handler: &mut H) -> bool
where
    E: Display,
    H: StreamHandler + ?Sized,
{
    match item {
        Some(Ok(bytes)) => match parser.feed(&bytes, handler) {
            Ok(Flow::Continue) => false,
            Ok(Flow::Done) => {
                handler.on_done();
                true
            }
            Err(err) => {
                handler.on_error(&err.to_string());
                true
            }
        },
        Some(Err(err)) => {
            handler.on_error(&StreamError::Transport(err.to_string()).to_string());
            true
        }
        None => {
            parser.finish(handler);
            handler.on_done();
            true
        }
    }
}

/// Run a parse session over a byte stream
///
/// Reads until the sentinel, the end of the source, or an error.
pub async fn parse<S, E, H>(source: S, limits: ParserLimits, handler: &mut H)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
    H: StreamHandler + ?Sized,
{
    let mut parser = ChunkParser::new(limits);
    futures::pin_mut!(source);
    while !step(&mut parser, source.next().await, handler) {}
}

/// Parse session exposed as a stream of events
pub fn events<S, E>(source: S, limits: ParserLimits) -> impl Stream<Item = StreamEvent>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    async_stream::stream! {
        let mut parser = ChunkParser::new(limits);
        let mut batch: Vec<StreamEvent> = Vec::new();
        futures::pin_mut!(source);
        loop {
            let ended = step(&mut parser, source.next().await, &mut batch);
            for event in batch.drain(..) {
                yield event;
            }
            if ended {
                break;
            }
        }
    }
}
