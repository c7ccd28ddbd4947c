// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! NDJSON streaming loader
//!
//! Each line of the byte stream is one JSON turn record:
//!
//! ```json
//! {"type": "assistant", "timestamp": 1712000000000, "screenshot": "https://...",
//!  "thought": "...", "actions": [{"type": "click", "position": [10, 20]}]}
//! ```
//!
//! Every field is optional. Turn ids and indices are assigned from a counter
//! in arrival order.

use std::path::PathBuf;
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde_json::{Map, Value};
use tr_domain_types::{Action, Screenshot, Turn, TurnKind, TurnsMetadata};

use crate::error::LoadError;
use crate::http::get_checked;
use crate::normalize::normalize_action;
use crate::source::TurnStream;

/// Delay inserted after each streamed turn unless configured otherwise.
pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Delay after each turn read from a complete line; `None` disables it.
    pub pacing: Option<Duration>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            pacing: Some(DEFAULT_PACING),
        }
    }
}

impl StreamOptions {
    pub fn unpaced() -> Self {
        Self { pacing: None }
    }
}

/// Splits a byte stream into lines.
///
/// Bytes after the last `\n` are carried over to the next chunk, so a line
/// (or a multi-byte UTF-8 sequence) split across chunks is decoded whole.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        complete[..last_newline]
            .split(|b| *b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// The unterminated remainder, if it holds anything but whitespace.
    pub fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        (!rest.trim().is_empty()).then_some(rest)
    }
}

/// One NDJSON turn record.
///
/// Fields are read individually: one of an unexpected type falls back to its
/// default instead of discarding the whole record.
#[derive(Debug)]
struct StreamRecord(Map<String, Value>);

impl StreamRecord {
    fn parse(line: &str) -> Result<Self, String> {
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(fields)) => Ok(Self(fields)),
            Ok(other) => Err(format!("expected a JSON object, found {}", json_type(&other))),
            Err(err) => Err(err.to_string()),
        }
    }

    /// `key` if present, non-null and accepted by `extract`.
    fn field<'a, T>(&'a self, key: &str, extract: impl FnOnce(&'a Value) -> Option<T>) -> Option<T> {
        let value = self.0.get(key).filter(|value| !value.is_null())?;
        let typed = extract(value);
        if typed.is_none() {
            tracing::debug!(field = key, value = %value, "ignoring streamed field of unexpected type");
        }
        typed
    }

    fn kind(&self) -> TurnKind {
        self.field("type", Value::as_str).map(turn_kind).unwrap_or_default()
    }

    fn timestamp(&self) -> f64 {
        self.field("timestamp", Value::as_f64).unwrap_or_else(now_millis)
    }

    fn screenshot(&self) -> Option<Screenshot> {
        self.field("screenshot", Value::as_str).map(Screenshot::uri)
    }

    fn thought(&self) -> Option<String> {
        self.field("thought", Value::as_str).map(str::to_string)
    }

    fn actions(&self) -> Vec<Action> {
        self.field("actions", Value::as_array)
            .map(|actions| actions.iter().filter_map(decode_action).collect())
            .unwrap_or_default()
    }

    fn metadata(&self) -> Option<Map<String, Value>> {
        self.field("metadata", Value::as_object).cloned()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Turns NDJSON lines into turns, numbering them in arrival order.
#[derive(Debug, Default)]
pub struct TurnDecoder {
    next_index: u64,
}

impl TurnDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one line. Blank lines yield `None` silently; malformed ones are
    /// logged and yield `None` without consuming an index.
    pub fn decode_line(&mut self, line: &str) -> Option<Turn> {
        if line.trim().is_empty() {
            return None;
        }
        let record = match StreamRecord::parse(line) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(line, error = %err, "Failed to parse turn data");
                return None;
            }
        };

        let index = self.next_index;
        self.next_index += 1;
        Some(Turn {
            kind: record.kind(),
            id: format!("turn_{index}"),
            index,
            timestamp: Some(record.timestamp()),
            screenshot: record.screenshot(),
            thought: record.thought(),
            actions: record.actions(),
            metadata: record.metadata(),
        })
    }
}

fn turn_kind(kind: &str) -> TurnKind {
    match kind {
        "user" => TurnKind::User,
        "system" => TurnKind::System,
        "assistant" => TurnKind::Assistant,
        other => {
            tracing::debug!(kind = other, "unknown turn type, treating as assistant");
            TurnKind::Assistant
        }
    }
}

/// Canonical actions are accepted when they carry the same required content
/// the normalizer demands; anything else goes through the normalizer.
fn decode_action(raw: &Value) -> Option<Action> {
    if let Ok(action) = serde_json::from_value::<Action>(raw.clone()) {
        if has_required_content(&action) {
            return Some(action);
        }
    }
    let action = normalize_action(raw);
    if action.is_none() {
        tracing::warn!(action = %raw, "dropping unrecognized streamed action");
    }
    action
}

fn has_required_content(action: &Action) -> bool {
    match action {
        Action::Type { text, .. } => !text.is_empty(),
        Action::Key { key, .. } => !key.is_empty(),
        Action::Click { .. } | Action::Drag { .. } | Action::Scroll { .. } => true,
    }
}

fn now_millis() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

/// Decode an NDJSON byte stream.
///
/// The pacing delay follows each turn decoded from a complete line; a final
/// unterminated record is yielded without delay. A chunk error ends the
/// stream with that error.
pub fn turns_from_byte_stream<S, B, E>(bytes: S, options: StreamOptions) -> TurnStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<LoadError> + Send + 'static,
{
    let turns = async_stream::try_stream! {
        let mut bytes = Box::pin(bytes);
        let mut lines = LineBuffer::new();
        let mut decoder = TurnDecoder::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(Into::<LoadError>::into)?;
            for line in lines.push(chunk.as_ref()) {
                if let Some(turn) = decoder.decode_line(&line) {
                    yield turn;
                    if let Some(delay) = options.pacing {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        if let Some(rest) = lines.finish() {
            if let Some(turn) = decoder.decode_line(&rest) {
                yield turn;
            }
        }
    };
    TurnStream::new(turns.boxed(), TurnsMetadata::open())
}

/// Stream turns from an NDJSON HTTP endpoint. The request is sent on first
/// poll.
pub fn stream_url(client: reqwest::Client, url: impl Into<String>, options: StreamOptions) -> TurnStream {
    let url = url.into();
    let turns = async_stream::try_stream! {
        let response = get_checked(&client, &url).await?;
        tracing::info!(url = %url, "streaming turns");
        let mut inner = turns_from_byte_stream(response.bytes_stream(), options).turns;
        while let Some(turn) = inner.next().await {
            yield turn?;
        }
    };
    TurnStream::new(turns.boxed(), TurnsMetadata::open())
}

/// Stream turns from a local NDJSON file, read in chunks.
pub fn stream_file(path: impl Into<PathBuf>, options: StreamOptions) -> TurnStream {
    let path = path.into();
    let turns = async_stream::try_stream! {
        let file = tokio::fs::File::open(&path).await.map_err(LoadError::from)?;
        let chunks = tokio_util::io::ReaderStream::new(file);
        let mut inner = turns_from_byte_stream(chunks, options).turns;
        while let Some(turn) = inner.next().await {
            yield turn?;
        }
    };
    TurnStream::new(turns.boxed(), TurnsMetadata::open())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn line_buffer_carries_partial_lines() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.push(b"{\"a\":1}\n{\"b\""), vec!["{\"a\":1}".to_string()]);
        assert_eq!(buffer.push(b":2}\n"), vec!["{\"b\":2}".to_string()]);
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn line_buffer_keeps_split_utf8_sequences_intact() {
        let text = "{\"thought\":\"caf\u{e9}\"}\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xc3).unwrap() + 1;
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(&text[..split]).is_empty());
        assert_eq!(buffer.push(&text[split..]), vec!["{\"thought\":\"caf\u{e9}\"}".to_string()]);
    }

    #[test]
    fn line_buffer_returns_non_blank_remainder() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"{\"x\":1}").is_empty());
        assert_eq!(buffer.finish().as_deref(), Some("{\"x\":1}"));

        let mut buffer = LineBuffer::new();
        buffer.push(b"{}\n  \t");
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn decoder_counts_only_successful_records() {
        let mut decoder = TurnDecoder::new();
        let first = decoder.decode_line(r#"{"type":"user","timestamp":5}"#).unwrap();
        assert!(decoder.decode_line("not json").is_none());
        assert!(decoder.decode_line("   ").is_none());
        let second = decoder.decode_line("{}").unwrap();

        assert_eq!((first.id.as_str(), first.index), ("turn_0", 0));
        assert_eq!(first.kind, TurnKind::User);
        assert_eq!(first.timestamp, Some(5.0));
        assert_eq!((second.id.as_str(), second.index), ("turn_1", 1));
        assert_eq!(second.kind, TurnKind::Assistant);
        assert!(second.timestamp.unwrap() > 0.0);
        assert!(second.actions.is_empty());
    }

    #[test]
    fn decoder_accepts_canonical_and_raw_actions() {
        let mut decoder = TurnDecoder::new();
        let turn = decoder
            .decode_line(
                r#"{"screenshot":"https://host/s.png","actions":[
                    {"type":"click","position":[1,2]},
                    {"type":"drag","start_x":0,"start_y":0,"end_x":3,"end_y":4},
                    {"type":"hover"}
                ]}"#
                .replace('\n', "")
                .as_str(),
            )
            .unwrap();
        assert_eq!(turn.screenshot, Some(Screenshot::uri("https://host/s.png")));
        assert_eq!(turn.actions.len(), 2);
        assert_eq!(turn.actions[0].kind(), "click");
        assert_eq!(turn.actions[1].kind(), "drag");
    }

    #[test]
    fn wrongly_typed_fields_fall_back_to_defaults() {
        let mut decoder = TurnDecoder::new();
        let turn = decoder
            .decode_line(r#"{"timestamp":"2024-01-01T00:00:00Z","thought":"kept","screenshot":7}"#)
            .unwrap();
        assert_eq!(turn.thought.as_deref(), Some("kept"));
        assert!(turn.timestamp.unwrap() > 0.0);
        assert_eq!(turn.screenshot, None);

        let turn = decoder
            .decode_line(r#"{"thought":"x","actions":{"type":"click"},"type":3,"metadata":[]}"#)
            .unwrap();
        assert_eq!((turn.id.as_str(), turn.thought.as_deref()), ("turn_1", Some("x")));
        assert!(turn.actions.is_empty());
        assert_eq!(turn.kind, TurnKind::Assistant);
        assert_eq!(turn.metadata, None);
    }

    #[test]
    fn non_object_lines_are_skipped() {
        let mut decoder = TurnDecoder::new();
        assert!(decoder.decode_line("[1, 2]").is_none());
        assert!(decoder.decode_line("\"turn\"").is_none());
        assert_eq!(decoder.decode_line("{}").map(|t| t.index), Some(0));
    }

    #[test]
    fn canonical_actions_need_text_and_key() {
        let mut decoder = TurnDecoder::new();
        let turn = decoder
            .decode_line(
                r#"{"actions":[{"type":"type","text":""},{"type":"key","key":""},{"type":"type","text":"hi"},{"type":"key","key":"Enter"}]}"#,
            )
            .unwrap();
        let kinds: Vec<&str> = turn.actions.iter().map(Action::kind).collect();
        assert_eq!(kinds, vec!["type", "key"]);
    }
}
