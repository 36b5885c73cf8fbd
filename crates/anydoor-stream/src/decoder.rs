//! Line splitting and per-line interpretation of the upstream event stream.
//!
//! Upstream chunks arrive with arbitrary boundaries: a line (and a multi-byte
//! UTF-8 character) may be split across chunks. [`LineDecoder`] buffers bytes
//! until a newline and only then decodes, so no partial line or character is
//! ever interpreted.

use serde_json::Value;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// What one complete line contributes to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// Blank line, or a delta without content.
    Skip,
    /// The `[DONE]` sentinel. Completion itself is driven by end-of-stream.
    Done,
    /// Text from `choices[0].delta.content`.
    Content(String),
    /// Anything else, appended verbatim.
    Raw(String),
}

impl LineEvent {
    /// Text this event appends to the document, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            LineEvent::Content(text) | LineEvent::Raw(text) => Some(text),
            LineEvent::Skip | LineEvent::Done => None,
        }
    }
}

/// Buffers raw bytes and yields complete lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completes, without the newline.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut search_from = self.pending.len();
        self.pending.extend_from_slice(chunk);

        while let Some(offset) = self.pending[search_from..].iter().position(|b| *b == b'\n') {
            let end = search_from + offset;
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(decode_line(&line[..line.len() - 1]));
            search_from = 0;
        }
        lines
    }

    /// Flush the trailing unterminated line at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_suffix('\r').unwrap_or(&text).to_owned()
}

/// Interpret one complete line.
///
/// - blank → [`LineEvent::Skip`]
/// - `data: [DONE]` → [`LineEvent::Done`]
/// - `data: <json>` with `choices[0].delta` → its non-empty `content`, else skip
/// - `data: <json>` of any other shape → the re-serialized JSON
/// - `data: <not json>` → the payload text
/// - any other line → the line itself
#[must_use]
pub fn parse_line(line: &str) -> LineEvent {
    if line.trim().is_empty() {
        return LineEvent::Skip;
    }

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return LineEvent::Raw(line.to_owned());
    };

    if payload.trim() == DONE_SENTINEL {
        return LineEvent::Done;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => match value.pointer("/choices/0/delta").filter(|d| !d.is_null()) {
            Some(delta) => match delta.get("content").and_then(Value::as_str) {
                Some(content) if !content.is_empty() => LineEvent::Content(content.to_owned()),
                _ => LineEvent::Skip,
            },
            None => LineEvent::Raw(value.to_string()),
        },
        Err(_) => LineEvent::Raw(payload.to_owned()),
    }
}
