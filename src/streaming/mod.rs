//! SSE (Server-Sent Events) framing
//!
//! Encodes outgoing chat completion chunks as `data:` frames and provides a
//! line buffer for reading the SSE bodies returned by upstream providers.

use bytes::Bytes;
use serde::Serialize;

/// Terminal sentinel written after the last chunk of a stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Format a serializable value as an SSE data frame: `data: {json}\n\n`
pub fn format_sse_data<T: Serialize>(value: &T) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    Ok(Bytes::from(format!("data: {}\n\n", json)))
}

/// Format the end-of-stream marker: `data: [DONE]\n\n`
pub fn format_sse_done() -> Bytes {
    Bytes::from_static(b"data: [DONE]\n\n")
}

/// Format an error frame for failures after streaming has begun
pub fn format_sse_error(message: &str) -> Bytes {
    let body = serde_json::json!({ "error": message });
    Bytes::from(format!("data: {}\n\n", body))
}

/// Buffer for accumulating incomplete SSE lines across chunk boundaries.
///
/// Network chunks rarely align with line boundaries, so partial lines are
/// kept until their terminating `\n` arrives.
///
/// # Example
/// ```
/// use lmbridge::streaming::SseLineBuffer;
///
/// let mut buffer = SseLineBuffer::new();
/// assert!(buffer.feed(b"data: {\"content\":\"hel").is_empty());
/// assert_eq!(buffer.feed(b"lo\"}\n"), vec!["data: {\"content\":\"hello\"}"]);
/// ```
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    incomplete: String,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return every line completed by them.
    ///
    /// Line terminators (`\n` or `\r\n`) are stripped and blank lines are
    /// dropped. Invalid UTF-8 is replaced rather than rejected.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.incomplete.push_str(&String::from_utf8_lossy(bytes));

        let mut lines = Vec::new();
        while let Some(pos) = self.incomplete.find('\n') {
            let line: String = self.incomplete.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }

    /// Data left over without a line terminator
    pub fn remaining(&self) -> &str {
        &self.incomplete
    }
}

/// Extract the payload of an SSE `data:` line, if it is one
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}
