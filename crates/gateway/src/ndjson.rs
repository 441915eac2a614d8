//! Newline-delimited JSON framing for stream events.
//!
//! One `StreamEvent` per line, UTF-8, `\n` terminated. The decoder is
//! incremental: transport chunks may end anywhere, including inside a
//! multi-byte character, so bytes are buffered until a newline arrives.

use bytes::Bytes;
use cloudclaw_agent::StreamEvent;

pub const CONTENT_TYPE: &str = "application/x-ndjson";

/// Encode one event as a single NDJSON line.
pub fn encode_event(event: &StreamEvent) -> Bytes {
    let mut line = serde_json::to_vec(event).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize stream event");
        br#"{"status":"error","message":"internal serialization failure"}"#.to_vec()
    });
    line.push(b'\n');
    Bytes::from(line)
}

/// Incremental NDJSON reader for the client side of `/chat`.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every complete line it finished.
    ///
    /// Blank lines are skipped. A line that is not a valid event yields an
    /// `Err` for that line only; decoding continues with the next one.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, serde_json::Error>> {
        self.buffer.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = decode_line(&line[..line.len() - 1]) {
                out.push(event);
            }
        }
        out
    }

    /// Flush a final line that was not newline terminated.
    pub fn finish(&mut self) -> Option<Result<StreamEvent, serde_json::Error>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(line: &[u8]) -> Option<Result<StreamEvent, serde_json::Error>> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_slice(trimmed))
}
