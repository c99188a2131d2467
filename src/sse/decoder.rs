//! Stateful SSE chunk decoding.

use bytes::Bytes;
use serde_json::Value;

use super::frame::parse_frame;

const FRAME_SEPARATOR: &[u8] = b"\n\n";

/// Turns an unbounded sequence of arbitrarily-sized byte chunks into decoded
/// events.
///
/// The decoder accumulates bytes until a complete frame (terminated by a
/// blank line) is available, so frames split across network reads decode
/// identically to frames arriving whole. A decoder carries buffer state from
/// one connection only; it has no reset operation and must be discarded on
/// reconnect.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Create a decoder with an empty carry-over buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every event completed by it, in order.
    ///
    /// Frames that parse to nothing (comments, non-`data:` frames, malformed
    /// JSON) are dropped silently.
    pub fn feed(&mut self, chunk: &Bytes) -> Vec<Value> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = find_separator(&self.buffer) {
            let rest = self.buffer.split_off(pos + FRAME_SEPARATOR.len());
            self.buffer.truncate(pos);
            if let Some(event) = parse_frame(&self.buffer) {
                events.push(event);
            }
            self.buffer = rest;
        }

        events
    }

    /// Bytes held over waiting for the next separator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn find_separator(buf: &[u8]) -> Option<usize> {
    buf.windows(FRAME_SEPARATOR.len())
        .position(|w| w == FRAME_SEPARATOR)
}
