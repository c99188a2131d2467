//! Single-frame SSE parsing.

use serde_json::Value;

const DATA_PREFIX: &[u8] = b"data:";

/// Parse one raw SSE frame (the bytes between two blank-line separators).
///
/// Returns `None` for frames that carry nothing for the caller:
/// `:`-prefixed comments (heartbeats), frames without a `data:` prefix, and
/// payloads that are not valid JSON. Malformed frames must never crash the
/// consumer, so a JSON parse failure is a skip, not an error.
pub fn parse_frame(frame: &[u8]) -> Option<Value> {
    if frame.starts_with(b":") {
        // SSE comment, discard.
        return None;
    }

    if !frame.starts_with(DATA_PREFIX) {
        // Only data: frames are meaningful for this API subset.
        return None;
    }

    serde_json::from_slice(&frame[DATA_PREFIX.len()..]).ok()
}
