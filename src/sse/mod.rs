//! SSE (Server-Sent Events) stream decoding.
//!
//! Handles the restricted SSE subset the monitoring API emits: frames are
//! separated by a blank line and are either `data: <json>` payloads or
//! `:`-prefixed comments the server uses as heartbeats. There are no
//! `event:`, `id:`, or `retry:` directives.
//!
//! # Module structure
//! - `frame` - stateless parsing of a single frame
//! - `decoder` - stateful chunk buffering that yields decoded events

mod decoder;
mod frame;

pub use decoder::SseDecoder;
pub use frame::parse_frame;
