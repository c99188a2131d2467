//! Trait abstractions for external collaborators.
//!
//! The HTTP transport is injected behind a trait so the token manager,
//! call executor, and watch loop can be exercised in tests without network
//! access.

mod transport;

pub use transport::{
    ByteStream, Headers, HttpTransport, Response, StreamOptions, StreamingResponse, TransportError,
};
