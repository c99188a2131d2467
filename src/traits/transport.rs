//! HTTP transport trait abstraction.
//!
//! Provides a trait-based abstraction over the HTTP client, enabling
//! dependency injection and mocking in tests. The transport is responsible
//! for bounded-time cancellation of in-flight streaming requests: dropping
//! the returned [`ByteStream`] must abort the underlying connection without
//! waiting for the server.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// A stream of body chunks from an open connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Transport-level errors: faults that occur before or while moving bytes,
/// as opposed to errors the server expressed in a response.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("stream read failed: {0}")]
    Io(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Other(String),
}

/// A fully-buffered HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Create a new response.
    pub fn new(status: u16, body: Bytes) -> Self {
        Self { status, body }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get the response body as a string (lossy for non-UTF-8 bytes).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the response body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Options for opening a streaming connection.
#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    /// Deadline for connecting and receiving response headers.
    pub connect_timeout: Duration,
}

/// The headers-received half of a streaming request.
///
/// The status is available immediately so the caller can reject 4xx
/// responses before consuming the body.
pub struct StreamingResponse {
    /// HTTP status code
    pub status: u16,
    /// Lazily-read body chunks
    pub body: ByteStream,
}

impl StreamingResponse {
    /// Drain the body into a single buffer. Used to recover an error payload
    /// from a non-2xx streaming response.
    pub async fn collect_body(mut self) -> Bytes {
        use futures_util::StreamExt;

        let mut buf = Vec::new();
        while let Some(Ok(chunk)) = self.body.next().await {
            buf.extend_from_slice(&chunk);
        }
        Bytes::from(buf)
    }
}

/// Trait for HTTP transport operations.
///
/// Implementations include the production reqwest-based transport and a
/// mock transport for tests. All request bodies in this API are
/// form-encoded; callers pass pre-encoded bodies and set headers
/// accordingly.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a GET request and buffer the full response.
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, TransportError>;

    /// Perform a POST request with a form-encoded body.
    async fn post_form(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<Response, TransportError>;

    /// Perform a DELETE request.
    async fn delete(&self, url: &str, headers: &Headers) -> Result<Response, TransportError>;

    /// Open a long-lived streaming GET.
    ///
    /// Returns once response headers are received. The body is consumed
    /// incrementally through [`StreamingResponse::body`]; dropping it aborts
    /// the connection promptly.
    async fn open_stream(
        &self,
        url: &str,
        headers: &Headers,
        options: StreamOptions,
    ) -> Result<StreamingResponse, TransportError>;
}
