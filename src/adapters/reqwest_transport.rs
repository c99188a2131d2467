//! Reqwest-based HTTP transport adapter.
//!
//! Production implementation of [`HttpTransport`]. Cancellation of an
//! in-flight streaming request is inherited from reqwest: dropping the
//! response body stream closes the connection immediately, so the watch
//! loop never needs to reach for platform socket calls.

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::debug;

use crate::traits::{
    Headers, HttpTransport, Response, StreamOptions, StreamingResponse, TransportError,
};

/// HTTP transport implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with default client settings.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a transport over a custom `reqwest::Client`.
    ///
    /// This allows advanced configuration like proxies, connection pools,
    /// or TLS settings.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn convert_error(err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::ConnectionFailed(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }

    fn apply_headers(
        builder: reqwest::RequestBuilder,
        headers: &Headers,
    ) -> reqwest::RequestBuilder {
        let mut builder = builder;
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        builder
    }

    async fn buffered(builder: reqwest::RequestBuilder) -> Result<Response, TransportError> {
        let response = builder.send().await.map_err(Self::convert_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(Self::convert_error)?;
        Ok(Response::new(status, body))
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, TransportError> {
        let builder = Self::apply_headers(self.client.get(url), headers);
        Self::buffered(builder).await
    }

    async fn post_form(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<Response, TransportError> {
        let builder = Self::apply_headers(self.client.post(url), headers).body(body.to_string());
        Self::buffered(builder).await
    }

    async fn delete(&self, url: &str, headers: &Headers) -> Result<Response, TransportError> {
        let builder = Self::apply_headers(self.client.delete(url), headers);
        Self::buffered(builder).await
    }

    async fn open_stream(
        &self,
        url: &str,
        headers: &Headers,
        options: StreamOptions,
    ) -> Result<StreamingResponse, TransportError> {
        let builder = Self::apply_headers(self.client.get(url), headers);

        let response = tokio::time::timeout(options.connect_timeout, builder.send())
            .await
            .map_err(|_| {
                TransportError::Timeout(format!(
                    "no response headers within {:?}",
                    options.connect_timeout
                ))
            })?
            .map_err(Self::convert_error)?;

        let status = response.status().as_u16();
        debug!(url, status, "streaming connection established");

        let body = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(e.to_string())
                } else {
                    TransportError::Io(e.to_string())
                }
            })
        });

        Ok(StreamingResponse {
            status,
            body: Box::pin(body),
        })
    }
}
