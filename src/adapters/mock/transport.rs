//! Configurable mock implementation of [`HttpTransport`].
//!
//! Buffered requests are answered from a per-URL response table (exact
//! match first, then prefix match). Streaming connections are answered from
//! a FIFO of scripts so a test can describe an entire reconnect history:
//! a refused connect, then a connection that emits two frames and drops,
//! then one that hangs until cancelled. Every request is recorded for
//! verification.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::traits::{
    Headers, HttpTransport, Response, StreamOptions, StreamingResponse, TransportError,
};

/// A recorded request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method (GET, POST, DELETE)
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body (for POST requests)
    pub body: Option<String>,
    /// When the request arrived at the mock
    pub at: Instant,
}

/// Configured outcome for a buffered request.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a response
    Success(Response),
    /// Fail at the transport level
    Error(TransportError),
}

/// One step of a scripted stream body.
#[derive(Debug, Clone)]
pub enum StreamStep {
    /// Emit a chunk of bytes.
    Data(Bytes),
    /// Sleep before the next step (models a quiet connection).
    Wait(Duration),
    /// Fail the read with a transport error, ending the stream.
    Fault(TransportError),
    /// Block forever; only cancellation gets past this.
    Hang,
}

/// Outcome of one `open_stream` call.
#[derive(Debug, Clone)]
pub enum StreamScript {
    /// Yield a connection with the given status and scripted body.
    Connect {
        status: u16,
        steps: Vec<StreamStep>,
        /// Delay before headers are returned, for exercising cancel races.
        connect_delay: Duration,
    },
    /// Fail before any response is obtained.
    ConnectError(TransportError),
}

impl StreamScript {
    /// A 200 connection with the given body steps and no connect delay.
    pub fn ok(steps: Vec<StreamStep>) -> Self {
        StreamScript::Connect {
            status: 200,
            steps,
            connect_delay: Duration::ZERO,
        }
    }
}

#[derive(Default)]
struct Inner {
    responses: HashMap<String, MockResponse>,
    stream_scripts: VecDeque<StreamScript>,
    requests: Vec<RecordedRequest>,
    stream_attempts: Vec<Instant>,
}

/// Mock HTTP transport for testing.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    /// Create an empty mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response for a URL. The URL is matched exactly, then by
    /// prefix; the response is returned for every matching request.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut inner = self.inner.lock().unwrap();
        inner.responses.insert(url.to_string(), response);
    }

    /// Append a script to the stream-connection FIFO.
    pub fn push_stream_script(&self, script: StreamScript) {
        let mut inner = self.inner.lock().unwrap();
        inner.stream_scripts.push_back(script);
    }

    /// All recorded requests, including stream opens.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// How many times `open_stream` was called.
    pub fn stream_attempts(&self) -> usize {
        self.inner.lock().unwrap().stream_attempts.len()
    }

    /// When each `open_stream` call arrived.
    pub fn stream_attempt_times(&self) -> Vec<Instant> {
        self.inner.lock().unwrap().stream_attempts.clone()
    }

    fn record(&self, method: &str, url: &str, headers: &Headers, body: Option<String>) {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body,
            at: Instant::now(),
        });
    }

    fn response_for(&self, url: &str) -> Option<MockResponse> {
        let inner = self.inner.lock().unwrap();
        if let Some(response) = inner.responses.get(url) {
            return Some(response.clone());
        }
        inner
            .responses
            .iter()
            .find(|(pattern, _)| url.starts_with(pattern.as_str()))
            .map(|(_, response)| response.clone())
    }

    fn answer(&self, url: &str) -> Result<Response, TransportError> {
        match self.response_for(url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            None => Err(TransportError::Other(format!(
                "no mock response for URL: {}",
                url
            ))),
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, TransportError> {
        self.record("GET", url, headers, None);
        self.answer(url)
    }

    async fn post_form(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<Response, TransportError> {
        self.record("POST", url, headers, Some(body.to_string()));
        self.answer(url)
    }

    async fn delete(&self, url: &str, headers: &Headers) -> Result<Response, TransportError> {
        self.record("DELETE", url, headers, None);
        self.answer(url)
    }

    async fn open_stream(
        &self,
        url: &str,
        headers: &Headers,
        _options: StreamOptions,
    ) -> Result<StreamingResponse, TransportError> {
        self.record("GET", url, headers, None);
        let script = {
            let mut inner = self.inner.lock().unwrap();
            inner.stream_attempts.push(Instant::now());
            inner.stream_scripts.pop_front()
        };

        match script {
            Some(StreamScript::Connect {
                status,
                steps,
                connect_delay,
            }) => {
                if !connect_delay.is_zero() {
                    tokio::time::sleep(connect_delay).await;
                }
                let body = futures::stream::unfold(
                    VecDeque::from(steps),
                    |mut steps| async move {
                        loop {
                            match steps.pop_front() {
                                None => return None,
                                Some(StreamStep::Data(bytes)) => return Some((Ok(bytes), steps)),
                                Some(StreamStep::Wait(duration)) => {
                                    tokio::time::sleep(duration).await
                                }
                                Some(StreamStep::Fault(err)) => {
                                    steps.clear();
                                    return Some((Err(err), steps));
                                }
                                Some(StreamStep::Hang) => futures::future::pending::<()>().await,
                            }
                        }
                    },
                );
                Ok(StreamingResponse {
                    status,
                    body: Box::pin(body),
                })
            }
            Some(StreamScript::ConnectError(err)) => Err(err),
            None => Err(TransportError::ConnectionFailed(
                "no scripted stream connection".to_string(),
            )),
        }
    }
}
