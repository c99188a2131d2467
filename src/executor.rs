//! Authenticated call executor.
//!
//! Every single-shot endpoint wrapper goes through [`CallExecutor::execute`],
//! which owns the "ensure token, perform, classify, retry once on token
//! expiry, format" sequence. The retry bound is explicit here rather than
//! hidden in nested error handlers: a call is attempted at most twice, and
//! only when the first classification is specifically
//! [`ErrorKind::TokenExpired`].
//!
//! The watch loop does not use this executor; it has its own longer-horizon
//! retry policy.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::auth::TokenManager;
use crate::error::{classify_response, ApiError, ErrorKind};
use crate::traits::{Response, TransportError};

/// A formatted single-shot call result, per the configured output mode.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult {
    /// Decoded JSON body (`json_format` on, the default).
    Json(Value),
    /// Raw body text (`json_format` off).
    Text(String),
}

impl ApiResult {
    /// The decoded value, if this result is JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiResult::Json(value) => Some(value),
            ApiResult::Text(_) => None,
        }
    }
}

/// Wraps single request/response exchanges with token and error handling.
pub struct CallExecutor {
    token_manager: Arc<TokenManager>,
    json_format: bool,
    print_output: bool,
}

impl CallExecutor {
    /// Create an executor sharing the given token manager.
    pub fn new(token_manager: Arc<TokenManager>, json_format: bool, print_output: bool) -> Self {
        Self {
            token_manager,
            json_format,
            print_output,
        }
    }

    /// Whether results are formatted as decoded JSON values.
    pub fn json_format(&self) -> bool {
        self.json_format
    }

    /// Run one authenticated exchange.
    ///
    /// `op` receives the `Authorization` header value and performs the
    /// request; it may be invoked twice (once more after a forced token
    /// refresh if the first attempt came back with the token-expiration
    /// code). `default_kind` is the classification for unrecognized 4xx
    /// responses from this endpoint.
    pub async fn execute<F, Fut>(
        &self,
        url: &str,
        default_kind: ErrorKind,
        op: F,
    ) -> Result<ApiResult, ApiError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Response, TransportError>>,
    {
        let token = self.token_manager.ensure_token(false).await?;
        let response = op(token.authorization_header())
            .await
            .map_err(|e| ApiError::connection(url, &e))?;

        let response = match classify_response(response.status, &response.body, url, default_kind)
        {
            Ok(()) => response,
            Err(err) if err.kind == ErrorKind::TokenExpired => {
                debug!(url, "token expired, refreshing and retrying once");
                let token = self.token_manager.ensure_token(true).await?;
                let retried = op(token.authorization_header())
                    .await
                    .map_err(|e| ApiError::connection(url, &e))?;
                // No further retry: a second token-expiration here surfaces.
                classify_response(retried.status, &retried.body, url, default_kind)?;
                retried
            }
            Err(err) => return Err(err),
        };

        self.format(url, &response)
    }

    fn format(&self, url: &str, response: &Response) -> Result<ApiResult, ApiError> {
        let text = response.text();
        if self.print_output {
            debug!(url, body = %text, "API response");
        }
        if self.json_format {
            let value = serde_json::from_str(&text).map_err(|_| {
                ApiError::message(ErrorKind::Api, url, "Could not parse the response")
            })?;
            Ok(ApiResult::Json(value))
        } else {
            Ok(ApiResult::Text(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::adapters::{mock::MockResponse, MockTransport};
    use crate::config::Credentials;

    const TOKEN_URL: &str = "https://example.com/api/v1/oauth/token";
    const CALL_URL: &str = "https://example.com/api/v1/account";

    fn executor_with(transport: &MockTransport) -> CallExecutor {
        transport.set_response(
            TOKEN_URL,
            MockResponse::Success(crate::traits::Response::new(
                200,
                Bytes::from(r#"{"access_token":"tok","token_type":"Bearer","expires_in":3600}"#),
            )),
        );
        let manager = TokenManager::new(
            Arc::new(transport.clone()),
            TOKEN_URL,
            Credentials::new("id", "secret"),
        );
        CallExecutor::new(Arc::new(manager), true, false)
    }

    #[tokio::test]
    async fn test_success_formats_json() {
        let transport = MockTransport::new();
        let executor = executor_with(&transport);

        let result = executor
            .execute(CALL_URL, ErrorKind::InvalidQuery, |auth| async move {
                assert_eq!(auth, "Bearer tok");
                Ok(crate::traits::Response::new(
                    200,
                    Bytes::from(r#"{"credits": 10}"#),
                ))
            })
            .await
            .unwrap();

        assert_eq!(result, ApiResult::Json(json!({"credits": 10})));
    }

    #[tokio::test]
    async fn test_text_mode_returns_raw_body() {
        let transport = MockTransport::new();
        transport.set_response(
            TOKEN_URL,
            MockResponse::Success(crate::traits::Response::new(
                200,
                Bytes::from(r#"{"access_token":"tok","token_type":"Bearer","expires_in":3600}"#),
            )),
        );
        let manager = TokenManager::new(
            Arc::new(transport.clone()),
            TOKEN_URL,
            Credentials::new("id", "secret"),
        );
        let executor = CallExecutor::new(Arc::new(manager), false, false);

        let result = executor
            .execute(CALL_URL, ErrorKind::InvalidQuery, |_| async {
                Ok(crate::traits::Response::new(200, Bytes::from("plain,csv")))
            })
            .await
            .unwrap();

        assert_eq!(result, ApiResult::Text("plain,csv".to_string()));
    }

    #[tokio::test]
    async fn test_token_expired_retries_exactly_once() {
        let transport = MockTransport::new();
        let executor = executor_with(&transport);
        let calls = AtomicUsize::new(0);

        let result = executor
            .execute(CALL_URL, ErrorKind::InvalidQuery, |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Ok(crate::traits::Response::new(
                            401,
                            Bytes::from(r#"{"code":"token_expiration_err"}"#),
                        ))
                    } else {
                        Ok(crate::traits::Response::new(200, Bytes::from("{}")))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result, ApiResult::Json(json!({})));
    }

    #[tokio::test]
    async fn test_second_token_expiration_surfaces() {
        let transport = MockTransport::new();
        let executor = executor_with(&transport);
        let calls = AtomicUsize::new(0);

        let err = executor
            .execute(CALL_URL, ErrorKind::InvalidQuery, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Ok(crate::traits::Response::new(
                        401,
                        Bytes::from(r#"{"code":"token_expiration_err"}"#),
                    ))
                }
            })
            .await
            .unwrap_err();

        // Exactly two attempts, then the error surfaces as-is.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(err.kind, ErrorKind::TokenExpired);
    }

    #[tokio::test]
    async fn test_other_errors_do_not_retry() {
        let transport = MockTransport::new();
        let executor = executor_with(&transport);
        let calls = AtomicUsize::new(0);

        let err = executor
            .execute(CALL_URL, ErrorKind::InvalidQuery, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Ok(crate::traits::Response::new(
                        429,
                        Bytes::from(r#"{"code":"rate_err"}"#),
                    ))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.kind, ErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn test_transport_fault_maps_to_connection_error() {
        let transport = MockTransport::new();
        let executor = executor_with(&transport);

        let err = executor
            .execute(CALL_URL, ErrorKind::InvalidQuery, |_| async {
                Err(TransportError::ConnectionFailed("refused".to_string()))
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Connection);
        assert!(err.is_retryable());
    }
}
