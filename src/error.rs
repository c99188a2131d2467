//! API error taxonomy.
//!
//! Errors are classified by HTTP status code plus the vendor error code
//! embedded in the JSON response body, not by transport exception type.
//! Classification is centralized in [`classify_response`] so every endpoint
//! wrapper and the watch loop agree on what a given response means.

use std::fmt;

use crate::traits::TransportError;

/// High-level classification of an API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 429 with the vendor rate-limit code.
    RateLimited,
    /// 402 with the vendor payment code.
    PaymentRequired,
    /// 4xx with the vendor token-expiration code. Special-cased: single-shot
    /// calls retry exactly once after a forced token refresh.
    TokenExpired,
    /// Non-2xx with the vendor media code.
    Media,
    /// 5xx with the vendor server code.
    Server,
    /// Other 4xx; the default kind supplied by the calling endpoint wrapper.
    InvalidQuery,
    /// Transport/IO failure before a response was obtained.
    Connection,
    /// Auth failure during the OAuth token exchange.
    Authorization,
    /// Anything else non-2xx.
    Api,
}

impl ErrorKind {
    /// Whether a caller-side retry of the same request could succeed.
    ///
    /// Single-shot calls never retry on these themselves; the watch loop
    /// retries `Connection` and `TokenExpired` transparently.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited
                | ErrorKind::Server
                | ErrorKind::Connection
                | ErrorKind::TokenExpired
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::PaymentRequired => "payment required",
            ErrorKind::TokenExpired => "token expired",
            ErrorKind::Media => "media error",
            ErrorKind::Server => "server error",
            ErrorKind::InvalidQuery => "invalid query",
            ErrorKind::Connection => "connection error",
            ErrorKind::Authorization => "authorization error",
            ErrorKind::Api => "API error",
        };
        f.write_str(name)
    }
}

/// An API call failure with the context needed to diagnose it.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Classification of the failure.
    pub kind: ErrorKind,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Vendor error code from the response body, when present.
    pub code: Option<String>,
    /// Raw response body, when a response was received.
    pub body: Option<String>,
    /// The request URL.
    pub url: String,
    /// Extra detail (transport message, malformed-response note).
    pub message: Option<String>,
}

impl ApiError {
    /// An error built from an HTTP response.
    pub fn from_response(
        kind: ErrorKind,
        status: u16,
        code: Option<String>,
        body: &[u8],
        url: &str,
    ) -> Self {
        Self {
            kind,
            status: Some(status),
            code,
            body: Some(String::from_utf8_lossy(body).into_owned()),
            url: url.to_string(),
            message: None,
        }
    }

    /// A transport-level failure with no response.
    pub fn connection(url: &str, err: &TransportError) -> Self {
        Self {
            kind: ErrorKind::Connection,
            status: None,
            code: None,
            body: None,
            url: url.to_string(),
            message: Some(err.to_string()),
        }
    }

    /// An error with a free-form message and no response context.
    pub fn message(kind: ErrorKind, url: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            code: None,
            body: None,
            url: url.to_string(),
            message: Some(message.into()),
        }
    }

    /// Whether a caller-side retry could succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.kind, self.url)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {})", status)?;
        }
        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        } else if let Some(body) = &self.body {
            write!(f, ": {}", body)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Extract the vendor error code from a JSON response body, if any.
fn vendor_code(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("code")?.as_str().map(|s| s.to_string())
}

/// Classify a response by status code and vendor error code.
///
/// Returns `Ok(())` for 2xx responses, otherwise the error kind the caller
/// must surface. `default_kind` is used for 4xx responses without a
/// recognized vendor code (typically [`ErrorKind::InvalidQuery`]).
pub fn classify_response(
    status: u16,
    body: &[u8],
    url: &str,
    default_kind: ErrorKind,
) -> Result<(), ApiError> {
    let code = vendor_code(body);
    let code_is = |expected: &str| code.as_deref() == Some(expected);

    if status == 429 && code_is("rate_err") {
        return Err(ApiError::from_response(
            ErrorKind::RateLimited,
            status,
            code,
            body,
            url,
        ));
    }
    if status == 402 && code_is("payment_err") {
        return Err(ApiError::from_response(
            ErrorKind::PaymentRequired,
            status,
            code,
            body,
            url,
        ));
    }
    if (400..500).contains(&status) {
        let kind = if code_is("token_expiration_err") {
            ErrorKind::TokenExpired
        } else {
            default_kind
        };
        return Err(ApiError::from_response(kind, status, code, body, url));
    }
    if code_is("media_err") && !(200..300).contains(&status) {
        return Err(ApiError::from_response(
            ErrorKind::Media,
            status,
            code,
            body,
            url,
        ));
    }
    if (500..600).contains(&status) && code_is("server_err") {
        return Err(ApiError::from_response(
            ErrorKind::Server,
            status,
            code,
            body,
            url,
        ));
    }
    if !(200..300).contains(&status) {
        return Err(ApiError::from_response(
            ErrorKind::Api,
            status,
            code,
            body,
            url,
        ));
    }

    Ok(())
}
