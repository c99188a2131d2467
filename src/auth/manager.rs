//! OAuth client-credentials token manager.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::Credentials;
use crate::endpoints::encode_form;
use crate::error::{classify_response, ApiError, ErrorKind};
use crate::traits::{Headers, HttpTransport};

use super::AccessToken;

const GRANT_TYPE: &str = "client_credentials";

/// Lifetime assumed for tokens supplied directly by the caller. If the real
/// lifetime is shorter the server rejects a call with the token-expiration
/// code and the executor refreshes automatically.
const PRELOADED_TOKEN_LIFETIME: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Owns the current access token and performs the OAuth client-credentials
/// exchange.
///
/// Shared between the call executor and the watch loop, which run on
/// different tasks, so the token slot sits behind an async mutex. Holding
/// the lock across the exchange serializes refreshes: two concurrent
/// expiry discoveries produce one network exchange, and the second caller
/// picks up the fresh token on the cheap path.
pub struct TokenManager {
    transport: Arc<dyn HttpTransport>,
    token_url: String,
    credentials: Credentials,
    token: Mutex<Option<AccessToken>>,
}

impl TokenManager {
    /// Create a manager with no token held; the first `ensure_token` call
    /// performs an exchange.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        token_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            transport,
            token_url: token_url.into(),
            credentials,
            token: Mutex::new(None),
        }
    }

    /// Preload an access token instead of requesting one from the server.
    pub fn with_access_token(self, token_value: impl Into<String>) -> Self {
        let token = AccessToken::new("Bearer", token_value, PRELOADED_TOKEN_LIFETIME);
        Self {
            token: Mutex::new(Some(token)),
            ..self
        }
    }

    /// Return a valid token, exchanging credentials with the server if the
    /// held token is absent, expired, or `force_refresh` is set.
    ///
    /// The common path (token held and unexpired) makes no network call.
    /// Passing `force_refresh` adds `refresh=true` to the exchange so the
    /// server hands back the current token without invalidating it, which
    /// keeps multiple clients sharing one credential pair from endlessly
    /// expiring each other's tokens.
    pub async fn ensure_token(&self, force_refresh: bool) -> Result<AccessToken, ApiError> {
        let mut slot = self.token.lock().await;

        if !force_refresh {
            if let Some(token) = slot.as_ref() {
                if !token.expired() {
                    return Ok(token.clone());
                }
            }
        }

        debug!(force_refresh, "requesting access token");

        let mut pairs = vec![
            ("grant_type", GRANT_TYPE),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];
        if force_refresh {
            pairs.push(("refresh", "true"));
        }
        let body = encode_form(&pairs);

        let mut headers = Headers::new();
        headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );

        let response = self
            .transport
            .post_form(&self.token_url, &body, &headers)
            .await
            .map_err(|e| ApiError::connection(&self.token_url, &e))?;

        classify_response(
            response.status,
            &response.body,
            &self.token_url,
            ErrorKind::Authorization,
        )?;

        let token = parse_token_response(&response.body, &self.token_url)?;
        *slot = Some(token.clone());
        Ok(token)
    }
}

/// Build an [`AccessToken`] from the exchange response, validating that the
/// body is a JSON object carrying all three required fields.
fn parse_token_response(body: &[u8], url: &str) -> Result<AccessToken, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::message(ErrorKind::Api, url, "Could not parse the response"))?;

    if !value.is_object() {
        return Err(ApiError::message(
            ErrorKind::Api,
            url,
            "Could not parse the response",
        ));
    }

    let access_token = value.get("access_token").and_then(Value::as_str);
    let token_type = value.get("token_type").and_then(Value::as_str);
    let expires_in = match value.get("expires_in") {
        Some(Value::Number(n)) => n.as_u64(),
        // Some deployments return the lifetime as a string.
        Some(Value::String(s)) => s.parse::<u64>().ok(),
        _ => None,
    };

    match (access_token, token_type, expires_in) {
        (Some(access_token), Some(token_type), Some(expires_in))
            if !access_token.is_empty() && !token_type.is_empty() && expires_in > 0 =>
        {
            Ok(AccessToken::new(
                token_type,
                access_token,
                Duration::from_secs(expires_in),
            ))
        }
        _ => Err(ApiError::message(
            ErrorKind::Api,
            url,
            "Required parameters not found in the response",
        )),
    }
}
