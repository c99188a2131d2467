//! Access token representation.

use std::time::{Duration, Instant};

/// An OAuth access token with its expiry window.
///
/// Tokens are immutable; the [`TokenManager`](super::TokenManager) replaces
/// the held token wholesale on refresh so no reader ever observes a
/// half-updated one. Expiry is computed against the clock on every check
/// rather than cached.
#[derive(Debug, Clone)]
pub struct AccessToken {
    token_type: String,
    token_value: String,
    issued_at: Instant,
    lifetime: Duration,
}

impl AccessToken {
    /// Create a token issued now with the given lifetime.
    pub fn new(
        token_type: impl Into<String>,
        token_value: impl Into<String>,
        lifetime: Duration,
    ) -> Self {
        Self {
            token_type: token_type.into(),
            token_value: token_value.into(),
            issued_at: Instant::now(),
            lifetime,
        }
    }

    /// Whether the token's lifetime has elapsed.
    pub fn expired(&self) -> bool {
        self.issued_at.elapsed() >= self.lifetime
    }

    /// The `Authorization` header value: `<token_type> <token_value>`.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.token_value)
    }
}

impl std::fmt::Display for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The secret value stays out of logs.
        write!(f, "{} token (lifetime {:?})", self.token_type, self.lifetime)
    }
}
