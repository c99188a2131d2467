//! Client configuration.
//!
//! Holds the OAuth credentials, the API base URL, and the tuning knobs for
//! the resilient monitoring watch loop.

use std::time::Duration;

/// Default URL for the Matroid API
pub const BASE_URL: &str = "https://app.matroid.com/api/v1";

/// OAuth client credentials.
///
/// Immutable once constructed. The secret is deliberately excluded from the
/// `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    /// Create credentials from explicit values.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Read credentials from the `MATROID_CLIENT_ID` and
    /// `MATROID_CLIENT_SECRET` environment variables.
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("MATROID_CLIENT_ID").ok()?;
        let client_secret = std::env::var("MATROID_CLIENT_SECRET").ok()?;
        Some(Self {
            client_id,
            client_secret,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Tuning parameters for the monitoring watch loop.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Delay before the first reconnect attempt after a transport fault.
    pub initial_backoff: Duration,
    /// Factor applied to the backoff after each consecutive fault.
    pub backoff_multiplier: u32,
    /// Upper bound on the reconnect delay.
    pub max_backoff: Duration,
    /// Timeout for establishing the streaming connection.
    pub connect_timeout: Duration,
    /// Maximum time between bytes on an open stream. The server sends SSE
    /// comment heartbeats well inside this window, so hitting it means the
    /// connection is dead.
    pub read_timeout: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            backoff_multiplier: 2,
            max_backoff: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(300),
        }
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, e.g. `https://app.matroid.com/api/v1`.
    pub base_url: String,
    /// OAuth client credentials.
    pub credentials: Credentials,
    /// Return decoded JSON values from single-shot calls when true, raw
    /// response text otherwise.
    pub json_format: bool,
    /// Emit response bodies to the tracing diagnostic sink.
    pub print_output: bool,
    /// Watch loop tuning.
    pub watch: WatchConfig,
}

impl ClientConfig {
    /// Create a configuration with the default base URL and watch tuning.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            credentials,
            json_format: true,
            print_output: false,
            watch: WatchConfig::default(),
        }
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Return raw response text instead of decoded JSON.
    pub fn with_text_output(mut self) -> Self {
        self.json_format = false;
        self
    }

    /// Emit response bodies to the tracing diagnostic sink.
    pub fn with_print_output(mut self) -> Self {
        self.print_output = true;
        self
    }

    /// Override the watch loop tuning.
    pub fn with_watch_config(mut self, watch: WatchConfig) -> Self {
        self.watch = watch;
        self
    }
}
