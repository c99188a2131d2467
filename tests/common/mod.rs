//! Common test utilities for integration tests.

use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;

use matroid::adapters::{mock::MockResponse, MockTransport};
use matroid::{ClientConfig, Credentials, MatroidClient, WatchConfig};

pub const BASE_URL: &str = "https://api.test/api/v1";
pub const TOKEN_BODY: &str =
    r#"{"access_token":"test-token","token_type":"Bearer","expires_in":3600}"#;

static TRACING: Once = Once::new();

/// Install the test tracing subscriber once per process. Honors `RUST_LOG`,
/// so watch-loop and retry diagnostics can be turned on per run.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Watch tuning with millisecond backoff so reconnect tests run quickly.
#[allow(dead_code)]
pub fn fast_watch_config() -> WatchConfig {
    WatchConfig {
        initial_backoff: Duration::from_millis(5),
        backoff_multiplier: 2,
        max_backoff: Duration::from_millis(40),
        connect_timeout: Duration::from_secs(5),
        read_timeout: Duration::from_secs(300),
    }
}

/// A client over the given mock transport, with the token endpoint already
/// answering successfully.
#[allow(dead_code)]
pub fn mock_client(transport: &MockTransport, watch: WatchConfig) -> MatroidClient {
    init_tracing();
    transport.set_response(
        &format!("{}/oauth/token", BASE_URL),
        MockResponse::Success(matroid::traits::Response::new(
            200,
            bytes::Bytes::from(TOKEN_BODY),
        )),
    );
    let config = ClientConfig::new(Credentials::new("test-id", "test-secret"))
        .with_base_url(BASE_URL)
        .with_watch_config(watch);
    MatroidClient::with_transport(config, Arc::new(transport.clone()))
}
