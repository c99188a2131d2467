//! Resilient monitoring-result watching.
//!
//! [`Watcher`] opens a long-lived SSE connection to a monitoring watch
//! endpoint and keeps it alive indefinitely: transport faults trigger
//! reconnection with exponential backoff, auth expiry triggers a token
//! refresh, and the caller consumes decoded events through a cancellable
//! [`WatchHandle`].
//!
//! # Module structure
//! - `policy` - reconnect backoff schedule
//! - `handle` - the caller-facing cancellable handle
//! - `worker` - the producer task driving the connect/stream/backoff loop

mod handle;
mod policy;
mod worker;

pub use handle::{WatchCanceller, WatchHandle};
pub use policy::ReconnectPolicy;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::auth::TokenManager;
use crate::config::WatchConfig;
use crate::traits::HttpTransport;

/// Alias for decoded monitoring events.
pub type StreamEvent = serde_json::Value;

/// Factory for watch handles over monitoring streams.
pub struct Watcher {
    transport: Arc<dyn HttpTransport>,
    token_manager: Arc<TokenManager>,
    config: WatchConfig,
}

impl Watcher {
    /// Create a watcher sharing the client's transport and token manager.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        token_manager: Arc<TokenManager>,
        config: WatchConfig,
    ) -> Self {
        Self {
            transport,
            token_manager,
            config,
        }
    }

    /// Start watching the given stream URL.
    ///
    /// Spawns the producer task immediately; events are pulled through the
    /// returned handle. The stream has no natural end under normal
    /// operation; it runs until [`WatchHandle::cancel`] is called or the
    /// handle is dropped.
    pub fn watch(&self, url: impl Into<String>) -> WatchHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(worker::run(
            Arc::clone(&self.transport),
            Arc::clone(&self.token_manager),
            url.into(),
            self.config.clone(),
            cancel.clone(),
            tx,
        ));

        WatchHandle::new(rx, cancel, task)
    }
}
