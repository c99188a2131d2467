//! The top-level API client.

use std::sync::Arc;

use crate::adapters::ReqwestTransport;
use crate::auth::{AccessToken, TokenManager};
use crate::config::ClientConfig;
use crate::endpoints::Endpoints;
use crate::error::{ApiError, ErrorKind};
use crate::executor::{ApiResult, CallExecutor};
use crate::traits::{Headers, HttpTransport};
use crate::watch::{WatchHandle, Watcher};

/// Client for the Matroid computer-vision API.
///
/// Owns one [`TokenManager`] injected into both the call executor and the
/// watcher, so every API call on this client shares a single token and a
/// single serialized refresh path.
pub struct MatroidClient {
    pub(crate) endpoints: Endpoints,
    pub(crate) transport: Arc<dyn HttpTransport>,
    token_manager: Arc<TokenManager>,
    pub(crate) executor: CallExecutor,
    watcher: Watcher,
}

impl MatroidClient {
    /// Create a client over the production reqwest transport.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Create a client over a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self::assemble(config, transport, None)
    }

    /// Create a client over a transport, preloading an access token instead
    /// of requesting one from the server.
    pub fn with_access_token(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        access_token: impl Into<String>,
    ) -> Self {
        Self::assemble(config, transport, Some(access_token.into()))
    }

    fn assemble(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        access_token: Option<String>,
    ) -> Self {
        let endpoints = Endpoints::new(config.base_url.clone());
        let mut token_manager = TokenManager::new(
            Arc::clone(&transport),
            endpoints.token(),
            config.credentials.clone(),
        );
        if let Some(token) = access_token {
            token_manager = token_manager.with_access_token(token);
        }
        let token_manager = Arc::new(token_manager);
        let executor = CallExecutor::new(
            Arc::clone(&token_manager),
            config.json_format,
            config.print_output,
        );
        let watcher = Watcher::new(
            Arc::clone(&transport),
            Arc::clone(&token_manager),
            config.watch.clone(),
        );
        Self {
            endpoints,
            transport,
            token_manager,
            executor,
            watcher,
        }
    }

    /// Obtain a valid access token, exchanging credentials if needed.
    ///
    /// The client refreshes tokens automatically; call this with
    /// `refresh = true` only to force a server round-trip (for instance when
    /// another client sharing the credentials has expired the token).
    pub async fn retrieve_token(&self, refresh: bool) -> Result<AccessToken, ApiError> {
        self.token_manager.ensure_token(refresh).await
    }

    /// Open a resilient watch over a monitoring's result stream.
    ///
    /// The returned handle reconnects through faults indefinitely; see
    /// [`WatchHandle`].
    pub fn watch_monitoring(&self, monitoring_id: &str) -> WatchHandle {
        self.watcher.watch(self.endpoints.watch_monitoring(monitoring_id))
    }

    pub(crate) fn executor_returns_json(&self) -> bool {
        self.executor.json_format()
    }

    pub(crate) fn auth_headers(auth: String) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Authorization".to_string(), auth);
        headers
    }

    /// Authenticated GET through the executor.
    pub(crate) async fn get_call(
        &self,
        url: String,
        default_kind: ErrorKind,
    ) -> Result<ApiResult, ApiError> {
        let call_url = url.clone();
        let transport = Arc::clone(&self.transport);
        self.executor
            .execute(&url, default_kind, move |auth| {
                let transport = Arc::clone(&transport);
                let url = call_url.clone();
                async move { transport.get(&url, &Self::auth_headers(auth)).await }
            })
            .await
    }

    /// Authenticated form POST through the executor.
    pub(crate) async fn post_call(
        &self,
        url: String,
        form: String,
        default_kind: ErrorKind,
    ) -> Result<ApiResult, ApiError> {
        let call_url = url.clone();
        let transport = Arc::clone(&self.transport);
        self.executor
            .execute(&url, default_kind, move |auth| {
                let transport = Arc::clone(&transport);
                let url = call_url.clone();
                let form = form.clone();
                async move {
                    let mut headers = Self::auth_headers(auth);
                    headers.insert(
                        "Content-Type".to_string(),
                        "application/x-www-form-urlencoded".to_string(),
                    );
                    transport.post_form(&url, &form, &headers).await
                }
            })
            .await
    }

    /// Authenticated DELETE through the executor.
    pub(crate) async fn delete_call(
        &self,
        url: String,
        default_kind: ErrorKind,
    ) -> Result<ApiResult, ApiError> {
        let call_url = url.clone();
        let transport = Arc::clone(&self.transport);
        self.executor
            .execute(&url, default_kind, move |auth| {
                let transport = Arc::clone(&transport);
                let url = call_url.clone();
                async move { transport.delete(&url, &Self::auth_headers(auth)).await }
            })
            .await
    }
}
