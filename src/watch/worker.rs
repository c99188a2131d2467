//! The watch producer loop.
//!
//! Runs the state machine `Connecting -> Streaming -> (Backoff ->
//! Connecting)*` on its own task, pushing decoded events into the handle's
//! channel. Every await point runs under `select!` against the cancellation
//! token, so a cancel issued from any other task is observed at the next
//! suspension and the in-flight connection is dropped (which aborts it at
//! the transport level) without ever opening another one.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::TokenManager;
use crate::config::WatchConfig;
use crate::error::{classify_response, ApiError, ErrorKind};
use crate::sse::SseDecoder;
use crate::traits::{Headers, HttpTransport, StreamOptions, StreamingResponse};

use super::policy::ReconnectPolicy;
use super::StreamEvent;

type EventSender = UnboundedSender<Result<StreamEvent, ApiError>>;

/// Outcome of one connection lifetime, deciding the next transition.
enum Connection {
    /// Transport fault or unusable response: back off and reconnect.
    Retry,
    /// Auth expired at connect time: refresh the token and reconnect
    /// without consuming backoff.
    RefreshToken,
    /// Terminal: the error was sent (or the receiver is gone); stop.
    Stop,
    /// Cancellation observed.
    Cancelled,
}

pub(super) async fn run(
    transport: Arc<dyn HttpTransport>,
    token_manager: Arc<TokenManager>,
    url: String,
    config: WatchConfig,
    cancel: CancellationToken,
    tx: EventSender,
) {
    let mut policy = ReconnectPolicy::new(&config);

    loop {
        if cancel.is_cancelled() {
            return;
        }

        match connect_and_stream(&*transport, &token_manager, &url, &config, &cancel, &tx, &mut policy)
            .await
        {
            Connection::Cancelled | Connection::Stop => return,
            Connection::RefreshToken => {
                let refreshed = tokio::select! {
                    _ = cancel.cancelled() => return,
                    result = token_manager.ensure_token(true) => result,
                };
                match refreshed {
                    Ok(_) => continue,
                    Err(err) if err.kind == ErrorKind::Connection => {
                        // Exchange never reached the server; same treatment
                        // as any transport fault.
                        if backoff(&mut policy, &cancel).await {
                            return;
                        }
                    }
                    Err(err) => {
                        warn!(%url, error = %err, "token refresh failed, stopping watch");
                        let _ = tx.send(Err(err));
                        return;
                    }
                }
            }
            Connection::Retry => {
                if backoff(&mut policy, &cancel).await {
                    return;
                }
            }
        }
    }
}

/// Sleep out the current backoff delay. Returns true if cancelled.
async fn backoff(policy: &mut ReconnectPolicy, cancel: &CancellationToken) -> bool {
    let delay = policy.next_delay();
    debug!(?delay, "backing off before reconnect");
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}

/// One pass through Connecting and Streaming.
#[allow(clippy::too_many_arguments)]
async fn connect_and_stream(
    transport: &dyn HttpTransport,
    token_manager: &TokenManager,
    url: &str,
    config: &WatchConfig,
    cancel: &CancellationToken,
    tx: &EventSender,
    policy: &mut ReconnectPolicy,
) -> Connection {
    let token = tokio::select! {
        _ = cancel.cancelled() => return Connection::Cancelled,
        result = token_manager.ensure_token(false) => match result {
            Ok(token) => token,
            Err(err) if err.kind == ErrorKind::Connection => {
                warn!(%url, error = %err, "token exchange unreachable");
                return Connection::Retry;
            }
            Err(err) => {
                let _ = tx.send(Err(err));
                return Connection::Stop;
            }
        },
    };

    let mut headers = Headers::new();
    headers.insert("Authorization".to_string(), token.authorization_header());
    headers.insert("Accept".to_string(), "text/event-stream".to_string());
    let options = StreamOptions {
        connect_timeout: config.connect_timeout,
    };

    let response = tokio::select! {
        _ = cancel.cancelled() => return Connection::Cancelled,
        result = transport.open_stream(url, &headers, options) => match result {
            Ok(response) => response,
            Err(err) => {
                warn!(%url, error = %err, "stream connection failed");
                return Connection::Retry;
            }
        },
    };

    // 4xx at connect time is a bad request, not a transient fault; it is
    // terminal unless the server is telling us the token expired.
    if (400..500).contains(&response.status) {
        let status = response.status;
        let body = tokio::select! {
            _ = cancel.cancelled() => return Connection::Cancelled,
            body = response.collect_body() => body,
        };
        return match classify_response(status, &body, url, ErrorKind::InvalidQuery) {
            Err(err) if err.kind == ErrorKind::TokenExpired => {
                debug!(%url, "stream rejected with expired token, refreshing");
                Connection::RefreshToken
            }
            Err(err) => {
                warn!(%url, error = %err, "stream rejected, stopping watch");
                let _ = tx.send(Err(err));
                Connection::Stop
            }
            // classify_response always errors for 4xx; keep the compiler
            // honest anyway.
            Ok(()) => Connection::Retry,
        };
    }

    info!(%url, status = response.status, "watch stream connected");
    policy.reset();

    stream_events(response, url, config, cancel, tx).await
}

/// Feed the open connection's body through a fresh decoder until it faults,
/// ends, or the watch is cancelled.
async fn stream_events(
    mut response: StreamingResponse,
    url: &str,
    config: &WatchConfig,
    cancel: &CancellationToken,
    tx: &EventSender,
) -> Connection {
    let mut decoder = SseDecoder::new();

    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => return Connection::Cancelled,
            read = tokio::time::timeout(config.read_timeout, response.body.next()) => read,
        };

        match read {
            // No bytes (not even a heartbeat) for the whole window: the
            // connection is dead even though the socket looks open.
            Err(_) => {
                warn!(%url, timeout = ?config.read_timeout, "no data within read timeout");
                return Connection::Retry;
            }
            Ok(Some(Err(err))) => {
                warn!(%url, error = %err, "stream read failed");
                return Connection::Retry;
            }
            // The server never ends a watch stream on purpose; an EOF
            // without a cancel in progress is surfaced as a fault.
            Ok(None) => {
                if cancel.is_cancelled() {
                    return Connection::Cancelled;
                }
                warn!(%url, "watch stream ended unexpectedly");
                let err = ApiError::message(
                    ErrorKind::Connection,
                    url,
                    "watch stream ended unexpectedly",
                );
                let _ = tx.send(Err(err));
                return Connection::Stop;
            }
            Ok(Some(Ok(chunk))) => {
                for event in decoder.feed(&chunk) {
                    if tx.send(Ok(event)).is_err() {
                        // Receiver dropped; nobody is listening anymore.
                        return Connection::Stop;
                    }
                }
            }
        }
    }
}
