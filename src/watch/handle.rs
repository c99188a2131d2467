//! Caller-facing watch handle.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

use super::StreamEvent;

/// A live, auto-reconnecting monitoring watch.
///
/// Events are pulled with [`next`](Self::next); the producer task blocks
/// (in channel terms) until the caller pulls or cancels. `cancel` may be
/// called from any task at any time, including before the first connection
/// is established; it is idempotent and safe after exhaustion. Once
/// cancelled the handle is terminal: `next` returns `None` forever, even if
/// events were still buffered when the cancel landed.
///
/// Dropping the handle cancels the watch.
pub struct WatchHandle {
    events: mpsc::UnboundedReceiver<Result<StreamEvent, ApiError>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    pub(super) fn new(
        events: mpsc::UnboundedReceiver<Result<StreamEvent, ApiError>>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            events,
            cancel,
            task: Some(task),
        }
    }

    /// Receive the next decoded event.
    ///
    /// Waits until an event arrives, an error terminates the watch, or the
    /// watch is cancelled. `Some(Err(_))` is terminal: it is produced once,
    /// for client errors at connection time, and no further items follow.
    /// `None` means the watch was cancelled.
    pub async fn next(&mut self) -> Option<Result<StreamEvent, ApiError>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            item = self.events.recv() => item,
        }
    }

    /// Cancel the watch.
    ///
    /// Tears down any in-flight connection and stops the reconnect loop.
    /// Idempotent; callable from any task.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A cheap, clonable canceller for this watch, usable from any task.
    pub fn canceller(&self) -> WatchCanceller {
        WatchCanceller {
            cancel: self.cancel.clone(),
        }
    }

    /// Cancel the watch and wait for the producer task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Cancels a watch without owning its handle.
///
/// Obtained from [`WatchHandle::canceller`]; lets one task block on
/// [`WatchHandle::next`] while another decides when to stop.
#[derive(Clone)]
pub struct WatchCanceller {
    cancel: CancellationToken,
}

impl WatchCanceller {
    /// Cancel the watch. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}
