//! Matroid API client - a Rust SDK for the Matroid computer-vision API
//!
//! The crate is built around two pieces of shared infrastructure:
//!
//! - [`auth::TokenManager`]: owns the OAuth client-credentials token and
//!   transparently refreshes it; shared by every API call.
//! - [`watch::WatchHandle`]: a cancellable handle over a live, auto-reconnecting
//!   SSE stream of monitoring results.
//!
//! Everything else is a thin endpoint wrapper going through
//! [`executor::CallExecutor`].

pub mod adapters;
pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod executor;
pub mod sse;
pub mod traits;
pub mod watch;

pub use client::MatroidClient;
pub use config::{ClientConfig, Credentials, WatchConfig};
pub use error::{ApiError, ErrorKind};
pub use watch::{WatchCanceller, WatchHandle};
