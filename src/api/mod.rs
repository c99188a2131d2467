//! Thin endpoint wrappers.
//!
//! Each wrapper builds one request and hands it to the call executor; all
//! token handling, retry, classification, and formatting live there.
//!
//! # Module structure
//! - `accounts` - account information
//! - `streams` - stream registration and monitoring operations

mod accounts;
mod streams;

pub use streams::{
    MonitorStreamOptions, MonitoringResultOptions, SearchMonitoringsQuery, SearchStreamsQuery,
};
