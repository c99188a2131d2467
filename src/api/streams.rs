//! Stream and monitoring endpoints.

use serde_json::Value;
use tracing::warn;

use crate::client::MatroidClient;
use crate::endpoints::encode_form;
use crate::error::{ApiError, ErrorKind};
use crate::executor::ApiResult;

/// Options for `monitor_stream`.
#[derive(Debug, Clone, Default)]
pub struct MonitorStreamOptions {
    /// Per-label detection thresholds, sent JSON-encoded.
    pub thresholds: Option<Value>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Callback endpoint notified on detections.
    pub endpoint: Option<String>,
    pub task_name: Option<String>,
}

/// Options for `get_monitoring_result`.
#[derive(Debug, Clone, Default)]
pub struct MonitoringResultOptions {
    /// Response format, `json` or `csv`.
    pub format: Option<String>,
    /// Return only the monitoring state, not the detections.
    pub status_only: bool,
}

/// Filters for `search_monitorings`.
#[derive(Debug, Clone, Default)]
pub struct SearchMonitoringsQuery {
    pub stream_id: Option<String>,
    pub monitoring_id: Option<String>,
    pub detector_id: Option<String>,
    pub name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub state: Option<String>,
}

/// Filters for `search_streams`.
#[derive(Debug, Clone, Default)]
pub struct SearchStreamsQuery {
    pub stream_id: Option<String>,
    pub name: Option<String>,
    pub permission: Option<String>,
}

fn form_of(pairs: &[(&str, Option<&str>)]) -> String {
    let present: Vec<(&str, &str)> = pairs
        .iter()
        .filter_map(|(key, value)| value.map(|v| (*key, v)))
        .collect();
    encode_form(&present)
}

fn with_query(url: String, pairs: &[(&str, Option<&str>)]) -> String {
    let query = form_of(pairs);
    if query.is_empty() {
        url
    } else {
        format!("{}?{}", url, query)
    }
}

impl MatroidClient {
    /// Register a remote camera stream.
    ///
    /// `POST /streams`
    pub async fn create_stream(
        &self,
        stream_url: &str,
        stream_name: &str,
    ) -> Result<ApiResult, ApiError> {
        let form = encode_form(&[("name", stream_name), ("url", stream_url)]);
        self.post_call(
            self.endpoints.create_stream(),
            form,
            ErrorKind::InvalidQuery,
        )
        .await
    }

    /// Delete a stream with no active monitorings.
    ///
    /// `DELETE /streams/:key`
    pub async fn delete_stream(&self, stream_id: &str) -> Result<ApiResult, ApiError> {
        self.delete_call(
            self.endpoints.delete_stream(stream_id),
            ErrorKind::InvalidQuery,
        )
        .await
    }

    /// Run a detector over a registered stream.
    ///
    /// `POST /streams/:streamId/monitor/:detectorId`
    pub async fn monitor_stream(
        &self,
        stream_id: &str,
        detector_id: &str,
        options: &MonitorStreamOptions,
    ) -> Result<ApiResult, ApiError> {
        let thresholds = options
            .thresholds
            .as_ref()
            .map(|t| serde_json::to_string(t).unwrap_or_default());
        let form = form_of(&[
            ("thresholds", thresholds.as_deref()),
            ("startTime", options.start_time.as_deref()),
            ("endTime", options.end_time.as_deref()),
            ("endpoint", options.endpoint.as_deref()),
            ("taskName", options.task_name.as_deref()),
        ]);
        self.post_call(
            self.endpoints.monitor_stream(stream_id, detector_id),
            form,
            ErrorKind::InvalidQuery,
        )
        .await
    }

    /// Fetch the accumulated results of a monitoring.
    ///
    /// `GET /monitorings/:key`
    pub async fn get_monitoring_result(
        &self,
        monitoring_id: &str,
        options: &MonitoringResultOptions,
    ) -> Result<ApiResult, ApiError> {
        let mut format = options.format.as_deref();
        if format == Some("csv") && self.executor_returns_json() {
            // CSV cannot be decoded in the configured JSON output mode.
            warn!("csv format unavailable with json output, requesting json");
            format = Some("json");
        }
        let url = with_query(
            self.endpoints.get_monitoring_result(monitoring_id),
            &[
                ("format", format),
                (
                    "status_only",
                    Some(if options.status_only { "true" } else { "false" }),
                ),
            ],
        );
        self.get_call(url, ErrorKind::InvalidQuery).await
    }

    /// Stop a running monitoring.
    ///
    /// `POST /monitorings/:key/kill`
    pub async fn kill_monitoring(&self, monitoring_id: &str) -> Result<ApiResult, ApiError> {
        self.post_call(
            self.endpoints.kill_monitoring(monitoring_id),
            String::new(),
            ErrorKind::InvalidQuery,
        )
        .await
    }

    /// Delete a finished monitoring.
    ///
    /// `DELETE /monitorings/:key`
    pub async fn delete_monitoring(&self, monitoring_id: &str) -> Result<ApiResult, ApiError> {
        self.delete_call(
            self.endpoints.delete_monitoring(monitoring_id),
            ErrorKind::InvalidQuery,
        )
        .await
    }

    /// Search monitorings by filter.
    ///
    /// `GET /monitorings`
    pub async fn search_monitorings(
        &self,
        query: &SearchMonitoringsQuery,
    ) -> Result<ApiResult, ApiError> {
        let url = with_query(
            self.endpoints.search_monitorings(),
            &[
                ("stream_id", query.stream_id.as_deref()),
                ("monitoring_id", query.monitoring_id.as_deref()),
                ("detector_id", query.detector_id.as_deref()),
                ("name", query.name.as_deref()),
                ("start_time", query.start_time.as_deref()),
                ("end_time", query.end_time.as_deref()),
                ("state", query.state.as_deref()),
            ],
        );
        self.get_call(url, ErrorKind::InvalidQuery).await
    }

    /// Search streams by filter.
    ///
    /// `GET /streams`
    pub async fn search_streams(&self, query: &SearchStreamsQuery) -> Result<ApiResult, ApiError> {
        let url = with_query(
            self.endpoints.search_streams(),
            &[
                ("stream_id", query.stream_id.as_deref()),
                ("name", query.name.as_deref()),
                ("permission", query.permission.as_deref()),
            ],
        );
        self.get_call(url, ErrorKind::InvalidQuery).await
    }
}
