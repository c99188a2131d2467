//! Vendor endpoint table.
//!
//! URL construction for the API routes the crate talks to. Path parameters
//! are percent-encoded before substitution.

use urlencoding::encode;

/// Percent-encode key-value pairs into an `application/x-www-form-urlencoded`
/// body (also usable as a query string).
pub fn encode_form(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", form_component(key), form_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

// Form fields encode spaces as `+`; `%20` is for path segments.
fn form_component(raw: &str) -> String {
    encode(raw).replace("%20", "+")
}

/// Builds absolute URLs for API routes from a base URL.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    /// Create an endpoint table rooted at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// `POST /oauth/token`
    pub fn token(&self) -> String {
        format!("{}/oauth/token", self.base_url)
    }

    /// `GET /account`
    pub fn account_info(&self) -> String {
        format!("{}/account", self.base_url)
    }

    /// `POST /streams`
    pub fn create_stream(&self) -> String {
        format!("{}/streams", self.base_url)
    }

    /// `GET /streams`
    pub fn search_streams(&self) -> String {
        format!("{}/streams", self.base_url)
    }

    /// `DELETE /streams/:key`
    pub fn delete_stream(&self, stream_id: &str) -> String {
        format!("{}/streams/{}", self.base_url, encode(stream_id))
    }

    /// `POST /streams/:streamId/monitor/:detectorId`
    pub fn monitor_stream(&self, stream_id: &str, detector_id: &str) -> String {
        format!(
            "{}/streams/{}/monitor/{}",
            self.base_url,
            encode(stream_id),
            encode(detector_id)
        )
    }

    /// `GET /monitorings`
    pub fn search_monitorings(&self) -> String {
        format!("{}/monitorings", self.base_url)
    }

    /// `GET /monitorings/:key`
    pub fn get_monitoring_result(&self, monitoring_id: &str) -> String {
        format!("{}/monitorings/{}", self.base_url, encode(monitoring_id))
    }

    /// `POST /monitorings/:key/kill`
    pub fn kill_monitoring(&self, monitoring_id: &str) -> String {
        format!(
            "{}/monitorings/{}/kill",
            self.base_url,
            encode(monitoring_id)
        )
    }

    /// `DELETE /monitorings/:key`
    pub fn delete_monitoring(&self, monitoring_id: &str) -> String {
        format!("{}/monitorings/{}", self.base_url, encode(monitoring_id))
    }

    /// `GET /monitorings/:key/watch` — the long-lived SSE stream.
    pub fn watch_monitoring(&self, monitoring_id: &str) -> String {
        format!(
            "{}/monitorings/{}/watch",
            self.base_url,
            encode(monitoring_id)
        )
    }
}
