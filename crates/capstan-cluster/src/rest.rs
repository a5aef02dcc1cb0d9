//! REST adapter for the [`ControlPlane`] interface.

use std::time::Duration;

use http::Method;
use serde::Deserialize;

use capstan_core::http::request_json;

use crate::{ClusterError, ClusterInfo, ControlPlane};

/// JSON-over-HTTP control-plane client.
///
/// `GET {base}/clusters/{name}` → `{"endpoint": ..., "caCertificate": ...}`
#[derive(Debug, Clone)]
pub struct RestControlPlane {
    base_url: String,
    timeout: Duration,
}

impl RestControlPlane {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCluster {
    endpoint: String,
    ca_certificate: String,
}

impl ControlPlane for RestControlPlane {
    async fn describe_cluster(&self, name: &str) -> Result<ClusterInfo, ClusterError> {
        let url = format!("{}/clusters/{name}", self.base_url);
        let value = request_json(Method::GET, &url, None, self.timeout)
            .await
            .map_err(|e| ClusterError::ControlPlane(e.to_string()))?;
        let wire: WireCluster = serde_json::from_value(value)
            .map_err(|e| ClusterError::ControlPlane(format!("malformed response: {e}")))?;
        Ok(ClusterInfo {
            endpoint: wire.endpoint,
            ca_certificate: wire.ca_certificate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_cluster_decodes() {
        let value = serde_json::json!({
            "endpoint": "https://cluster.example.com",
            "caCertificate": "Q0EgZGF0YQ=="
        });
        let wire: WireCluster = serde_json::from_value(value).unwrap();
        assert_eq!(wire.endpoint, "https://cluster.example.com");
        assert_eq!(wire.ca_certificate, "Q0EgZGF0YQ==");
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = RestControlPlane::new("http://control-plane.internal/");
        assert_eq!(client.base_url, "http://control-plane.internal");
    }
}
