//! REST adapter for the pipeline-status interface.
//!
//! Talks JSON over HTTP/1.1 to a control-plane base URL:
//!
//! ```text
//! GET  {base}/pipelines/{name}/executions/{id}
//! GET  {base}/pipelines/{name}/executions?limit=N
//! POST {base}/pipelines/{name}/executions
//! ```

use std::time::Duration;

use http::Method;
use serde::Deserialize;
use tracing::debug;

use capstan_core::http::{HttpError, request_json};

use crate::{
    ExecutionStatus, ExecutionSummary, PipelineError, PipelineExecution, PipelineStatus,
    SourceRevision,
};

/// JSON-over-HTTP pipeline client.
#[derive(Debug, Clone)]
pub struct RestPipeline {
    base_url: String,
    timeout: Duration,
}

impl RestPipeline {
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
struct WireRevision {
    action_name: String,
    revision_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireExecution {
    #[serde(default)]
    source_revisions: Vec<WireRevision>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSummary {
    execution_id: String,
    status: String,
}

#[derive(Deserialize)]
struct WireListing {
    #[serde(default)]
    executions: Vec<WireSummary>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStarted {
    execution_id: String,
}

fn request_err(err: HttpError) -> PipelineError {
    PipelineError::Request(err.to_string())
}

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, PipelineError> {
    serde_json::from_value(value).map_err(|e| PipelineError::MalformedResponse(e.to_string()))
}

impl PipelineStatus for RestPipeline {
    async fn get_execution(
        &self,
        pipeline: &str,
        execution_id: &str,
    ) -> Result<PipelineExecution, PipelineError> {
        let url = format!(
            "{}/pipelines/{pipeline}/executions/{execution_id}",
            self.base_url
        );
        let wire: WireExecution =
            decode(request_json(Method::GET, &url, None, self.timeout).await.map_err(request_err)?)?;
        Ok(PipelineExecution {
            source_revisions: wire
                .source_revisions
                .into_iter()
                .map(|r| SourceRevision {
                    action_name: r.action_name,
                    revision_id: r.revision_id,
                })
                .collect(),
        })
    }

    async fn list_recent_executions(
        &self,
        pipeline: &str,
        limit: usize,
    ) -> Result<Vec<ExecutionSummary>, PipelineError> {
        let url = format!(
            "{}/pipelines/{pipeline}/executions?limit={limit}",
            self.base_url
        );
        let wire: WireListing =
            decode(request_json(Method::GET, &url, None, self.timeout).await.map_err(request_err)?)?;
        Ok(wire
            .executions
            .into_iter()
            .map(|e| ExecutionSummary {
                execution_id: e.execution_id,
                status: ExecutionStatus::parse(&e.status),
            })
            .collect())
    }

    async fn start_execution(&self, pipeline: &str) -> Result<String, PipelineError> {
        let url = format!("{}/pipelines/{pipeline}/executions", self.base_url);
        let wire: WireStarted =
            decode(request_json(Method::POST, &url, None, self.timeout).await.map_err(request_err)?)?;
        debug!(pipeline, execution = %wire.execution_id, "execution started");
        Ok(wire.execution_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_execution_decodes() {
        let value = serde_json::json!({
            "sourceRevisions": [
                { "actionName": "Source", "revisionId": "abc12345def" }
            ]
        });
        let wire: WireExecution = decode(value).unwrap();
        assert_eq!(wire.source_revisions.len(), 1);
        assert_eq!(wire.source_revisions[0].action_name, "Source");
    }

    #[test]
    fn wire_execution_defaults_to_empty_revisions() {
        let wire: WireExecution = decode(serde_json::json!({})).unwrap();
        assert!(wire.source_revisions.is_empty());
    }

    #[test]
    fn wire_listing_decodes_statuses() {
        let value = serde_json::json!({
            "executions": [
                { "executionId": "ex-2", "status": "Succeeded" },
                { "executionId": "ex-1", "status": "Failed" }
            ]
        });
        let wire: WireListing = decode(value).unwrap();
        assert_eq!(wire.executions.len(), 2);
        assert_eq!(wire.executions[0].execution_id, "ex-2");
    }

    #[test]
    fn malformed_listing_is_error() {
        let result: Result<WireListing, _> = decode(serde_json::json!({ "executions": "nope" }));
        assert!(result.is_err());
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = RestPipeline::new("http://pipelines.internal/");
        assert_eq!(client.base_url, "http://pipelines.internal");
    }
}
