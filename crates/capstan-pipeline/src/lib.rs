//! capstan-pipeline — pipeline-status collaborator.
//!
//! The [`PipelineStatus`] trait is what the handlers program against;
//! [`RestPipeline`] is the shipped JSON-over-HTTP adapter. Image tag
//! derivation lives here because it is a pure function of the execution's
//! source revision.

pub mod rest;

pub use rest::RestPipeline;

use std::fmt;
use std::future::Future;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline request failed: {0}")]
    Request(String),

    #[error("malformed pipeline response: {0}")]
    MalformedResponse(String),
}

/// Status of a pipeline execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Succeeded,
    Failed,
    InProgress,
    Other(String),
}

impl ExecutionStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "Succeeded" => ExecutionStatus::Succeeded,
            "Failed" => ExecutionStatus::Failed,
            "InProgress" => ExecutionStatus::InProgress,
            other => ExecutionStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Succeeded => f.write_str("Succeeded"),
            ExecutionStatus::Failed => f.write_str("Failed"),
            ExecutionStatus::InProgress => f.write_str("InProgress"),
            ExecutionStatus::Other(s) => f.write_str(s),
        }
    }
}

/// Revision that fed a pipeline execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRevision {
    pub action_name: String,
    pub revision_id: String,
}

/// Details of one pipeline execution.
#[derive(Debug, Clone, Default)]
pub struct PipelineExecution {
    pub source_revisions: Vec<SourceRevision>,
}

impl PipelineExecution {
    /// Revision id of the "Source" action, if present.
    pub fn source_revision(&self) -> Option<&str> {
        self.source_revisions
            .iter()
            .find(|r| r.action_name == "Source")
            .map(|r| r.revision_id.as_str())
    }
}

/// Summary row from a recent-executions listing, newest first.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    pub execution_id: String,
    pub status: ExecutionStatus,
}

/// Read and trigger pipeline executions.
pub trait PipelineStatus {
    fn get_execution(
        &self,
        pipeline: &str,
        execution_id: &str,
    ) -> impl Future<Output = Result<PipelineExecution, PipelineError>> + Send;

    fn list_recent_executions(
        &self,
        pipeline: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ExecutionSummary>, PipelineError>> + Send;

    /// Start a new execution; returns its id.
    fn start_execution(
        &self,
        pipeline: &str,
    ) -> impl Future<Output = Result<String, PipelineError>> + Send;
}

/// Container image coordinates resolved for a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    /// Derive the image for a repository from an optional source revision.
    pub fn from_revision(repository: impl Into<String>, revision: Option<&str>) -> Self {
        Self {
            repository: repository.into(),
            tag: image_tag(revision),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// Image tag for a source revision: first 8 characters, the whole id when
/// shorter, `latest` when no revision is resolvable. Never empty.
pub fn image_tag(revision: Option<&str>) -> String {
    match revision {
        Some(rev) if !rev.is_empty() => rev.chars().take(8).collect(),
        _ => "latest".to_string(),
    }
}
