//! Controller error taxonomy.

use thiserror::Error;

/// Errors a handler invocation can terminate with.
///
/// Every variant maps to exactly one HTTP status code. Handlers convert
/// the error into a terminal [`ControllerResult`](crate::ControllerResult)
/// rather than letting it escape.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Inbound event is missing required fields.
    #[error("{0}")]
    MalformedEvent(String),

    /// A required configuration value is absent.
    #[error("{0}")]
    Configuration(String),

    /// Cluster credential configuration failed.
    #[error("cluster authentication failed: {0}")]
    ClusterAuth(String),

    /// Manifest rollout did not complete in time or reported failure.
    #[error("{0}")]
    RolloutFailed(String),

    /// The target pipeline has no executions to roll back.
    #[error("No pipeline executions found.")]
    NoExecutionFound,

    /// Triggering the rollback execution failed.
    #[error("{0}")]
    RollbackTrigger(String),

    /// Unexpected failure from an external collaborator.
    #[error("{0}")]
    Collaborator(String),
}

impl ControllerError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ControllerError::MalformedEvent(_) => 400,
            ControllerError::NoExecutionFound => 404,
            ControllerError::Configuration(_)
            | ControllerError::ClusterAuth(_)
            | ControllerError::RolloutFailed(_)
            | ControllerError::RollbackTrigger(_)
            | ControllerError::Collaborator(_) => 500,
        }
    }
}
