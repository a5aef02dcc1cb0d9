//! capstan-controller — the release controller's two handlers.
//!
//! [`DeployHandler`] advances a pipeline-success event into a cluster
//! rollout; [`RollbackHandler`] advances an alarm event into a rollback
//! decision. Both are generic over their collaborators so the control
//! flow is testable without a cluster, a pipeline, or a model endpoint.
//!
//! Every invocation is an independent unit of work: handlers hold no
//! mutable state, so concurrent invocations need no coordination.

pub mod deploy;
pub mod rollback;

pub use deploy::DeployHandler;
pub use rollback::RollbackHandler;
