//! capstan-cluster — cluster collaborator.
//!
//! The controller sees two seams: [`ControlPlane`] (cluster lookup on the
//! provider side) and [`Cluster`] (credential configuration, manifest
//! apply, rollout wait). [`KubectlCluster`] is the shipped adapter — it
//! renders a kubeconfig from the control plane's answer and shells out to
//! `kubectl` for the cluster-side operations.

pub mod kubeconfig;
pub mod kubectl;
pub mod manifest;
pub mod rest;

pub use kubectl::KubectlCluster;
pub use manifest::ManifestTemplate;
pub use rest::RestControlPlane;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Connection details for a managed cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    pub endpoint: String,
    /// Base64-encoded certificate authority bundle.
    pub ca_certificate: String,
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("control plane request failed: {0}")]
    ControlPlane(String),

    #[error("kubeconfig setup failed: {0}")]
    Kubeconfig(String),

    #[error("`{command}` failed: {detail}")]
    Command { command: String, detail: String },

    #[error("rollout of {workload} did not complete: {detail}")]
    Rollout { workload: String, detail: String },
}

/// Provider-side cluster lookup.
pub trait ControlPlane {
    fn describe_cluster(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<ClusterInfo, ClusterError>> + Send;
}

/// Cluster-side operations the deploy handler drives.
pub trait Cluster {
    /// Write credentials for the named cluster. Nothing downstream is
    /// attempted if this fails.
    fn configure_access(
        &self,
        cluster_name: &str,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;

    /// Apply a rendered manifest. Idempotent; safe to reapply unchanged.
    fn apply_manifest(
        &self,
        manifest: &str,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;

    /// Wait for the workload's rollout to complete, bounded by `timeout`.
    fn rollout_status(
        &self,
        workload: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;
}
