//! kubectl adapter for the [`Cluster`] trait.
//!
//! `configure_access` asks the control plane for the cluster's endpoint
//! and CA, renders a kubeconfig into the scratch directory, and every
//! later invocation passes `--kubeconfig` explicitly. Manifests are fed
//! over stdin so nothing transient lands on disk.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{Cluster, ClusterError, ControlPlane, kubeconfig};

/// Shell-out adapter driving `kubectl`.
pub struct KubectlCluster<CP> {
    control_plane: CP,
    kubeconfig_path: PathBuf,
    credential_command: Vec<String>,
}

impl<CP> KubectlCluster<CP> {
    pub fn new(
        control_plane: CP,
        scratch_dir: impl Into<PathBuf>,
        credential_command: Vec<String>,
    ) -> Self {
        Self {
            control_plane,
            kubeconfig_path: scratch_dir.into().join("kubeconfig.json"),
            credential_command,
        }
    }
}

fn command_err(command: &str, detail: impl ToString) -> ClusterError {
    ClusterError::Command {
        command: command.to_string(),
        detail: detail.to_string(),
    }
}

impl<CP: ControlPlane + Sync> Cluster for KubectlCluster<CP> {
    async fn configure_access(&self, cluster_name: &str) -> Result<(), ClusterError> {
        let info = self.control_plane.describe_cluster(cluster_name).await?;
        let rendered = kubeconfig::render(cluster_name, &info, &self.credential_command)
            .map_err(|e| ClusterError::Kubeconfig(e.to_string()))?;

        if let Some(parent) = self.kubeconfig_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClusterError::Kubeconfig(e.to_string()))?;
        }
        tokio::fs::write(&self.kubeconfig_path, rendered)
            .await
            .map_err(|e| ClusterError::Kubeconfig(e.to_string()))?;

        info!(cluster = cluster_name, path = ?self.kubeconfig_path, "cluster access configured");
        Ok(())
    }

    async fn apply_manifest(&self, manifest: &str) -> Result<(), ClusterError> {
        let mut child = Command::new("kubectl")
            .args(["apply", "-f", "-", "--kubeconfig"])
            .arg(&self.kubeconfig_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| command_err("kubectl apply", e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(manifest.as_bytes())
                .await
                .map_err(|e| command_err("kubectl apply", e))?;
            // Dropping stdin closes the pipe so kubectl sees EOF.
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| command_err("kubectl apply", e))?;

        if !output.status.success() {
            return Err(command_err(
                "kubectl apply",
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }

        debug!(result = %String::from_utf8_lossy(&output.stdout).trim(), "manifest applied");
        Ok(())
    }

    async fn rollout_status(&self, workload: &str, timeout: Duration) -> Result<(), ClusterError> {
        let target = format!("deployment/{workload}");
        let timeout_arg = format!("--timeout={}s", timeout.as_secs());
        let mut cmd = Command::new("kubectl");
        cmd.args(["rollout", "status", target.as_str(), timeout_arg.as_str(), "--kubeconfig"])
            .arg(&self.kubeconfig_path);

        // kubectl enforces the timeout itself; the outer bound covers a
        // hung child.
        let outer = timeout + Duration::from_secs(10);
        let output = match tokio::time::timeout(outer, cmd.output()).await {
            Ok(result) => result.map_err(|e| command_err("kubectl rollout status", e))?,
            Err(_) => {
                return Err(ClusterError::Rollout {
                    workload: workload.to_string(),
                    detail: format!("timed out after {}s", outer.as_secs()),
                });
            }
        };

        if !output.status.success() {
            return Err(ClusterError::Rollout {
                workload: workload.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(workload, status = %String::from_utf8_lossy(&output.stdout).trim(), "rollout complete");
        Ok(())
    }
}
