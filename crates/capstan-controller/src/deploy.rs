//! Deploy handler — advances a pipeline-success event into a cluster
//! rollout.
//!
//! Side effects are strictly ordered: notify-start → authenticate →
//! apply-manifests → wait-rollout → notify-terminal. Nothing is retried
//! here; re-delivery is the event dispatcher's concern.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{error, info, warn};

use capstan_cluster::{Cluster, ManifestTemplate};
use capstan_core::{CapstanConfig, ControllerError, ControllerResult, PipelineEvent, PipelineState};
use capstan_notify::{Notifier, publish_best_effort};
use capstan_pipeline::{ImageReference, PipelineStatus};

/// Deploys a workload when its release pipeline succeeds.
pub struct DeployHandler<P, C, N> {
    config: CapstanConfig,
    deployment_template: ManifestTemplate,
    service_template: ManifestTemplate,
    pipeline: P,
    cluster: C,
    notifier: N,
}

impl<P, C, N> DeployHandler<P, C, N>
where
    P: PipelineStatus,
    C: Cluster,
    N: Notifier,
{
    pub fn new(
        config: CapstanConfig,
        deployment_template: ManifestTemplate,
        service_template: ManifestTemplate,
        pipeline: P,
        cluster: C,
        notifier: N,
    ) -> Self {
        Self {
            config,
            deployment_template,
            service_template,
            pipeline,
            cluster,
            notifier,
        }
    }

    /// Handle one pipeline event, producing exactly one terminal result.
    pub async fn handle(&self, event: &Value) -> ControllerResult {
        let event = match PipelineEvent::from_value(event) {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "rejecting malformed pipeline event");
                return ControllerResult::from_error(&ControllerError::MalformedEvent(
                    e.to_string(),
                ));
            }
        };

        info!(
            pipeline = %event.pipeline,
            execution = %event.execution_id,
            state = ?event.state,
            "pipeline event received"
        );

        if event.state != PipelineState::Succeeded {
            info!(execution = %event.execution_id, "build did not succeed, skipping deployment");
            return ControllerResult::ok("Build not successful, skipping deployment.");
        }

        let (cluster_name, repository, topic) = match self.required_config() {
            Ok(values) => values,
            Err(e) => {
                error!(error = %e, "deployment not configured");
                return ControllerResult::from_error(&e);
            }
        };

        match self.deploy(&event, &cluster_name, &repository, &topic).await {
            Ok(()) => {
                publish_best_effort(
                    &self.notifier,
                    &topic,
                    "DEPLOYMENT SUCCESSFUL",
                    &format!(
                        "Successfully deployed {} execution {} to cluster {}",
                        event.pipeline, event.execution_id, cluster_name
                    ),
                )
                .await;
                ControllerResult::ok(format!(
                    "Deployment completed successfully for execution {}",
                    event.execution_id
                ))
            }
            Err(e) => {
                let detail = format!(
                    "Deployment failed for {} execution {}: {}",
                    event.pipeline, event.execution_id, e
                );
                error!(execution = %event.execution_id, error = %e, "deployment failed");
                publish_best_effort(&self.notifier, &topic, "DEPLOYMENT FAILED", &detail).await;
                ControllerResult::error(e.status_code(), detail)
            }
        }
    }

    fn required_config(&self) -> Result<(String, String, String), ControllerError> {
        match (
            &self.config.cluster_name,
            &self.config.image_repository,
            &self.config.notify_topic,
        ) {
            (Some(cluster), Some(repository), Some(topic)) => {
                Ok((cluster.clone(), repository.clone(), topic.clone()))
            }
            (cluster, repository, topic) => {
                let mut missing = Vec::new();
                if cluster.is_none() {
                    missing.push("cluster_name");
                }
                if repository.is_none() {
                    missing.push("image_repository_url");
                }
                if topic.is_none() {
                    missing.push("notify_topic");
                }
                Err(ControllerError::Configuration(format!(
                    "missing required configuration: {}",
                    missing.join(", ")
                )))
            }
        }
    }

    async fn deploy(
        &self,
        event: &PipelineEvent,
        cluster_name: &str,
        repository: &str,
        topic: &str,
    ) -> Result<(), ControllerError> {
        let execution = self
            .pipeline
            .get_execution(&event.pipeline, &event.execution_id)
            .await
            .map_err(|e| ControllerError::Collaborator(e.to_string()))?;

        let revision = execution.source_revision();
        if revision.is_none() {
            warn!(execution = %event.execution_id, "no Source revision found, using `latest` tag");
        }
        let image = ImageReference::from_revision(repository, revision);
        info!(image = %image, "resolved deployment image");

        publish_best_effort(
            &self.notifier,
            topic,
            "DEPLOYMENT STARTED",
            &format!(
                "Starting deployment of {} execution {} to cluster {}",
                event.pipeline, event.execution_id, cluster_name
            ),
        )
        .await;

        self.cluster
            .configure_access(cluster_name)
            .await
            .map_err(|e| ControllerError::ClusterAuth(e.to_string()))?;

        let mut vars = BTreeMap::new();
        vars.insert("image", image.to_string());

        let deployment = self
            .deployment_template
            .render(&vars)
            .map_err(|e| ControllerError::Collaborator(e.to_string()))?;
        self.cluster
            .apply_manifest(&deployment)
            .await
            .map_err(|e| ControllerError::Collaborator(e.to_string()))?;

        // The service rarely changes; reapplying it is idempotent.
        let service = self
            .service_template
            .render(&vars)
            .map_err(|e| ControllerError::Collaborator(e.to_string()))?;
        self.cluster
            .apply_manifest(&service)
            .await
            .map_err(|e| ControllerError::Collaborator(e.to_string()))?;

        self.cluster
            .rollout_status(&self.config.workload_name, self.config.rollout_timeout)
            .await
            .map_err(|e| ControllerError::RolloutFailed(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::Ordering::SeqCst;
    use std::time::Duration;

    use serde_json::json;

    use capstan_core::AdvisorFailurePolicy;
    use capstan_pipeline::{PipelineExecution, SourceRevision};

    use super::*;
    use crate::fakes::{FakeCluster, FakeNotifier, FakePipeline};

    fn config() -> CapstanConfig {
        CapstanConfig {
            cluster_name: Some("demo".to_string()),
            image_repository: Some("registry.example.com/bank".to_string()),
            notify_topic: Some("releases".to_string()),
            pipeline_name: Some("bank-api".to_string()),
            control_plane_url: None,
            advisor_url: None,
            advisor_model_id: "default".to_string(),
            advisor_failure_policy: AdvisorFailurePolicy::FailOpen,
            notify_webhook_url: None,
            workload_name: "capstan-bank".to_string(),
            deployment_manifest: PathBuf::from("deploy/deployment.yaml"),
            service_manifest: PathBuf::from("deploy/service.yaml"),
            rollout_timeout: Duration::from_secs(300),
            credential_command: Vec::new(),
        }
    }

    fn handler(
        config: CapstanConfig,
        pipeline: FakePipeline,
        cluster: FakeCluster,
    ) -> DeployHandler<FakePipeline, FakeCluster, FakeNotifier> {
        DeployHandler::new(
            config,
            ManifestTemplate::new("image: {{image}}\n"),
            ManifestTemplate::new("kind: Service\n"),
            pipeline,
            cluster,
            FakeNotifier::default(),
        )
    }

    fn success_event() -> Value {
        json!({
            "detail": {
                "pipeline": "bank-api",
                "execution-id": "ex-1",
                "state": "SUCCEEDED"
            }
        })
    }

    fn pipeline_with_revision(revision_id: &str) -> FakePipeline {
        FakePipeline {
            execution: Some(PipelineExecution {
                source_revisions: vec![SourceRevision {
                    action_name: "Source".to_string(),
                    revision_id: revision_id.to_string(),
                }],
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn failed_build_skips_without_side_effects() {
        let h = handler(config(), FakePipeline::default(), FakeCluster::default());
        let event = json!({
            "detail": { "pipeline": "bank-api", "execution-id": "ex-1", "state": "FAILED" }
        });

        let result = h.handle(&event).await;

        assert_eq!(result.status_code, 200);
        assert_eq!(result.message, "Build not successful, skipping deployment.");
        assert_eq!(h.pipeline.get_calls.load(SeqCst), 0);
        assert_eq!(h.cluster.call_count(), 0);
        assert!(h.notifier.subjects().is_empty());
    }

    #[tokio::test]
    async fn malformed_event_is_rejected_without_side_effects() {
        let h = handler(config(), FakePipeline::default(), FakeCluster::default());
        let event = json!({
            "detail": { "pipeline": "bank-api", "state": "SUCCEEDED" }
        });

        let result = h.handle(&event).await;

        assert_eq!(result.status_code, 400);
        assert!(result.message.contains("execution-id"));
        assert_eq!(h.pipeline.get_calls.load(SeqCst), 0);
        assert_eq!(h.cluster.call_count(), 0);
        assert!(h.notifier.subjects().is_empty());
    }

    #[tokio::test]
    async fn missing_configuration_fails_before_side_effects() {
        let mut config = config();
        config.cluster_name = None;
        config.notify_topic = None;
        let h = handler(config, FakePipeline::default(), FakeCluster::default());

        let result = h.handle(&success_event()).await;

        assert_eq!(result.status_code, 500);
        assert!(result.message.contains("cluster_name"));
        assert!(result.message.contains("notify_topic"));
        assert_eq!(h.pipeline.get_calls.load(SeqCst), 0);
        assert_eq!(h.cluster.call_count(), 0);
    }

    #[tokio::test]
    async fn successful_deploy_applies_tagged_image_and_notifies() {
        let h = handler(
            config(),
            pipeline_with_revision("abc12345def"),
            FakeCluster::default(),
        );

        let result = h.handle(&success_event()).await;

        assert_eq!(result.status_code, 200);
        assert_eq!(
            result.message,
            "Deployment completed successfully for execution ex-1"
        );
        let applied = h.cluster.applied.lock().unwrap();
        assert_eq!(applied.len(), 2);
        assert!(applied[0].contains("registry.example.com/bank:abc12345"));
        assert_eq!(applied[1], "kind: Service\n");
        drop(applied);
        assert_eq!(h.cluster.configure_calls.load(SeqCst), 1);
        assert_eq!(h.cluster.rollout_calls.load(SeqCst), 1);
        assert_eq!(
            h.notifier.subjects(),
            vec!["DEPLOYMENT STARTED", "DEPLOYMENT SUCCESSFUL"]
        );
    }

    #[tokio::test]
    async fn missing_source_revision_deploys_latest() {
        let h = handler(config(), FakePipeline::default(), FakeCluster::default());

        let result = h.handle(&success_event()).await;

        assert_eq!(result.status_code, 200);
        let applied = h.cluster.applied.lock().unwrap();
        assert!(applied[0].contains("registry.example.com/bank:latest"));
    }

    #[tokio::test]
    async fn rollout_failure_reports_execution_and_notifies_once() {
        let cluster = FakeCluster {
            rollout_error: Some("timed out after 310s".to_string()),
            ..Default::default()
        };
        let h = handler(config(), pipeline_with_revision("abc12345def"), cluster);

        let result = h.handle(&success_event()).await;

        assert_eq!(result.status_code, 500);
        assert!(result.message.contains("ex-1"));
        assert!(result.message.contains("timed out"));
        let subjects = h.notifier.subjects();
        assert_eq!(
            subjects.iter().filter(|s| *s == "DEPLOYMENT FAILED").count(),
            1
        );
        assert!(!subjects.contains(&"DEPLOYMENT SUCCESSFUL".to_string()));
    }

    #[tokio::test]
    async fn auth_failure_stops_before_any_apply() {
        let cluster = FakeCluster {
            fail_configure: true,
            ..Default::default()
        };
        let h = handler(config(), pipeline_with_revision("abc12345def"), cluster);

        let result = h.handle(&success_event()).await;

        assert_eq!(result.status_code, 500);
        assert!(result.message.contains("cluster authentication failed"));
        assert!(h.cluster.applied.lock().unwrap().is_empty());
        assert_eq!(h.cluster.rollout_calls.load(SeqCst), 0);
    }

    #[tokio::test]
    async fn apply_failure_skips_rollout_wait() {
        let cluster = FakeCluster {
            fail_apply: true,
            ..Default::default()
        };
        let h = handler(config(), pipeline_with_revision("abc12345def"), cluster);

        let result = h.handle(&success_event()).await;

        assert_eq!(result.status_code, 500);
        assert_eq!(h.cluster.rollout_calls.load(SeqCst), 0);
        assert_eq!(
            h.notifier.subjects(),
            vec!["DEPLOYMENT STARTED", "DEPLOYMENT FAILED"]
        );
    }

    #[tokio::test]
    async fn status_lookup_failure_is_terminal() {
        let pipeline = FakePipeline {
            fail_get: true,
            ..Default::default()
        };
        let h = handler(config(), pipeline, FakeCluster::default());

        let result = h.handle(&success_event()).await;

        assert_eq!(result.status_code, 500);
        assert!(result.message.contains("ex-1"));
        assert_eq!(h.cluster.call_count(), 0);
        // The failure happened before notify-start, so only the terminal
        // notification goes out.
        assert_eq!(h.notifier.subjects(), vec!["DEPLOYMENT FAILED"]);
    }
}
