//! Rollback handler — advances an alarm event into a rollback decision.
//!
//! Re-running the target pipeline with its last-good artifact source is
//! the rollback; the handler only does it when the latest execution
//! succeeded, because re-running an already-failed execution changes
//! nothing.

use serde_json::Value;
use tracing::{error, info, warn};

use capstan_advisor::{Advisor, AlarmContext, RollbackDecision};
use capstan_core::{
    AdvisorFailurePolicy, AlarmEvent, AlarmState, CapstanConfig, ControllerError, ControllerResult,
};
use capstan_notify::{Notifier, publish_best_effort};
use capstan_pipeline::{ExecutionStatus, PipelineStatus};

/// Rolls back the last known-good release when an alarm fires.
pub struct RollbackHandler<P, A, N> {
    config: CapstanConfig,
    pipeline: P,
    advisor: A,
    notifier: N,
}

impl<P, A, N> RollbackHandler<P, A, N>
where
    P: PipelineStatus,
    A: Advisor,
    N: Notifier,
{
    pub fn new(config: CapstanConfig, pipeline: P, advisor: A, notifier: N) -> Self {
        Self {
            config,
            pipeline,
            advisor,
            notifier,
        }
    }

    /// Handle one alarm event, producing exactly one terminal result.
    pub async fn handle(&self, event: &Value) -> ControllerResult {
        let event = match AlarmEvent::from_value(event) {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "rejecting malformed alarm event");
                return ControllerResult::from_error(&ControllerError::MalformedEvent(
                    e.to_string(),
                ));
            }
        };

        info!(alarm = %event.alarm_name, state = ?event.state, "alarm event received");

        if event.state != AlarmState::Alarm {
            info!(alarm = %event.alarm_name, "alarm not in ALARM state, no action needed");
            return ControllerResult::ok("No action taken.");
        }

        let Some(pipeline_name) = self.config.pipeline_name.clone() else {
            error!("target pipeline not configured, cannot roll back");
            return ControllerResult::from_error(&ControllerError::Configuration(
                "Pipeline name not configured.".to_string(),
            ));
        };

        let decision = match self.advise(&event).await {
            Ok(decision) => decision,
            Err(result) => return result,
        };

        if !decision.recommend {
            info!(rationale = %decision.rationale, "rollback not recommended");
            return ControllerResult::ok(format!(
                "Rollback not recommended: {}",
                decision.rationale
            ));
        }

        match self.trigger(&pipeline_name, &event).await {
            Ok(result) => result,
            Err(e) => {
                error!(alarm = %event.alarm_name, error = %e, "rollback not triggered");
                ControllerResult::from_error(&e)
            }
        }
    }

    /// Ask the advisor; on failure the configured policy decides whether
    /// the alarm alone is enough to proceed.
    async fn advise(&self, event: &AlarmEvent) -> Result<RollbackDecision, ControllerResult> {
        let ctx = AlarmContext {
            alarm_name: event.alarm_name.clone(),
            reason: event.reason.clone(),
        };

        match self.advisor.recommend(&ctx).await {
            Ok(decision) => {
                info!(
                    recommend = decision.recommend,
                    rationale = %decision.rationale,
                    "advisory decision received"
                );
                Ok(decision)
            }
            Err(e) => match self.config.advisor_failure_policy {
                AdvisorFailurePolicy::FailOpen => {
                    warn!(error = %e, "advisory unavailable, proceeding on the alarm alone");
                    Ok(RollbackDecision {
                        recommend: true,
                        rationale: "advisory unavailable, alarm state taken as signal".to_string(),
                    })
                }
                AdvisorFailurePolicy::FailClosed => {
                    warn!(error = %e, "advisory unavailable, holding off");
                    Err(ControllerResult::ok("Advisory unavailable; no action taken."))
                }
            },
        }
    }

    async fn trigger(
        &self,
        pipeline_name: &str,
        event: &AlarmEvent,
    ) -> Result<ControllerResult, ControllerError> {
        let recent = self
            .pipeline
            .list_recent_executions(pipeline_name, 1)
            .await
            .map_err(|e| ControllerError::RollbackTrigger(e.to_string()))?;

        let Some(latest) = recent.first() else {
            return Err(ControllerError::NoExecutionFound);
        };

        if latest.status != ExecutionStatus::Succeeded {
            let message = format!(
                "Alarm {} triggered but latest pipeline execution was {}. Manual investigation needed.",
                event.alarm_name, latest.status
            );
            info!(
                execution = %latest.execution_id,
                status = %latest.status,
                "latest execution did not succeed, leaving it alone"
            );
            return Ok(ControllerResult::ok(message));
        }

        info!(execution = %latest.execution_id, "rolling back latest successful execution");
        let new_id = self
            .pipeline
            .start_execution(pipeline_name)
            .await
            .map_err(|e| {
                ControllerError::RollbackTrigger(format!(
                    "Failed to initiate rollback for alarm {}. Error: {}",
                    event.alarm_name, e
                ))
            })?;

        let message = format!(
            "Rollback started for alarm {}. Execution ID: {}",
            event.alarm_name, new_id
        );
        info!(execution = %new_id, "rollback execution started");

        let topic = self.config.notify_topic.as_deref().unwrap_or("releases");
        publish_best_effort(&self.notifier, topic, "ROLLBACK STARTED", &message).await;

        Ok(ControllerResult::ok(message))
    }
}
