//! Inbound event envelopes.
//!
//! Events arrive as JSON envelopes from the event dispatcher; the
//! controller reads a handful of `detail` fields and ignores the rest.
//! A missing field is reported before any side effect occurs.

use serde_json::Value;
use thiserror::Error;

/// Errors extracting a typed event from its envelope.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

/// State of a pipeline execution as reported by the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Succeeded,
    Failed,
    Other(String),
}

impl PipelineState {
    fn parse(s: &str) -> Self {
        match s {
            "SUCCEEDED" => PipelineState::Succeeded,
            "FAILED" => PipelineState::Failed,
            other => PipelineState::Other(other.to_string()),
        }
    }
}

/// A release-pipeline state-change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineEvent {
    pub pipeline: String,
    pub execution_id: String,
    pub state: PipelineState,
}

impl PipelineEvent {
    /// Extract the event from its JSON envelope.
    pub fn from_value(event: &Value) -> Result<Self, EventError> {
        let detail = event
            .get("detail")
            .ok_or(EventError::MissingField("detail"))?;
        let pipeline = str_field(detail, "pipeline", "detail.pipeline")?;
        let execution_id = str_field(detail, "execution-id", "detail.execution-id")?;
        let state = str_field(detail, "state", "detail.state")?;
        Ok(Self {
            pipeline,
            execution_id,
            state: PipelineState::parse(&state),
        })
    }
}

/// Alarm state reported by the monitoring system.
///
/// Values outside the known set parse as `Other`; only `Alarm` triggers
/// rollback analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmState {
    Alarm,
    Ok,
    InsufficientData,
    Other(String),
}

impl AlarmState {
    fn parse(s: &str) -> Self {
        match s {
            "ALARM" => AlarmState::Alarm,
            "OK" => AlarmState::Ok,
            "INSUFFICIENT_DATA" => AlarmState::InsufficientData,
            other => AlarmState::Other(other.to_string()),
        }
    }
}

/// An alarm state-change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmEvent {
    pub alarm_name: String,
    pub state: AlarmState,
    pub reason: String,
}

impl AlarmEvent {
    /// Extract the event from its JSON envelope.
    pub fn from_value(event: &Value) -> Result<Self, EventError> {
        let alarm = event
            .pointer("/detail/alarmData")
            .ok_or(EventError::MissingField("detail.alarmData"))?;
        let alarm_name = str_field(alarm, "alarmName", "detail.alarmData.alarmName")?;
        let state = alarm
            .get("state")
            .ok_or(EventError::MissingField("detail.alarmData.state"))?;
        let value = str_field(state, "value", "detail.alarmData.state.value")?;
        let reason = str_field(state, "reason", "detail.alarmData.state.reason")?;
        Ok(Self {
            alarm_name,
            state: AlarmState::parse(&value),
            reason,
        })
    }
}

fn str_field(obj: &Value, key: &str, path: &'static str) -> Result<String, EventError> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(EventError::MissingField(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pipeline_event_parses_full_envelope() {
        let event = json!({
            "detail": {
                "pipeline": "bank-api",
                "execution-id": "ex-1",
                "state": "SUCCEEDED"
            }
        });
        let parsed = PipelineEvent::from_value(&event).unwrap();
        assert_eq!(parsed.pipeline, "bank-api");
        assert_eq!(parsed.execution_id, "ex-1");
        assert_eq!(parsed.state, PipelineState::Succeeded);
    }

    #[test]
    fn pipeline_event_unknown_state_is_other() {
        let event = json!({
            "detail": {
                "pipeline": "p",
                "execution-id": "e",
                "state": "SUPERSEDED"
            }
        });
        let parsed = PipelineEvent::from_value(&event).unwrap();
        assert_eq!(parsed.state, PipelineState::Other("SUPERSEDED".to_string()));
    }

    #[test]
    fn pipeline_event_missing_execution_id() {
        let event = json!({
            "detail": { "pipeline": "p", "state": "SUCCEEDED" }
        });
        let err = PipelineEvent::from_value(&event).unwrap_err();
        assert_eq!(err.to_string(), "missing field `detail.execution-id`");
    }

    #[test]
    fn pipeline_event_missing_detail() {
        let err = PipelineEvent::from_value(&json!({})).unwrap_err();
        assert_eq!(err.to_string(), "missing field `detail`");
    }

    #[test]
    fn pipeline_event_non_string_field_is_missing() {
        let event = json!({
            "detail": { "pipeline": 7, "execution-id": "e", "state": "SUCCEEDED" }
        });
        assert!(PipelineEvent::from_value(&event).is_err());
    }

    #[test]
    fn alarm_event_parses_full_envelope() {
        let event = json!({
            "detail": {
                "alarmData": {
                    "alarmName": "5xxAlarm",
                    "state": { "value": "ALARM", "reason": "high error rate" }
                }
            }
        });
        let parsed = AlarmEvent::from_value(&event).unwrap();
        assert_eq!(parsed.alarm_name, "5xxAlarm");
        assert_eq!(parsed.state, AlarmState::Alarm);
        assert_eq!(parsed.reason, "high error rate");
    }

    #[test]
    fn alarm_event_ok_state() {
        let event = json!({
            "detail": {
                "alarmData": {
                    "alarmName": "a",
                    "state": { "value": "OK", "reason": "recovered" }
                }
            }
        });
        assert_eq!(AlarmEvent::from_value(&event).unwrap().state, AlarmState::Ok);
    }

    #[test]
    fn alarm_event_missing_reason() {
        let event = json!({
            "detail": {
                "alarmData": {
                    "alarmName": "a",
                    "state": { "value": "ALARM" }
                }
            }
        });
        let err = AlarmEvent::from_value(&event).unwrap_err();
        assert_eq!(err.to_string(), "missing field `detail.alarmData.state.reason`");
    }

    #[test]
    fn alarm_event_unknown_state_is_other() {
        let event = json!({
            "detail": {
                "alarmData": {
                    "alarmName": "a",
                    "state": { "value": "PENDING", "reason": "r" }
                }
            }
        });
        assert_eq!(
            AlarmEvent::from_value(&event).unwrap().state,
            AlarmState::Other("PENDING".to_string())
        );
    }
}
