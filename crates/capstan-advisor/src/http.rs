//! HTTP model adapter for the [`Advisor`] interface.

use std::time::Duration;

use http::Method;
use serde_json::{Value, json};
use tracing::debug;

use capstan_core::http::request_json;

use crate::{AdvisorError, AlarmContext, Advisor, RollbackDecision, parse_decision};

/// Posts `{modelId, prompt, ...}` to a model endpoint and reads the
/// verdict out of the returned `completion` text.
#[derive(Debug, Clone)]
pub struct HttpAdvisor {
    url: String,
    model_id: String,
    timeout: Duration,
}

impl HttpAdvisor {
    pub fn new(url: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            model_id: model_id.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn prompt(ctx: &AlarmContext) -> String {
    format!(
        "An alarm '{}' has triggered with reason: '{}'. This alarm monitors \
         a banking API deployment on a managed cluster. The most likely cause \
         is a recent code deployment that introduced a bug causing HTTP 500 \
         errors. Should we roll back the deployment? Respond ONLY with a \
         valid JSON object in this exact format: \
         {{\"analysis\": \"A one-sentence summary of the likely problem based \
         on the reason.\", \"recommendation\": \"ROLLBACK\"}}",
        ctx.alarm_name, ctx.reason
    )
}

impl Advisor for HttpAdvisor {
    async fn recommend(&self, ctx: &AlarmContext) -> Result<RollbackDecision, AdvisorError> {
        let body = json!({
            "modelId": self.model_id,
            "prompt": prompt(ctx),
            "maxTokens": 500,
            "temperature": 0.5,
        });

        let value = request_json(Method::POST, &self.url, Some(&body), self.timeout)
            .await
            .map_err(|e| AdvisorError::Request(e.to_string()))?;

        let completion = value
            .get("completion")
            .and_then(Value::as_str)
            .ok_or_else(|| AdvisorError::MalformedResponse("missing `completion`".to_string()))?;

        debug!(alarm = %ctx.alarm_name, completion, "advisory completion received");
        parse_decision(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_alarm_context() {
        let ctx = AlarmContext {
            alarm_name: "5xxAlarm".to_string(),
            reason: "high error rate".to_string(),
        };
        let text = prompt(&ctx);
        assert!(text.contains("5xxAlarm"));
        assert!(text.contains("high error rate"));
        assert!(text.contains("ROLLBACK"));
    }
}
