//! capstan-advisor — advisory collaborator.
//!
//! Given an alarm's name and reason, the advisor returns a
//! [`RollbackDecision`]. The shipped adapter asks a language model over
//! HTTP; the parser tolerates prose around the verdict but reports
//! malformed responses as errors so the handler's failure policy can
//! decide what happens next.

pub mod http;

pub use http::HttpAdvisor;

use std::future::Future;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("advisory request failed: {0}")]
    Request(String),

    #[error("malformed advisory response: {0}")]
    MalformedResponse(String),
}

/// Alarm context handed to the advisor.
#[derive(Debug, Clone)]
pub struct AlarmContext {
    pub alarm_name: String,
    pub reason: String,
}

/// Advisory verdict on whether to roll back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackDecision {
    pub recommend: bool,
    pub rationale: String,
}

/// Produce rollback recommendations from alarm context.
pub trait Advisor {
    fn recommend(
        &self,
        ctx: &AlarmContext,
    ) -> impl Future<Output = Result<RollbackDecision, AdvisorError>> + Send;
}

/// Fish the advisory verdict out of free-form completion text.
///
/// The model is asked for `{"analysis": ..., "recommendation": "ROLLBACK"}`
/// but wraps it in prose often enough that the parser scans for the
/// outermost object instead of trusting the whole completion.
pub fn parse_decision(completion: &str) -> Result<RollbackDecision, AdvisorError> {
    let start = completion.find('{').ok_or_else(|| {
        AdvisorError::MalformedResponse("no JSON object in completion".to_string())
    })?;
    let end = completion
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| {
            AdvisorError::MalformedResponse("no JSON object in completion".to_string())
        })?;

    let value: Value = serde_json::from_str(&completion[start..=end])
        .map_err(|e| AdvisorError::MalformedResponse(e.to_string()))?;

    let recommendation = value
        .get("recommendation")
        .and_then(Value::as_str)
        .ok_or_else(|| AdvisorError::MalformedResponse("missing `recommendation`".to_string()))?;
    let rationale = value
        .get("analysis")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(RollbackDecision {
        recommend: recommendation == "ROLLBACK",
        rationale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_json_parses() {
        let decision = parse_decision(
            "{\"analysis\": \"recent deploy is failing\", \"recommendation\": \"ROLLBACK\"}",
        )
        .unwrap();
        assert!(decision.recommend);
        assert_eq!(decision.rationale, "recent deploy is failing");
    }

    #[test]
    fn verdict_wrapped_in_prose_parses() {
        let completion = "Here is my assessment:\n{\"analysis\": \"looks bad\", \"recommendation\": \"ROLLBACK\"}\nLet me know.";
        let decision = parse_decision(completion).unwrap();
        assert!(decision.recommend);
    }

    #[test]
    fn non_rollback_recommendation() {
        let decision = parse_decision(
            "{\"analysis\": \"transient spike\", \"recommendation\": \"OBSERVE\"}",
        )
        .unwrap();
        assert!(!decision.recommend);
        assert_eq!(decision.rationale, "transient spike");
    }

    #[test]
    fn missing_recommendation_is_malformed() {
        let err = parse_decision("{\"analysis\": \"hmm\"}").unwrap_err();
        assert!(matches!(err, AdvisorError::MalformedResponse(_)));
    }

    #[test]
    fn no_json_object_is_malformed() {
        let err = parse_decision("I cannot answer that.").unwrap_err();
        assert!(matches!(err, AdvisorError::MalformedResponse(_)));
    }

    #[test]
    fn missing_analysis_defaults_to_empty_rationale() {
        let decision = parse_decision("{\"recommendation\": \"ROLLBACK\"}").unwrap();
        assert!(decision.recommend);
        assert_eq!(decision.rationale, "");
    }
}
