//! Terminal result of a handler invocation.

use serde::Serialize;

use crate::error::ControllerError;

/// Terminal output of any handler invocation.
///
/// Never partially populated: a handler produces exactly one of these per
/// invocation, success or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerResult {
    pub status_code: u16,
    pub message: String,
}

impl ControllerResult {
    /// Success result (200).
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            message: message.into(),
        }
    }

    /// Error result carrying the error's own message.
    pub fn from_error(err: &ControllerError) -> Self {
        Self {
            status_code: err.status_code(),
            message: err.to_string(),
        }
    }

    /// Error result with an explicit status and message.
    pub fn error(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// JSON body: `{"message": ...}` on success, `{"error": ...}` otherwise.
    pub fn body(&self) -> serde_json::Value {
        if self.is_success() {
            serde_json::json!({ "message": self.message })
        } else {
            serde_json::json!({ "error": self.message })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_result_body_uses_message_key() {
        let result = ControllerResult::ok("done");
        assert!(result.is_success());
        assert_eq!(result.body(), serde_json::json!({ "message": "done" }));
    }

    #[test]
    fn error_result_body_uses_error_key() {
        let result = ControllerResult::error(500, "boom");
        assert!(!result.is_success());
        assert_eq!(result.body(), serde_json::json!({ "error": "boom" }));
    }

    #[test]
    fn from_error_maps_status() {
        let result = ControllerResult::from_error(&ControllerError::NoExecutionFound);
        assert_eq!(result.status_code, 404);
        assert_eq!(result.message, "No pipeline executions found.");
    }
}
