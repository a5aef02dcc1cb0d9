//! Webhook adapter for the [`Notifier`] interface.

use std::time::Duration;

use http::Method;
use serde_json::json;

use capstan_core::http::request_json;

use crate::{Notifier, NotifyError};

/// POSTs `{topic, subject, body}` to a configured URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Notifier for WebhookNotifier {
    async fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let payload = json!({
            "topic": topic,
            "subject": subject,
            "body": body,
        });
        request_json(Method::POST, &self.url, Some(&payload), self.timeout)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(())
    }
}
