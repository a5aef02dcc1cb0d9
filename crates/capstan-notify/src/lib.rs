//! capstan-notify — notification sink.
//!
//! Handlers publish through [`publish_best_effort`]: delivery failures
//! are logged at warn level and never propagate into the control flow.

pub mod webhook;

pub use webhook::WebhookNotifier;

use std::future::Future;

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Deliver a notification to a topic.
pub trait Notifier {
    fn publish(
        &self,
        topic: &str,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Publish and swallow any failure with a warning.
pub async fn publish_best_effort<N: Notifier>(notifier: &N, topic: &str, subject: &str, body: &str) {
    if let Err(e) = notifier.publish(topic, subject, body).await {
        warn!(topic, subject, error = %e, "notification failed");
    }
}

/// Structured-log delivery. Always available; the default sink.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        info!(topic, subject, body, "notification");
        Ok(())
    }
}

/// Runtime-selected sink.
pub enum AnyNotifier {
    Log(LogNotifier),
    Webhook(WebhookNotifier),
}

impl AnyNotifier {
    /// Webhook delivery when a URL is configured, log delivery otherwise.
    pub fn from_webhook_url(url: Option<String>) -> Self {
        match url {
            Some(url) => AnyNotifier::Webhook(WebhookNotifier::new(url)),
            None => AnyNotifier::Log(LogNotifier),
        }
    }
}

impl Notifier for AnyNotifier {
    async fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        match self {
            AnyNotifier::Log(n) => n.publish(topic, subject, body).await,
            AnyNotifier::Webhook(n) => n.publish(topic, subject, body).await,
        }
    }
}
