//! Notification collaborator. The services only see `notify(target,
//! payload) -> success/failure`; delivery details live behind the trait.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;

use crate::error::AppError;

/// Either the shared channel (due-date broadcasts, celebrations) or a
/// single user (work-session reminders).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyTarget {
    Channel,
    User(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, target: &NotifyTarget, message: &str) -> Result<(), AppError>;
}

/// Posts payloads to a Discord-compatible webhook. User-targeted messages
/// land in the same channel with the user mentioned in the rendered text.
pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self { client, webhook_url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, _target: &NotifyTarget, message: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&json!({ "content": message }))
            .send()
            .await
            .map_err(|e| AppError::Notify(format!("webhook request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Notify(format!("webhook error {status}: {body}")));
        }
        Ok(())
    }
}

/// Logs instead of delivering. Used when no webhook is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, target: &NotifyTarget, message: &str) -> Result<(), AppError> {
        info!(?target, "notification (no webhook configured): {}", message);
        Ok(())
    }
}
