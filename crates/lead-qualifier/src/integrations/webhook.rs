use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::json;

use super::http::{build_client, classify_error, describe_failure, FailureKind, IntegrationError};
use crate::workflows::intake::{Notification, NotificationError, Notifier};

/// Posts notifications as JSON to a relay (mail gateway, chat bridge) that renders them.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, IntegrationError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        let payload = json!({
            "recipient": notification.recipient,
            "subject": notification.template.subject(),
            "template": notification.template,
            "lead_id": notification.lead_id,
            "context": notification.context,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|error| notification_error(classify_error(&error), error.to_string()))?;

        if !response.status().is_success() {
            let (kind, detail) = describe_failure(response);
            return Err(notification_error(kind, detail));
        }

        tracing::debug!(
            lead_id = %notification.lead_id,
            template = ?notification.template,
            "notification relayed"
        );
        Ok(())
    }
}

fn notification_error(kind: FailureKind, detail: String) -> NotificationError {
    match kind {
        FailureKind::Transient => NotificationError::Transport(detail),
        FailureKind::Permanent => NotificationError::Rejected(detail),
    }
}
