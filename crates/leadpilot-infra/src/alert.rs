//! Slack incoming-webhook alert sink for `notify_team`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::debug;

use leadpilot_core::integration::alert::{AlertDelivery, AlertSink, TeamAlert};
use leadpilot_types::config::AlertConfig;
use leadpilot_types::error::IntegrationError;

pub struct SlackWebhookAlerter {
    client: reqwest::Client,
    webhook_url: Option<SecretString>,
}

impl SlackWebhookAlerter {
    pub fn from_config(config: &AlertConfig) -> Result<Self, IntegrationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| IntegrationError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            webhook_url: config.slack_webhook_url.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }
}

/// Block Kit payload: a header with the priority emoji, the message itself,
/// then a context line with priority and send time.
pub fn slack_payload(alert: &TeamAlert) -> Value {
    let emoji = alert.priority.emoji();
    let priority = alert.priority.to_string().to_uppercase();
    json!({
        "text": format!("{emoji} Lead Alert - Priority: {priority}"),
        "blocks": [
            {
                "type": "header",
                "text": {"type": "plain_text", "text": format!("{emoji} New Lead Alert")}
            },
            {
                "type": "section",
                "text": {"type": "mrkdwn", "text": alert.message}
            },
            {
                "type": "context",
                "elements": [
                    {
                        "type": "mrkdwn",
                        "text": format!(
                            "*Priority:* {priority} | *Time:* {}",
                            alert.timestamp.format("%Y-%m-%d %H:%M UTC")
                        )
                    }
                ]
            }
        ]
    })
}

impl AlertSink for SlackWebhookAlerter {
    async fn send(&self, alert: &TeamAlert) -> Result<AlertDelivery, IntegrationError> {
        let Some(url) = &self.webhook_url else {
            return Ok(AlertDelivery::Skipped);
        };

        let response = self
            .client
            .post(url.expose_secret())
            .json(&slack_payload(alert))
            .send()
            .await
            .map_err(|e| IntegrationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(priority = %alert.priority, "slack alert delivered");
        Ok(AlertDelivery::Delivered)
    }
}
