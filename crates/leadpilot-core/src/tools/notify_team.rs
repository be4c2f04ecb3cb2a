//! `notify_team`: push an alert to the sales team channel.

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{info, warn};

use leadpilot_types::error::IntegrationError;
use leadpilot_types::tool::{ToolName, ToolResult};

use super::args;
use super::{ToolContext, ToolHandler};
use crate::integration::alert::{AlertDelivery, AlertPriority, AlertSink, TeamAlert};

pub struct NotifyTeamTool<A> {
    alerts: A,
}

impl<A: AlertSink> NotifyTeamTool<A> {
    pub fn new(alerts: A) -> Self {
        Self { alerts }
    }
}

impl<A: AlertSink> ToolHandler for NotifyTeamTool<A> {
    fn name(&self) -> ToolName {
        ToolName::NotifyTeam
    }

    async fn execute(&self, ctx: &ToolContext, args: &Value) -> ToolResult {
        let Some(message) = args::string(args, "message") else {
            return ToolResult::failure("Message is required");
        };
        let priority = args::string(args, "priority")
            .and_then(|p| p.parse::<AlertPriority>().ok())
            .unwrap_or_default();
        let alert = TeamAlert {
            message,
            priority,
            timestamp: Utc::now(),
        };
        let timestamp = alert.timestamp.to_rfc3339();

        match self.alerts.send(&alert).await {
            Ok(AlertDelivery::Delivered) => {
                info!(visitor_id = %ctx.visitor_id, %priority, "team notified");
                ToolResult::success(json!({
                    "priority": priority.to_string(),
                    "timestamp": timestamp,
                }))
            }
            Ok(AlertDelivery::Skipped) => {
                info!(
                    visitor_id = %ctx.visitor_id,
                    %priority,
                    message = %alert.message,
                    "alert channel not configured, alert logged only"
                );
                ToolResult::success(json!({
                    "priority": priority.to_string(),
                    "timestamp": timestamp,
                    "delivered": false,
                }))
            }
            Err(IntegrationError::Rejected { status, body }) => {
                warn!(visitor_id = %ctx.visitor_id, status, %body, "alert endpoint rejected alert");
                ToolResult::failure(format!("alert endpoint returned {status}"))
            }
            Err(e) => {
                warn!(visitor_id = %ctx.visitor_id, error = %e, "alert delivery failed");
                ToolResult::failure(format!("Alert delivery failed: {e}"))
            }
        }
    }
}
