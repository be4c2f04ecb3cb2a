//! Team alert port used by `notify_team`.

use chrono::{DateTime, Utc};
use leadpilot_types::error::IntegrationError;
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl AlertPriority {
    pub fn emoji(&self) -> &'static str {
        match self {
            AlertPriority::Low => "ℹ️",
            AlertPriority::Normal => "📋",
            AlertPriority::High => "🔥",
        }
    }
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertPriority::Low => write!(f, "low"),
            AlertPriority::Normal => write!(f, "normal"),
            AlertPriority::High => write!(f, "high"),
        }
    }
}

impl FromStr for AlertPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(AlertPriority::Low),
            "normal" | "medium" => Ok(AlertPriority::Normal),
            "high" | "urgent" => Ok(AlertPriority::High),
            other => Err(format!("invalid alert priority: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamAlert {
    pub message: String,
    pub priority: AlertPriority,
    pub timestamp: DateTime<Utc>,
}

/// Whether an alert actually left the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDelivery {
    Delivered,
    /// No alert channel is configured; the alert was only logged.
    Skipped,
}

pub trait AlertSink: Send + Sync {
    /// Post an alert. A non-2xx answer is [`IntegrationError::Rejected`].
    fn send(
        &self,
        alert: &TeamAlert,
    ) -> impl std::future::Future<Output = Result<AlertDelivery, IntegrationError>> + Send;
}
