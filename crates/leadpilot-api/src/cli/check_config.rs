//! Configuration check: which collaborators are live and which run in
//! simulation or no-op mode. Secrets are never printed.

use std::path::Path;

use anyhow::Result;
use console::style;
use serde::Serialize;

use leadpilot_types::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Live,
    Simulated,
    Disabled,
}

#[derive(Debug, Serialize)]
pub struct IntegrationStatus {
    pub name: &'static str,
    pub mode: Mode,
    pub detail: String,
}

pub fn integration_report(config: &AppConfig) -> Vec<IntegrationStatus> {
    let llm = if config.llm.api_key.is_some() {
        IntegrationStatus {
            name: "llm",
            mode: Mode::Live,
            detail: format!("{} at {}", config.llm.model, config.llm.base_url),
        }
    } else {
        IntegrationStatus {
            name: "llm",
            mode: Mode::Disabled,
            detail: format!("no API key, requests to {} are unauthenticated", config.llm.base_url),
        }
    };

    let calendar = if config.calendar.access_token.is_some() {
        IntegrationStatus {
            name: "calendar",
            mode: Mode::Live,
            detail: format!("calendar '{}'", config.calendar.calendar_id),
        }
    } else {
        IntegrationStatus {
            name: "calendar",
            mode: Mode::Simulated,
            detail: "no access token, bookings return sim- event ids".to_string(),
        }
    };

    let email = match (&config.email.username, &config.email.password) {
        (Some(_), Some(_)) => IntegrationStatus {
            name: "email",
            mode: Mode::Live,
            detail: format!(
                "{}:{} as {}",
                config.email.smtp_host, config.email.smtp_port, config.email.from_email
            ),
        },
        _ => IntegrationStatus {
            name: "email",
            mode: Mode::Disabled,
            detail: "no SMTP credentials, confirmations are skipped".to_string(),
        },
    };

    let alert = if config.alert.slack_webhook_url.is_some() {
        IntegrationStatus {
            name: "alert",
            mode: Mode::Live,
            detail: "Slack webhook".to_string(),
        }
    } else {
        IntegrationStatus {
            name: "alert",
            mode: Mode::Disabled,
            detail: "no webhook, alerts are logged only".to_string(),
        }
    };

    vec![llm, calendar, email, alert]
}

pub async fn check_config(path: &Path, config: &AppConfig, json: bool) -> Result<()> {
    let source = match leadpilot_infra::config::read_config(path).await {
        Ok(_) => format!("{}", path.display()),
        Err(e) if path.exists() => format!("{} (ignored: {e})", path.display()),
        Err(_) => "defaults (no config file)".to_string(),
    };
    let integrations = integration_report(config);

    if json {
        let report = serde_json::json!({
            "source": source,
            "server": format!("{}:{}", config.server.host, config.server.port),
            "database": config.database.url,
            "session": {
                "max_turns": config.session.max_turns,
                "ttl_secs": config.session.ttl_secs,
            },
            "integrations": integrations,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Leadpilot v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("  Config: {}", style(&source).dim());
    println!();

    println!("  {}", style("── Server ──").dim());
    println!("  Listen:   {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.database.url);
    println!(
        "  Sessions: last {} turns, {}s TTL",
        config.session.max_turns, config.session.ttl_secs
    );
    println!();

    println!("  {}", style("── Integrations ──").dim());
    for status in &integrations {
        let mode = match status.mode {
            Mode::Live => style(format!("{:<10}", "live")).green(),
            Mode::Simulated => style(format!("{:<10}", "simulated")).yellow(),
            Mode::Disabled => style(format!("{:<10}", "off")).dim(),
        };
        println!("  {:<9} {mode} {}", status.name, status.detail);
    }
    println!();

    Ok(())
}
