//! Configuration loader for Leadpilot.
//!
//! Reads a TOML file into [`AppConfig`], falling back to defaults when the
//! file is missing or malformed, then applies environment overrides for
//! secrets and deployment-specific values.

use std::path::Path;

use secrecy::SecretString;

use leadpilot_types::config::AppConfig;
use leadpilot_types::error::ConfigError;

/// Parse a TOML document. Missing sections and keys take their defaults.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Read and parse `path`, reporting any failure instead of defaulting.
pub async fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
    parse_config(&content)
}

/// Load configuration from `path` without environment overrides.
///
/// - Missing file: defaults.
/// - Unreadable or unparseable file: a warning and defaults.
pub async fn load_config(path: &Path) -> AppConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return AppConfig::default();
        }
    };

    match parse_config(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            AppConfig::default()
        }
    }
}

/// Load `path` and apply overrides from the process environment.
pub async fn load_config_from_env(path: &Path) -> AppConfig {
    let mut config = load_config(path).await;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Apply environment overrides read through `lookup`. Blank values are ignored.
pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let secret = |key: &str| get(key).map(SecretString::from);

    if let Some(key) = secret("OPENAI_API_KEY") {
        config.llm.api_key = Some(key);
    }
    if let Some(url) = get("OPENAI_BASE_URL") {
        config.llm.base_url = url;
    }
    if let Some(model) = get("OPENAI_MODEL") {
        config.llm.model = model;
    }
    if let Some(url) = get("DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(port) = get("PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(e) => tracing::warn!(value = %port, error = %e, "ignoring invalid PORT"),
        }
    }
    if let Some(token) = secret("GOOGLE_CALENDAR_TOKEN") {
        config.calendar.access_token = Some(token);
    }
    if let Some(host) = get("SMTP_HOST") {
        config.email.smtp_host = host;
    }
    if let Some(port) = get("SMTP_PORT") {
        match port.parse() {
            Ok(port) => config.email.smtp_port = port,
            Err(e) => tracing::warn!(value = %port, error = %e, "ignoring invalid SMTP_PORT"),
        }
    }
    if let Some(username) = get("SMTP_USERNAME") {
        config.email.username = Some(username);
    }
    if let Some(password) = secret("SMTP_PASSWORD") {
        config.email.password = Some(password);
    }
    if let Some(from) = get("FROM_EMAIL") {
        config.email.from_email = from;
    }
    if let Some(url) = secret("SLACK_WEBHOOK_URL") {
        config.alert.slack_webhook_url = Some(url);
    }
}
