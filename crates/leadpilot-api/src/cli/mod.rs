//! CLI command definitions for the `leadpilot` binary.
//!
//! Uses clap derive macros. Every command reads the same TOML config, with
//! environment overrides applied on top.

pub mod check_config;
pub mod score;
pub mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Conversational sales agent: qualifies leads, books meetings, alerts the team.
#[derive(Parser)]
#[command(name = "leadpilot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, env = "LEADPILOT_CONFIG", default_value = "leadpilot.toml")]
    pub config: PathBuf,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP and WebSocket server.
    Serve {
        /// Host to bind to (overrides `server.host`).
        #[arg(long, env = "LEADPILOT_HOST")]
        host: Option<String>,

        /// Port to listen on (overrides `server.port` and `PORT`).
        #[arg(short, long)]
        port: Option<u16>,

        /// Emit JSON log lines.
        #[arg(long)]
        json_logs: bool,
    },

    /// Score a lead offline.
    Score {
        /// Upper bound of the budget in USD.
        #[arg(long)]
        budget_max: i64,

        /// Free-text timeline, e.g. "3 weeks".
        #[arg(long)]
        timeline: String,

        /// Buying authority: dm, influencer, unknown or no.
        #[arg(long)]
        authority: String,

        /// Project clarity 0-100 (defaults to `scoring.default_clarity`).
        #[arg(long, conflicts_with = "visitor")]
        clarity: Option<i64>,

        /// Estimate clarity from this visitor's stored transcript.
        #[arg(long)]
        visitor: Option<String>,
    },

    /// Show which integrations are live and which are simulated.
    #[command(name = "check-config")]
    CheckConfig,
}
