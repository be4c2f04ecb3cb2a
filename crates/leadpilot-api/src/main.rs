//! Leadpilot server and CLI entry point.
//!
//! Binary name: `leadpilot`
//!
//! Parses CLI arguments, loads configuration, installs tracing, then runs the
//! selected command.

mod cli;
mod http;
mod state;

use clap::Parser;

use leadpilot_infra::config::{load_config_from_env, read_config};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging settings come from the file alone so the subscriber is in
    // place before the full load reports problems with it.
    let mut logging = read_config(&cli.config)
        .await
        .map(|config| config.logging)
        .unwrap_or_default();
    if let Commands::Serve { json_logs: true, .. } = &cli.command {
        logging.json = true;
    }
    leadpilot_observe::init_tracing(&logging)?;

    let mut config = load_config_from_env(&cli.config).await;
    config.logging = logging;

    let result = match cli.command {
        Commands::Serve { host, port, .. } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cli::serve::serve(config).await
        }

        Commands::Score {
            budget_max,
            timeline,
            authority,
            clarity,
            visitor,
        } => {
            cli::score::score(
                &config,
                budget_max,
                &timeline,
                &authority,
                clarity,
                visitor.as_deref(),
                cli.json,
            )
            .await
        }

        Commands::CheckConfig => cli::check_config::check_config(&cli.config, &config, cli.json).await,
    };

    leadpilot_observe::shutdown_tracing();
    result
}
