//! Chatline - conversation notifications for instant-messaging transports
//!
#![doc = "Main entry point for the chatline tool."]

use anyhow::Result;

use chatline::cli::{Cli, Commands};
use chatline::commands;
use chatline::config::Config;
use chatline::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    init_logging(&config.logging)?;

    match cli.command {
        Commands::History {
            account,
            partner,
            limit,
            db,
            json,
        } => {
            tracing::debug!(account = %account, partner = %partner, "Rendering seeded scrollback");
            commands::history::show_history(&config, &account, &partner, limit, db, json).await?;
            Ok(())
        }
        Commands::Config => {
            commands::show_config(&config)?;
            Ok(())
        }
    }
}
