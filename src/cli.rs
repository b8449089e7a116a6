//! Command-line interface definition for Chatline
//!
//! The library is normally embedded in a host process; the binary offers
//! offline tooling around the scrollback engine and configuration.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chatline - conversation notifications for instant-messaging transports
#[derive(Parser, Debug, Clone)]
#[command(name = "chatline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Render the scrollback a new conversation with a partner would start with
    History {
        /// Account the conversation belongs to
        #[arg(short, long)]
        account: String,

        /// Partner identifier as stored in the log
        #[arg(short, long)]
        partner: String,

        /// Number of logged messages to fetch (defaults to scrollback.history_lines)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Conversation log database (overrides config and CHATLINE_LOG_DB)
        #[arg(long, env = "CHATLINE_LOG_DB")]
        db: Option<PathBuf>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print the effective configuration as YAML
    Config,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            command: Commands::Config,
        }
    }
}
