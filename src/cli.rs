//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap. Discord
//! settings fall back to the same environment variables the service has
//! always been deployed with.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Statusfeed - live status, update and commit feed
///
/// Serves the current status banner, the latest update post and recent
/// commits over HTTP. Status and updates come from Discord, commits from
/// GitHub.
///
/// Examples:
///   statusfeed
///   statusfeed --listen 127.0.0.1:8080 --verbose
///   statusfeed --config ./statusfeed.toml --refresh-interval 300
///   statusfeed --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .statusfeed.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address for the HTTP server (default 0.0.0.0:3000)
    #[arg(short, long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub discord_token: Option<String>,

    /// Channel id carrying status commands
    #[arg(long, env = "DISCORD_STATUS_CHANNEL", value_name = "ID")]
    pub status_channel: Option<String>,

    /// Channel id whose latest image post is the current update
    #[arg(long, env = "DISCORD_UPDATES_CHANNEL", value_name = "ID")]
    pub updates_channel: Option<String>,

    /// Seconds between commit feed refreshes
    #[arg(long, value_name = "SECS")]
    pub refresh_interval: Option<u64>,

    /// Per-source commit fetch timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub fetch_timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .statusfeed.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.refresh_interval == Some(0) {
            return Err("Refresh interval must be at least 1 second".to_string());
        }

        if self.fetch_timeout == Some(0) {
            return Err("Fetch timeout must be at least 1 second".to_string());
        }

        if let Some(ref path) = self.config {
            if !path.is_file() {
                return Err(format!("Config file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Copy of the arguments that is safe to log.
    pub fn redacted(mut self) -> Self {
        if self.discord_token.is_some() {
            self.discord_token = Some("<redacted>".to_string());
        }
        self
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
