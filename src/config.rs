//! Configuration file handling.
//!
//! This module handles loading `.statusfeed.toml`, merging command-line
//! and environment overrides, and validating the result before startup.

use crate::chat::Channels;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".statusfeed.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Discord settings.
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Commit feed settings.
    #[serde(default)]
    pub commits: CommitsConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

/// Discord settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token. Only taken from the environment or the command line.
    #[serde(skip)]
    pub token: String,

    /// Channel carrying `--status-set` / `--status-remove` commands.
    #[serde(default)]
    pub status_channel: String,

    /// Channel whose latest image post is served as the update.
    #[serde(default)]
    pub updates_channel: String,

    /// Messages read per channel at startup.
    #[serde(default = "default_history_limit")]
    pub history_limit: u8,

    /// Reaction added to acknowledge a status command.
    #[serde(default = "default_ack_emoji")]
    pub ack_emoji: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            status_channel: String::new(),
            updates_channel: String::new(),
            history_limit: default_history_limit(),
            ack_emoji: default_ack_emoji(),
        }
    }
}

fn default_history_limit() -> u8 {
    50
}

fn default_ack_emoji() -> String {
    "✅".to_string()
}

/// Commit feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitsConfig {
    /// GitHub commit list endpoints.
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    /// `per_page` sent to every source.
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Maximum number of commits served.
    #[serde(default = "default_feed_limit")]
    pub feed_limit: usize,

    /// Seconds between refreshes, counted from the end of the previous one.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Per-source request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// User-Agent sent upstream (GitHub rejects requests without one).
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CommitsConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            per_page: default_per_page(),
            feed_limit: default_feed_limit(),
            refresh_interval_secs: default_refresh_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_sources() -> Vec<String> {
    [
        "ScratchTurbo-Home",
        "ScratchTurbo-API",
        "ScratchTurbo-BasicAPI",
        "ScratchTurbo-Docs",
        "ScratchTurbo-ObjectLibraries",
        "ScratchTurbo-Packager",
        "ScratchTurbo-Studios",
    ]
    .into_iter()
    .map(|repo| format!("https://api.github.com/repos/ScratchTurbo/{}/commits", repo))
    .collect()
}

fn default_per_page() -> u32 {
    50
}

fn default_feed_limit() -> usize {
    crate::commits::aggregator::DEFAULT_FEED_LIMIT
}

fn default_refresh_interval() -> u64 {
    15 * 60
}

fn default_fetch_timeout() -> u64 {
    20
}

fn default_user_agent() -> String {
    format!("statusfeed/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>, ConfigError> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Arguments (and the environment variables behind them) take
    /// precedence; unset arguments leave the file value alone.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(listen) = args.listen {
            self.server.listen = listen;
        }

        if let Some(ref token) = args.discord_token {
            self.discord.token = token.clone();
        }
        if let Some(ref channel) = args.status_channel {
            self.discord.status_channel = channel.clone();
        }
        if let Some(ref channel) = args.updates_channel {
            self.discord.updates_channel = channel.clone();
        }

        if let Some(secs) = args.refresh_interval {
            self.commits.refresh_interval_secs = secs;
        }
        if let Some(secs) = args.fetch_timeout {
            self.commits.fetch_timeout_secs = secs;
        }
    }

    /// Check everything startup depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discord.token.trim().is_empty() {
            return Err(ConfigError::MissingValue("discord token (DISCORD_TOKEN)"));
        }

        validate_channel("status channel (DISCORD_STATUS_CHANNEL)", &self.discord.status_channel)?;
        validate_channel("updates channel (DISCORD_UPDATES_CHANNEL)", &self.discord.updates_channel)?;

        if self.discord.history_limit == 0 || self.discord.history_limit > 100 {
            return Err(ConfigError::InvalidValue {
                name: "discord.history_limit",
                reason: "must be between 1 and 100".to_string(),
            });
        }
        if self.commits.refresh_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "commits.refresh_interval_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.commits.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "commits.fetch_timeout_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.commits.feed_limit == 0 {
            return Err(ConfigError::InvalidValue {
                name: "commits.feed_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(bad) = self
            .commits
            .sources
            .iter()
            .find(|s| !s.starts_with("http://") && !s.starts_with("https://"))
        {
            return Err(ConfigError::InvalidValue {
                name: "commits.sources",
                reason: format!("not an http(s) URL: {}", bad),
            });
        }

        Ok(())
    }

    pub fn channels(&self) -> Channels {
        Channels {
            status: self.discord.status_channel.clone(),
            updates: self.discord.updates_channel.clone(),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.commits.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.commits.fetch_timeout_secs)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

fn validate_channel(name: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingValue(name));
    }
    match value.parse::<u64>() {
        Ok(id) if id != 0 => Ok(()),
        _ => Err(ConfigError::InvalidChannelId {
            name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.discord.token = "token".to_string();
        config.discord.status_channel = "1118293837773807657".to_string();
        config.discord.updates_channel = "1118293837773807658".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.commits.sources.len(), 7);
        assert_eq!(config.commits.per_page, 50);
        assert_eq!(config.commits.feed_limit, 200);
        assert_eq!(config.refresh_interval(), Duration::from_secs(900));
        assert_eq!(config.discord.history_limit, 50);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[server]
listen = "127.0.0.1:8080"

[discord]
status_channel = "10"
updates_channel = "20"

[commits]
sources = ["https://api.github.com/repos/o/r/commits"]
refresh_interval_secs = 60
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.discord.status_channel, "10");
        assert_eq!(config.discord.ack_emoji, "✅");
        assert_eq!(config.commits.sources.len(), 1);
        assert_eq!(config.commits.refresh_interval_secs, 60);
        assert_eq!(config.commits.per_page, 50);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[commits]\nfeed_limit = 25").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.commits.feed_limit, 25);

        writeln!(file, "not toml at all [").unwrap();
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validate_requires_discord_settings() {
        assert!(valid_config().validate().is_ok());

        let mut config = valid_config();
        config.discord.token = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingValue(_))));

        let mut config = valid_config();
        config.discord.status_channel = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::MissingValue(_))));

        let mut config = valid_config();
        config.discord.updates_channel = "updates".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidChannelId { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = valid_config();
        config.commits.refresh_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.commits.sources.push("ftp://example.com".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_never_serialized() {
        let toml_str = toml::to_string_pretty(&valid_config()).unwrap();
        assert!(!toml_str.contains("token"));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[discord]"));
        assert!(toml_str.contains("[commits]"));
    }
}
