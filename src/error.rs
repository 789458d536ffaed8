//! Error types.
//!
//! Process-level code works with `anyhow`; the module boundaries below
//! report typed errors so callers can tell fatal failures from transient
//! ones.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Invalid or incomplete configuration. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingValue(&'static str),

    #[error("{name} is not a valid Discord channel id: {value:?}")]
    InvalidChannelId { name: &'static str, value: String },

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failure of a single commit source during one aggregation run.
///
/// Never fatal; the source contributes no records for that run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("upstream returned {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("no response within {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Failure talking to the chat platform.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("failed to connect to chat platform")]
    Connect(#[source] serenity::Error),

    #[error("failed to read history of channel {channel}")]
    History {
        channel: String,
        #[source]
        source: serenity::Error,
    },

    #[error("not a valid Discord id: {0:?}")]
    InvalidId(String),

    #[error("unsupported reaction emoji: {0:?}")]
    InvalidEmoji(String),

    #[error("failed to add reaction")]
    Reaction(#[source] serenity::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_setting() {
        let err = ConfigError::MissingValue("discord token");
        assert_eq!(err.to_string(), "missing required setting: discord token");

        let err = ConfigError::InvalidChannelId {
            name: "status channel",
            value: "general".to_string(),
        };
        assert!(err.to_string().contains("\"general\""));
    }

    #[test]
    fn test_timeout_message() {
        let err = FetchError::Timeout(Duration::from_secs(20));
        assert_eq!(err.to_string(), "no response within 20s");
    }

    #[test]
    fn test_history_error_keeps_source() {
        use std::error::Error as _;

        let err = ChatError::History {
            channel: "100".to_string(),
            source: serenity::Error::Other("Missing Access"),
        };
        assert_eq!(err.to_string(), "failed to read history of channel 100");
        assert_eq!(err.source().unwrap().to_string(), "Missing Access");
    }
}
