//! Chat command ingestion.
//!
//! Messages arrive from the chat platform adapter as [`ChatMessage`]
//! values. The [`Ingester`] recognizes status commands on the status
//! channel and image posts on the update channel, and publishes the
//! resulting values into [`LiveState`]. Everything else is ignored.

pub mod discord;

use crate::error::ChatError;
use crate::models::{Status, Update};
use crate::state::LiveState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Command token that sets a warning banner.
pub const STATUS_SET: &str = "--status-set";
/// Command token that clears the banner.
pub const STATUS_REMOVE: &str = "--status-remove";

/// Author of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatAuthor {
    pub id: String,
    pub username: String,
    pub avatar_url: String,
}

/// File attached to a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
}

/// A chat message as delivered by the platform adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub guild_id: String,
    pub channel_id: String,
    pub timestamp: DateTime<Utc>,
    pub edited_timestamp: Option<DateTime<Utc>>,
    pub author: ChatAuthor,
    /// Raw text, mentions still encoded as `<@id>`.
    pub content: String,
    /// Text with mentions replaced by `@username`.
    pub clean_content: String,
    pub attachments: Vec<Attachment>,
}

/// The two channels the ingester listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channels {
    pub status: String,
    pub updates: String,
}

/// Recognized status command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCommand {
    Set(String),
    Remove,
}

impl StatusCommand {
    /// Recognize a command at the start of `content`.
    ///
    /// For `--status-set` the first occurrence of the token is removed and
    /// the remainder trimmed.
    pub fn parse(content: &str) -> Option<Self> {
        if content.starts_with(STATUS_SET) {
            let text = content.replacen(STATUS_SET, "", 1);
            Some(StatusCommand::Set(text.trim().to_string()))
        } else if content.starts_with(STATUS_REMOVE) {
            Some(StatusCommand::Remove)
        } else {
            None
        }
    }

    pub fn into_status(self) -> Status {
        match self {
            StatusCommand::Set(text) => Status::warning(text),
            StatusCommand::Remove => Status::empty(),
        }
    }
}

/// What handling one message did to the live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    StatusSet,
    StatusCleared,
    UpdateReplaced,
    Ignored,
}

impl Ingested {
    /// Whether the author should get a reaction confirming the command.
    pub fn acknowledge(self) -> bool {
        matches!(self, Ingested::StatusSet | Ingested::StatusCleared)
    }
}

/// Applies chat messages to the live state.
#[derive(Debug, Clone)]
pub struct Ingester {
    channels: Channels,
    state: Arc<LiveState>,
}

impl Ingester {
    pub fn new(channels: Channels, state: Arc<LiveState>) -> Self {
        Self { channels, state }
    }

    pub fn channels(&self) -> &Channels {
        &self.channels
    }

    /// Handle one live message. Each recognized message is exactly one publish.
    pub fn handle(&self, message: &ChatMessage) -> Ingested {
        if message.channel_id == self.channels.status {
            let Some(command) = StatusCommand::parse(&message.content) else {
                debug!(message_id = %message.id, "Ignoring non-command message on status channel");
                return Ingested::Ignored;
            };
            let outcome = match command {
                StatusCommand::Set(_) => Ingested::StatusSet,
                StatusCommand::Remove => Ingested::StatusCleared,
            };
            let status = command.into_status();
            info!(
                author = %message.author.username,
                kind = %status.kind(),
                text = status.text(),
                "Updating status"
            );
            self.state.publish_status(status);
            outcome
        } else if message.channel_id == self.channels.updates {
            let Some(update) = Update::from_message(message) else {
                debug!(message_id = %message.id, "Ignoring update channel message without attachment");
                return Ingested::Ignored;
            };
            info!(author = %message.author.username, "Updating latest update");
            self.state.publish_update(update);
            Ingested::UpdateReplaced
        } else {
            Ingested::Ignored
        }
    }

    /// Seed status and update from channel histories, newest message first.
    ///
    /// The first recognized message of each history wins. Returns whether
    /// a status and an update were found.
    pub fn seed(
        &self,
        status_history: &[ChatMessage],
        update_history: &[ChatMessage],
    ) -> (bool, bool) {
        let status = status_history
            .iter()
            .find_map(|m| StatusCommand::parse(&m.content));
        let seeded_status = status.is_some();
        if let Some(command) = status {
            self.state.publish_status(command.into_status());
        }

        let update = update_history.iter().find_map(Update::from_message);
        let seeded_update = update.is_some();
        if let Some(update) = update {
            self.state.publish_update(update);
        }

        (seeded_status, seeded_update)
    }
}

/// Replace `<@id>` and `<@!id>` mentions with `@username`.
pub fn resolve_mentions<'a>(
    content: &str,
    mentions: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut resolved = content.to_string();
    for (id, username) in mentions {
        let name = format!("@{}", username);
        resolved = resolved
            .replace(&format!("<@{}>", id), &name)
            .replace(&format!("<@!{}>", id), &name);
    }
    resolved
}

/// The chat platform as seen by the bootstrap loader and the ingester.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Up to `limit` most recent messages of a channel, newest first.
    async fn recent_messages(&self, channel: &str, limit: u8) -> Result<Vec<ChatMessage>, ChatError>;

    /// React to a message with `emoji`.
    async fn react(&self, channel: &str, message_id: &str, emoji: &str) -> Result<(), ChatError>;
}
