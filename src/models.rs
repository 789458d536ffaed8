//! Data models for the live feed.
//!
//! This module contains the values published by the service: the status
//! banner, the latest update post and the commit feed, together with
//! their JSON wire forms.

use crate::chat::ChatMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Kind of the status banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StatusKind {
    /// No banner is shown.
    #[default]
    #[serde(rename = "empty")]
    Empty,
    /// A warning banner with operator text.
    #[serde(rename = "warn")]
    Warning,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusKind::Empty => write!(f, "empty"),
            StatusKind::Warning => write!(f, "warn"),
        }
    }
}

/// Operator-settable status banner.
///
/// `text` is always empty for [`StatusKind::Empty`]; the fields are private
/// so the only way in is through [`Status::empty`] and [`Status::warning`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Status {
    #[serde(rename = "type")]
    kind: StatusKind,
    text: String,
}

impl Status {
    /// The cleared banner.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A warning banner carrying `text`.
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Warning,
            text: text.into(),
        }
    }

    pub fn kind(&self) -> StatusKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// The latest chat post carrying an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub id: String,
    pub guild_id: String,
    pub channel_id: String,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(rename = "createdTimestamp")]
    pub created_at: i64,
    /// Edit time in milliseconds; equals `created_at` for unedited posts.
    #[serde(rename = "editedTimestamp")]
    pub edited_at: i64,
    pub author_id: String,
    pub author_name: String,
    #[serde(rename = "authorImage")]
    pub author_image_url: String,
    pub content: String,
    pub clean_content: String,
    /// URL of the first attachment. Never empty.
    #[serde(rename = "image")]
    pub image_url: String,
}

impl Update {
    /// Builds an update from a chat message.
    ///
    /// Returns `None` when the message has no attachment with a URL.
    pub fn from_message(message: &ChatMessage) -> Option<Self> {
        let image_url = message
            .attachments
            .first()
            .map(|a| a.url.clone())
            .filter(|url| !url.is_empty())?;

        let created_at = message.timestamp.timestamp_millis();
        let edited_at = message
            .edited_timestamp
            .map(|t| t.timestamp_millis())
            .unwrap_or(created_at);

        Some(Self {
            id: message.id.clone(),
            guild_id: message.guild_id.clone(),
            channel_id: message.channel_id.clone(),
            created_at,
            edited_at,
            author_id: message.author.id.clone(),
            author_name: message.author.username.clone(),
            author_image_url: message.author.avatar_url.clone(),
            content: message.content.clone(),
            clean_content: message.clean_content.clone(),
            image_url,
        })
    }
}

/// GitHub account linked to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitAccount {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: String,
}

/// Git author signature of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitSignature {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// RFC 3339 timestamp as sent upstream.
    #[serde(default)]
    pub date: String,
}

/// Git-level commit details.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitDetails {
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: CommitSignature,
    #[serde(default)]
    pub message: String,
}

/// One upstream commit, in the GitHub commits API shape.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitRecord {
    /// `null` upstream for commits not linked to an account.
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: CommitAccount,
    #[serde(default)]
    pub commit: CommitDetails,
    #[serde(default)]
    pub html_url: String,
}

impl CommitRecord {
    /// Commit date, or the Unix epoch when the upstream date does not parse.
    pub fn committed_at(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&self.commit.author.date)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Commits ordered newest first.
pub type CommitFeed = Vec<CommitRecord>;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
