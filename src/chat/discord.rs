//! Discord adapter built on serenity.
//!
//! [`DiscordPlatform`] answers history and reaction calls over the REST
//! API; [`GatewayHandler`] feeds live gateway messages to the
//! [`Ingester`].

use super::{resolve_mentions, Attachment, ChatAuthor, ChatMessage, ChatPlatform, Ingester};
use crate::error::ChatError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{
    ChannelId, Context, EventHandler, GatewayIntents, GetMessages, Http, Message, MessageId,
    ReactionType, Ready, Timestamp,
};
use serenity::Client;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Gateway events the bot needs: guild messages with their content.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

/// REST side of the Discord connection.
#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    /// Connect with a bot token and check that Discord accepts it.
    #[instrument(skip(token), fields(token_len = token.len()))]
    pub async fn connect(token: &str) -> Result<Self, ChatError> {
        let http = Arc::new(Http::new(token));
        let user = http
            .get_current_user()
            .await
            .map_err(ChatError::Connect)?;

        info!(bot_user = %user.name, bot_id = %user.id, "Authenticated with Discord");
        Ok(Self { http })
    }

    pub fn from_http(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn recent_messages(&self, channel: &str, limit: u8) -> Result<Vec<ChatMessage>, ChatError> {
        let channel_id = parse_id(channel)
            .map(ChannelId::new)
            .ok_or_else(|| ChatError::InvalidId(channel.to_string()))?;

        let messages = channel_id
            .messages(&*self.http, GetMessages::new().limit(limit))
            .await
            .map_err(|source| ChatError::History {
                channel: channel.to_string(),
                source,
            })?;

        debug!(channel, count = messages.len(), "Fetched channel history");
        Ok(messages.iter().map(to_chat_message).collect())
    }

    async fn react(&self, channel: &str, message_id: &str, emoji: &str) -> Result<(), ChatError> {
        let channel_id = parse_id(channel)
            .map(ChannelId::new)
            .ok_or_else(|| ChatError::InvalidId(channel.to_string()))?;
        let message_id = parse_id(message_id)
            .map(MessageId::new)
            .ok_or_else(|| ChatError::InvalidId(message_id.to_string()))?;
        let reaction =
            ReactionType::try_from(emoji).map_err(|_| ChatError::InvalidEmoji(emoji.to_string()))?;

        self.http
            .create_reaction(channel_id, message_id, &reaction)
            .await
            .map_err(ChatError::Reaction)
    }
}

/// Gateway event handler forwarding messages to the ingester.
pub struct GatewayHandler {
    ingester: Ingester,
    ack_emoji: String,
}

impl GatewayHandler {
    pub fn new(ingester: Ingester, ack_emoji: String) -> Self {
        Self { ingester, ack_emoji }
    }
}

#[async_trait]
impl EventHandler for GatewayHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_user = %ready.user.name,
            guilds = ready.guilds.len(),
            "Connected to Discord gateway"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let message = to_chat_message(&msg);
        let outcome = self.ingester.handle(&message);

        if outcome.acknowledge() {
            let platform = DiscordPlatform::from_http(Arc::clone(&ctx.http));
            if let Err(e) = platform
                .react(&message.channel_id, &message.id, &self.ack_emoji)
                .await
            {
                warn!(message_id = %message.id, error = %e, "Failed to acknowledge command");
            }
        }
    }
}

/// Build the gateway client. Running it is left to the caller.
pub async fn build_client(token: &str, handler: GatewayHandler) -> Result<Client, ChatError> {
    Client::builder(token, intents())
        .event_handler(handler)
        .await
        .map_err(ChatError::Connect)
}

fn parse_id(id: &str) -> Option<u64> {
    id.parse::<u64>().ok().filter(|id| *id != 0)
}

fn to_chat_message(msg: &Message) -> ChatMessage {
    let mentions: Vec<(String, String)> = msg
        .mentions
        .iter()
        .map(|user| (user.id.to_string(), user.name.clone()))
        .collect();
    let clean_content = resolve_mentions(
        &msg.content,
        mentions.iter().map(|(id, name)| (id.as_str(), name.as_str())),
    );

    ChatMessage {
        id: msg.id.to_string(),
        guild_id: msg.guild_id.map(|id| id.to_string()).unwrap_or_default(),
        channel_id: msg.channel_id.to_string(),
        timestamp: to_utc(&msg.timestamp),
        edited_timestamp: msg.edited_timestamp.as_ref().map(to_utc),
        author: ChatAuthor {
            id: msg.author.id.to_string(),
            username: msg.author.name.clone(),
            avatar_url: msg.author.face(),
        },
        content: msg.content.clone(),
        clean_content,
        attachments: msg
            .attachments
            .iter()
            .map(|a| Attachment { url: a.url.clone() })
            .collect(),
    }
}

fn to_utc(timestamp: &Timestamp) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&timestamp.to_string())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            DateTime::from_timestamp(timestamp.unix_timestamp(), 0).unwrap_or_default()
        })
}
