//! Serenity-backed message sink.
//!
//! Only the REST API is used: the bot never opens a gateway connection, it
//! just posts and edits one message.

use std::time::Duration;

use serenity::all::{
    ChannelId, CreateMessage, EditMessage, GetMessages, Message, MessageId, UserId,
};
use serenity::async_trait;
use serenity::http::{Http, HttpBuilder, HttpError};
use tracing::{debug, info};

use crate::common::error::{AppError, PublishError, PublishResult};
use crate::common::TrackedMessage;
use crate::discord::dashboard::RenderedPayload;
use crate::discord::publisher::MessageSink;

/// Recent messages searched for an earlier status board.
const HISTORY_LIMIT: u8 = 10;

// Discord JSON error codes.
const UNKNOWN_CHANNEL: isize = 10003;
const UNKNOWN_MESSAGE: isize = 10008;
const MISSING_ACCESS: isize = 50001;
const MISSING_PERMISSIONS: isize = 50013;

pub struct DiscordSink {
    http: Http,
    channel_id: ChannelId,
    user_id: UserId,
}

impl DiscordSink {
    /// Build the HTTP client and check that the token and channel are usable.
    pub async fn connect(token: &str, channel_id: u64) -> Result<Self, AppError> {
        // Build a custom reqwest client with timeout settings
        let reqwest_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let http = HttpBuilder::new(token).client(reqwest_client).build();

        let user = http.get_current_user().await?;
        info!("Authenticated as {} ({})", user.name, user.id);

        let channel_id = ChannelId::new(channel_id);
        let channel = channel_id.to_channel(&http).await?;
        debug!("Target channel: {}", channel);

        Ok(Self {
            http,
            channel_id,
            user_id: user.id,
        })
    }

    fn tracked(&self, message: &Message) -> TrackedMessage {
        TrackedMessage {
            channel_id: self.channel_id.get(),
            message_id: message.id.get(),
        }
    }

    fn is_our_board(&self, message: &Message, title: &str) -> bool {
        message.author.id == self.user_id
            && message
                .embeds
                .first()
                .and_then(|e| e.title.as_deref())
                .map_or(false, |t| t == title)
    }

    async fn edit_existing(&self, message_id: MessageId, payload: &RenderedPayload) -> PublishResult<Message> {
        let builder = EditMessage::new().embed(payload.to_embed());
        self.channel_id
            .edit_message(&self.http, message_id, builder)
            .await
            .map_err(classify_error)
    }

    /// The remembered message, if it still exists and is ours.
    async fn find_known(&self, known: TrackedMessage) -> PublishResult<Option<Message>> {
        if known.channel_id != self.channel_id.get() {
            return Ok(None);
        }

        match self
            .channel_id
            .message(&self.http, MessageId::new(known.message_id))
            .await
            .map_err(classify_error)
        {
            Ok(message) if message.author.id == self.user_id => Ok(Some(message)),
            Ok(_) => Ok(None),
            Err(PublishError::MessageGone { .. }) => {
                debug!("Stored message {} no longer exists", known.message_id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn find_in_history(&self, title: &str) -> PublishResult<Option<Message>> {
        let messages = self
            .channel_id
            .messages(&self.http, GetMessages::new().limit(HISTORY_LIMIT))
            .await
            .map_err(classify_error)?;

        // Newest first.
        Ok(messages.into_iter().find(|m| self.is_our_board(m, title)))
    }
}

#[async_trait]
impl MessageSink for DiscordSink {
    async fn locate_or_create(
        &self,
        payload: &RenderedPayload,
        known: Option<TrackedMessage>,
    ) -> PublishResult<TrackedMessage> {
        let existing = match known {
            Some(known) => self.find_known(known).await?,
            None => None,
        };
        let existing = match existing {
            Some(message) => Some(message),
            None => self.find_in_history(&payload.title).await?,
        };

        if let Some(message) = existing {
            info!("Reusing status message {}", message.id);
            let message = self.edit_existing(message.id, payload).await?;
            return Ok(self.tracked(&message));
        }

        let builder = CreateMessage::new().embed(payload.to_embed());
        let message = self
            .channel_id
            .send_message(&self.http, builder)
            .await
            .map_err(classify_error)?;
        info!("Posted new status message {}", message.id);
        Ok(self.tracked(&message))
    }

    async fn edit(&self, tracked: &TrackedMessage, payload: &RenderedPayload) -> PublishResult<()> {
        self.edit_existing(MessageId::new(tracked.message_id), payload)
            .await
            .map(|_| ())
    }
}

/// Map a serenity error onto the publishing taxonomy.
fn classify_error(error: serenity::Error) -> PublishError {
    match error {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => classify_status(
            response.status_code.as_u16(),
            response.error.code,
            &response.error.message,
        ),
        serenity::Error::Http(HttpError::Request(e)) => PublishError::Transient {
            message: e.to_string(),
        },
        serenity::Error::Io(e) => PublishError::Transient {
            message: e.to_string(),
        },
        other => PublishError::Fatal {
            message: other.to_string(),
        },
    }
}

/// Classify a failed REST call by HTTP status and Discord error code.
///
/// serenity's ratelimiter already waits out `Retry-After` before a request
/// fails, and its error response carries no duration, so a 429 that still
/// surfaces here has no `retry_after` and the publisher falls back to backoff.
pub fn classify_status(status: u16, code: isize, message: &str) -> PublishError {
    let message = format!("{} (HTTP {}, code {})", message, status, code);
    match (status, code) {
        (429, _) => PublishError::RateLimited { retry_after: None },
        (_, UNKNOWN_CHANNEL | MISSING_ACCESS | MISSING_PERMISSIONS) => PublishError::Fatal { message },
        (_, UNKNOWN_MESSAGE) | (404, _) => PublishError::MessageGone { message },
        (401 | 403, _) => PublishError::Fatal { message },
        (500..=599, _) => PublishError::Transient { message },
        _ => PublishError::Fatal { message },
    }
}
