use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{ChatId, Recipient},
};

use super::{ChannelError, ReminderDeliveryChannel};
use crate::models::Notification;

const CHANNEL_NAME: &str = "Telegram";

/// Telegram bot message. The destination is a numeric chat id or an `@channel` username.
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    pub fn new(
        token: Option<&str>,
        chat: Option<&str>,
        client: reqwest::Client,
    ) -> Result<Self, ChannelError> {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ChannelError::MissingField {
                channel: CHANNEL_NAME,
                field: "bot token",
            })?;
        let chat = chat.filter(|c| !c.trim().is_empty()).ok_or(ChannelError::MissingField {
            channel: CHANNEL_NAME,
            field: "recipient id",
        })?;
        parse_recipient(chat)?;

        Ok(Self {
            bot: Bot::with_client(token, client),
        })
    }
}

fn parse_recipient(destination: &str) -> Result<Recipient, ChannelError> {
    let destination = destination.trim();
    if let Ok(id) = destination.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    if destination.starts_with('@') && destination.len() > 1 {
        return Ok(Recipient::ChannelUsername(destination.to_owned()));
    }

    Err(ChannelError::InvalidDestination {
        channel: CHANNEL_NAME,
        destination: destination.to_owned(),
    })
}

#[async_trait]
impl ReminderDeliveryChannel for TelegramChannel {
    async fn send_reminder_notification(
        &self,
        notification: &Notification<'_>,
    ) -> Result<(), ChannelError> {
        let recipient = parse_recipient(&notification.destination)?;
        self.bot
            .send_message(recipient, notification.message.clone())
            .await?;

        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        CHANNEL_NAME
    }
}
