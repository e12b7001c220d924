use async_trait::async_trait;
use serde::Serialize;

use super::{ChannelError, ReminderDeliveryChannel, ensure_success};
use crate::models::Notification;

pub const LINE_PUSH_ENDPOINT: &str = "https://api.line.me/v2/bot/message/push";

const CHANNEL_NAME: &str = "LINE";

#[derive(Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

/// LINE Messaging API push message, authenticated with a channel access token.
pub struct LinePushChannel {
    token: String,
    endpoint: String,
    client: reqwest::Client,
}

impl LinePushChannel {
    pub fn new(
        token: Option<&str>,
        recipient: Option<&str>,
        endpoint: &str,
        client: reqwest::Client,
    ) -> Result<Self, ChannelError> {
        let token = required(token, "channel token")?;
        required(recipient, "recipient id")?;

        Ok(Self {
            token: token.to_owned(),
            endpoint: endpoint.to_owned(),
            client,
        })
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, ChannelError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ChannelError::MissingField {
            channel: CHANNEL_NAME,
            field,
        })
}

#[async_trait]
impl ReminderDeliveryChannel for LinePushChannel {
    async fn send_reminder_notification(
        &self,
        notification: &Notification<'_>,
    ) -> Result<(), ChannelError> {
        let to = required(Some(notification.destination.as_str()), "recipient id")?;
        let body = PushRequest {
            to,
            messages: [TextMessage {
                kind: "text",
                text: &notification.message,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        ensure_success(CHANNEL_NAME, response.status())
    }

    fn channel_name(&self) -> &'static str {
        CHANNEL_NAME
    }
}
