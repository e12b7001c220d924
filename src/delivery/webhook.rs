use async_trait::async_trait;
use serde_json::json;

use super::{ChannelError, ReminderDeliveryChannel, ensure_success};
use crate::models::Notification;

/// Body shape expected by an incoming-webhook provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookFormat {
    Discord,
    Slack,
}

impl WebhookFormat {
    fn channel_name(&self) -> &'static str {
        match self {
            WebhookFormat::Discord => "Discord",
            WebhookFormat::Slack => "Slack",
        }
    }

    fn payload(&self, text: &str) -> serde_json::Value {
        match self {
            WebhookFormat::Discord => json!({ "content": text }),
            WebhookFormat::Slack => json!({ "text": text }),
        }
    }
}

/// Posts the rendered message to an incoming webhook URL.
pub struct WebhookChannel {
    format: WebhookFormat,
    url: String,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(
        format: WebhookFormat,
        url: Option<&str>,
        client: reqwest::Client,
    ) -> Result<Self, ChannelError> {
        let url = url
            .filter(|u| !u.trim().is_empty())
            .ok_or(ChannelError::MissingField {
                channel: format.channel_name(),
                field: "webhook URL",
            })?;

        Ok(Self {
            format,
            url: url.to_owned(),
            client,
        })
    }
}

#[async_trait]
impl ReminderDeliveryChannel for WebhookChannel {
    async fn send_reminder_notification(
        &self,
        notification: &Notification<'_>,
    ) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(&self.url)
            .json(&self.format.payload(&notification.message))
            .send()
            .await?;

        ensure_success(self.channel_name(), response.status())
    }

    fn channel_name(&self) -> &'static str {
        self.format.channel_name()
    }
}
