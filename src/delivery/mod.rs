mod line;
#[cfg(feature = "telegram")]
mod telegram;
mod webhook;

use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Notification, ReminderConfig};

pub use line::{LINE_PUSH_ENDPOINT, LinePushChannel};
#[cfg(feature = "telegram")]
pub use telegram::TelegramChannel;
pub use webhook::{WebhookChannel, WebhookFormat};

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("unsupported notification channel: {0}")]
    Unsupported(String),

    #[error("{0} notifier is not implemented")]
    NotImplemented(&'static str),

    #[error("{field} required for {channel}")]
    MissingField {
        channel: &'static str,
        field: &'static str,
    },

    #[error("invalid {channel} destination: {destination}")]
    InvalidDestination {
        channel: &'static str,
        destination: String,
    },

    #[error("{channel} returned status {status}")]
    Status {
        channel: &'static str,
        status: reqwest::StatusCode,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "telegram")]
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),
}

/// Channels a configuration may name, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Discord,
    Slack,
    Line,
    Telegram,
}

impl ChannelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelKind::Discord => "Discord",
            ChannelKind::Slack => "Slack",
            ChannelKind::Line => "LINE",
            ChannelKind::Telegram => "Telegram",
        }
    }

    /// Token-push channels address a recipient id rather than a webhook URL.
    pub fn is_token_push(&self) -> bool {
        matches!(self, ChannelKind::Line | ChannelKind::Telegram)
    }
}

impl FromStr for ChannelKind {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "discord" => Ok(ChannelKind::Discord),
            "slack" => Ok(ChannelKind::Slack),
            "line" => Ok(ChannelKind::Line),
            "telegram" => Ok(ChannelKind::Telegram),
            _ => Err(ChannelError::Unsupported(s.to_owned())),
        }
    }
}

/// Where a notification for `config` is addressed: the recipient id for
/// token-push channels, the webhook URL otherwise.
pub fn resolve_destination(config: &ReminderConfig) -> String {
    let destination = match config.channel.parse::<ChannelKind>() {
        Ok(kind) if kind.is_token_push() => &config.recipient_id,
        _ => &config.webhook_url,
    };
    destination.clone().unwrap_or_default()
}

#[async_trait]
pub trait ReminderDeliveryChannel: Send + Sync {
    async fn send_reminder_notification(
        &self,
        notification: &Notification<'_>,
    ) -> Result<(), ChannelError>;

    fn channel_name(&self) -> &'static str;
}

pub trait DeliveryChannelFactory: Send + Sync {
    fn create_channel(
        &self,
        config: &ReminderConfig,
    ) -> Result<Box<dyn ReminderDeliveryChannel>, ChannelError>;
}

/// Builds HTTP-backed channels sharing one client and its timeout.
pub struct HttpChannelFactory {
    client: reqwest::Client,
    line_endpoint: String,
}

impl HttpChannelFactory {
    pub fn new(timeout: Duration) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            line_endpoint: LINE_PUSH_ENDPOINT.to_owned(),
        })
    }

    pub fn with_line_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.line_endpoint = endpoint.into();
        self
    }

    #[cfg(feature = "telegram")]
    fn create_telegram(
        &self,
        config: &ReminderConfig,
    ) -> Result<Box<dyn ReminderDeliveryChannel>, ChannelError> {
        let channel = TelegramChannel::new(
            config.channel_token.as_deref(),
            config.recipient_id.as_deref(),
            self.client.clone(),
        )?;
        Ok(Box::new(channel))
    }

    #[cfg(not(feature = "telegram"))]
    fn create_telegram(
        &self,
        _config: &ReminderConfig,
    ) -> Result<Box<dyn ReminderDeliveryChannel>, ChannelError> {
        Err(ChannelError::NotImplemented(ChannelKind::Telegram.name()))
    }
}

impl DeliveryChannelFactory for HttpChannelFactory {
    fn create_channel(
        &self,
        config: &ReminderConfig,
    ) -> Result<Box<dyn ReminderDeliveryChannel>, ChannelError> {
        match config.channel.parse::<ChannelKind>()? {
            ChannelKind::Discord => Ok(Box::new(WebhookChannel::new(
                WebhookFormat::Discord,
                config.webhook_url.as_deref(),
                self.client.clone(),
            )?)),
            ChannelKind::Slack => Ok(Box::new(WebhookChannel::new(
                WebhookFormat::Slack,
                config.webhook_url.as_deref(),
                self.client.clone(),
            )?)),
            ChannelKind::Line => Ok(Box::new(LinePushChannel::new(
                config.channel_token.as_deref(),
                config.recipient_id.as_deref(),
                &self.line_endpoint,
                self.client.clone(),
            )?)),
            ChannelKind::Telegram => self.create_telegram(config),
        }
    }
}

pub(crate) fn ensure_success(
    channel: &'static str,
    status: reqwest::StatusCode,
) -> Result<(), ChannelError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ChannelError::Status { channel, status })
    }
}
