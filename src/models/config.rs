use chrono_tz::Tz;

use super::{ValidationError, non_empty};

pub const DEFAULT_TITLE_PROPERTY: &str = "Title";
pub const DEFAULT_DATE_PROPERTY: &str = "Due Date";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Tokyo;
pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "[Reminder] {title}\nDue: {due_date} ({days_text})\n{url}";

/// Fallback values applied while validating a [`RawReminderConfig`].
#[derive(Debug, Clone)]
pub struct ConfigDefaults {
    pub title_property: String,
    pub date_property: String,
    pub timezone: Tz,
    pub message_template: String,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        Self {
            title_property: DEFAULT_TITLE_PROPERTY.to_owned(),
            date_property: DEFAULT_DATE_PROPERTY.to_owned(),
            timezone: DEFAULT_TIMEZONE,
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_owned(),
        }
    }
}

/// Configuration row as read from the source, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawReminderConfig {
    pub id: String,
    pub name: String,
    pub target_database_id: String,
    pub reminder_timings: Vec<String>,
    pub channel: String,
    pub webhook_url: Option<String>,
    pub channel_token: Option<String>,
    pub recipient_id: Option<String>,
    pub message_template: Option<String>,
    pub title_property: Option<String>,
    pub date_property: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReminderConfig {
    pub id: String,
    pub name: String,
    pub target_database_id: String,
    pub reminder_timings: Vec<String>,
    pub channel: String,
    pub webhook_url: Option<String>,
    pub channel_token: Option<String>,
    pub recipient_id: Option<String>,
    pub message_template: String,
    pub title_property: String,
    pub date_property: String,
    pub timezone: Tz,
}

impl RawReminderConfig {
    pub fn validate(self, defaults: &ConfigDefaults) -> Result<ReminderConfig, ValidationError> {
        let target_database_id = self.target_database_id.trim().to_owned();
        if target_database_id.is_empty() {
            return Err(ValidationError::required("target_database_id"));
        }

        let reminder_timings: Vec<String> = self
            .reminder_timings
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect();
        if reminder_timings.is_empty() {
            return Err(ValidationError {
                field: "reminder_timings",
                message: "at least one timing required",
            });
        }

        let channel = self.channel.trim().to_owned();
        if channel.is_empty() {
            return Err(ValidationError::required("channel"));
        }

        let timezone = match non_empty(self.timezone) {
            Some(name) => name.trim().parse::<Tz>().unwrap_or_else(|_| {
                log::warn!(
                    "Unknown timezone, falling back to default. [config_id = {}, timezone = {}, default = {}]",
                    self.id,
                    name,
                    defaults.timezone
                );
                defaults.timezone
            }),
            None => defaults.timezone,
        };

        Ok(ReminderConfig {
            id: self.id,
            name: self.name,
            target_database_id,
            reminder_timings,
            channel,
            webhook_url: non_empty(self.webhook_url),
            channel_token: non_empty(self.channel_token),
            recipient_id: non_empty(self.recipient_id),
            message_template: non_empty(self.message_template)
                .unwrap_or_else(|| defaults.message_template.clone()),
            title_property: non_empty(self.title_property)
                .unwrap_or_else(|| defaults.title_property.clone()),
            date_property: non_empty(self.date_property)
                .unwrap_or_else(|| defaults.date_property.clone()),
            timezone,
        })
    }
}
