use std::{collections::HashMap, time::Duration};

use chrono::NaiveDate;
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

use crate::{
    delivery::DEFAULT_SEND_TIMEOUT,
    models::DEFAULT_TIMEZONE,
    service::DEFAULT_MAX_CONCURRENCY,
    source::notion::{NOTION_API_BASE_URL, NOTION_VERSION},
};

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct NotionSettings {
    pub base_url: String,
    pub version: String,
}

impl Default for NotionSettings {
    fn default() -> Self {
        Self {
            base_url: NOTION_API_BASE_URL.to_owned(),
            version: NOTION_VERSION.to_owned(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ReminderSettings {
    pub master_database_id: Option<String>,
    pub holidays: Vec<NaiveDate>,
    pub max_concurrency: usize,
    pub http_timeout_secs: u64,
    pub default_timezone: String,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            master_database_id: None,
            holidays: Vec::new(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            http_timeout_secs: DEFAULT_SEND_TIMEOUT.as_secs(),
            default_timezone: DEFAULT_TIMEZONE.name().to_owned(),
        }
    }
}

impl ReminderSettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn default_timezone(&self) -> Result<Tz, ConfigError> {
        self.default_timezone.parse().map_err(|_| {
            ConfigError::Message(format!(
                "reminder.default_timezone is not a known timezone: {}",
                self.default_timezone
            ))
        })
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AppSettings {
    pub notion: NotionSettings,
    pub reminder: ReminderSettings,
    pub credentials: HashMap<String, String>,
}

impl AppSettings {
    /// Layers `appsettings`, `appsettings.local` and `APP_` environment variables
    /// (`APP_REMINDER__MAX_CONCURRENCY`), later sources winning. Both files are optional.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("appsettings").required(false))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("reminder.holidays")
                    .try_parsing(true),
            );

        Self::build(builder)
    }

    fn build(builder: config::ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}
