mod model;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;

use self::model::{Page, Property, QueryResponse};
use super::{ReminderSource, SourceError};
use crate::models::{ConfigDefaults, DueItem, RawDueItem, RawReminderConfig, ReminderConfig};

pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";

const ENABLED: &str = "Enabled";
const CONFIG_NAME: &str = "Name";
const TARGET_DATABASE_ID: &str = "Target Database ID";
const REMINDER_TIMINGS: &str = "Reminder Timings";
const NOTIFICATION_CHANNEL: &str = "Notification Channel";
const WEBHOOK_URL: &str = "Webhook URL";
const CHANNEL_ACCESS_TOKEN: &str = "Channel Access Token";
const RECIPIENT_ID: &str = "Recipient ID";
const MESSAGE_TEMPLATE: &str = "Message Template";
const DATE_PROPERTY_NAME: &str = "Date Property Name";
const TITLE_PROPERTY_NAME: &str = "Title Property Name";
const TIMEZONE: &str = "Timezone";
const DESCRIPTION: &str = "Description";

/// Reads configurations and due items from Notion databases.
pub struct NotionSource {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    version: String,
    defaults: ConfigDefaults,
}

impl NotionSource {
    pub fn new(api_key: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: NOTION_API_BASE_URL.to_owned(),
            version: NOTION_VERSION.to_owned(),
            defaults: ConfigDefaults::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_defaults(mut self, defaults: ConfigDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Runs a database query, following `next_cursor` until every page is read.
    async fn query_database(
        &self,
        database_id: &str,
        query: serde_json::Value,
    ) -> Result<Vec<Page>, SourceError> {
        let url = format!(
            "{}/databases/{}/query",
            self.base_url.trim_end_matches('/'),
            database_id
        );
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = query.clone();
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .header("Notion-Version", &self.version)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::Status {
                    context: format!("query of database {database_id}"),
                    status,
                    body: response.text().await.unwrap_or_default(),
                });
            }

            let bytes = response.bytes().await?;
            let result: QueryResponse = serde_json::from_slice(&bytes)?;
            pages.extend(result.results);

            match (result.has_more, result.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        log::debug!(
            "Read {} pages from Notion database {}",
            pages.len(),
            database_id
        );
        Ok(pages)
    }
}

#[async_trait]
impl ReminderSource for NotionSource {
    async fn load_reminder_configs(
        &self,
        master_ref: &str,
    ) -> Result<Vec<ReminderConfig>, SourceError> {
        let query = json!({
            "filter": { "property": ENABLED, "checkbox": { "equals": true } }
        });
        let pages = self.query_database(master_ref, query).await?;

        let configs = pages
            .iter()
            .filter_map(|page| match parse_reminder_config(page).validate(&self.defaults) {
                Ok(config) => Some(config),
                Err(err) => {
                    log::warn!(
                        "Skipping invalid reminder configuration. [page_id = {}, error = {}]",
                        page.id,
                        err
                    );
                    None
                }
            })
            .collect();

        Ok(configs)
    }

    async fn fetch_due_items(
        &self,
        config: &ReminderConfig,
        today: NaiveDate,
    ) -> Result<Vec<DueItem>, SourceError> {
        let query = json!({
            "filter": {
                "property": config.date_property,
                "date": { "on_or_after": today.format("%Y-%m-%d").to_string() }
            },
            "sorts": [{ "property": config.date_property, "direction": "ascending" }]
        });
        let pages = self
            .query_database(&config.target_database_id, query)
            .await?;

        let items = pages
            .iter()
            .filter_map(|page| match parse_due_item(page, config).validate() {
                Ok(item) => Some(item),
                Err(err) => {
                    log::warn!(
                        "Skipping invalid due item. [config_id = {}, page_id = {}, error = {}]",
                        config.id,
                        page.id,
                        err
                    );
                    None
                }
            })
            .collect();

        Ok(items)
    }
}

fn text(page: &Page, name: &str) -> Option<String> {
    page.properties.get(name).and_then(Property::text)
}

fn names(page: &Page, name: &str) -> Vec<String> {
    page.properties
        .get(name)
        .map(Property::names)
        .unwrap_or_default()
}

fn parse_reminder_config(page: &Page) -> RawReminderConfig {
    RawReminderConfig {
        id: page.id.clone(),
        name: text(page, CONFIG_NAME).unwrap_or_default(),
        target_database_id: text(page, TARGET_DATABASE_ID).unwrap_or_default(),
        reminder_timings: names(page, REMINDER_TIMINGS),
        channel: text(page, NOTIFICATION_CHANNEL).unwrap_or_default(),
        webhook_url: text(page, WEBHOOK_URL),
        channel_token: text(page, CHANNEL_ACCESS_TOKEN),
        recipient_id: text(page, RECIPIENT_ID),
        message_template: text(page, MESSAGE_TEMPLATE),
        title_property: text(page, TITLE_PROPERTY_NAME),
        date_property: text(page, DATE_PROPERTY_NAME),
        timezone: text(page, TIMEZONE),
    }
}

fn parse_due_item(page: &Page, config: &ReminderConfig) -> RawDueItem {
    RawDueItem {
        id: page.id.clone(),
        title: text(page, &config.title_property).unwrap_or_default(),
        due: page
            .properties
            .get(&config.date_property)
            .and_then(|p| p.date_in(config.timezone)),
        description: text(page, DESCRIPTION).unwrap_or_default(),
        message_template: text(page, MESSAGE_TEMPLATE),
        reminder_timings: names(page, REMINDER_TIMINGS),
        url: page.url.clone(),
        attributes: page
            .properties
            .iter()
            .map(|(name, prop)| (name.clone(), prop.to_attribute()))
            .collect(),
    }
}
