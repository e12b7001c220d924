use std::sync::Arc;

use anyhow::Context;
use deadline_reminder::{
    appsettings::AppSettings,
    credentials::{CredentialProvider, SettingsCredentialProvider},
    delivery::HttpChannelFactory,
    models::ConfigDefaults,
    service::ReminderService,
    source::notion::NotionSource,
};
use tokio_util::sync::CancellationToken;

const NOTION_API_KEY: &str = "NOTION_API_KEY";
const REMINDER_CONFIG_DB_ID: &str = "REMINDER_CONFIG_DB_ID";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = AppSettings::load().context("Failed to load application settings")?;
    let credentials = SettingsCredentialProvider::new(settings.credentials.clone());

    let api_key = credentials.get_credential(NOTION_API_KEY)?;
    let master_database_id = match credentials.get_credential(REMINDER_CONFIG_DB_ID) {
        Ok(id) => id,
        Err(err) => settings
            .reminder
            .master_database_id
            .clone()
            .ok_or(err)
            .context("No reminder configuration database configured")?,
    };

    let defaults = ConfigDefaults {
        timezone: settings.reminder.default_timezone()?,
        ..Default::default()
    };
    let client = reqwest::Client::builder()
        .timeout(settings.reminder.http_timeout())
        .build()?;
    let source = NotionSource::new(api_key, client)
        .with_base_url(&settings.notion.base_url)
        .with_version(&settings.notion.version)
        .with_defaults(defaults);
    let channels = HttpChannelFactory::new(settings.reminder.http_timeout())?;

    let service = ReminderService::new(Arc::new(source), Arc::new(channels), master_database_id)
        .with_holidays(settings.reminder.holidays.iter().copied())
        .with_max_concurrency(settings.reminder.max_concurrency);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Received Ctrl-C, cancelling reminder run.");
            ctrl_c.cancel();
        }
    });

    log::info!("Starting reminder run.");
    let report = service.process_reminders_now(&cancel).await?;
    log::info!(
        "Reminder run complete. [configs_processed = {}, configs_failed = {}, notifications_sent = {}, notifications_failed = {}]",
        report.configs_processed,
        report.configs_failed,
        report.notifications_sent,
        report.notifications_failed
    );

    Ok(())
}
