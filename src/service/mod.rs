use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    calendar::{BusinessDayCalculator, TimingExpression, is_same_date},
    delivery::{ChannelError, DeliveryChannelFactory, resolve_destination},
    models::{DueItem, Notification, ReminderConfig},
    render::render_message,
    source::ReminderSource,
};

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Totals of one reminder run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub configs_processed: usize,
    pub configs_failed: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct DeliveryCounts {
    sent: usize,
    failed: usize,
    cancelled: bool,
}

/// Evaluates every enabled configuration once and sends the reminders due today.
pub struct ReminderService {
    source: Arc<dyn ReminderSource>,
    channels: Arc<dyn DeliveryChannelFactory>,
    master_ref: String,
    holidays: Arc<[NaiveDate]>,
    max_concurrency: usize,
}

impl ReminderService {
    pub fn new(
        source: Arc<dyn ReminderSource>,
        channels: Arc<dyn DeliveryChannelFactory>,
        master_ref: impl Into<String>,
    ) -> Self {
        Self {
            source,
            channels,
            master_ref: master_ref.into(),
            holidays: Arc::from([]),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays = holidays.into_iter().collect();
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub async fn process_reminders_now(
        &self,
        cancel: &CancellationToken,
    ) -> anyhow::Result<RunReport> {
        self.process_reminders(Utc::now(), cancel).await
    }

    /// Runs every enabled configuration against `now`.
    ///
    /// Only a failure to load the configurations is returned as an error. A
    /// configuration that fails is logged and counted, and the others carry on.
    /// Once `cancel` fires no further configuration is started and the ones in
    /// flight stop before their next fetch or send. Notifications they already
    /// sent are still counted, but such a configuration counts as neither
    /// processed nor failed.
    pub async fn process_reminders(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<RunReport> {
        let mut report = RunReport::default();

        let load = self.source.load_reminder_configs(&self.master_ref);
        let loaded = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(report),
            configs = load => configs,
        };
        let configs = loaded.with_context(|| {
            format!("Failed to load reminder configurations from {}", self.master_ref)
        })?;
        log::info!(
            "Loaded reminder configurations. [count = {}, master_ref = {}]",
            configs.len(),
            self.master_ref
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for config in configs {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!("Reminder run cancelled, not starting remaining configurations.");
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => permit?,
            };

            let source = Arc::clone(&self.source);
            let channels = Arc::clone(&self.channels);
            let holidays = Arc::clone(&self.holidays);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let result = process_config(
                    source.as_ref(),
                    channels.as_ref(),
                    &holidays,
                    &config,
                    now,
                    &cancel,
                )
                .await;
                (config.id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((config_id, Ok(counts))) => {
                    if counts.cancelled {
                        log::info!(
                            "Reminder configuration cancelled. [config_id = {}, sent = {}]",
                            config_id,
                            counts.sent
                        );
                    } else {
                        report.configs_processed += 1;
                    }
                    report.notifications_sent += counts.sent;
                    report.notifications_failed += counts.failed;
                }
                Ok((config_id, Err(err))) => {
                    log::error!(
                        "Reminder configuration failed. [config_id = {}, error = {:#}]",
                        config_id,
                        err
                    );
                    report.configs_failed += 1;
                }
                Err(err) => {
                    log::error!("Reminder configuration task aborted. [error = {}]", err);
                    report.configs_failed += 1;
                }
            }
        }

        log::info!("Reminder run finished. [report = {:?}]", report);
        Ok(report)
    }
}

async fn process_config(
    source: &dyn ReminderSource,
    channels: &dyn DeliveryChannelFactory,
    holidays: &[NaiveDate],
    config: &ReminderConfig,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> anyhow::Result<DeliveryCounts> {
    let mut counts = DeliveryCounts::default();
    let today = now.with_timezone(&config.timezone);

    let fetch = source.fetch_due_items(config, today.date_naive());
    let fetched = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            counts.cancelled = true;
            return Ok(counts);
        }
        items = fetch => items,
    };
    let items = fetched
        .with_context(|| format!("Failed to fetch due items from {}", config.target_database_id))?;

    let calculator = BusinessDayCalculator::new(holidays.iter().copied(), config.timezone);

    for item in &items {
        for timing in triggered_timings(item, config, &today, &calculator) {
            let notification = Notification {
                item,
                config,
                timing,
                message: render_message(item, config, &timing),
                destination: resolve_destination(config),
            };

            let delivered = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    counts.cancelled = true;
                    return Ok(counts);
                }
                delivered = deliver(channels, &notification) => delivered,
            };

            match delivered {
                Ok(()) => {
                    log::info!(
                        "Sent reminder. [config_id = {}, item_id = {}, timing = {}]",
                        config.id,
                        item.id,
                        timing
                    );
                    counts.sent += 1;
                }
                Err(err) => {
                    log::error!(
                        "Failed to send reminder. [config_id = {}, item_id = {}, timing = {}, error = {}]",
                        config.id,
                        item.id,
                        timing,
                        err
                    );
                    counts.failed += 1;
                }
            }
        }
    }

    Ok(counts)
}

/// Expressions of `item` whose reminder date falls on `today`, first occurrence
/// of each kept.
fn triggered_timings(
    item: &DueItem,
    config: &ReminderConfig,
    today: &DateTime<Tz>,
    calculator: &BusinessDayCalculator,
) -> Vec<TimingExpression> {
    let timings = if item.reminder_timings.is_empty() {
        &config.reminder_timings
    } else {
        &item.reminder_timings
    };
    let due = item.due.with_timezone(&config.timezone);

    let mut triggered = Vec::new();
    for raw in timings {
        let result = raw
            .parse::<TimingExpression>()
            .and_then(|timing| Ok((timing, timing.reminder_date(&due, Some(calculator))?)));

        match result {
            Ok((timing, date)) if is_same_date(&date, today) => {
                if !triggered.contains(&timing) {
                    triggered.push(timing);
                }
            }
            Ok(_) => {}
            Err(err) => log::warn!(
                "Skipping reminder timing. [config_id = {}, item_id = {}, timing = {}, error = {}]",
                config.id,
                item.id,
                raw,
                err
            ),
        }
    }

    triggered
}

async fn deliver(
    channels: &dyn DeliveryChannelFactory,
    notification: &Notification<'_>,
) -> Result<(), ChannelError> {
    let channel = channels.create_channel(notification.config)?;
    channel.send_reminder_notification(notification).await
}

#[cfg(test)]
mod tests;
