use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::StatusCode;

use super::*;
use crate::{
    delivery::ReminderDeliveryChannel,
    models::RawReminderConfig,
    source::SourceError,
    test_utils,
};

#[derive(Clone)]
enum Items {
    Ready(Vec<DueItem>),
    Fail,
    Hang,
}

struct TestSource {
    configs: Option<Vec<ReminderConfig>>,
    items: HashMap<String, Items>,
}

impl TestSource {
    fn new(configs: Vec<ReminderConfig>) -> Self {
        Self {
            configs: Some(configs),
            items: HashMap::new(),
        }
    }

    fn with_items(mut self, config_id: &str, items: Items) -> Self {
        self.items.insert(config_id.to_owned(), items);
        self
    }
}

fn server_error(context: &str) -> SourceError {
    SourceError::Status {
        context: context.to_owned(),
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: String::new(),
    }
}

#[async_trait]
impl ReminderSource for TestSource {
    async fn load_reminder_configs(
        &self,
        master_ref: &str,
    ) -> Result<Vec<ReminderConfig>, SourceError> {
        self.configs.clone().ok_or_else(|| server_error(master_ref))
    }

    async fn fetch_due_items(
        &self,
        config: &ReminderConfig,
        _today: NaiveDate,
    ) -> Result<Vec<DueItem>, SourceError> {
        match self.items.get(&config.id).cloned() {
            Some(Items::Ready(items)) => Ok(items),
            Some(Items::Fail) => Err(server_error(&config.target_database_id)),
            Some(Items::Hang) => std::future::pending().await,
            None => Ok(vec![]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SentReminder {
    config_id: String,
    item_id: String,
    timing: TimingExpression,
    message: String,
    destination: String,
}

type SentReminders = Arc<Mutex<Vec<SentReminder>>>;

struct TestChannel {
    sent: SentReminders,
    failing_items: Arc<HashSet<String>>,
    hanging_items: Arc<HashSet<String>>,
}

#[async_trait]
impl ReminderDeliveryChannel for TestChannel {
    async fn send_reminder_notification(
        &self,
        notification: &Notification<'_>,
    ) -> Result<(), ChannelError> {
        if self.hanging_items.contains(&notification.item.id) {
            return std::future::pending().await;
        }
        if self.failing_items.contains(&notification.item.id) {
            return Err(ChannelError::Status {
                channel: "Test",
                status: StatusCode::BAD_GATEWAY,
            });
        }

        self.sent.lock().unwrap().push(SentReminder {
            config_id: notification.config.id.clone(),
            item_id: notification.item.id.clone(),
            timing: notification.timing,
            message: notification.message.clone(),
            destination: notification.destination.clone(),
        });
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "Test"
    }
}

#[derive(Default)]
struct TestChannelFactory {
    sent: SentReminders,
    failing_items: Arc<HashSet<String>>,
    hanging_items: Arc<HashSet<String>>,
}

fn id_set(ids: &[&str]) -> Arc<HashSet<String>> {
    Arc::new(ids.iter().map(|id| id.to_string()).collect())
}

impl TestChannelFactory {
    fn failing_for(item_ids: &[&str]) -> Self {
        Self {
            failing_items: id_set(item_ids),
            ..Default::default()
        }
    }

    fn hanging_for(item_ids: &[&str]) -> Self {
        Self {
            hanging_items: id_set(item_ids),
            ..Default::default()
        }
    }
}

impl DeliveryChannelFactory for TestChannelFactory {
    fn create_channel(
        &self,
        _config: &ReminderConfig,
    ) -> Result<Box<dyn ReminderDeliveryChannel>, ChannelError> {
        Ok(Box::new(TestChannel {
            sent: Arc::clone(&self.sent),
            failing_items: Arc::clone(&self.failing_items),
            hanging_items: Arc::clone(&self.hanging_items),
        }))
    }
}

struct TestContext {
    sent: SentReminders,
    service: ReminderService,
}

impl TestContext {
    fn new(source: TestSource, factory: TestChannelFactory) -> Self {
        let sent = Arc::clone(&factory.sent);
        let service = ReminderService::new(Arc::new(source), Arc::new(factory), "master");

        Self { sent, service }
    }

    fn sent(&self) -> Vec<SentReminder> {
        self.sent.lock().unwrap().clone()
    }
}

/// 2024-01-08 09:00 in Tokyo, a Monday.
fn monday_morning() -> DateTime<Utc> {
    test_utils::tokyo(2024, 1, 8, 9).with_timezone(&Utc)
}

fn config_with_timings(id: &str, timings: &[&str]) -> ReminderConfig {
    RawReminderConfig {
        reminder_timings: timings.iter().map(|t| t.to_string()).collect(),
        ..test_utils::raw_config(id, "discord")
    }
    .validate(&Default::default())
    .unwrap()
}

fn item_with_timings(id: &str, day: u32, timings: &[&str]) -> DueItem {
    DueItem {
        reminder_timings: timings.iter().map(|t| t.to_string()).collect(),
        ..test_utils::due_item(id, &format!("task {id}"), test_utils::tokyo(2024, 1, day, 9))
    }
}

#[tokio::test]
async fn same_day_item_is_sent_once_with_rendered_message() {
    let source = TestSource::new(vec![test_utils::config("a", "discord")]).with_items(
        "a",
        Items::Ready(vec![test_utils::due_item(
            "item-1",
            "Submit report",
            test_utils::tokyo(2024, 1, 8, 9),
        )]),
    );
    let ctx = TestContext::new(source, TestChannelFactory::default());

    let report = ctx
        .service
        .process_reminders(monday_morning(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report,
        RunReport {
            configs_processed: 1,
            configs_failed: 0,
            notifications_sent: 1,
            notifications_failed: 0,
        }
    );
    let sent = ctx.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].config_id, "a");
    assert_eq!(sent[0].item_id, "item-1");
    assert_eq!(sent[0].timing, TimingExpression::SameDay);
    assert!(sent[0].message.contains("Submit report"));
    assert!(sent[0].message.contains("today"));
    assert_eq!(sent[0].destination, "https://hooks.example.com/reminder");
}

#[tokio::test]
async fn items_not_due_for_a_reminder_today_are_ignored() {
    let source = TestSource::new(vec![config_with_timings("a", &["same-day", "3-days-before"])])
        .with_items("a", Items::Ready(vec![item_with_timings("later", 10, &[])]));
    let ctx = TestContext::new(source, TestChannelFactory::default());

    let report = ctx
        .service
        .process_reminders(monday_morning(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.configs_processed, 1);
    assert_eq!(report.notifications_sent, 0);
    assert!(ctx.sent().is_empty());
}

#[tokio::test]
async fn failed_configuration_does_not_stop_others() {
    let source = TestSource::new(vec![
        test_utils::config("a", "discord"),
        test_utils::config("b", "slack"),
    ])
    .with_items("a", Items::Fail)
    .with_items(
        "b",
        Items::Ready(vec![item_with_timings("item-b", 8, &[])]),
    );
    let ctx = TestContext::new(source, TestChannelFactory::default());

    let report = ctx
        .service
        .process_reminders(monday_morning(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.configs_processed, 1);
    assert_eq!(report.configs_failed, 1);
    assert_eq!(report.notifications_sent, 1);
    assert_eq!(ctx.sent()[0].config_id, "b");
}

#[tokio::test]
async fn item_timings_replace_configuration_timings() {
    let source = TestSource::new(vec![config_with_timings("a", &["same-day"])]).with_items(
        "a",
        Items::Ready(vec![
            item_with_timings("tomorrow", 9, &["1-days-before"]),
            item_with_timings("today", 8, &["3-days-before"]),
        ]),
    );
    let ctx = TestContext::new(source, TestChannelFactory::default());

    ctx.service
        .process_reminders(monday_morning(), &CancellationToken::new())
        .await
        .unwrap();

    let sent = ctx.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].item_id, "tomorrow");
    assert_eq!(sent[0].timing, TimingExpression::DaysBefore(1));
    assert!(sent[0].message.contains("tomorrow"));
}

#[tokio::test]
async fn equivalent_timings_fire_once() {
    let source = TestSource::new(vec![config_with_timings(
        "a",
        &["same-day", "当日", " same-day "],
    )])
    .with_items("a", Items::Ready(vec![item_with_timings("item-1", 8, &[])]));
    let ctx = TestContext::new(source, TestChannelFactory::default());

    let report = ctx
        .service
        .process_reminders(monday_morning(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.notifications_sent, 1);
}

#[tokio::test]
async fn distinct_timings_landing_today_each_fire() {
    // Due Wednesday, so both land on Monday.
    let source = TestSource::new(vec![config_with_timings(
        "a",
        &["2-days-before", "2-business-days-before"],
    )])
    .with_items("a", Items::Ready(vec![item_with_timings("item-1", 10, &[])]));
    let ctx = TestContext::new(source, TestChannelFactory::default());

    ctx.service
        .process_reminders(monday_morning(), &CancellationToken::new())
        .await
        .unwrap();

    let timings: Vec<_> = ctx.sent().into_iter().map(|s| s.timing).collect();
    assert_eq!(
        timings,
        vec![
            TimingExpression::DaysBefore(2),
            TimingExpression::BusinessDaysBefore(2)
        ]
    );
}

#[tokio::test]
async fn unsupported_timing_is_skipped() {
    let source = TestSource::new(vec![config_with_timings("a", &["someday", "same-day"])])
        .with_items("a", Items::Ready(vec![item_with_timings("item-1", 8, &[])]));
    let ctx = TestContext::new(source, TestChannelFactory::default());

    let report = ctx
        .service
        .process_reminders(monday_morning(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.configs_processed, 1);
    assert_eq!(report.notifications_sent, 1);
}

#[tokio::test]
async fn configured_holidays_are_skipped_by_business_day_timings() {
    let source = TestSource::new(vec![config_with_timings("a", &["1-business-days-before"])])
        .with_items("a", Items::Ready(vec![item_with_timings("item-1", 10, &[])]));
    let mut ctx = TestContext::new(source, TestChannelFactory::default());
    ctx.service = ctx
        .service
        .with_holidays([NaiveDate::from_ymd_opt(2024, 1, 9).unwrap()]);

    let report = ctx
        .service
        .process_reminders(monday_morning(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.notifications_sent, 1);
    assert_eq!(ctx.sent()[0].timing, TimingExpression::BusinessDaysBefore(1));
}

#[tokio::test]
async fn failed_send_is_counted_and_siblings_still_go_out() {
    let source = TestSource::new(vec![test_utils::config("a", "discord")]).with_items(
        "a",
        Items::Ready(vec![
            item_with_timings("broken", 8, &[]),
            item_with_timings("fine", 8, &[]),
        ]),
    );
    let ctx = TestContext::new(source, TestChannelFactory::failing_for(&["broken"]));

    let report = ctx
        .service
        .process_reminders(monday_morning(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report,
        RunReport {
            configs_processed: 1,
            configs_failed: 0,
            notifications_sent: 1,
            notifications_failed: 1,
        }
    );
    assert_eq!(ctx.sent()[0].item_id, "fine");
}

#[tokio::test]
async fn failing_to_load_configurations_is_fatal() {
    let source = TestSource {
        configs: None,
        items: HashMap::new(),
    };
    let ctx = TestContext::new(source, TestChannelFactory::default());

    let result = ctx
        .service
        .process_reminders(monday_morning(), &CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert!(ctx.sent().is_empty());
}

#[tokio::test]
async fn cancelled_run_starts_nothing() {
    let source = TestSource::new(vec![test_utils::config("a", "discord")])
        .with_items("a", Items::Ready(vec![item_with_timings("item-1", 8, &[])]));
    let ctx = TestContext::new(source, TestChannelFactory::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = ctx
        .service
        .process_reminders(monday_morning(), &cancel)
        .await
        .unwrap();

    assert_eq!(report, RunReport::default());
    assert!(ctx.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_in_flight_configurations_and_keeps_finished_ones() {
    let source = TestSource::new(vec![
        test_utils::config("fast", "discord"),
        test_utils::config("stuck", "discord"),
    ])
    .with_items("fast", Items::Ready(vec![item_with_timings("item-1", 8, &[])]))
    .with_items("stuck", Items::Hang);
    let ctx = TestContext::new(source, TestChannelFactory::default());
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        canceller.cancel();
    });

    let report = ctx
        .service
        .process_reminders(monday_morning(), &cancel)
        .await
        .unwrap();

    assert_eq!(report.configs_processed, 1);
    assert_eq!(report.configs_failed, 0);
    assert_eq!(report.notifications_sent, 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_mid_configuration_still_counts_sent_reminders() {
    let source = TestSource::new(vec![test_utils::config("a", "discord")]).with_items(
        "a",
        Items::Ready(vec![
            item_with_timings("first", 8, &[]),
            item_with_timings("hang", 8, &[]),
        ]),
    );
    let ctx = TestContext::new(source, TestChannelFactory::hanging_for(&["hang"]));
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        canceller.cancel();
    });

    let report = ctx
        .service
        .process_reminders(monday_morning(), &cancel)
        .await
        .unwrap();

    assert_eq!(
        report,
        RunReport {
            configs_processed: 0,
            configs_failed: 0,
            notifications_sent: 1,
            notifications_failed: 0,
        }
    );
    assert_eq!(ctx.sent().len(), 1);
    assert_eq!(ctx.sent()[0].item_id, "first");
}

/// Monday 05:00 in Tokyo, still Sunday in UTC.
fn sunday_evening_utc() -> DateTime<Utc> {
    test_utils::tokyo(2024, 1, 8, 5).with_timezone(&Utc)
}

#[tokio::test]
async fn today_is_taken_in_the_configuration_timezone() {
    let source = TestSource::new(vec![test_utils::config("tokyo", "discord")]).with_items(
        "tokyo",
        Items::Ready(vec![item_with_timings("item-1", 8, &["same-day"])]),
    );
    let ctx = TestContext::new(source, TestChannelFactory::default());

    let report = ctx
        .service
        .process_reminders(sunday_evening_utc(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.notifications_sent, 1);
    assert_eq!(ctx.sent()[0].timing, TimingExpression::SameDay);
}

#[tokio::test]
async fn same_instant_is_not_due_yet_in_a_utc_configuration() {
    let utc_config = RawReminderConfig {
        timezone: Some("UTC".to_owned()),
        ..test_utils::raw_config("utc", "discord")
    }
    .validate(&Default::default())
    .unwrap();
    // Due Monday 09:00 Tokyo, which is Monday 00:00 UTC.
    let source = TestSource::new(vec![utc_config]).with_items(
        "utc",
        Items::Ready(vec![item_with_timings("item-1", 8, &["same-day"])]),
    );
    let ctx = TestContext::new(source, TestChannelFactory::default());

    let report = ctx
        .service
        .process_reminders(sunday_evening_utc(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.configs_processed, 1);
    assert_eq!(report.notifications_sent, 0);
    assert!(ctx.sent().is_empty());
}

#[tokio::test]
async fn concurrency_limit_of_one_still_processes_every_configuration() {
    let configs = (0..5)
        .map(|i| test_utils::config(&i.to_string(), "discord"))
        .collect::<Vec<_>>();
    let mut source = TestSource::new(configs);
    for i in 0..5 {
        source = source.with_items(
            &i.to_string(),
            Items::Ready(vec![item_with_timings(&format!("item-{i}"), 8, &[])]),
        );
    }
    let mut ctx = TestContext::new(source, TestChannelFactory::default());
    ctx.service = ctx.service.with_max_concurrency(1);

    let report = ctx
        .service
        .process_reminders(monday_morning(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.configs_processed, 5);
    assert_eq!(report.notifications_sent, 5);
}
