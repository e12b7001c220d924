use std::collections::HashMap;

use chrono::{DateTime, TimeZone};
use chrono_tz::{Asia::Tokyo, Tz};

use crate::{
    calendar::TimingExpression,
    models::{ConfigDefaults, DueItem, Notification, RawReminderConfig, ReminderConfig},
};

pub fn tokyo(y: i32, m: u32, d: u32, h: u32) -> DateTime<Tz> {
    Tokyo.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn raw_config(id: &str, channel: &str) -> RawReminderConfig {
    RawReminderConfig {
        id: id.to_owned(),
        name: format!("config {id}"),
        target_database_id: format!("db-{id}"),
        reminder_timings: vec!["same-day".to_owned()],
        channel: channel.to_owned(),
        webhook_url: Some("https://hooks.example.com/reminder".to_owned()),
        channel_token: Some("secret-token".to_owned()),
        recipient_id: Some("U123".to_owned()),
        timezone: Some("Asia/Tokyo".to_owned()),
        ..Default::default()
    }
}

pub fn config(id: &str, channel: &str) -> ReminderConfig {
    raw_config(id, channel)
        .validate(&ConfigDefaults::default())
        .unwrap()
}

pub fn due_item(id: &str, title: &str, due: DateTime<Tz>) -> DueItem {
    DueItem {
        id: id.to_owned(),
        title: title.to_owned(),
        due,
        description: String::new(),
        message_template: None,
        reminder_timings: vec![],
        url: format!("https://notion.example.com/{id}"),
        attributes: HashMap::new(),
    }
}

pub fn notification<'a>(
    item: &'a DueItem,
    config: &'a ReminderConfig,
    message: &str,
    destination: &str,
) -> Notification<'a> {
    Notification {
        item,
        config,
        timing: TimingExpression::SameDay,
        message: message.to_owned(),
        destination: destination.to_owned(),
    }
}
