mod config;
mod due_item;
mod notification;

pub use config::{
    ConfigDefaults, DEFAULT_DATE_PROPERTY, DEFAULT_MESSAGE_TEMPLATE, DEFAULT_TIMEZONE,
    DEFAULT_TITLE_PROPERTY, RawReminderConfig, ReminderConfig,
};
pub use due_item::{AttributeValue, DueItem, RawDueItem};
pub use notification::Notification;

use thiserror::Error;

/// A row from the source that could not be turned into a usable model.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidationError {
    pub(crate) fn required(field: &'static str) -> Self {
        Self {
            field,
            message: "required",
        }
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
