use crate::calendar::TimingExpression;

use super::{DueItem, ReminderConfig};

/// A rendered reminder ready to be handed to a delivery channel.
#[derive(Debug, Clone)]
pub struct Notification<'a> {
    pub item: &'a DueItem,
    pub config: &'a ReminderConfig,
    pub timing: TimingExpression,
    pub message: String,
    pub destination: String,
}
