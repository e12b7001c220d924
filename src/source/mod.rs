pub mod notion;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{DueItem, ReminderConfig};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{context} returned status {status}: {body}")]
    Status {
        context: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Where reminder configurations and their due items come from.
///
/// Rows that fail validation are dropped with a warning by the implementation;
/// an `Err` means the whole read failed.
#[async_trait]
pub trait ReminderSource: Send + Sync {
    /// Enabled configurations under `master_ref`, all pages included.
    async fn load_reminder_configs(
        &self,
        master_ref: &str,
    ) -> Result<Vec<ReminderConfig>, SourceError>;

    /// Due items of `config`'s target collection, filtered to those due on or
    /// after `today` where the backend supports it.
    async fn fetch_due_items(
        &self,
        config: &ReminderConfig,
        today: NaiveDate,
    ) -> Result<Vec<DueItem>, SourceError>;
}
