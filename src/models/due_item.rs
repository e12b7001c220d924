use std::{collections::HashMap, fmt};

use chrono::DateTime;
use chrono_tz::Tz;

use super::{ValidationError, non_empty};

/// Value of an arbitrary named attribute carried by a due item.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<String>),
    Null,
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(text) => f.write_str(text),
            AttributeValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            AttributeValue::Number(n) => write!(f, "{n}"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::List(items) => f.write_str(&items.join(", ")),
            AttributeValue::Null => Ok(()),
        }
    }
}

/// Due item as read from the source, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawDueItem {
    pub id: String,
    pub title: String,
    pub due: Option<DateTime<Tz>>,
    pub description: String,
    pub message_template: Option<String>,
    pub reminder_timings: Vec<String>,
    pub url: String,
    pub attributes: HashMap<String, AttributeValue>,
}

#[derive(Debug, Clone)]
pub struct DueItem {
    pub id: String,
    pub title: String,
    pub due: DateTime<Tz>,
    pub description: String,
    pub message_template: Option<String>,
    /// Replaces the configuration's timings when non-empty.
    pub reminder_timings: Vec<String>,
    pub url: String,
    pub attributes: HashMap<String, AttributeValue>,
}

impl RawDueItem {
    pub fn validate(self) -> Result<DueItem, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::required("title"));
        }
        let due = self.due.ok_or(ValidationError::required("due"))?;

        Ok(DueItem {
            id: self.id,
            title: self.title,
            due,
            description: self.description,
            message_template: non_empty(self.message_template),
            reminder_timings: self
                .reminder_timings
                .into_iter()
                .filter(|t| !t.trim().is_empty())
                .collect(),
            url: self.url,
            attributes: self.attributes,
        })
    }
}
