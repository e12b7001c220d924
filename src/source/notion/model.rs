use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeZone};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::models::AttributeValue;

#[derive(Debug, Deserialize)]
pub(super) struct QueryResponse {
    #[serde(default)]
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Page {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub properties: HashMap<String, Property>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct SelectOption {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct Person {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DateValue {
    pub start: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(super) enum Property {
    Title {
        #[serde(default)]
        title: Vec<RichText>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Number {
        number: Option<f64>,
    },
    Select {
        select: Option<SelectOption>,
    },
    MultiSelect {
        #[serde(default)]
        multi_select: Vec<SelectOption>,
    },
    Date {
        date: Option<DateValue>,
    },
    People {
        #[serde(default)]
        people: Vec<Person>,
    },
    Checkbox {
        #[serde(default)]
        checkbox: bool,
    },
    Url {
        url: Option<String>,
    },
    #[serde(other)]
    Unsupported,
}

impl Property {
    /// Single text value of title, rich text, select and URL properties.
    pub fn text(&self) -> Option<String> {
        let text = match self {
            Property::Title { title: parts } | Property::RichText { rich_text: parts } => parts
                .iter()
                .map(|p| p.plain_text.as_str())
                .collect::<String>(),
            Property::Select { select: Some(option) } => option.name.clone(),
            Property::Url { url: Some(url) } => url.clone(),
            _ => return None,
        };

        Some(text).filter(|t| !t.is_empty())
    }

    pub fn names(&self) -> Vec<String> {
        match self {
            Property::MultiSelect { multi_select } => {
                multi_select.iter().map(|o| o.name.clone()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Start of a date property, read in `timezone` when it carries no offset.
    pub fn date_in(&self, timezone: Tz) -> Option<DateTime<Tz>> {
        match self {
            Property::Date {
                date: Some(DateValue { start: Some(start) }),
            } => parse_date(start, timezone),
            _ => None,
        }
    }

    pub fn to_attribute(&self) -> AttributeValue {
        match self {
            Property::Title { .. }
            | Property::RichText { .. }
            | Property::Select { .. }
            | Property::Url { .. } => {
                self.text().map_or(AttributeValue::Null, AttributeValue::Text)
            }
            Property::Number { number } => {
                number.map_or(AttributeValue::Null, AttributeValue::Number)
            }
            Property::MultiSelect { .. } => AttributeValue::List(self.names()),
            Property::Date {
                date: Some(DateValue { start: Some(start) }),
            } => AttributeValue::Text(start.chars().take(10).collect()),
            Property::People { people } => AttributeValue::List(
                people
                    .iter()
                    .filter_map(|p| p.name.clone())
                    .filter(|n| !n.is_empty())
                    .collect(),
            ),
            Property::Checkbox { checkbox } => AttributeValue::Bool(*checkbox),
            Property::Date { .. } | Property::Unsupported => AttributeValue::Null,
        }
    }
}

fn parse_date(start: &str, timezone: Tz) -> Option<DateTime<Tz>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(start) {
        return Some(at.with_timezone(&timezone));
    }

    let date = NaiveDate::parse_from_str(start, "%Y-%m-%d").ok()?;
    timezone
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .earliest()
}
