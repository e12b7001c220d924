use std::{fmt, str::FromStr};

use chrono::{DateTime, Days, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;

use super::business_day::{BusinessDayCalculator, with_local_date};

pub const TODAY_LABEL: &str = "today";
pub const TOMORROW_LABEL: &str = "tomorrow";

// Canonical spelling first, then the Japanese one used in Notion select options.
const SAME_DAY: [&str; 2] = ["same-day", "当日"];
const DAYS_BEFORE: [&str; 2] = ["-days-before", "日前"];
const BUSINESS_DAYS_BEFORE: [&str; 2] = ["-business-days-before", "営業日前"];
const WEEKS_BEFORE: [&str; 2] = ["-weeks-before", "週間前"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimingError {
    #[error("unsupported timing format: {0}")]
    Unsupported(String),

    #[error("invalid number in timing: {0}")]
    InvalidNumber(String),

    #[error("business day calculator required for: {0}")]
    MissingCalculator(String),

    #[error("reminder date out of range for: {0}")]
    OutOfRange(String),
}

/// When a reminder fires relative to the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingExpression {
    SameDay,
    DaysBefore(u32),
    BusinessDaysBefore(u32),
    WeeksBefore(u32),
}

impl TimingExpression {
    /// Date on which this reminder fires for `due`.
    pub fn reminder_date(
        &self,
        due: &DateTime<Tz>,
        calculator: Option<&BusinessDayCalculator>,
    ) -> Result<DateTime<Tz>, TimingError> {
        let out_of_range = || TimingError::OutOfRange(self.to_string());

        match *self {
            TimingExpression::SameDay => Ok(*due),
            TimingExpression::DaysBefore(days) => {
                calendar_days_before(due, u64::from(days)).ok_or_else(out_of_range)
            }
            TimingExpression::WeeksBefore(weeks) => {
                calendar_days_before(due, u64::from(weeks) * 7).ok_or_else(out_of_range)
            }
            TimingExpression::BusinessDaysBefore(days) => {
                let calculator =
                    calculator.ok_or_else(|| TimingError::MissingCalculator(self.to_string()))?;
                calculator
                    .subtract_business_days(due, days)
                    .ok_or_else(out_of_range)
            }
        }
    }

    /// Short offset label used in rendered messages.
    ///
    /// Only the same-day, one-day and two-day forms get dedicated labels; every
    /// other form is labelled by its number alone, whatever its unit.
    pub fn days_text(&self) -> String {
        match *self {
            TimingExpression::SameDay => TODAY_LABEL.to_owned(),
            TimingExpression::DaysBefore(1) => TOMORROW_LABEL.to_owned(),
            TimingExpression::DaysBefore(n)
            | TimingExpression::BusinessDaysBefore(n)
            | TimingExpression::WeeksBefore(n) => format!("in {n} days"),
        }
    }
}

impl FromStr for TimingExpression {
    type Err = TimingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let timing = s.trim();
        if SAME_DAY.contains(&timing) {
            return Ok(TimingExpression::SameDay);
        }

        let (digits, suffix) = split_leading_digits(timing);
        if digits.is_empty() {
            return Err(TimingError::Unsupported(timing.to_owned()));
        }

        let unit: fn(u32) -> TimingExpression = if DAYS_BEFORE.contains(&suffix) {
            TimingExpression::DaysBefore
        } else if BUSINESS_DAYS_BEFORE.contains(&suffix) {
            TimingExpression::BusinessDaysBefore
        } else if WEEKS_BEFORE.contains(&suffix) {
            TimingExpression::WeeksBefore
        } else {
            return Err(TimingError::Unsupported(timing.to_owned()));
        };

        let n = digits
            .parse::<u32>()
            .map_err(|_| TimingError::InvalidNumber(timing.to_owned()))?;

        Ok(unit(n))
    }
}

impl fmt::Display for TimingExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingExpression::SameDay => f.write_str(SAME_DAY[0]),
            TimingExpression::DaysBefore(n) => write!(f, "{n}{}", DAYS_BEFORE[0]),
            TimingExpression::BusinessDaysBefore(n) => write!(f, "{n}{}", BUSINESS_DAYS_BEFORE[0]),
            TimingExpression::WeeksBefore(n) => write!(f, "{n}{}", WEEKS_BEFORE[0]),
        }
    }
}

/// Parses `expression` and computes the reminder date for `due`.
pub fn evaluate(
    due: &DateTime<Tz>,
    expression: &str,
    calculator: Option<&BusinessDayCalculator>,
) -> Result<DateTime<Tz>, TimingError> {
    expression
        .parse::<TimingExpression>()?
        .reminder_date(due, calculator)
}

/// Compares calendar dates only. Both sides are expected in the same zone.
pub fn is_same_date<A: TimeZone, B: TimeZone>(a: &DateTime<A>, b: &DateTime<B>) -> bool {
    a.date_naive() == b.date_naive()
}

/// Offset label for a raw timing string. Input without a leading number that
/// does not parse is returned unchanged.
pub fn format_days_text(timing: &str) -> String {
    if let Ok(expression) = timing.parse::<TimingExpression>() {
        return expression.days_text();
    }

    match split_leading_digits(timing.trim()) {
        ("", _) => timing.to_owned(),
        (digits, _) => format!("in {digits} days"),
    }
}

fn calendar_days_before(due: &DateTime<Tz>, days: u64) -> Option<DateTime<Tz>> {
    let date = due.date_naive().checked_sub_days(Days::new(days))?;
    with_local_date(due, date)
}

fn split_leading_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}
