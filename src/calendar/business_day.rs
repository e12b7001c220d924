use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDate, Offset, TimeZone, Weekday};
use chrono_tz::Tz;

const WEEKEND: [Weekday; 2] = [Weekday::Sat, Weekday::Sun];

/// Business-day arithmetic over a fixed holiday set, evaluated in one timezone.
#[derive(Debug, Clone)]
pub struct BusinessDayCalculator {
    holidays: HashSet<NaiveDate>,
    timezone: Tz,
}

impl BusinessDayCalculator {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>, timezone: Tz) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
            timezone,
        }
    }

    pub fn without_holidays(timezone: Tz) -> Self {
        Self::new(std::iter::empty(), timezone)
    }

    /// Builds the holiday set from instants, taking each one's calendar date in `timezone`.
    pub fn from_instants<T: TimeZone>(
        holidays: impl IntoIterator<Item = DateTime<T>>,
        timezone: Tz,
    ) -> Self {
        Self::new(
            holidays
                .into_iter()
                .map(|h| h.with_timezone(&timezone).date_naive()),
            timezone,
        )
    }

    pub fn is_business_date(&self, date: NaiveDate) -> bool {
        !WEEKEND.contains(&date.weekday()) && !self.holidays.contains(&date)
    }

    pub fn is_business_day<T: TimeZone>(&self, at: &DateTime<T>) -> bool {
        self.is_business_date(at.with_timezone(&self.timezone).date_naive())
    }

    /// Walks back `days` business days. The time of day is kept.
    ///
    /// Returns `None` only when the walk leaves the representable date range.
    pub fn subtract_business_days(&self, at: &DateTime<Tz>, days: u32) -> Option<DateTime<Tz>> {
        self.walk(at, days, NaiveDate::pred_opt)
    }

    /// Walks forward `days` business days. The time of day is kept.
    pub fn add_business_days(&self, at: &DateTime<Tz>, days: u32) -> Option<DateTime<Tz>> {
        self.walk(at, days, NaiveDate::succ_opt)
    }

    fn walk(
        &self,
        at: &DateTime<Tz>,
        days: u32,
        step: fn(&NaiveDate) -> Option<NaiveDate>,
    ) -> Option<DateTime<Tz>> {
        let local = at.with_timezone(&self.timezone);
        let mut current = local.date_naive();
        let mut remaining = days;

        while remaining > 0 {
            current = step(&current)?;
            if self.is_business_date(current) {
                remaining -= 1;
            }
        }

        with_local_date(&local, current)
    }
}

/// Moves `at` to another calendar date in its own zone, keeping the wall-clock time.
pub(crate) fn with_local_date(at: &DateTime<Tz>, date: NaiveDate) -> Option<DateTime<Tz>> {
    if date == at.date_naive() {
        return Some(*at);
    }

    let tz = at.timezone();
    let local = date.and_time(at.time());
    tz.from_local_datetime(&local).earliest().or_else(|| {
        // Wall-clock time falls in a DST gap, keep the offset it had before.
        let utc = local.checked_sub_offset(at.offset().fix())?;
        Some(tz.from_utc_datetime(&utc))
    })
}
