//! Working-day calendar and date conventions.
//!
//! Weekends (Saturday, Sunday) and an explicit holiday list are
//! non-working days. Dates are displayed as `DD/MM/YYYY`.
//!
//! # Parsing
//! ISO dates (`YYYY-MM-DD`) are always accepted. Slash, dash and dot
//! separated dates are tried in the preferred order (day-first or
//! month-first) and then in the other order. A trailing time part is ignored.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Display format for dates in table headers and cells.
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

const ISO_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DAY_FIRST_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const MONTH_FIRST_FORMATS: [&str; 3] = ["%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y"];

/// Parses a date string.
///
/// Returns `None` when the text is not a recognizable date.
pub fn parse_date(raw: &str, day_first: bool) -> Option<NaiveDate> {
    let date_part = raw.trim().split(['T', ' ']).next()?;
    if date_part.is_empty() {
        return None;
    }

    let (preferred, fallback) = if day_first {
        (DAY_FIRST_FORMATS, MONTH_FIRST_FORMATS)
    } else {
        (MONTH_FIRST_FORMATS, DAY_FIRST_FORMATS)
    };

    ISO_FORMATS
        .iter()
        .chain(preferred.iter())
        .chain(fallback.iter())
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Formats a date as `DD/MM/YYYY`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Business-day calendar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkCalendar {
    /// Non-working days besides weekends.
    pub holidays: BTreeSet<NaiveDate>,
}

impl WorkCalendar {
    /// Creates a calendar without holidays.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a calendar with the given holidays.
    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Adds a holiday.
    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    /// Whether work happens on this date.
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// The date `days` working days after `start`.
    ///
    /// `start` itself is never counted. Zero days returns `start`.
    pub fn add_business_days(&self, start: NaiveDate, days: u32) -> NaiveDate {
        let mut current = start;
        let mut added = 0;
        while added < days {
            current += Duration::days(1);
            if self.is_working_day(current) {
                added += 1;
            }
        }
        current
    }

    /// Number of working days in `[from, to)`.
    pub fn business_days_between(&self, from: NaiveDate, to: NaiveDate) -> u32 {
        from.iter_days()
            .take_while(|d| *d < to)
            .filter(|d| self.is_working_day(*d))
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_day_first() {
        assert_eq!(parse_date("12/05/2024", true), Some(ymd(2024, 5, 12)));
        assert_eq!(parse_date("25-05-2024", true), Some(ymd(2024, 5, 25)));
        assert_eq!(parse_date("2024-05-25", true), Some(ymd(2024, 5, 25)));
        assert_eq!(
            parse_date("2024-05-25 00:00:00", true),
            Some(ymd(2024, 5, 25))
        );
    }

    #[test]
    fn test_parse_month_first_with_fallback() {
        assert_eq!(parse_date("05/12/2024", false), Some(ymd(2024, 5, 12)));
        // Day 25 cannot be a month, so the other order is used.
        assert_eq!(parse_date("25/05/2024", false), Some(ymd(2024, 5, 25)));
    }

    #[test]
    fn test_parse_rejects_non_dates() {
        assert_eq!(parse_date("1", true), None);
        assert_eq!(parse_date("Goal", true), None);
        assert_eq!(parse_date("", true), None);
        assert_eq!(parse_date("31/02/2024", true), None);
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(ymd(2024, 6, 2)), "02/06/2024");
    }

    #[test]
    fn test_working_days() {
        let cal = WorkCalendar::with_holidays([ymd(2024, 12, 25)]);
        assert!(cal.is_working_day(ymd(2024, 12, 20)));
        assert!(!cal.is_working_day(ymd(2024, 12, 21)));
        assert!(!cal.is_working_day(ymd(2024, 12, 22)));
        assert!(!cal.is_working_day(ymd(2024, 12, 25)));
    }

    #[test]
    fn test_add_business_days_skips_weekend_and_holiday() {
        let cal = WorkCalendar::with_holidays([ymd(2024, 12, 25)]);
        assert_eq!(cal.add_business_days(ymd(2024, 12, 20), 3), ymd(2024, 12, 26));
        assert_eq!(cal.add_business_days(ymd(2024, 12, 20), 0), ymd(2024, 12, 20));
        assert_eq!(
            WorkCalendar::new().add_business_days(ymd(2024, 5, 17), 1),
            ymd(2024, 5, 20)
        );
    }

    #[test]
    fn test_business_days_between() {
        let cal = WorkCalendar::new();
        assert_eq!(cal.business_days_between(ymd(2024, 5, 12), ymd(2024, 5, 19)), 5);
        assert_eq!(cal.business_days_between(ymd(2024, 5, 13), ymd(2024, 5, 13)), 0);
        let cal = WorkCalendar::with_holidays([ymd(2024, 5, 15)]);
        assert_eq!(cal.business_days_between(ymd(2024, 5, 13), ymd(2024, 5, 20)), 4);
    }
}
