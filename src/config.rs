//! Scheduler configuration.
//!
//! A plain value passed into [`TaskScheduler`](crate::scheduler::TaskScheduler).
//! Nothing in the crate reads settings from global state.

use std::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of resource-days one date bucket represents.
pub const DEFAULT_PERIOD_DAYS: f64 = 5.0;

/// Placeholder replaced by the info column name in
/// [`SchedulerConfig::info_column_template`].
pub const INFO_COLUMN_PLACEHOLDER: &str = "{infocolumn}";

/// How many resource-days each processed date represents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodLength {
    /// Fixed number of days for every date.
    Days(f64),
    /// Business days from each date to the next processed date.
    Auto,
}

impl Default for PeriodLength {
    fn default() -> Self {
        PeriodLength::Days(DEFAULT_PERIOD_DAYS)
    }
}

impl FromStr for PeriodLength {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(PeriodLength::Auto);
        }
        s.parse::<f64>()
            .map(PeriodLength::Days)
            .map_err(|_| Error::Config(format!("Invalid period length: '{s}'")))
    }
}

/// Configuration for a scheduling run.
///
/// # Example
///
/// ```
/// use u_capacity::config::{PeriodLength, SchedulerConfig};
/// use chrono::NaiveDate;
///
/// let config = SchedulerConfig::new()
///     .with_period(PeriodLength::Days(1.0))
///     .with_holiday(NaiveDate::from_ymd_opt(2024, 12, 25).unwrap())
///     .with_today(NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Resource-days per date bucket.
    pub period: PeriodLength,
    /// Non-working days besides weekends.
    pub holidays: Vec<NaiveDate>,
    /// Parse ambiguous dates as day/month/year.
    pub day_first: bool,
    /// Value written into info columns of new ledger rows.
    /// `{infocolumn}` is replaced by the column name.
    pub info_column_template: Option<String>,
    /// Dates before this are not scheduled. `None` = local current date.
    pub today: Option<NaiveDate>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period: PeriodLength::default(),
            holidays: Vec::new(),
            day_first: true,
            info_column_template: None,
            today: None,
        }
    }
}

impl SchedulerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the period length.
    pub fn with_period(mut self, period: PeriodLength) -> Self {
        self.period = period;
        self
    }

    /// Adds a holiday.
    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.holidays.push(date);
        self
    }

    /// Replaces the holiday list.
    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays = holidays.into_iter().collect();
        self
    }

    /// Sets the date parsing convention.
    pub fn with_day_first(mut self, day_first: bool) -> Self {
        self.day_first = day_first;
        self
    }

    /// Sets the info column template.
    pub fn with_info_column_template(mut self, template: impl Into<String>) -> Self {
        self.info_column_template = Some(template.into());
        self
    }

    /// Pins "now" to a fixed date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// The cutoff date for this run.
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Checks the configuration for unusable values.
    pub fn validate(&self) -> Result<()> {
        if let PeriodLength::Days(days) = self.period {
            if !days.is_finite() || days <= 0.0 {
                return Err(Error::Config(format!(
                    "Period length must be a positive number of days, got {days}"
                )));
            }
        }
        Ok(())
    }
}
