//! Capacity lookups against the used-capacity ledger.
//!
//! # Algorithm
//! The capacity left for a responsibility on a date is the smallest
//! headroom over every capacity row covering it:
//!
//! ```text
//! available(date, filters) = max(0, min over matching rows r of
//!                                   r.capacity[date] - ledger.sum(date, r.attrs + r.goal))
//! ```
//!
//! A row covers the filters when each of its attribute values equals the
//! requested value or is an aggregate token. Taking the minimum lets a team
//! level row (`TeamA, *`) cap every group below it.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use crate::ledger::{LedgerInitializer, UpdateMode, UsedResourceLedger};
use crate::matching::{Filters, Pattern};
use crate::models::{format_date, CapacityTable, Table, Task, TASK_GOAL};

/// Available capacity combined with the consumption ledger.
#[derive(Debug, Clone)]
pub struct CapacityManager {
    capacity: CapacityTable,
    ledger: UsedResourceLedger,
}

impl CapacityManager {
    /// Checks that the capacity, ledger and task tables agree.
    ///
    /// # Errors
    /// - [`Error::MissingColumn`] if a responsibility attribute is absent
    ///   from the ledger or task table.
    /// - [`Error::DateColumnMismatch`] if capacity and ledger dates differ.
    pub fn check_schema(
        capacity: &CapacityTable,
        used: &Table,
        tasks: &Table,
        day_first: bool,
    ) -> Result<()> {
        for (name, table) in [("used capacity", used), ("tasks", tasks)] {
            let missing: Vec<String> = capacity
                .attribute_names
                .iter()
                .filter(|attr| !table.has_column(attr))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(Error::MissingColumn {
                    table: name.into(),
                    columns: missing,
                });
            }
        }

        let used_dates: Vec<NaiveDate> = used
            .date_columns(day_first)
            .into_iter()
            .map(|(_, date)| date)
            .collect();
        check_dates(&capacity.dates, &used_dates)
    }

    /// Combines a capacity table with a ledger.
    ///
    /// # Errors
    /// [`Error::DateColumnMismatch`] if their dates differ, or
    /// [`Error::MissingColumn`] if the ledger lacks a responsibility attribute.
    pub fn new(capacity: CapacityTable, ledger: UsedResourceLedger) -> Result<Self> {
        let missing: Vec<String> = capacity
            .attribute_names
            .iter()
            .filter(|attr| !ledger.attribute_names().contains(attr))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingColumn {
                table: "used capacity".into(),
                columns: missing,
            });
        }
        check_dates(&capacity.dates, ledger.dates())?;
        Ok(Self { capacity, ledger })
    }

    /// Validates the tables, reconciles the ledger and builds the manager.
    pub fn from_tables(
        available: &Table,
        used: &Table,
        task_table: &Table,
        tasks: &[Task],
        config: &SchedulerConfig,
    ) -> Result<Self> {
        let capacity = CapacityTable::from_table(available, config.day_first);
        Self::check_schema(&capacity, used, task_table, config.day_first)?;

        let ledger = LedgerInitializer::new()
            .with_info_template(config.info_column_template.clone())
            .with_day_first(config.day_first)
            .initialize(used, tasks, &capacity.roster())?;

        info!(
            attributes = ?capacity.attribute_names,
            dates = capacity.dates.len(),
            rows = capacity.rows.len(),
            "capacity manager ready"
        );
        Self::new(capacity, ledger)
    }

    /// Parsed capacity table.
    pub fn capacity(&self) -> &CapacityTable {
        &self.capacity
    }

    /// Consumption ledger.
    pub fn ledger(&self) -> &UsedResourceLedger {
        &self.ledger
    }

    /// Consumes the manager, returning the ledger.
    pub fn into_ledger(self) -> UsedResourceLedger {
        self.ledger
    }

    /// Responsibility attribute names.
    pub fn attribute_names(&self) -> &[String] {
        &self.capacity.attribute_names
    }

    /// Capacity still available on `date` for the responsibility in `filters`.
    ///
    /// Keys other than the responsibility attributes are ignored. Returns 0
    /// when no capacity row covers the filters.
    ///
    /// # Errors
    /// - [`Error::InvalidDate`] if `date` is not a capacity date.
    /// - [`Error::MissingFilter`] if a responsibility attribute is not in `filters`.
    pub fn available_capacity(&self, date: NaiveDate, filters: &Filters) -> Result<f64> {
        let idx = self
            .capacity
            .date_index(date)
            .ok_or_else(|| Error::InvalidDate(format_date(date)))?;

        let missing: Vec<String> = self
            .capacity
            .attribute_names
            .iter()
            .filter(|attr| !filters.contains_key(*attr))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingFilter(missing));
        }

        let mut remaining: Option<f64> = None;
        for row in &self.capacity.rows {
            let covers = self.capacity.attribute_names.iter().all(|attr| {
                filters
                    .get(attr)
                    .is_some_and(|value| Pattern::exact(&row.responsibility.text(attr)).matches(value))
            });
            if !covers {
                continue;
            }

            let mut ledger_filters = row.responsibility.to_filters();
            ledger_filters.insert(TASK_GOAL.to_string(), row.goal.clone());
            let used = self.ledger.sum(date, &ledger_filters)?;
            let headroom = row.capacity[idx] - used;
            remaining = Some(remaining.map_or(headroom, |r| r.min(headroom)));
        }

        let available = remaining.unwrap_or(0.0).max(0.0);
        debug!(date = %format_date(date), ?filters, available, "capacity lookup");
        Ok(available)
    }

    /// Records `amount` of consumption on `date`.
    ///
    /// Only the responsibility attributes and the goal of `filters` are used.
    pub fn consume(&mut self, date: NaiveDate, amount: f64, filters: &Filters) -> Result<usize> {
        let restricted: Filters = filters
            .iter()
            .filter(|(key, _)| {
                key.as_str() == TASK_GOAL || self.capacity.attribute_names.contains(key)
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.ledger
            .update(date, amount, UpdateMode::Additive, &restricted)
    }

    /// Zeroes ledger consumption on and after `cutoff`.
    pub fn reset_future_dates(&mut self, cutoff: NaiveDate) -> usize {
        self.ledger.reset_future_dates(cutoff)
    }
}

fn check_dates(available: &[NaiveDate], used: &[NaiveDate]) -> Result<()> {
    let available: BTreeSet<NaiveDate> = available.iter().copied().collect();
    let used: BTreeSet<NaiveDate> = used.iter().copied().collect();
    if available == used {
        return Ok(());
    }
    Err(Error::DateColumnMismatch {
        missing_in_available: used.difference(&available).map(|d| format_date(*d)).collect(),
        missing_in_used: available.difference(&used).map(|d| format_date(*d)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Responsibility, Value};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn filters(pairs: &[(&str, &str)]) -> Filters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn available() -> Table {
        Table::new(["Goal", "Team", "Group", "12/05/2024", "19/05/2024"])
            .with_row(vec!["*".into(), "TeamA".into(), "*".into(), 5.into(), 4.into()])
            .with_row(vec!["*".into(), "TeamA".into(), "GroupA".into(), 3.into(), 4.into()])
            .with_row(vec!["*".into(), "TeamB".into(), "GroupB".into(), 2.into(), 2.into()])
    }

    fn used() -> Table {
        Table::new(["Goal", "Team", "Group", "12/05/2024", "19/05/2024"])
            .with_row(vec!["Goal1".into(), "TeamA".into(), "GroupA".into(), 1.into(), 0.into()])
            .with_row(vec!["Goal2".into(), "TeamA".into(), "GroupC".into(), 1.into(), 0.into()])
    }

    fn task_table() -> Table {
        Table::new(["ID", "Goal", "Team", "Group"])
    }

    fn tasks() -> Vec<Task> {
        vec![
            Task::new("1").with_goal("Goal1").with_remaining(5.0).with_responsibility(
                Responsibility::new().with("Team", "TeamA").with("Group", "GroupA"),
            ),
            Task::new("2").with_goal("Goal2").with_remaining(5.0).with_responsibility(
                Responsibility::new().with("Team", "TeamA").with("Group", "GroupC"),
            ),
        ]
    }

    fn manager() -> CapacityManager {
        CapacityManager::from_tables(
            &available(),
            &used(),
            &task_table(),
            &tasks(),
            &SchedulerConfig::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_minimum_over_matching_rows() {
        let m = manager();
        // TeamA,* : 5 - (1 + 1) = 3 ; TeamA,GroupA : 3 - 1 = 2
        let f = filters(&[("Team", "TeamA"), ("Group", "GroupA")]);
        assert!((m.available_capacity(ymd(2024, 5, 12), &f).unwrap() - 2.0).abs() < 1e-10);
        // Only TeamA,* covers GroupC.
        let f = filters(&[("Team", "TeamA"), ("Group", "GroupC")]);
        assert!((m.available_capacity(ymd(2024, 5, 12), &f).unwrap() - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_no_matching_row_is_zero() {
        let m = manager();
        let f = filters(&[("Team", "TeamC"), ("Group", "GroupA")]);
        assert_eq!(m.available_capacity(ymd(2024, 5, 12), &f).unwrap(), 0.0);
    }

    #[test]
    fn test_extra_filters_ignored() {
        let m = manager();
        let f = filters(&[("Team", "TeamB"), ("Group", "GroupB"), ("Goal", "Goal9"), ("Area", "X")]);
        assert!((m.available_capacity(ymd(2024, 5, 19), &f).unwrap() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_lookup_errors() {
        let m = manager();
        let f = filters(&[("Team", "TeamA")]);
        assert!(matches!(
            m.available_capacity(ymd(2024, 5, 12), &f),
            Err(Error::MissingFilter(missing)) if missing == vec!["Group"]
        ));
        let f = filters(&[("Team", "TeamA"), ("Group", "GroupA")]);
        assert!(matches!(
            m.available_capacity(ymd(2024, 5, 26), &f),
            Err(Error::InvalidDate(_))
        ));
    }

    #[test]
    fn test_consume_reduces_availability() {
        let mut m = manager();
        let date = ymd(2024, 5, 19);
        let f = filters(&[("Goal", "Goal1"), ("Team", "TeamA"), ("Group", "GroupA"), ("ID", "1")]);
        m.consume(date, 1.5, &f).unwrap();

        let lookup = filters(&[("Team", "TeamA"), ("Group", "GroupA")]);
        assert!((m.available_capacity(date, &lookup).unwrap() - 2.5).abs() < 1e-10);

        let goal1 = m
            .ledger()
            .find("Goal1", &Responsibility::new().with("Team", "TeamA").with("Group", "GroupA"))
            .unwrap();
        assert!((m.ledger().value_at(goal1, date).unwrap() - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_availability_never_negative() {
        let mut m = manager();
        let date = ymd(2024, 5, 12);
        let f = filters(&[("Goal", "Goal1"), ("Team", "TeamA"), ("Group", "GroupA")]);
        m.consume(date, 10.0, &f).unwrap();
        let lookup = filters(&[("Team", "TeamA"), ("Group", "GroupA")]);
        assert_eq!(m.available_capacity(date, &lookup).unwrap(), 0.0);
    }

    #[test]
    fn test_reset_future_dates() {
        let mut m = manager();
        assert_eq!(m.reset_future_dates(ymd(2024, 5, 12)), 2);
        let lookup = filters(&[("Team", "TeamA"), ("Group", "GroupA")]);
        assert!((m.available_capacity(ymd(2024, 5, 12), &lookup).unwrap() - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_missing_attribute_in_tasks() {
        let capacity = CapacityTable::from_table(&available(), true);
        let err = CapacityManager::check_schema(&capacity, &used(), &Table::new(["ID", "Goal", "Team"]), true)
            .unwrap_err();
        assert!(matches!(err, Error::MissingColumn { table, .. } if table == "tasks"));
    }

    #[test]
    fn test_date_mismatch_names_both_sides() {
        let capacity = CapacityTable::from_table(&available(), true);
        let used = Table::new(["Goal", "Team", "Group", "12/05/2024", "26/05/2024"]);
        let err = CapacityManager::check_schema(&capacity, &used, &task_table(), true).unwrap_err();
        match err {
            Error::DateColumnMismatch {
                missing_in_available,
                missing_in_used,
            } => {
                assert_eq!(missing_in_available, vec!["26/05/2024"]);
                assert_eq!(missing_in_used, vec!["19/05/2024"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_date_headers_normalized() {
        let used = Table::new(["Goal", "Team", "Group", "2024-05-12", "2024-05-19"])
            .with_row(vec!["Goal1".into(), "TeamA".into(), "GroupA".into(), Value::Empty, 1.into()]);
        let m = CapacityManager::from_tables(&available(), &used, &task_table(), &tasks(), &SchedulerConfig::new())
            .unwrap();
        let table = m.ledger().to_table();
        assert!(table.has_column("12/05/2024"));
        assert!(table.has_column("19/05/2024"));
    }
}
