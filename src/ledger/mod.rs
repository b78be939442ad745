//! Used-capacity ledger.
//!
//! Records, per entry and date, how much capacity has been consumed.
//! Entries are keyed by goal: a specific task's goal, or an aggregate
//! token (`*`) for the "any goal" entry of a responsibility combination.
//!
//! # Matching
//! - [`sum`](UsedResourceLedger::sum) selects entries by stored value:
//!   aggregate tokens in the query select aggregate entries, anything else
//!   needs the identical text.
//! - [`update`](UsedResourceLedger::update) treats stored values as
//!   patterns (aggregate token, exact text or anchored regex), so one
//!   consumption reaches the task entry and every aggregate entry covering it.
//!
//! Values are kept non-negative.

mod initializer;

pub use initializer::LedgerInitializer;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::matching::{aggregate_selects, is_accumulated, matches_filters, Filters, Pattern};
use crate::models::{format_date, Responsibility, Table, Value, TASK_GOAL};

/// How [`UsedResourceLedger::update`] applies the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Add to the current value.
    Additive,
    /// Overwrite the current value.
    Absolute,
}

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Task goal, or an aggregate token.
    pub goal: String,
    /// Responsibility attributes.
    pub responsibility: Responsibility,
    /// Auxiliary columns, carried through untouched.
    pub info: BTreeMap<String, Value>,
    /// Consumed capacity, aligned with [`UsedResourceLedger::dates`].
    pub values: Vec<f64>,
}

impl LedgerEntry {
    /// Whether this is an aggregate ("any goal") entry.
    pub fn is_aggregate(&self) -> bool {
        is_accumulated(&self.goal)
    }

    /// Text of a goal, responsibility or info column.
    fn column_text(&self, column: &str) -> Option<String> {
        if column == TASK_GOAL {
            return Some(self.goal.clone());
        }
        self.responsibility
            .get(column)
            .or_else(|| self.info.get(column))
            .map(Value::text)
    }

    fn patterns(&self) -> BTreeMap<String, Pattern> {
        std::iter::once((TASK_GOAL.to_string(), Pattern::compile(&self.goal)))
            .chain(
                self.responsibility
                    .iter()
                    .chain(self.info.iter())
                    .map(|(name, value)| (name.clone(), Pattern::compile(&value.text()))),
            )
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum LedgerColumn {
    Goal,
    Attribute(String),
    Info(String),
    Date(usize),
}

/// Per-entry, per-date consumed capacity.
#[derive(Debug, Clone)]
pub struct UsedResourceLedger {
    layout: Vec<LedgerColumn>,
    attribute_names: Vec<String>,
    info_names: Vec<String>,
    dates: Vec<NaiveDate>,
    entries: Vec<LedgerEntry>,
    patterns: Vec<BTreeMap<String, Pattern>>,
}

impl UsedResourceLedger {
    /// Reads a ledger table.
    ///
    /// Columns that are neither the goal, a date, nor one of
    /// `attribute_names` are info columns. Missing or non-numeric date cells
    /// read as 0.
    ///
    /// # Errors
    /// [`Error::MissingColumn`] if the goal column or an attribute column is absent.
    pub fn from_table(table: &Table, attribute_names: &[String], day_first: bool) -> Result<Self> {
        let missing: Vec<String> = std::iter::once(TASK_GOAL.to_string())
            .chain(attribute_names.iter().cloned())
            .filter(|name| !table.has_column(name))
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingColumn {
                table: "used capacity".into(),
                columns: missing,
            });
        }

        let date_columns = table.date_columns(day_first);
        let mut layout = Vec::with_capacity(table.columns.len());
        let mut info_names = Vec::new();
        let mut date_positions = Vec::new();
        let mut dates = Vec::new();

        for (idx, name) in table.columns.iter().enumerate() {
            if let Some((_, date)) = date_columns.iter().find(|(pos, _)| *pos == idx) {
                layout.push(LedgerColumn::Date(dates.len()));
                dates.push(*date);
                date_positions.push(idx);
            } else if name == TASK_GOAL {
                layout.push(LedgerColumn::Goal);
            } else if attribute_names.contains(name) {
                layout.push(LedgerColumn::Attribute(name.clone()));
            } else {
                layout.push(LedgerColumn::Info(name.clone()));
                info_names.push(name.clone());
            }
        }

        let mut ledger = Self {
            layout,
            attribute_names: attribute_names.to_vec(),
            info_names,
            dates,
            entries: Vec::new(),
            patterns: Vec::new(),
        };

        for row in 0..table.row_count() {
            let goal = table.value(row, TASK_GOAL).map(Value::text).unwrap_or_default();
            let info = ledger
                .info_names
                .iter()
                .map(|name| (name.clone(), table.value(row, name).cloned().unwrap_or_default()))
                .collect();
            let values = date_positions
                .iter()
                .map(|idx| table.cell(row, *idx).and_then(Value::as_number).unwrap_or(0.0))
                .collect();
            ledger.push_entry(LedgerEntry {
                goal,
                responsibility: Responsibility::from_row(table, row, attribute_names),
                info,
                values,
            });
        }

        Ok(ledger)
    }

    /// Appends an entry. Values are clamped to non-negative and padded to the date count.
    pub fn push_entry(&mut self, mut entry: LedgerEntry) {
        entry.values.resize(self.dates.len(), 0.0);
        for v in &mut entry.values {
            *v = v.max(0.0);
        }
        self.patterns.push(entry.patterns());
        self.entries.push(entry);
    }

    /// Ledger dates, in column order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Responsibility attribute names.
    pub fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }

    /// Info column names.
    pub fn info_names(&self) -> &[String] {
        &self.info_names
    }

    /// All entries, in row order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Entry with this goal and responsibility.
    pub fn find(&self, goal: &str, responsibility: &Responsibility) -> Option<&LedgerEntry> {
        self.entries
            .iter()
            .find(|e| e.goal == goal && e.responsibility.same_values(responsibility))
    }

    /// Value of an entry at a date.
    pub fn value_at(&self, entry: &LedgerEntry, date: NaiveDate) -> Result<f64> {
        let idx = self.date_index(date)?;
        Ok(entry.values.get(idx).copied().unwrap_or(0.0))
    }

    fn date_index(&self, date: NaiveDate) -> Result<usize> {
        self.dates
            .iter()
            .position(|d| *d == date)
            .ok_or_else(|| Error::InvalidDate(format_date(date)))
    }

    fn check_filter_keys(&self, filters: &Filters) -> Result<()> {
        match filters.keys().find(|key| {
            key.as_str() != TASK_GOAL
                && !self.attribute_names.contains(key)
                && !self.info_names.contains(key)
        }) {
            Some(key) => Err(Error::InvalidAttribute(key.clone())),
            None => Ok(()),
        }
    }

    /// Total consumption on `date` over entries selected by `filters`.
    ///
    /// # Errors
    /// [`Error::InvalidDate`] or [`Error::InvalidAttribute`] for unknown dates or keys.
    pub fn sum(&self, date: NaiveDate, filters: &Filters) -> Result<f64> {
        let idx = self.date_index(date)?;
        self.check_filter_keys(filters)?;

        Ok(self
            .entries
            .iter()
            .filter(|entry| {
                filters.iter().all(|(key, requested)| {
                    entry
                        .column_text(key)
                        .is_some_and(|stored| aggregate_selects(&stored, requested))
                })
            })
            .map(|entry| entry.values[idx])
            .sum())
    }

    /// Applies `amount` on `date` to every entry whose stored values match `filters`.
    ///
    /// Returns the number of entries changed.
    ///
    /// # Errors
    /// [`Error::InvalidDate`] or [`Error::InvalidAttribute`] for unknown dates or keys.
    pub fn update(
        &mut self,
        date: NaiveDate,
        amount: f64,
        mode: UpdateMode,
        filters: &Filters,
    ) -> Result<usize> {
        let idx = self.date_index(date)?;
        self.check_filter_keys(filters)?;

        let mut updated = 0;
        for (entry, patterns) in self.entries.iter_mut().zip(&self.patterns) {
            if !matches_filters(patterns, filters) {
                continue;
            }
            let value = &mut entry.values[idx];
            *value = match mode {
                UpdateMode::Additive => *value + amount,
                UpdateMode::Absolute => amount,
            }
            .max(0.0);
            updated += 1;
        }

        debug!(date = %format_date(date), amount, ?mode, updated, "ledger updated");
        Ok(updated)
    }

    /// Zeroes every date on or after `cutoff`. Returns the number of dates reset.
    pub fn reset_future_dates(&mut self, cutoff: NaiveDate) -> usize {
        let future: Vec<usize> = self
            .dates
            .iter()
            .enumerate()
            .filter(|(_, d)| **d >= cutoff)
            .map(|(idx, _)| idx)
            .collect();

        for entry in &mut self.entries {
            for idx in &future {
                entry.values[*idx] = 0.0;
            }
        }

        info!(cutoff = %format_date(cutoff), dates = future.len(), "used capacity reset");
        future.len()
    }

    /// Renders the ledger as a table in its original column order.
    ///
    /// Date headers use `DD/MM/YYYY`.
    pub fn to_table(&self) -> Table {
        let columns = self.layout.iter().map(|col| match col {
            LedgerColumn::Goal => TASK_GOAL.to_string(),
            LedgerColumn::Attribute(name) | LedgerColumn::Info(name) => name.clone(),
            LedgerColumn::Date(idx) => format_date(self.dates[*idx]),
        });
        let mut table = Table::new(columns);

        for entry in &self.entries {
            let row = self
                .layout
                .iter()
                .map(|col| match col {
                    LedgerColumn::Goal => Value::Text(entry.goal.clone()),
                    LedgerColumn::Attribute(name) => {
                        entry.responsibility.get(name).cloned().unwrap_or_default()
                    }
                    LedgerColumn::Info(name) => entry.info.get(name).cloned().unwrap_or_default(),
                    LedgerColumn::Date(idx) => Value::Number(entry.values[*idx]),
                })
                .collect();
            table.push_row(row);
        }

        table
    }
}
