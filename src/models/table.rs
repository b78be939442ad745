//! Tabular interchange format.
//!
//! The scheduler consumes and produces three tables (tasks, available
//! capacity, used capacity). Reading and writing them from files is left
//! to the caller; this type is only the in-memory exchange shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use chrono::NaiveDate;

use super::calendar::parse_date;
use super::Value;

/// Ordered named columns and ordered rows of [`Value`] cells.
///
/// Rows built through [`Table::push_row`] have exactly one cell per column.
/// Deserialized rows may be ragged; missing cells read as blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column names, in display order.
    pub columns: Vec<String>,
    /// Rows of cells, aligned with `columns`.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Creates an empty table with the given columns.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row (builder form).
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.push_row(row);
        self
    }

    /// Appends a row, padding with empty cells or truncating to the column count.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Empty);
        self.rows.push(row);
    }

    /// Pads or truncates every row to the column count.
    pub fn normalize_rows(&mut self) {
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, Value::Empty);
        }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at (`row`, `column`). `None` if either does not exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        self.cell(row, self.column_index(column)?)
    }

    /// Cell at (`row`, column position). `None` past the end of a short row.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Adds a column filled with empty cells. Returns its index.
    ///
    /// Existing columns are left untouched.
    pub fn add_column(&mut self, name: impl Into<String>) -> usize {
        let name = name.into();
        if let Some(idx) = self.column_index(&name) {
            return idx;
        }
        self.columns.push(name);
        for row in &mut self.rows {
            row.push(Value::Empty);
        }
        self.columns.len() - 1
    }

    /// Writes a cell, adding the column if needed. Out-of-range rows are ignored.
    pub fn set_value(&mut self, row: usize, column: &str, value: Value) {
        let col = self.add_column(column);
        if let Some(r) = self.rows.get_mut(row) {
            if r.len() <= col {
                r.resize(col + 1, Value::Empty);
            }
            r[col] = value;
        }
    }

    /// Columns whose names are dates, with their positions.
    pub fn date_columns(&self, day_first: bool) -> Vec<(usize, NaiveDate)> {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| parse_date(name, day_first).map(|date| (idx, date)))
            .collect()
    }

    /// Column name → cell map of one row.
    pub fn row_map(&self, row: usize) -> BTreeMap<String, Value> {
        self.rows
            .get(row)
            .map(|r| self.columns.iter().cloned().zip(r.iter().cloned()).collect())
            .unwrap_or_default()
    }
}
