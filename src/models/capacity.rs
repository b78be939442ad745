//! Available-capacity table model.
//!
//! One row per responsibility combination (optionally per goal), one
//! column per date holding the number of resources available that day.
//! Every column that is neither the goal nor a date is a responsibility
//! attribute.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::calendar::format_date;
use super::{Responsibility, Table, Value, TASK_GOAL};
use crate::matching::ALL_TAG;

/// One row of the available-capacity table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRow {
    /// Goal the capacity is reserved for. `*` = any goal.
    pub goal: String,
    /// Pool attributes. Blank or aggregate values match any task value.
    pub responsibility: Responsibility,
    /// Available resources, aligned with [`CapacityTable::dates`].
    pub capacity: Vec<f64>,
}

/// Parsed available-capacity table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityTable {
    /// Responsibility attribute names, in column order.
    pub attribute_names: Vec<String>,
    /// Date columns, in column order.
    pub dates: Vec<NaiveDate>,
    /// Capacity rows.
    pub rows: Vec<CapacityRow>,
}

impl CapacityTable {
    /// Reads a capacity table.
    ///
    /// Cells that are not numbers count as zero capacity.
    pub fn from_table(table: &Table, day_first: bool) -> Self {
        let date_columns = table.date_columns(day_first);
        let date_positions: HashSet<usize> = date_columns.iter().map(|(idx, _)| *idx).collect();

        let attribute_names: Vec<String> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(idx, name)| name.as_str() != TASK_GOAL && !date_positions.contains(idx))
            .map(|(_, name)| name.clone())
            .collect();

        let rows = (0..table.row_count())
            .map(|row| {
                let goal = table
                    .value(row, TASK_GOAL)
                    .filter(|v| !v.is_blank())
                    .map_or_else(|| ALL_TAG.to_string(), Value::text);
                let capacity = date_columns
                    .iter()
                    .map(|(idx, date)| {
                        let cell = table.cell(row, *idx).cloned().unwrap_or_default();
                        cell.as_number().unwrap_or_else(|| {
                            if !cell.is_blank() {
                                warn!(row, date = %format_date(*date), value = %cell.text(), "non-numeric capacity treated as 0");
                            }
                            0.0
                        })
                    })
                    .collect();
                CapacityRow {
                    goal,
                    responsibility: Responsibility::from_row(table, row, &attribute_names),
                    capacity,
                }
            })
            .collect();

        Self {
            attribute_names,
            dates: date_columns.into_iter().map(|(_, date)| date).collect(),
            rows,
        }
    }

    /// Position of a date column.
    pub fn date_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.iter().position(|d| *d == date)
    }

    /// Distinct responsibility combinations, in first-seen order.
    pub fn roster(&self) -> ResponsibilityRoster {
        let mut seen = HashSet::new();
        let combinations = self
            .rows
            .iter()
            .filter(|row| seen.insert(row.responsibility.key()))
            .map(|row| row.responsibility.clone())
            .collect();
        ResponsibilityRoster {
            attribute_names: self.attribute_names.clone(),
            combinations,
        }
    }
}

/// Distinct responsibility combinations of a capacity table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponsibilityRoster {
    /// Responsibility attribute names.
    pub attribute_names: Vec<String>,
    /// One entry per distinct combination.
    pub combinations: Vec<Responsibility>,
}

impl ResponsibilityRoster {
    /// Number of combinations.
    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Table {
        Table::new(["Goal", "Team", "Group", "12/05/2024", "19/05/2024"])
            .with_row(vec!["*".into(), "TeamA".into(), "GroupA".into(), 3.into(), 1.into()])
            .with_row(vec!["*".into(), "TeamB".into(), "GroupB".into(), 4.into(), "x".into()])
            .with_row(vec!["Goal9".into(), "TeamA".into(), "GroupA".into(), 1.into(), 1.into()])
    }

    #[test]
    fn test_from_table() {
        let capacity = CapacityTable::from_table(&sample(), true);
        assert_eq!(capacity.attribute_names, vec!["Team", "Group"]);
        assert_eq!(capacity.dates, vec![ymd(2024, 5, 12), ymd(2024, 5, 19)]);
        assert_eq!(capacity.rows.len(), 3);
        assert_eq!(capacity.rows[2].goal, "Goal9");
        assert_eq!(capacity.rows[1].capacity, vec![4.0, 0.0]);
        assert_eq!(capacity.date_index(ymd(2024, 5, 19)), Some(1));
        assert_eq!(capacity.date_index(ymd(2024, 5, 26)), None);
    }

    #[test]
    fn test_missing_goal_column_means_any_goal() {
        let table = Table::new(["Team", "12/05/2024"]).with_row(vec!["TeamA".into(), 2.into()]);
        let capacity = CapacityTable::from_table(&table, true);
        assert_eq!(capacity.attribute_names, vec!["Team"]);
        assert_eq!(capacity.rows[0].goal, ALL_TAG);
    }

    #[test]
    fn test_roster_is_distinct() {
        let roster = CapacityTable::from_table(&sample(), true).roster();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.combinations[0].text("Team"), "TeamA");
        assert_eq!(roster.combinations[1].text("Team"), "TeamB");
    }
}
