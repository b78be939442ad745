//! Ledger reconciliation before a scheduling run.
//!
//! # Algorithm
//! 1. Info columns = ledger columns other than the goal, the responsibility
//!    attributes and the dates.
//! 2. Append an entry for every task with remaining work that has none yet
//!    (same goal and responsibility). Info cells come from the task row, or
//!    from the configured template.
//! 3. Append an aggregate (`*`) entry for every roster combination that has
//!    none yet. Info cells are `N/A`.
//! 4. Fill date cells. Task entries: missing → 0. Aggregate entries:
//!    missing or `N/A` → sum of the task entries sharing the entry's
//!    non-aggregate attribute values. Explicit values are kept.
//!
//! Running it again on its own output changes nothing.

use std::collections::HashSet;

use tracing::{debug, info};

use super::UsedResourceLedger;
use crate::config::INFO_COLUMN_PLACEHOLDER;
use crate::error::{Error, Result};
use crate::matching::{is_accumulated, ALL_TAG};
use crate::models::{
    Responsibility, ResponsibilityRoster, Table, Task, Value, NA_MARKER, TASK_GOAL,
};

/// Builds a ready [`UsedResourceLedger`] from a raw ledger table.
#[derive(Debug, Clone)]
pub struct LedgerInitializer {
    info_template: Option<String>,
    day_first: bool,
}

impl Default for LedgerInitializer {
    fn default() -> Self {
        Self {
            info_template: None,
            day_first: true,
        }
    }
}

impl LedgerInitializer {
    /// Creates an initializer that copies info cells from tasks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills info cells of new task entries from a template instead of the task.
    ///
    /// `{infocolumn}` in the template is replaced by the column name.
    pub fn with_info_template(mut self, template: Option<String>) -> Self {
        self.info_template = template;
        self
    }

    /// Sets the date parsing convention for ledger headers.
    pub fn with_day_first(mut self, day_first: bool) -> Self {
        self.day_first = day_first;
        self
    }

    /// Reconciles `used` against the tasks and the responsibility roster.
    ///
    /// # Errors
    /// [`Error::MissingColumn`] if the ledger lacks the goal or a roster attribute.
    pub fn initialize(
        &self,
        used: &Table,
        tasks: &[Task],
        roster: &ResponsibilityRoster,
    ) -> Result<UsedResourceLedger> {
        info!(entries = used.row_count(), tasks = tasks.len(), "initializing used capacity");

        let attrs = &roster.attribute_names;
        let missing: Vec<String> = std::iter::once(TASK_GOAL.to_string())
            .chain(attrs.iter().cloned())
            .filter(|name| !used.has_column(name))
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingColumn {
                table: "used capacity".into(),
                columns: missing,
            });
        }

        let date_columns = used.date_columns(self.day_first);
        let date_positions: HashSet<usize> = date_columns.iter().map(|(idx, _)| *idx).collect();
        let info_names: Vec<String> = used
            .columns
            .iter()
            .enumerate()
            .filter(|(idx, name)| {
                name.as_str() != TASK_GOAL && !attrs.contains(name) && !date_positions.contains(idx)
            })
            .map(|(_, name)| name.clone())
            .collect();

        // Aggregate entries are keyed with every aggregate token folded to `*`,
        // so a `TOTAL` entry stands in for the `*` one.
        let existing: HashSet<(String, String)> = (0..used.row_count())
            .map(|row| {
                let goal = used.value(row, TASK_GOAL).map(Value::text).unwrap_or_default();
                let responsibility = Responsibility::from_row(used, row, attrs);
                if is_accumulated(&goal) {
                    (ALL_TAG.to_string(), aggregate_key(&responsibility))
                } else {
                    (goal, responsibility.key())
                }
            })
            .collect();

        let mut table = used.clone();
        table.normalize_rows();

        for task in tasks.iter().filter(|t| t.remaining > 0.0) {
            if existing.contains(&(task.goal.clone(), task.responsibility.key())) {
                continue;
            }
            let mut row = vec![Value::Empty; table.columns.len()];
            set(&table, &mut row, TASK_GOAL, Value::Text(task.goal.clone()));
            for (name, value) in task.responsibility.iter() {
                set(&table, &mut row, name, value.clone());
            }
            for name in &info_names {
                let value = match &self.info_template {
                    Some(template) => Value::Text(template.replace(INFO_COLUMN_PLACEHOLDER, name)),
                    None => task.attributes.get(name).cloned().unwrap_or_default(),
                };
                set(&table, &mut row, name, value);
            }
            debug!(goal = %task.goal, "ledger entry added for task");
            table.push_row(row);
        }

        for combination in &roster.combinations {
            if existing.contains(&(ALL_TAG.to_string(), aggregate_key(combination))) {
                continue;
            }
            let mut row = vec![Value::Empty; table.columns.len()];
            set(&table, &mut row, TASK_GOAL, Value::Text(ALL_TAG.to_string()));
            for (name, value) in combination.iter() {
                set(&table, &mut row, name, value.clone());
            }
            for name in &info_names {
                set(&table, &mut row, name, Value::Text(NA_MARKER.to_string()));
            }
            debug!(responsibility = %combination.key(), "aggregate ledger entry added");
            table.push_row(row);
        }

        fill_date_cells(&mut table, attrs, &date_columns);

        let ledger = UsedResourceLedger::from_table(&table, attrs, self.day_first)?;
        info!(entries = ledger.entries().len(), "used capacity initialized");
        Ok(ledger)
    }
}

fn set(table: &Table, row: &mut [Value], column: &str, value: Value) {
    if let Some(idx) = table.column_index(column) {
        row[idx] = value;
    }
}

fn aggregate_key(responsibility: &Responsibility) -> String {
    responsibility
        .iter()
        .fold(Responsibility::new(), |folded, (name, value)| {
            if is_accumulated(&value.text()) {
                folded.with(name.clone(), ALL_TAG)
            } else {
                folded.with(name.clone(), value.clone())
            }
        })
        .key()
}

/// Rows must already span every column.
fn fill_date_cells(
    table: &mut Table,
    attrs: &[String],
    date_columns: &[(usize, chrono::NaiveDate)],
) {
    let goal_idx = table.column_index(TASK_GOAL);
    let is_aggregate: Vec<bool> = table
        .rows
        .iter()
        .map(|row| goal_idx.is_some_and(|idx| is_accumulated(&row[idx].text())))
        .collect();

    // Task entries first, so aggregate sums see their filled values.
    for (row, aggregate) in table.rows.iter_mut().zip(&is_aggregate) {
        if *aggregate {
            continue;
        }
        for (idx, _) in date_columns {
            if row[*idx].as_number().is_none() {
                row[*idx] = Value::Number(0.0);
            }
        }
    }

    let attr_positions: Vec<usize> = attrs.iter().filter_map(|a| table.column_index(a)).collect();

    for target in 0..table.rows.len() {
        if !is_aggregate[target] {
            continue;
        }
        let constraints: Vec<(usize, String)> = attr_positions
            .iter()
            .map(|idx| (*idx, table.rows[target][*idx].text()))
            .filter(|(_, value)| !is_accumulated(value))
            .collect();

        for (date_idx, _) in date_columns {
            let cell = &table.rows[target][*date_idx];
            if cell.as_number().is_some() {
                continue;
            }
            let total: f64 = table
                .rows
                .iter()
                .zip(&is_aggregate)
                .filter(|(row, aggregate)| {
                    !**aggregate
                        && constraints
                            .iter()
                            .all(|(idx, value)| row[*idx].text() == *value)
                })
                .filter_map(|(row, _)| row[*date_idx].as_number())
                .sum();
            table.rows[target][*date_idx] = Value::Number(total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerEntry;
    use crate::models::CapacityTable;
    use chrono::NaiveDate;

    const PRIORITY_FORMULA: &str = "=INDEX(T_Schedule[Priority], MATCH([Goal], T_Schedule[Goal], 0))";

    fn task(id: &str, goal: &str, team: &str, project: &str, remaining: f64) -> Task {
        Task::new(id)
            .with_goal(goal)
            .with_remaining(remaining)
            .with_responsibility(
                Responsibility::new()
                    .with("Team", team)
                    .with("Project", project),
            )
            .with_attribute("Priority", PRIORITY_FORMULA)
            .with_attribute("Type", "SW")
    }

    fn tasks() -> Vec<Task> {
        vec![
            task("1", "Goal1", "Team A", "Project X", 2.0),
            task("2", "Goal2", "Team A", "TOTAL", 1.0),
            task("3", "Goal3", "Team B", "Project Y", 2.0),
            task("4", "Goal4", "Team B", "Project Y", 0.0),
            task("5", "Goal5", "Team A", "Project X", 0.0),
        ]
    }

    fn used() -> Table {
        Table::new(["Goal", "Team", "Project", "Priority", "Type", "11/10/2024", "18/10/2024"])
            .with_row(vec!["Goal1".into(), "Team A".into(), "Project X".into(), PRIORITY_FORMULA.into(), "=Type".into(), 5.into(), 3.into()])
            .with_row(vec!["Goal2".into(), "Team A".into(), "Project Y".into(), PRIORITY_FORMULA.into(), "=Type".into(), 3.into(), 2.into()])
            .with_row(vec!["*".into(), "Team B".into(), "*".into(), "N/A".into(), "N/A".into(), 2.into(), 4.into()])
            .with_row(vec!["*".into(), "Team B".into(), "Project Y".into(), "N/A".into(), "N/A".into(), 1.into(), 3.into()])
    }

    fn roster() -> ResponsibilityRoster {
        let capacity = Table::new(["Team", "Project", "11/10/2024", "18/10/2024"])
            .with_row(vec!["Team A".into(), "*".into(), 1.into(), 1.into()])
            .with_row(vec!["Team A".into(), "Project Y".into(), 1.into(), 1.into()])
            .with_row(vec!["Team B".into(), "*".into(), 1.into(), 1.into()]);
        CapacityTable::from_table(&capacity, true).roster()
    }

    fn oct(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
    }

    fn aggregate(team: &str, project: &str) -> Responsibility {
        Responsibility::new().with("Team", team).with("Project", project)
    }

    fn initialized() -> UsedResourceLedger {
        LedgerInitializer::new()
            .initialize(&used(), &tasks(), &roster())
            .unwrap()
    }

    #[test]
    fn test_info_columns() {
        assert_eq!(initialized().info_names(), ["Priority".to_string(), "Type".to_string()]);
    }

    #[test]
    fn test_tasks_with_remaining_are_added() {
        let ledger = initialized();
        let goals: HashSet<&str> = ledger.entries().iter().map(|e| e.goal.as_str()).collect();
        let expected: HashSet<&str> = ["Goal1", "Goal2", "Goal3", "*"].into_iter().collect();
        assert_eq!(goals, expected);

        // Goal2 exists for Project Y only; the task is on TOTAL.
        assert!(ledger.find("Goal2", &aggregate("Team A", "TOTAL")).is_some());
        let goal3 = ledger.find("Goal3", &aggregate("Team B", "Project Y")).unwrap();
        assert_eq!(ledger.value_at(goal3, oct(11)).unwrap(), 0.0);
    }

    #[test]
    fn test_existing_values_preserved() {
        let ledger = initialized();
        let goal1 = ledger.find("Goal1", &aggregate("Team A", "Project X")).unwrap();
        assert_eq!(ledger.value_at(goal1, oct(11)).unwrap(), 5.0);
    }

    #[test]
    fn test_new_aggregate_rows_sum_task_entries() {
        let ledger = initialized();
        let team_a = ledger.find("*", &aggregate("Team A", "*")).unwrap();
        assert_eq!(ledger.value_at(team_a, oct(11)).unwrap(), 8.0);

        let team_a_y = ledger.find("*", &aggregate("Team A", "Project Y")).unwrap();
        assert_eq!(ledger.value_at(team_a_y, oct(18)).unwrap(), 2.0);
    }

    #[test]
    fn test_explicit_aggregate_values_preserved() {
        let ledger = initialized();
        let team_b = ledger.find("*", &aggregate("Team B", "*")).unwrap();
        assert_eq!(ledger.value_at(team_b, oct(18)).unwrap(), 4.0);
    }

    #[test]
    fn test_aggregate_groups() {
        let ledger = initialized();
        let groups: HashSet<(String, String)> = ledger
            .entries()
            .iter()
            .filter(|e| e.goal == "*")
            .map(|e| (e.responsibility.text("Team"), e.responsibility.text("Project")))
            .collect();
        let expected: HashSet<(String, String)> = [
            ("Team A", "*"),
            ("Team A", "Project Y"),
            ("Team B", "*"),
            ("Team B", "Project Y"),
        ]
        .into_iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
        assert_eq!(groups, expected);
    }

    #[test]
    fn test_info_cells() {
        let ledger = initialized();
        let goal2 = ledger.find("Goal2", &aggregate("Team A", "TOTAL")).unwrap();
        assert_eq!(goal2.info.get("Priority"), Some(&Value::from(PRIORITY_FORMULA)));
        let team_a = ledger.find("*", &aggregate("Team A", "*")).unwrap();
        assert_eq!(team_a.info.get("Priority"), Some(&Value::from(NA_MARKER)));
    }

    #[test]
    fn test_info_template() {
        let ledger = LedgerInitializer::new()
            .with_info_template(Some("=Lookup({infocolumn})".to_string()))
            .initialize(&used(), &tasks(), &roster())
            .unwrap();
        let goal3 = ledger.find("Goal3", &aggregate("Team B", "Project Y")).unwrap();
        assert_eq!(goal3.info.get("Type"), Some(&Value::from("=Lookup(Type)")));
    }

    #[test]
    fn test_no_duplicates_and_idempotent() {
        let first = initialized();
        let keys: Vec<(String, String)> = first
            .entries()
            .iter()
            .map(|e| (e.goal.clone(), e.responsibility.key()))
            .collect();
        let unique: HashSet<&(String, String)> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());

        let second = LedgerInitializer::new()
            .initialize(&first.to_table(), &tasks(), &roster())
            .unwrap();
        assert_eq!(second.entries(), first.entries());
    }

    #[test]
    fn test_total_aggregate_entry_not_duplicated() {
        let used = used().with_row(vec![
            "TOTAL".into(),
            "Team A".into(),
            "TOTAL".into(),
            "N/A".into(),
            "N/A".into(),
            6.into(),
            7.into(),
        ]);
        let ledger = LedgerInitializer::new()
            .initialize(&used, &tasks(), &roster())
            .unwrap();

        let team_a: Vec<&LedgerEntry> = ledger
            .entries()
            .iter()
            .filter(|e| e.is_aggregate() && e.responsibility.text("Team") == "Team A")
            .filter(|e| is_accumulated(&e.responsibility.text("Project")))
            .collect();
        assert_eq!(team_a.len(), 1);
        assert_eq!(team_a[0].goal, "TOTAL");
        assert_eq!(ledger.value_at(team_a[0], oct(11)).unwrap(), 6.0);
    }

    #[test]
    fn test_na_aggregate_cells_seeded_zero_kept() {
        let used = used().with_row(vec![
            "*".into(),
            "Team A".into(),
            "*".into(),
            "N/A".into(),
            "N/A".into(),
            "N/A".into(),
            0.into(),
        ]);
        let ledger = LedgerInitializer::new()
            .initialize(&used, &tasks(), &roster())
            .unwrap();

        let team_a = ledger.find("*", &aggregate("Team A", "*")).unwrap();
        assert_eq!(ledger.value_at(team_a, oct(11)).unwrap(), 8.0);
        assert_eq!(ledger.value_at(team_a, oct(18)).unwrap(), 0.0);
    }

    #[test]
    fn test_short_rows_read_as_missing() {
        let mut used = used();
        used.rows.push(vec!["Goal3".into(), "Team B".into(), "Project Y".into()]);
        let ledger = LedgerInitializer::new()
            .initialize(&used, &tasks(), &roster())
            .unwrap();

        let goal3 = ledger.find("Goal3", &aggregate("Team B", "Project Y")).unwrap();
        assert_eq!(ledger.value_at(goal3, oct(18)).unwrap(), 0.0);
        assert_eq!(ledger.entries().iter().filter(|e| e.goal == "Goal3").count(), 1);
    }

    #[test]
    fn test_missing_attribute_column() {
        let table = Table::new(["Goal", "Team", "11/10/2024"]);
        let err = LedgerInitializer::new()
            .initialize(&table, &tasks(), &roster())
            .unwrap_err();
        assert!(matches!(err, Error::MissingColumn { .. }));
    }
}
