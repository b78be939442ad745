//! Task table validation and loading.
//!
//! Checks the task table before anything is mutated and reports every
//! problem at once. Detects:
//! - Missing required columns (ID, goal, priority, remaining and every
//!   responsibility attribute)
//! - Blank IDs or goals
//! - Duplicate IDs or goals
//! - Non-numeric or negative remaining work, max resources or priority
//!
//! `N/A` cells are tolerated in numeric columns. A blank remaining value is
//! only a warning and reads as 0.

use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::error::{Error, Result};
use crate::models::{
    Responsibility, Restriction, Table, Task, Value, TASK_BLOCKED_DAYS, TASK_END_DATE, TASK_GOAL,
    TASK_ID, TASK_PRIORITY, TASK_REMAINING, TASK_RESOURCES_MAX, TASK_RESTRICTION, TASK_START_DATE,
};

/// Validation result.
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Offending task IDs, rows or columns.
    pub entities: Vec<String>,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A required column is absent.
    MissingColumn,
    /// A row has a blank ID.
    MissingId,
    /// A row has a blank goal.
    MissingGoal,
    /// Two rows share an ID.
    DuplicateId,
    /// Two rows share a goal.
    DuplicateGoal,
    /// A numeric column holds text.
    InvalidNumber,
    /// A numeric column holds a negative number.
    NegativeValue,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>, entities: Vec<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            entities,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Columns every task table must have, besides the responsibility attributes.
pub const REQUIRED_COLUMNS: [&str; 4] = [TASK_ID, TASK_GOAL, TASK_PRIORITY, TASK_REMAINING];

/// Validates a task table.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with every detected issue.
pub fn validate_task_table(table: &Table, attribute_names: &[String]) -> ValidationResult {
    let mut errors = Vec::new();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(attribute_names.iter().cloned())
        .filter(|c| !table.has_column(c))
        .collect();
    if !missing.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::MissingColumn,
            format!("Missing required column(s): {}", missing.join(", ")),
            missing,
        ));
        // Row checks need the required columns.
        return Err(errors);
    }

    let mut ids: HashMap<String, usize> = HashMap::new();
    let mut goals: HashMap<String, usize> = HashMap::new();

    for row in 0..table.row_count() {
        let id = cell(table, row, TASK_ID).text().trim().to_string();
        let goal = cell(table, row, TASK_GOAL).text().trim().to_string();
        let label = if id.is_empty() { format!("row {}", row + 1) } else { id.clone() };

        if id.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingId,
                format!("Task at row {} has no ID", row + 1),
                vec![label.clone()],
            ));
        } else {
            *ids.entry(id).or_default() += 1;
        }

        if goal.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingGoal,
                format!("Task '{label}' has no goal"),
                vec![label.clone()],
            ));
        } else {
            *goals.entry(goal).or_default() += 1;
        }

        for column in [TASK_REMAINING, TASK_RESOURCES_MAX, TASK_PRIORITY] {
            let value = cell(table, row, column);
            if value.is_blank() || value.is_na() {
                continue;
            }
            match value.as_number() {
                None => errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidNumber,
                    format!("Task '{label}' has a non-numeric {column}: '{}'", value.text()),
                    vec![label.clone()],
                )),
                Some(n) if n < 0.0 => errors.push(ValidationError::new(
                    ValidationErrorKind::NegativeValue,
                    format!("Task '{label}' has a negative {column}: {n}"),
                    vec![label.clone()],
                )),
                Some(_) => {}
            }
        }
    }

    for (kind, counts, what) in [
        (ValidationErrorKind::DuplicateId, ids, "ID"),
        (ValidationErrorKind::DuplicateGoal, goals, "goal"),
    ] {
        let mut duplicated: Vec<String> = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(key, _)| key)
            .collect();
        duplicated.sort();
        for key in duplicated {
            errors.push(ValidationError::new(
                kind.clone(),
                format!("Duplicate task {what}: {key}"),
                vec![key],
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a task table and converts it to typed tasks, in row order.
///
/// Defaults: no restriction, unbounded max resources, 0 blocked days,
/// 0 remaining work.
///
/// # Errors
/// [`Error::Validation`] with every problem found.
pub fn load_tasks(table: &Table, attribute_names: &[String], day_first: bool) -> Result<Vec<Task>> {
    validate_task_table(table, attribute_names).map_err(Error::Validation)?;

    let mut tasks = Vec::with_capacity(table.row_count());
    for row in 0..table.row_count() {
        let id = cell(table, row, TASK_ID).text().trim().to_string();

        let remaining_cell = cell(table, row, TASK_REMAINING);
        if remaining_cell.is_blank() {
            warn!(task = %id, "remaining work is empty, treated as 0");
        }

        let blocked_days = cell(table, row, TASK_BLOCKED_DAYS)
            .as_number()
            .filter(|n| *n > 0.0)
            .map_or(0, |n| n.round() as u32);

        tasks.push(Task {
            goal: cell(table, row, TASK_GOAL).text().trim().to_string(),
            priority: cell(table, row, TASK_PRIORITY).as_number(),
            remaining: remaining_cell.as_number().unwrap_or(0.0),
            max_resources: cell(table, row, TASK_RESOURCES_MAX).as_number(),
            restriction: Restriction::from_value(&cell(table, row, TASK_RESTRICTION), day_first),
            blocked_days,
            start_date: cell(table, row, TASK_START_DATE).as_date(day_first),
            end_date: cell(table, row, TASK_END_DATE).as_date(day_first),
            responsibility: Responsibility::from_row(table, row, attribute_names),
            attributes: table.row_map(row),
            row,
            id,
        });
    }

    Ok(tasks)
}

fn cell(table: &Table, row: usize, column: &str) -> Value {
    table.value(row, column).cloned().unwrap_or_default()
}
