//! Task model.
//!
//! A task is a goal with an amount of remaining work (in resource-days),
//! a priority, an optional per-period resource cap and an optional
//! restriction gating when it may start.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Responsibility, Value, WorkCalendar};

/// Task identifier column.
pub const TASK_ID: &str = "ID";
/// Goal column, shared with the capacity and ledger tables.
pub const TASK_GOAL: &str = "Goal";
/// Priority column (lower = earlier).
pub const TASK_PRIORITY: &str = "Priority";
/// Remaining work column.
pub const TASK_REMAINING: &str = "Remaining";
/// Maximum resources per period column.
pub const TASK_RESOURCES_MAX: &str = "Resources Max.";
/// Restriction column (task ID or date).
pub const TASK_RESTRICTION: &str = "Restriction";
/// First allocation date column.
pub const TASK_START_DATE: &str = "Start Date";
/// Completion date column.
pub const TASK_END_DATE: &str = "End Date";
/// Business days blocked after completion.
pub const TASK_BLOCKED_DAYS: &str = "Blocked Days";

/// Remaining work at or below this is treated as done.
pub const EPSILON: f64 = 1e-9;

/// Gate on when a task may receive capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Restriction {
    /// Another task (by ID) must be completed first.
    Task(String),
    /// Not before this date.
    Date(NaiveDate),
}

impl Restriction {
    /// Interprets a restriction cell. Blank and `N/A` mean no restriction.
    pub fn from_value(value: &Value, day_first: bool) -> Option<Self> {
        if value.is_blank() || value.is_na() {
            return None;
        }
        Some(match value.as_date(day_first) {
            Some(date) => Restriction::Date(date),
            None => Restriction::Task(value.text().trim().to_string()),
        })
    }

    /// Whether the restriction is lifted on `date`.
    pub fn is_satisfied(&self, completed: &HashSet<String>, date: NaiveDate) -> bool {
        match self {
            Restriction::Task(id) => completed.contains(id),
            Restriction::Date(not_before) => *not_before <= date,
        }
    }

    /// Cell form for the task table.
    pub fn to_value(&self) -> Value {
        match self {
            Restriction::Task(id) => Value::Text(id.clone()),
            Restriction::Date(date) => Value::Date(*date),
        }
    }
}

/// A task to be scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier.
    pub id: String,
    /// Unique goal name. Also the ledger key.
    pub goal: String,
    /// Scheduling priority (lower = earlier). `None` = not scheduled.
    pub priority: Option<f64>,
    /// Remaining work in resource-days.
    pub remaining: f64,
    /// Resources per day of period. `None` = unbounded.
    pub max_resources: Option<f64>,
    /// Start gate.
    pub restriction: Option<Restriction>,
    /// Business days the end date is pushed after completion.
    pub blocked_days: u32,
    /// Date of the first allocation. Never changes once set.
    pub start_date: Option<NaiveDate>,
    /// Date the remaining work reached zero (plus blocked days).
    pub end_date: Option<NaiveDate>,
    /// Resource pool this task draws from.
    pub responsibility: Responsibility,
    /// Every cell of the source row, by column name.
    pub attributes: BTreeMap<String, Value>,
    /// Index of the source row in the task table.
    pub row: usize,
}

impl Task {
    /// Creates a task with no work and no restrictions.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            goal: String::new(),
            priority: Some(0.0),
            remaining: 0.0,
            max_resources: None,
            restriction: None,
            blocked_days: 0,
            start_date: None,
            end_date: None,
            responsibility: Responsibility::new(),
            attributes: BTreeMap::new(),
            row: 0,
        }
    }

    /// Sets the goal.
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the remaining work.
    pub fn with_remaining(mut self, remaining: f64) -> Self {
        self.remaining = remaining;
        self
    }

    /// Caps resources per day of period.
    pub fn with_max_resources(mut self, max: f64) -> Self {
        self.max_resources = Some(max);
        self
    }

    /// Sets the restriction.
    pub fn with_restriction(mut self, restriction: Restriction) -> Self {
        self.restriction = Some(restriction);
        self
    }

    /// Sets the blocked days.
    pub fn with_blocked_days(mut self, days: u32) -> Self {
        self.blocked_days = days;
        self
    }

    /// Sets the responsibility.
    pub fn with_responsibility(mut self, responsibility: Responsibility) -> Self {
        self.responsibility = responsibility;
        self
    }

    /// Sets a raw source cell.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Whether no work remains.
    pub fn is_completed(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Maximum effort for one period of `period` days.
    pub fn max_effort(&self, period: f64) -> f64 {
        self.max_resources.map_or(f64::INFINITY, |max| max * period)
    }

    /// Whether the task may receive capacity on `date`.
    pub fn is_eligible(&self, completed: &HashSet<String>, date: NaiveDate) -> bool {
        !self.is_completed()
            && self
                .restriction
                .as_ref()
                .map_or(true, |r| r.is_satisfied(completed, date))
    }

    /// Applies an allocation of `effort` on `date`.
    ///
    /// Sets the start date on the first allocation and the end date when the
    /// remaining work first reaches zero.
    pub fn allocate(&mut self, effort: f64, date: NaiveDate, calendar: &WorkCalendar) {
        self.remaining -= effort;

        if self.start_date.is_none() {
            self.start_date = Some(date);
        }

        if self.remaining <= EPSILON {
            self.remaining = 0.0;
            if self.end_date.is_none() {
                self.end_date = Some(if self.blocked_days > 0 {
                    calendar.add_business_days(date, self.blocked_days)
                } else {
                    date
                });
            }
        }
    }
}
