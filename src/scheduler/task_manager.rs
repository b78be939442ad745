//! Greedy per-date capacity scheduler.
//!
//! # Algorithm
//!
//! 1. Validate the task table and check the three tables agree.
//! 2. Reconcile the used-capacity ledger, clear end dates of unfinished
//!    tasks and reset ledger consumption from today on.
//! 3. Group tasks by (priority, responsibility), ascending priority.
//! 4. For each date (dates before today are skipped), for each group:
//!    keep the tasks whose restriction is lifted, look up the capacity left
//!    for the group's responsibility, multiply by the period length and
//!    split it with [`distribute`]. Each share reduces the task's remaining
//!    work and is recorded in the ledger as `share / period`.
//!
//! Completed tasks are recomputed before every group, so a task finished
//! by an earlier group unblocks its dependents on the same date.
//!
//! # Complexity
//! O(d × (g × r + n)) where d=dates, g=groups, r=capacity rows, n=tasks.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::fair_share::{distribute, ShareRequest};
use crate::capacity::CapacityManager;
use crate::config::{PeriodLength, SchedulerConfig, DEFAULT_PERIOD_DAYS};
use crate::error::{Error, Result};
use crate::ledger::LedgerInitializer;
use crate::models::{
    format_date, CapacityTable, Table, Task, Value, WorkCalendar, TASK_END_DATE, TASK_GOAL,
    TASK_ID, TASK_REMAINING, TASK_START_DATE,
};
use crate::validation::load_tasks;

/// Input container for scheduling.
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    /// Task table.
    pub tasks: Table,
    /// Available-capacity table.
    pub available: Table,
    /// Used-capacity ledger table.
    pub used: Table,
    /// Dates to process. `None` = every capacity date.
    pub dates: Option<Vec<NaiveDate>>,
}

impl ScheduleRequest {
    /// Creates a request over every capacity date.
    pub fn new(tasks: Table, available: Table, used: Table) -> Self {
        Self {
            tasks,
            available,
            used,
            dates: None,
        }
    }

    /// Restricts the run to these dates, processed in the given order.
    pub fn with_dates(mut self, dates: Vec<NaiveDate>) -> Self {
        self.dates = Some(dates);
        self
    }
}

/// Effort given to one task on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub date: NaiveDate,
    pub task_id: String,
    /// Work deducted from the task's remaining.
    pub effort: f64,
    /// Capacity recorded in the ledger (`effort / period`).
    pub consumed: f64,
}

/// Result of a scheduling run.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    /// Task table with updated remaining work, start and end dates.
    pub tasks: Table,
    /// Updated used-capacity table.
    pub used: Table,
    /// Every allocation made, in processing order.
    pub allocations: Vec<Allocation>,
}

impl ScheduleOutcome {
    /// Allocations made to one task.
    pub fn allocations_for<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a Allocation> {
        self.allocations.iter().filter(move |a| a.task_id == task_id)
    }
}

/// Tasks sharing a priority and a responsibility.
#[derive(Debug)]
struct TaskGroup {
    priority: f64,
    key: String,
    members: Vec<usize>,
}

/// Greedy per-date fair-share scheduler.
///
/// # Example
///
/// ```
/// use u_capacity::config::{PeriodLength, SchedulerConfig};
/// use u_capacity::models::{Table, Value};
/// use u_capacity::scheduler::TaskScheduler;
/// use chrono::NaiveDate;
///
/// let tasks = Table::new(["ID", "Goal", "Priority", "Remaining", "Team"])
///     .with_row(vec!["1".into(), "Goal1".into(), 1.into(), 4.into(), "TeamA".into()]);
/// let available = Table::new(["Team", "20/05/2024", "21/05/2024"])
///     .with_row(vec!["TeamA".into(), 2.into(), 2.into()]);
/// let used = Table::new(["Goal", "Team", "20/05/2024", "21/05/2024"]);
///
/// let config = SchedulerConfig::new()
///     .with_period(PeriodLength::Days(1.0))
///     .with_today(NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
/// let outcome = TaskScheduler::new(config)
///     .schedule(&tasks, &available, &used, None)
///     .unwrap();
///
/// assert_eq!(outcome.tasks.value(0, "Remaining"), Some(&Value::Number(0.0)));
/// assert_eq!(
///     outcome.tasks.value(0, "End Date"),
///     Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 5, 21).unwrap()))
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct TaskScheduler {
    config: SchedulerConfig,
}

impl TaskScheduler {
    /// Creates a scheduler.
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Runs a request.
    pub fn schedule_request(&self, request: &ScheduleRequest) -> Result<ScheduleOutcome> {
        self.schedule(
            &request.tasks,
            &request.available,
            &request.used,
            request.dates.as_deref(),
        )
    }

    /// Schedules the task table against the capacity tables.
    ///
    /// `dates` defaults to every date column of the available-capacity table.
    ///
    /// # Errors
    /// Validation, schema and lookup errors are all raised before any
    /// allocation is made.
    pub fn schedule(
        &self,
        task_table: &Table,
        available: &Table,
        used: &Table,
        dates: Option<&[NaiveDate]>,
    ) -> Result<ScheduleOutcome> {
        self.config.validate()?;
        let day_first = self.config.day_first;
        let today = self.config.today();
        let calendar = WorkCalendar::with_holidays(self.config.holidays.iter().copied());

        let capacity = CapacityTable::from_table(available, day_first);
        CapacityManager::check_schema(&capacity, used, task_table, day_first)?;

        let mut tasks = load_tasks(task_table, &capacity.attribute_names, day_first)?;

        let dates: Vec<NaiveDate> = dates.map_or_else(|| capacity.dates.clone(), <[_]>::to_vec);
        if let Some(unknown) = dates
            .iter()
            .find(|d| **d >= today && capacity.date_index(**d).is_none())
        {
            return Err(Error::InvalidDate(format_date(*unknown)));
        }

        let ledger = LedgerInitializer::new()
            .with_info_template(self.config.info_column_template.clone())
            .with_day_first(day_first)
            .initialize(used, &tasks, &capacity.roster())?;
        let mut manager = CapacityManager::new(capacity, ledger)?;

        info!(
            tasks = tasks.len(),
            dates = dates.len(),
            today = %format_date(today),
            "scheduling started"
        );

        for task in tasks.iter_mut().filter(|t| t.remaining > 0.0) {
            task.end_date = None;
        }

        manager.reset_future_dates(today);

        let groups = group_tasks(&tasks);
        let periods = self.period_lengths(&dates, &calendar);
        let mut allocations = Vec::new();

        for (date, period) in dates.iter().copied().zip(periods) {
            if date < today {
                debug!(date = %format_date(date), "past date skipped");
                continue;
            }

            for group in &groups {
                let completed: HashSet<String> = tasks
                    .iter()
                    .filter(|t| t.is_completed())
                    .map(|t| t.id.clone())
                    .collect();

                let eligible: Vec<usize> = group
                    .members
                    .iter()
                    .copied()
                    .filter(|&i| tasks[i].is_eligible(&completed, date))
                    .collect();
                let Some(&first) = eligible.first() else {
                    continue;
                };

                let filters = tasks[first].responsibility.to_filters();
                let effort = manager.available_capacity(date, &filters)? * period;
                if effort <= 0.0 {
                    continue;
                }

                debug!(
                    date = %format_date(date),
                    priority = group.priority,
                    responsibility = %group.key,
                    tasks = eligible.len(),
                    effort,
                    "distributing effort"
                );

                let requests: Vec<ShareRequest> = eligible
                    .iter()
                    .map(|&i| ShareRequest::new(tasks[i].remaining, tasks[i].max_resources))
                    .collect();
                let shares = distribute(&requests, effort, period);

                for (&i, share) in eligible.iter().zip(shares) {
                    if share <= 0.0 {
                        continue;
                    }
                    let task = &mut tasks[i];
                    task.allocate(share, date, &calendar);

                    let consumed = share / period;
                    let mut consume_filters = task.responsibility.to_filters();
                    consume_filters.insert(TASK_GOAL.to_string(), task.goal.clone());
                    manager.consume(date, consumed, &consume_filters)?;

                    debug!(
                        task = %task.id,
                        share,
                        remaining = task.remaining,
                        "task allocated"
                    );
                    allocations.push(Allocation {
                        date,
                        task_id: task.id.clone(),
                        effort: share,
                        consumed,
                    });
                }
            }
        }

        info!(allocations = allocations.len(), "scheduling finished");

        Ok(ScheduleOutcome {
            tasks: write_back(task_table, &tasks),
            used: manager.into_ledger().to_table(),
            allocations,
        })
    }

    /// Period length for each date.
    fn period_lengths(&self, dates: &[NaiveDate], calendar: &WorkCalendar) -> Vec<f64> {
        match self.config.period {
            PeriodLength::Days(days) => {
                let mut gaps = dates.windows(2).map(|w| (w[1] - w[0]).num_days());
                if let Some(first) = gaps.next() {
                    if gaps.any(|gap| gap != first) {
                        warn!(period = days, "dates are not evenly spaced; every date uses the same period");
                    }
                }
                vec![days; dates.len()]
            }
            PeriodLength::Auto => {
                let mut periods: Vec<f64> = dates
                    .windows(2)
                    .map(|w| f64::from(calendar.business_days_between(w[0], w[1])))
                    .collect();
                if !dates.is_empty() {
                    periods.push(periods.last().copied().unwrap_or(DEFAULT_PERIOD_DAYS));
                }
                periods
            }
        }
    }
}

/// Groups schedulable tasks by (priority, responsibility key), ascending.
fn group_tasks(tasks: &[Task]) -> Vec<TaskGroup> {
    let mut groups: BTreeMap<(u64, String), TaskGroup> = BTreeMap::new();

    for (i, task) in tasks.iter().enumerate() {
        let Some(priority) = task.priority else {
            warn!(task = %task.id, "task has no priority and is not scheduled");
            continue;
        };
        let key = task.responsibility.key();
        // Non-negative floats order like their bit patterns; `+ 0.0` folds -0 into 0.
        groups
            .entry(((priority + 0.0).to_bits(), key.clone()))
            .or_insert_with(|| TaskGroup {
                priority,
                key,
                members: Vec::new(),
            })
            .members
            .push(i);
    }

    groups.into_values().collect()
}

/// Copies the task table with updated ID, remaining and date columns.
fn write_back(task_table: &Table, tasks: &[Task]) -> Table {
    let mut table = task_table.clone();
    for task in tasks {
        table.set_value(task.row, TASK_ID, Value::Text(task.id.clone()));
        table.set_value(task.row, TASK_REMAINING, Value::Number(task.remaining));
        table.set_value(task.row, TASK_START_DATE, task.start_date.into());
        table.set_value(task.row, TASK_END_DATE, task.end_date.into());
    }
    table
}
