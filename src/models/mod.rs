//! Capacity planning domain models.
//!
//! Tabular interchange types ([`Table`], [`Value`]) and the typed views the
//! engine works on.
//!
//! # Tables
//!
//! | Table | Rows | Columns |
//! |-------|------|---------|
//! | Tasks | one per task | ID, Goal, Priority, Remaining, Resources Max., Restriction, Blocked Days, Start Date, End Date, responsibility attributes, free info columns |
//! | Available capacity | one per responsibility combination | Goal (optional), responsibility attributes, one per date |
//! | Used capacity | one per task goal, plus aggregate `*` rows | Goal, responsibility attributes, info columns, one per date |

mod calendar;
mod capacity;
mod responsibility;
mod table;
mod task;
mod value;

pub use calendar::{format_date, parse_date, WorkCalendar, DISPLAY_DATE_FORMAT};
pub use capacity::{CapacityRow, CapacityTable, ResponsibilityRoster};
pub use responsibility::Responsibility;
pub use table::Table;
pub use task::{
    Restriction, Task, EPSILON, TASK_BLOCKED_DAYS, TASK_END_DATE, TASK_GOAL, TASK_ID,
    TASK_PRIORITY, TASK_REMAINING, TASK_RESOURCES_MAX, TASK_RESTRICTION, TASK_START_DATE,
};
pub use value::{Value, NA_MARKER};
