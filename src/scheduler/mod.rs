//! Per-date capacity scheduling.
//!
//! # Algorithm
//!
//! `TaskScheduler` walks the supplied dates in order and, for each
//! (priority, responsibility) group, splits the remaining capacity among
//! the group's eligible tasks with a max-min fair-share rule. It is greedy
//! per date: no lookahead, no global optimality, fully deterministic.
//!
//! # References
//!
//! - Bertsekas & Gallager (1992), "Data Networks", Ch. 6.5.2
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4

mod fair_share;
mod task_manager;

pub use fair_share::{distribute, ShareRequest};
pub use task_manager::{Allocation, ScheduleOutcome, ScheduleRequest, TaskScheduler};
