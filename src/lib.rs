//! Capacity allocation engine.
//!
//! Spreads a finite, date-bucketed pool of team capacity over a prioritized
//! backlog. Produces start and end dates for each task and a ledger of the
//! capacity consumed per goal and responsibility.
//!
//! # Modules
//!
//! - **`models`**: Tabular interchange (`Table`, `Value`) and typed views:
//!   `Task`, `Restriction`, `Responsibility`, `CapacityTable`, `WorkCalendar`
//! - **`matching`**: Aggregate tokens and stored-value patterns
//! - **`ledger`**: `UsedResourceLedger` and its `LedgerInitializer`
//! - **`capacity`**: `CapacityManager` (headroom lookups, consumption)
//! - **`scheduler`**: `TaskScheduler` and the fair-share `distribute` rule
//! - **`validation`**: Task table checks and loading
//! - **`config`**: `SchedulerConfig`, `PeriodLength`
//!
//! # Architecture
//!
//! Reading and writing spreadsheets is the caller's job. The crate takes
//! three tables (tasks, available capacity, used capacity) and returns the
//! updated task and used-capacity tables. The run is a single-threaded batch
//! over in-memory state; validation and schema errors are raised before
//! anything is allocated.
//!
//! # References
//!
//! - Bertsekas & Gallager (1992), "Data Networks", Ch. 6.5.2 (Max-Min Fairness)
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"

pub mod capacity;
pub mod config;
pub mod error;
pub mod ledger;
pub mod matching;
pub mod models;
pub mod scheduler;
pub mod validation;

pub use error::{Error, ErrorCategory, Result};
