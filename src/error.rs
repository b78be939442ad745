//! Error types for capacity planning.
//!
//! Every fallible operation in the crate returns [`Result`]. Variants group
//! into four categories (see [`ErrorCategory`]): task-data validation, schema
//! mismatches between the input tables, lookups of unknown dates or
//! attributes, and rejected configuration.

use thiserror::Error;

use crate::validation::ValidationError;

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// The task table failed validation. Holds every problem found.
    #[error("Task validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// A table lacks columns another table declares.
    #[error("Missing columns in {table} table: {}", .columns.join(", "))]
    MissingColumn { table: String, columns: Vec<String> },

    /// Capacity and ledger tables disagree on their date columns.
    #[error(
        "Date columns differ between tables: missing in available capacity [{}], missing in used capacity [{}]",
        .missing_in_available.join(", "),
        .missing_in_used.join(", ")
    )]
    DateColumnMismatch {
        missing_in_available: Vec<String>,
        missing_in_used: Vec<String>,
    },

    /// A date that is not a column of the queried table.
    #[error("Unknown date column: {0}")]
    InvalidDate(String),

    /// A filter key that is not a column of the queried table.
    #[error("Unknown attribute: {0}")]
    InvalidAttribute(String),

    /// Responsibility filters required by a capacity lookup were not supplied.
    #[error("Missing responsibility filters: {}", .0.join(", "))]
    MissingFilter(Vec<String>),

    /// Rejected configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of [`Error`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed, missing, duplicate or negative task data.
    Validation,
    /// Responsibility or date columns inconsistent between tables.
    SchemaMismatch,
    /// Unknown date or attribute passed to a capacity or ledger query.
    Lookup,
    /// Invalid configuration.
    Config,
}

impl Error {
    /// Category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation(_) => ErrorCategory::Validation,
            Error::MissingColumn { .. } | Error::DateColumnMismatch { .. } => {
                ErrorCategory::SchemaMismatch
            }
            Error::InvalidDate(_) | Error::InvalidAttribute(_) | Error::MissingFilter(_) => {
                ErrorCategory::Lookup
            }
            Error::Config(_) => ErrorCategory::Config,
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience Result type.
pub type Result<T> = std::result::Result<T, Error>;
