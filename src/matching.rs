//! Responsibility matching.
//!
//! Capacity rows and ledger entries store responsibility attribute values
//! that act as patterns against the values of a task or query:
//!
//! | Stored value | Matches |
//! |---|---|
//! | aggregate token (`*`, `TOTAL`) or blank | any candidate |
//! | plain text | the identical text |
//! | regular expression | candidates it fully matches (anchored) |
//!
//! A stored value that does not compile as a regular expression is treated
//! as plain text. Matching never fails.
//!
//! Aggregation queries on the ledger use a stricter rule, see
//! [`aggregate_selects`].

use std::collections::BTreeMap;

use regex::Regex;

/// Values that mean "any" in a stored row and "the aggregate row" in a query.
pub const ACCUMULATED_SYNONYMS: [&str; 2] = ["TOTAL", "*"];

/// Goal of aggregate ("any-goal") ledger entries and capacity rows.
pub const ALL_TAG: &str = "*";

/// Attribute name → requested value.
pub type Filters = BTreeMap<String, String>;

/// Whether a value is one of the aggregate tokens.
pub fn is_accumulated(value: &str) -> bool {
    let value = value.trim();
    ACCUMULATED_SYNONYMS.contains(&value)
}

/// A compiled stored value.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Aggregate token or blank.
    Any,
    /// Exact text.
    Literal(String),
    /// Anchored regular expression. `source` also matches itself literally.
    Regex { source: String, regex: Regex },
}

impl Pattern {
    /// Equality pattern with aggregate-token bypass.
    ///
    /// Used for capacity lookups, where regular expressions are not honored.
    pub fn exact(raw: &str) -> Self {
        if raw.trim().is_empty() || is_accumulated(raw) {
            Pattern::Any
        } else {
            Pattern::Literal(raw.to_string())
        }
    }

    /// Equality-or-regex pattern with aggregate-token bypass.
    pub fn compile(raw: &str) -> Self {
        if raw.trim().is_empty() || is_accumulated(raw) {
            return Pattern::Any;
        }
        if regex::escape(raw) == raw {
            return Pattern::Literal(raw.to_string());
        }
        match Regex::new(&format!("^(?:{raw})$")) {
            Ok(regex) => Pattern::Regex {
                source: raw.to_string(),
                regex,
            },
            Err(_) => Pattern::Literal(raw.to_string()),
        }
    }

    /// Whether `candidate` satisfies this pattern.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Literal(text) => text == candidate,
            Pattern::Regex { source, regex } => source == candidate || regex.is_match(candidate),
        }
    }

    /// Whether this pattern accepts every candidate.
    pub fn is_any(&self) -> bool {
        matches!(self, Pattern::Any)
    }
}

/// Whether every filter is matched by the pattern stored under its key.
///
/// A filter key without a stored pattern never matches.
pub fn matches_filters(patterns: &BTreeMap<String, Pattern>, filters: &Filters) -> bool {
    filters.iter().all(|(key, value)| {
        patterns
            .get(key)
            .is_some_and(|pattern| pattern.matches(value))
    })
}

/// Row selection rule for ledger aggregation queries.
///
/// A requested aggregate token selects stored aggregate tokens only; any other
/// request needs the identical stored text. Stored wildcards and regular
/// expressions are plain values here.
pub fn aggregate_selects(stored: &str, requested: &str) -> bool {
    if is_accumulated(requested) {
        is_accumulated(stored)
    } else {
        stored == requested
    }
}
