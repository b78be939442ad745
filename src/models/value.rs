//! Table cell value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::calendar::{format_date, parse_date};

/// Marker for "not applicable" cells.
pub const NA_MARKER: &str = "N/A";

/// A single cell of a [`Table`](super::Table).
///
/// Spreadsheet columns are loosely typed: the same column may hold numbers,
/// dates, free text or nothing. Consumers ask for the interpretation they
/// need ([`as_number`](Value::as_number), [`as_date`](Value::as_date),
/// [`text`](Value::text)).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Blank cell.
    #[default]
    Empty,
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    /// Textual form used for matching and keys.
    ///
    /// Integral numbers print without a fractional part, dates as `DD/MM/YYYY`.
    pub fn text(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Number(n) => format_number(*n),
            Value::Date(d) => format_date(*d),
            Value::Text(s) => s.clone(),
        }
    }

    /// Numeric interpretation. Text is parsed after trimming.
    ///
    /// NaN and infinities are not numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Date interpretation. Text is parsed with the given convention.
    pub fn as_date(&self, day_first: bool) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Text(s) => parse_date(s, day_first),
            _ => None,
        }
    }

    /// Empty cell, whitespace-only text or NaN.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Number(n) => n.is_nan(),
            Value::Text(s) => s.trim().is_empty(),
            Value::Date(_) => false,
        }
    }

    /// The "not applicable" marker.
    pub fn is_na(&self) -> bool {
        matches!(self, Value::Text(s) if s.trim() == NA_MARKER)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Empty, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_forms() {
        assert_eq!(Value::Number(1.0).text(), "1");
        assert_eq!(Value::Number(2.5).text(), "2.5");
        assert_eq!(Value::Empty.text(), "");
        assert_eq!(
            Value::Date(NaiveDate::from_ymd_opt(2024, 5, 25).unwrap()).text(),
            "25/05/2024"
        );
    }

    #[test]
    fn test_as_number() {
        assert_eq!(Value::from(" 3.5 ").as_number(), Some(3.5));
        assert_eq!(Value::from("abc").as_number(), None);
        assert_eq!(Value::from(NA_MARKER).as_number(), None);
        assert_eq!(Value::Number(f64::NAN).as_number(), None);
        assert_eq!(Value::Number(f64::INFINITY).as_number(), None);
        assert_eq!(Value::from("inf").as_number(), None);
        assert_eq!(Value::from("-Infinity").as_number(), None);
        assert_eq!(Value::from("1e3").as_number(), Some(1000.0));
        assert_eq!(Value::Empty.as_number(), None);
    }

    #[test]
    fn test_blank_and_na() {
        assert!(Value::Empty.is_blank());
        assert!(Value::from("  ").is_blank());
        assert!(!Value::from("N/A").is_blank());
        assert!(Value::from("N/A").is_na());
        assert!(!Value::Number(0.0).is_blank());
    }

    #[test]
    fn test_serde_untagged() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, 2, "TeamA"]"#).unwrap();
        assert_eq!(
            values,
            vec![Value::Empty, Value::Number(2.0), Value::from("TeamA")]
        );
    }
}
