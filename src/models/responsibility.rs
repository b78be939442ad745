//! Responsibility attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Table, Value};
use crate::matching::Filters;

/// Attribute name → value map identifying a resource pool
/// (e.g. `Team = TeamA`, `Group = GroupA`).
///
/// The attribute names are user-defined and shared by the task, capacity and
/// ledger tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Responsibility {
    attributes: BTreeMap<String, Value>,
}

impl Responsibility {
    /// Creates an empty responsibility.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute (builder form).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets an attribute.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Reads the named attributes of a table row. Absent columns read as empty.
    pub fn from_row(table: &Table, row: usize, names: &[String]) -> Self {
        let attributes = names
            .iter()
            .map(|name| {
                let value = table.value(row, name).cloned().unwrap_or_default();
                (name.clone(), value)
            })
            .collect();
        Self { attributes }
    }

    /// Attribute value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Attribute value as text. Absent attributes read as empty text.
    pub fn text(&self, name: &str) -> String {
        self.get(name).map(Value::text).unwrap_or_default()
    }

    /// Attribute names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// `(name, value)` pairs, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attributes.iter()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Canonical grouping key.
    ///
    /// A JSON object with sorted keys and textual values, so equal attribute
    /// sets produce equal keys whatever their insertion order or cell type.
    pub fn key(&self) -> String {
        let object: serde_json::Map<String, serde_json::Value> = self
            .attributes
            .iter()
            .map(|(name, value)| (name.clone(), serde_json::Value::String(value.text())))
            .collect();
        serde_json::Value::Object(object).to_string()
    }

    /// Textual filters for capacity and ledger queries.
    pub fn to_filters(&self) -> Filters {
        self.attributes
            .iter()
            .map(|(name, value)| (name.clone(), value.text()))
            .collect()
    }

    /// Whether every attribute has the same text as in `other`.
    pub fn same_values(&self, other: &Responsibility) -> bool {
        self.attributes.len() == other.attributes.len()
            && self
                .attributes
                .iter()
                .all(|(name, value)| other.get(name).map(Value::text) == Some(value.text()))
    }
}
