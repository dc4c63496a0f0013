//! Entity instance representation.

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A single entity instance: an ordered map of field name to value.
///
/// Resolved relations attach onto the row under the relation name as
/// `Value::Record` (hasOne/belongsTo) or `Value::List` (hasMany), and
/// resolved computed fields attach under the computed field name. The
/// underlying map is a `BTreeMap`, so iteration order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a field value, replacing any existing one.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Check whether a field is present (even if null).
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over (field, value) pairs in field-name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Iterate over field names in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Merge another row into this one, overwriting shared fields.
    pub fn merge(&mut self, other: Row) {
        for (field, value) in other.0 {
            self.0.insert(field, value);
        }
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, Value>> for Row {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_builder_and_access() {
        let mut row = Row::new().with("id", "u1").with("age", 30i64);

        assert_eq!(row.get("id"), Some(&Value::String("u1".into())));
        assert_eq!(row.len(), 2);
        assert!(row.contains("age"));
        assert!(!row.contains("name"));

        row.set("name", "Alice");
        assert_eq!(row.get("name").and_then(Value::as_str), Some("Alice"));

        assert_eq!(row.remove("age"), Some(Value::Int(30)));
        assert!(!row.contains("age"));
    }

    #[test]
    fn test_row_iteration_is_ordered() {
        let row = Row::new().with("b", 2i64).with("a", 1i64).with("c", 3i64);
        let fields: Vec<&str> = row.fields().collect();
        assert_eq!(fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_row_merge_overwrites() {
        let mut base = Row::new().with("id", "u1").with("name", "old");
        base.merge(Row::new().with("name", "new").with("age", 7i64));

        assert_eq!(base.get("name").and_then(Value::as_str), Some("new"));
        assert_eq!(base.get("age"), Some(&Value::Int(7)));
        assert_eq!(base.get("id").and_then(Value::as_str), Some("u1"));
    }

    #[test]
    fn test_row_serializes_as_plain_object() {
        let row = Row::new().with("id", "u1").with("active", true);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"active":true,"id":"u1"}"#);
    }
}
