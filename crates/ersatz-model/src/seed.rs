//! Deferred reference markers for seed data.

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A deferred reference to a record created earlier in the same seed run,
/// addressed by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefMarker {
    /// Entity whose created records are addressed.
    pub entity: String,
    /// Zero-based position in that entity's creation order.
    pub index: usize,
    /// Field to read off the addressed record.
    pub field: String,
}

/// A deferred reference addressed by field criteria instead of position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupMarker {
    /// Entity whose created records are searched.
    pub entity: String,
    /// Criteria every matched record must satisfy; first match wins.
    #[serde(rename = "where")]
    pub criteria: BTreeMap<String, Value>,
    /// Field to read off the matched record.
    pub field: String,
}

/// A value in a seed record: either a literal or a deferred marker.
///
/// The union is closed and tagged, so seed processing never has to probe
/// structurally whether a value "looks like" a marker. Literal nulls pass
/// through as literals; they are never read as markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SeedValue {
    /// A literal value, inserted as-is.
    Value(Value),
    /// A positional reference resolved against created records.
    Ref(RefMarker),
    /// A criteria lookup resolved against created records.
    Lookup(LookupMarker),
}

impl SeedValue {
    /// Check whether this is a deferred marker rather than a literal.
    pub fn is_marker(&self) -> bool {
        matches!(self, SeedValue::Ref(_) | SeedValue::Lookup(_))
    }
}

impl From<Value> for SeedValue {
    fn from(v: Value) -> Self {
        SeedValue::Value(v)
    }
}

impl From<bool> for SeedValue {
    fn from(v: bool) -> Self {
        SeedValue::Value(v.into())
    }
}

impl From<i64> for SeedValue {
    fn from(v: i64) -> Self {
        SeedValue::Value(v.into())
    }
}

impl From<f64> for SeedValue {
    fn from(v: f64) -> Self {
        SeedValue::Value(v.into())
    }
}

impl From<&str> for SeedValue {
    fn from(v: &str) -> Self {
        SeedValue::Value(v.into())
    }
}

impl From<String> for SeedValue {
    fn from(v: String) -> Self {
        SeedValue::Value(v.into())
    }
}

/// Reference the identity of the `index`-th created record of `entity`.
pub fn reference(entity: impl Into<String>, index: usize) -> SeedValue {
    reference_field(entity, index, "id")
}

/// Reference an arbitrary field of the `index`-th created record.
pub fn reference_field(
    entity: impl Into<String>,
    index: usize,
    field: impl Into<String>,
) -> SeedValue {
    SeedValue::Ref(RefMarker {
        entity: entity.into(),
        index,
        field: field.into(),
    })
}

/// Reference the identity of the first created record matching `criteria`.
pub fn lookup<K, V, I>(entity: impl Into<String>, criteria: I) -> SeedValue
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    lookup_field(entity, criteria, "id")
}

/// Reference an arbitrary field of the first created record matching
/// `criteria`.
pub fn lookup_field<K, V, I>(
    entity: impl Into<String>,
    criteria: I,
    field: impl Into<String>,
) -> SeedValue
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    SeedValue::Lookup(LookupMarker {
        entity: entity.into(),
        criteria: criteria
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
        field: field.into(),
    })
}

/// A not-yet-inserted record authored in seed data: field name to
/// [`SeedValue`], in field order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedRecord(BTreeMap<String, SeedValue>);

impl SeedRecord {
    /// Create an empty seed record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<SeedValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Get a field's seed value.
    pub fn get(&self, field: &str) -> Option<&SeedValue> {
        self.0.get(field)
    }

    /// Iterate over (field, value) pairs in field order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, SeedValue> {
        self.0.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, SeedValue)> for SeedRecord {
    fn from_iter<I: IntoIterator<Item = (String, SeedValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
