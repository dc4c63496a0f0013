//! Seed reference resolution during ordered bulk insertion.
//!
//! A seed run inserts entities one at a time in a caller-supplied order,
//! appending each created record to the run's ledger. Records authored with
//! `ref`/`lookup` markers have those markers substituted against the ledger
//! just before insertion. A marker pointing at records the ledger does not
//! hold yet fails loudly with the entity, the count available, and what was
//! requested - silent corruption of seed data costs far more than an error
//! during a one-time run.

use std::collections::BTreeMap;

use tracing::trace;

use ersatz_model::{LookupMarker, RefMarker, Row, SeedRecord, SeedValue, Value};

use crate::error::Error;

/// The ledger of records created during one bulk-seed run.
///
/// Entity name to records in creation order. Scoped to a single run with a
/// single writer; never persisted and never shared across runs.
#[derive(Debug, Clone, Default)]
pub struct CreatedRecords {
    records: BTreeMap<String, Vec<Row>>,
}

impl CreatedRecords {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record created for an entity.
    pub fn append(&mut self, entity: impl Into<String>, row: Row) {
        self.records.entry(entity.into()).or_default().push(row);
    }

    /// The records created for an entity so far, in creation order.
    pub fn records(&self, entity: &str) -> &[Row] {
        self.records.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// How many records an entity has so far.
    pub fn count(&self, entity: &str) -> usize {
        self.records(entity).len()
    }

    /// Entity names present in the ledger, in name order.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}

/// Substitutes deferred markers in seed records against the run ledger.
pub struct SeedResolver;

impl SeedResolver {
    /// Resolve every field of a not-yet-inserted record.
    ///
    /// Literal values pass through unchanged, nulls included; markers are
    /// replaced via [`resolve_ref`](Self::resolve_ref) and
    /// [`resolve_lookup`](Self::resolve_lookup). `entity` names the record
    /// being seeded, for logging only - errors name the referenced entity.
    pub fn resolve_item(
        record: &SeedRecord,
        created: &CreatedRecords,
        entity: &str,
    ) -> Result<Row, Error> {
        let mut row = Row::new();
        for (field, value) in record.iter() {
            let resolved = match value {
                SeedValue::Value(literal) => literal.clone(),
                SeedValue::Ref(marker) => {
                    trace!(entity, field = %field, target = %marker.entity, "resolving ref");
                    Self::resolve_ref(marker, created)?
                }
                SeedValue::Lookup(marker) => {
                    trace!(entity, field = %field, target = %marker.entity, "resolving lookup");
                    Self::resolve_lookup(marker, created)?
                }
            };
            row.set(field.clone(), resolved);
        }
        Ok(row)
    }

    /// Resolve a positional reference against the ledger.
    ///
    /// Fails when the referenced entity has no created records or when the
    /// index falls outside them; both messages state what was available.
    pub fn resolve_ref(marker: &RefMarker, created: &CreatedRecords) -> Result<Value, Error> {
        let records = created.records(&marker.entity);
        if records.is_empty() {
            return Err(Error::RefNoRecords {
                entity: marker.entity.clone(),
                index: marker.index,
            });
        }
        let record = records.get(marker.index).ok_or_else(|| Error::RefOutOfRange {
            entity: marker.entity.clone(),
            index: marker.index,
            available: records.len(),
        })?;
        Ok(record.get(&marker.field).cloned().unwrap_or(Value::Null))
    }

    /// Resolve a criteria lookup against the ledger.
    ///
    /// First-match semantics: the earliest created record satisfying every
    /// criterion wins; duplicates are not an error. No match at all is.
    pub fn resolve_lookup(
        marker: &LookupMarker,
        created: &CreatedRecords,
    ) -> Result<Value, Error> {
        let records = created.records(&marker.entity);
        if records.is_empty() {
            return Err(Error::LookupNoRecords {
                entity: marker.entity.clone(),
            });
        }
        let matched = records.iter().find(|record| {
            marker.criteria.iter().all(|(field, expected)| {
                record.get(field).is_some_and(|actual| actual.equals(expected))
            })
        });
        match matched {
            Some(record) => Ok(record.get(&marker.field).cloned().unwrap_or(Value::Null)),
            None => Err(Error::LookupNoMatch {
                entity: marker.entity.clone(),
                criteria: render_criteria(&marker.criteria),
            }),
        }
    }
}

fn render_criteria(criteria: &BTreeMap<String, Value>) -> String {
    serde_json::to_string(criteria).unwrap_or_else(|_| format!("{:?}", criteria))
}
