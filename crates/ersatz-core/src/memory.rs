//! In-memory reference implementation of the database capability.
//!
//! Backs tests and mock servers. Every capability call is recorded, so
//! tests can assert query budgets (for instance, that batched relation
//! loading issued exactly one `find_many`).

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use ersatz_model::{Database, Error, Filter, OrderBy, OrderDirection, Query, Row, Value};

/// One recorded capability call.
#[derive(Debug, Clone)]
pub struct QueryCall {
    /// Capability method name.
    pub operation: &'static str,
    /// Entity the call addressed.
    pub entity: String,
    /// The query as issued.
    pub query: Query,
}

/// An in-memory, entity-per-collection database.
///
/// Collections must exist before they can be queried; querying an entity
/// that was never registered or inserted into fails with
/// [`Error::EntityNotFound`], mirroring how a real backend reports a
/// missing table.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    log: RwLock<Vec<QueryCall>>,
}

impl MemoryDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection for an entity.
    pub fn register_entity(&self, entity: impl Into<String>) {
        self.tables.write().entry(entity.into()).or_default();
    }

    /// Insert a row directly, creating the collection if needed.
    ///
    /// This is setup plumbing: it does not go through the capability
    /// surface and is not recorded in the call log.
    pub fn insert(&self, entity: impl Into<String>, row: Row) {
        self.tables.write().entry(entity.into()).or_default().push(row);
    }

    /// Snapshot a collection's rows in insertion order.
    pub fn snapshot(&self, entity: &str) -> Vec<Row> {
        self.tables.read().get(entity).cloned().unwrap_or_default()
    }

    /// Number of capability calls recorded so far.
    pub fn query_count(&self) -> usize {
        self.log.read().len()
    }

    /// The recorded capability calls, oldest first.
    pub fn calls(&self) -> Vec<QueryCall> {
        self.log.read().clone()
    }

    /// Forget all recorded calls.
    pub fn reset_calls(&self) {
        self.log.write().clear();
    }

    fn record(&self, operation: &'static str, entity: &str, query: &Query) {
        self.log.write().push(QueryCall {
            operation,
            entity: entity.to_string(),
            query: query.clone(),
        });
    }

    fn collect(&self, entity: &str, query: &Query) -> Result<Vec<Row>, Error> {
        let tables = self.tables.read();
        let rows = tables
            .get(entity)
            .ok_or_else(|| Error::EntityNotFound(entity.to_string()))?;

        let mut matched: Vec<Row> = rows
            .iter()
            .filter(|row| matches_all(row, &query.filters))
            .cloned()
            .collect();

        sort_rows(&mut matched, &query.order_by);

        let skip = query.skip.unwrap_or(0);
        let matched: Vec<Row> = match query.take {
            Some(take) => matched.into_iter().skip(skip).take(take).collect(),
            None => matched.into_iter().skip(skip).collect(),
        };
        Ok(matched)
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn find_first(&self, entity: &str, query: Query) -> Result<Option<Row>, Error> {
        self.record("find_first", entity, &query);
        Ok(self.collect(entity, &query)?.into_iter().next())
    }

    async fn find_many(&self, entity: &str, query: Query) -> Result<Vec<Row>, Error> {
        self.record("find_many", entity, &query);
        self.collect(entity, &query)
    }

    async fn count(&self, entity: &str, query: Query) -> Result<usize, Error> {
        self.record("count", entity, &query);
        Ok(self.collect(entity, &query)?.len())
    }

    async fn create(&self, entity: &str, row: Row) -> Result<Row, Error> {
        self.record("create", entity, &Query::new());
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(entity)
            .ok_or_else(|| Error::EntityNotFound(entity.to_string()))?;
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, entity: &str, query: Query, changes: Row) -> Result<Vec<Row>, Error> {
        self.record("update", entity, &query);
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(entity)
            .ok_or_else(|| Error::EntityNotFound(entity.to_string()))?;

        let mut updated = Vec::new();
        for row in rows.iter_mut() {
            if matches_all(row, &query.filters) {
                row.merge(changes.clone());
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, entity: &str, query: Query) -> Result<usize, Error> {
        self.record("delete", entity, &query);
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(entity)
            .ok_or_else(|| Error::EntityNotFound(entity.to_string()))?;

        let before = rows.len();
        rows.retain(|row| !matches_all(row, &query.filters));
        Ok(before - rows.len())
    }
}

/// Evaluate all filters against a row (filters are ANDed).
fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| matches(row, filter))
}

/// Evaluate a single filter against a row.
///
/// A missing field matches nothing, with two exceptions: `NotIn` holds for
/// a missing field (it is in no set), and `IsNull` treats missing as null.
fn matches(row: &Row, filter: &Filter) -> bool {
    match filter {
        Filter::Eq { field, value } => compare_field(row, field, |v| v.equals(value)),
        Filter::Ne { field, value } => compare_field(row, field, |v| !v.equals(value)),
        Filter::Lt { field, value } => ordered(row, field, value, Ordering::is_lt),
        Filter::Le { field, value } => ordered(row, field, value, Ordering::is_le),
        Filter::Gt { field, value } => ordered(row, field, value, Ordering::is_gt),
        Filter::Ge { field, value } => ordered(row, field, value, Ordering::is_ge),
        Filter::In { field, values } => {
            compare_field(row, field, |v| values.iter().any(|c| v.equals(c)))
        }
        Filter::NotIn { field, values } => match row.get(field) {
            Some(v) => !values.iter().any(|c| v.equals(c)),
            None => true, // a missing field is in no set
        },
        Filter::Contains { field, value } => string_field(row, field, |s| s.contains(value)),
        Filter::StartsWith { field, value } => string_field(row, field, |s| s.starts_with(value)),
        Filter::EndsWith { field, value } => string_field(row, field, |s| s.ends_with(value)),
        Filter::IsNull { field } => matches!(row.get(field), None | Some(Value::Null)),
        Filter::IsNotNull { field } => !matches!(row.get(field), None | Some(Value::Null)),
    }
}

fn compare_field<F>(row: &Row, field: &str, predicate: F) -> bool
where
    F: FnOnce(&Value) -> bool,
{
    match row.get(field) {
        Some(v) => predicate(v),
        None => false,
    }
}

fn ordered<F>(row: &Row, field: &str, value: &Value, check: F) -> bool
where
    F: FnOnce(Ordering) -> bool,
{
    match row.get(field) {
        Some(v) => v.compare(value).map(check).unwrap_or(false),
        None => false,
    }
}

fn string_field<F>(row: &Row, field: &str, predicate: F) -> bool
where
    F: FnOnce(&str) -> bool,
{
    match row.get(field).and_then(Value::as_str) {
        Some(s) => predicate(s),
        None => false,
    }
}

/// Sort rows by the given orderings, applied in sequence.
fn sort_rows(rows: &mut [Row], order_by: &[OrderBy]) {
    if order_by.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for order in order_by {
            let ord = match (a.get(&order.field), b.get(&order.field)) {
                (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ord = match order.direction {
                OrderDirection::Asc => ord,
                OrderDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}
