//! Capability traits consumed by the resolution runtime.

use async_trait::async_trait;

use crate::error::Error;
use crate::query::Query;
use crate::row::Row;
use crate::value::Value;

/// The storage/query capability the runtime resolves against.
///
/// The runtime treats this as opaque: it issues queries and consumes rows,
/// and never assumes anything about how they are executed. `find_first`,
/// `find_many`, and `count` are required; the write operations are optional
/// and reject by default.
#[async_trait]
pub trait Database: Send + Sync {
    /// Fetch the first row of `entity` matching the query.
    async fn find_first(&self, entity: &str, query: Query) -> Result<Option<Row>, Error>;

    /// Fetch all rows of `entity` matching the query.
    async fn find_many(&self, entity: &str, query: Query) -> Result<Vec<Row>, Error>;

    /// Count rows of `entity` matching the query.
    async fn count(&self, entity: &str, query: Query) -> Result<usize, Error>;

    /// Insert a row, returning it as stored.
    async fn create(&self, entity: &str, row: Row) -> Result<Row, Error> {
        let _ = row;
        Err(Error::Unsupported(format!("create on '{}'", entity)))
    }

    /// Apply `changes` to every row matching the query, returning the
    /// updated rows.
    async fn update(&self, entity: &str, query: Query, changes: Row) -> Result<Vec<Row>, Error> {
        let _ = (query, changes);
        Err(Error::Unsupported(format!("update on '{}'", entity)))
    }

    /// Delete every row matching the query, returning how many went away.
    async fn delete(&self, entity: &str, query: Query) -> Result<usize, Error> {
        let _ = query;
        Err(Error::Unsupported(format!("delete on '{}'", entity)))
    }
}

/// Produces a concrete value for a semantic hint.
///
/// Only mock functions inside computed specs and seed-data authors touch
/// this; the runtime itself never generates values.
pub trait ValueGenerator: Send + Sync {
    /// Generate a value for a hint such as `"email"` or `"uuid"`.
    fn generate(&self, hint: &str) -> Value;
}
