//! Capability-side error types.

use thiserror::Error;

/// Errors surfaced by the database capability and by computed-field
/// resolver functions.
#[derive(Debug, Error)]
pub enum Error {
    /// The backing store has no collection for the requested entity.
    #[error("target entity not found: {0}")]
    EntityNotFound(String),

    /// The backing store failed.
    #[error("database error: {0}")]
    Database(String),

    /// A computed-field resolver failed.
    #[error("compute error: {0}")]
    Compute(String),

    /// The capability does not implement an optional operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}
