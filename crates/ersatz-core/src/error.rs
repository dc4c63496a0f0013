//! Runtime error types.

use thiserror::Error;

/// Errors raised by the resolution runtime.
///
/// Configuration problems (unregistered entities, unknown computed fields,
/// dependency cycles) are meant to fail fast at build time. Seed reference
/// problems fail per record, loudly, with the entity, the count available,
/// and what was requested. Authorization decisions and missing foreign keys
/// are never errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The entity was never registered.
    #[error("entity is not registered: {0}")]
    NotRegistered(String),

    /// The entity declares no relation by that name.
    #[error("entity '{entity}' has no relation '{relation}'")]
    UnknownRelation { entity: String, relation: String },

    /// The entity declares no computed field by that name.
    #[error("entity '{entity}' has no computed field '{field}'")]
    UnknownComputed { entity: String, field: String },

    /// The computed-field dependency graph has a cycle.
    #[error("circular dependency detected involving computed field '{0}'")]
    CircularDependency(String),

    /// A seed ref addressed an entity with no created records.
    #[error("seed ref to '{entity}' index {index}: no records created yet")]
    RefNoRecords { entity: String, index: usize },

    /// A seed ref index fell outside the created records.
    #[error(
        "seed ref to '{entity}' index {index} is out of range: {available} record(s) created, valid indices 0..={}",
        .available - 1
    )]
    RefOutOfRange {
        entity: String,
        index: usize,
        available: usize,
    },

    /// A seed lookup addressed an entity with no created records.
    #[error("seed lookup in '{entity}': no records created yet")]
    LookupNoRecords { entity: String },

    /// A seed lookup matched nothing.
    #[error("seed lookup in '{entity}' matched no record for where {criteria}")]
    LookupNoMatch { entity: String, criteria: String },

    /// The database capability failed.
    #[error("capability error: {0}")]
    Capability(#[from] ersatz_model::Error),
}
