//! Ersatz model types and capability contracts.
//!
//! This crate defines the shared vocabulary of the Ersatz runtime: entity
//! declarations, runtime values, the query IR, seed markers, and the traits
//! external capabilities implement.
//!
//! # Modules
//!
//! - [`value`] - Runtime value types for entity data
//! - [`row`] - Entity instance representation
//! - [`entity`] - Entity and view declarations
//! - [`field`] - Field specifications
//! - [`relation`] - Relation specifications
//! - [`computed`] - Computed-field specifications
//! - [`policy`] - Row-level security policy declarations
//! - [`query`] - Query IR consumed by the database capability
//! - [`seed`] - Deferred reference markers for seed data
//! - [`context`] - Caller context
//! - [`database`] - Capability traits
//! - [`error`] - Capability-side error types

pub mod computed;
pub mod context;
pub mod database;
pub mod entity;
pub mod error;
pub mod field;
pub mod policy;
pub mod query;
pub mod relation;
pub mod row;
pub mod seed;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use computed::{ComputeFuture, ComputeMode, ComputedSpec, MockFn, Resolver};
pub use context::Context;
pub use database::{Database, ValueGenerator};
pub use entity::{EntityDecl, ViewDecl};
pub use field::{FieldConstraints, FieldSpec, FieldType};
pub use policy::{BypassRule, Operation, RlsPolicy, RowPredicate, ScopeRule};
pub use query::{Filter, OrderBy, OrderDirection, Query};
pub use relation::{default_foreign_key, RelationKind, RelationSpec};
pub use row::Row;
pub use seed::{
    lookup, lookup_field, reference, reference_field, LookupMarker, RefMarker, SeedRecord,
    SeedValue,
};
pub use value::Value;
