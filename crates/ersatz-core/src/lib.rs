//! Ersatz resolution runtime.
//!
//! Entity declarations form a directed graph: relation targets, computed
//! field dependencies, and seed references. This crate traverses that graph
//! correctly under cycles: the registry answers lookups and advisory
//! ordering, the relation resolver walks relation edges with a depth bound,
//! the computed-field resolver orders dependency edges with hard cycle
//! rejection, the RLS evaluator decides row access, and the seed resolver
//! substitutes deferred cross-entity references during bulk insertion.
//!
//! # Modules
//!
//! - [`registry`] - Entity and view declaration storage and lookup
//! - [`relation`] - Single, recursive, and batched relation resolution
//! - [`compute`] - Computed-field ordering and evaluation
//! - [`rls`] - Row-level security evaluation
//! - [`seed`] - Seed reference resolution and the run ledger
//! - [`memory`] - In-memory reference database capability
//! - [`error`] - Runtime error types

pub mod compute;
pub mod error;
pub mod memory;
pub mod registry;
pub mod relation;
pub mod rls;
pub mod seed;

pub use error::Error;

// Re-export the resolution surface at crate root
pub use compute::{topological_sort, ComputeCache, ComputedFieldResolver};
pub use memory::MemoryDatabase;
pub use registry::Registry;
pub use relation::{ComputeHook, RelationResolver, ResolveOptions};
pub use rls::RlsEvaluator;
pub use seed::{CreatedRecords, SeedResolver};
