//! Computed-field specifications.

use std::fmt;
use std::future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::database::Database;
use crate::error::Error;
use crate::row::Row;
use crate::value::Value;

/// The future returned by a computed-field resolver.
pub type ComputeFuture<'a> = BoxFuture<'a, Result<Value, Error>>;

/// How computed fields are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputeMode {
    /// Normal resolution: run the resolver function.
    Resolve,
    /// Seed/mock mode: prefer the mock function when one is declared.
    Seed,
}

/// A computed-field resolver.
///
/// Implemented for any `Fn(&Row, &dyn Database, Option<&Context>)` returning
/// a [`ComputeFuture`], so plain `fn` items with that signature work
/// directly. Synchronous derivations are easier to write through
/// [`ComputedSpec::from_fn`].
pub trait Resolver: Send + Sync {
    /// Produce the field value for one entity instance.
    fn resolve<'a>(
        &'a self,
        row: &'a Row,
        database: &'a dyn Database,
        context: Option<&'a Context>,
    ) -> ComputeFuture<'a>;
}

impl<F> Resolver for F
where
    F: for<'a> Fn(&'a Row, &'a dyn Database, Option<&'a Context>) -> ComputeFuture<'a>
        + Send
        + Sync,
{
    fn resolve<'a>(
        &'a self,
        row: &'a Row,
        database: &'a dyn Database,
        context: Option<&'a Context>,
    ) -> ComputeFuture<'a> {
        self(row, database, context)
    }
}

struct SyncResolver<F>(F);

impl<F> Resolver for SyncResolver<F>
where
    F: Fn(&Row) -> Result<Value, Error> + Send + Sync,
{
    fn resolve<'a>(
        &'a self,
        row: &'a Row,
        _database: &'a dyn Database,
        _context: Option<&'a Context>,
    ) -> ComputeFuture<'a> {
        let result = (self.0)(row);
        Box::pin(future::ready(result))
    }
}

/// Mock function used instead of the resolver in seed mode.
pub type MockFn = Arc<dyn Fn(&Row) -> Value + Send + Sync>;

/// A computed field on an entity.
///
/// `depends_on` lists sibling field names used purely for ordering: computed
/// dependencies are resolved first so the resolver may read them off the
/// row. Dependencies on plain fields carry no ordering obligation.
#[derive(Clone)]
pub struct ComputedSpec {
    /// The resolver producing the value.
    pub resolver: Arc<dyn Resolver>,
    /// Optional mock used in seed mode.
    pub mock: Option<MockFn>,
    /// Sibling fields this computation reads.
    pub depends_on: Vec<String>,
}

impl ComputedSpec {
    /// Create a computed field from an async resolver.
    pub fn new(resolver: impl Resolver + 'static) -> Self {
        Self {
            resolver: Arc::new(resolver),
            mock: None,
            depends_on: Vec::new(),
        }
    }

    /// Create a computed field from a synchronous derivation.
    pub fn from_fn(f: impl Fn(&Row) -> Result<Value, Error> + Send + Sync + 'static) -> Self {
        Self::new(SyncResolver(f))
    }

    /// Set the mock function for seed mode.
    pub fn with_mock(mut self, f: impl Fn(&Row) -> Value + Send + Sync + 'static) -> Self {
        self.mock = Some(Arc::new(f));
        self
    }

    /// Declare the sibling fields this computation depends on.
    pub fn with_depends_on<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = fields.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for ComputedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedSpec")
            .field("depends_on", &self.depends_on)
            .field("has_mock", &self.mock.is_some())
            .finish_non_exhaustive()
    }
}
