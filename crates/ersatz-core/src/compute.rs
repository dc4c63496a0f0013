//! Computed-field ordering and evaluation.
//!
//! Dependency ordering uses a two-set depth-first walk (visiting/visited);
//! revisiting a node still on the current path is a hard configuration
//! error, unlike the relation walk's silent depth truncation. Evaluation
//! memoizes resolved values in an explicit per-request [`ComputeCache`]
//! rather than a process-wide singleton, so nothing leaks across requests.

use std::collections::{BTreeMap, HashSet};

use dashmap::DashMap;
use tracing::{instrument, trace};

use ersatz_model::{ComputeMode, ComputedSpec, Context, Database, EntityDecl, Row, Value};

use crate::error::Error;

/// Order a subset of an entity's computed fields so every field comes after
/// its computed dependencies.
///
/// Dependencies on plain fields are ignored (they need no prior
/// computation), and dependencies pulled in purely for ordering are not
/// re-emitted: the output contains exactly the input fields. A dependency
/// cycle raises [`Error::CircularDependency`] naming a field on the cycle.
pub fn topological_sort(
    fields: &[String],
    all_computed: &BTreeMap<String, ComputedSpec>,
) -> Result<Vec<String>, Error> {
    let requested: HashSet<&str> = fields.iter().map(String::as_str).collect();
    let mut visiting = HashSet::new();
    let mut visited = HashSet::new();
    let mut ordered = Vec::new();

    for field in fields {
        visit(field, all_computed, &mut visiting, &mut visited, &mut ordered)?;
    }

    Ok(ordered
        .into_iter()
        .filter(|f| requested.contains(f.as_str()))
        .collect())
}

fn visit(
    field: &str,
    all_computed: &BTreeMap<String, ComputedSpec>,
    visiting: &mut HashSet<String>,
    visited: &mut HashSet<String>,
    ordered: &mut Vec<String>,
) -> Result<(), Error> {
    if visited.contains(field) {
        return Ok(());
    }
    if !visiting.insert(field.to_string()) {
        return Err(Error::CircularDependency(field.to_string()));
    }
    if let Some(spec) = all_computed.get(field) {
        for dep in &spec.depends_on {
            // Plain-field dependencies carry no ordering obligation.
            if all_computed.contains_key(dep) {
                visit(dep, all_computed, visiting, visited, ordered)?;
            }
        }
    }
    visiting.remove(field);
    visited.insert(field.to_string());
    ordered.push(field.to_string());
    Ok(())
}

/// Per-request memoization of resolved computed values.
///
/// Keyed by (entity id, field name). Create one per logical request and
/// drop it (or [`clear`](ComputeCache::clear) it) when the request ends;
/// sharing one instance across concurrent requests on the same entity id
/// risks observing another request's memoized value.
#[derive(Default)]
pub struct ComputeCache {
    values: DashMap<(String, String), Value>,
}

impl ComputeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a memoized value.
    pub fn get(&self, entity_id: &str, field: &str) -> Option<Value> {
        self.values
            .get(&(entity_id.to_string(), field.to_string()))
            .map(|entry| entry.clone())
    }

    /// Memoize a resolved value.
    pub fn insert(&self, entity_id: impl Into<String>, field: impl Into<String>, value: Value) {
        self.values.insert((entity_id.into(), field.into()), value);
    }

    /// Drop every memoized value.
    pub fn clear(&self) {
        self.values.clear();
    }

    /// Number of memoized values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether nothing is memoized.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Evaluates computed fields for entity instances.
///
/// Values memoize per (entity id, field); rows without an identity value
/// resolve uncached. Memoization stores the resolved value, not the
/// in-flight future, so concurrent resolution of the same field may
/// recompute - the cache exists to deduplicate within one sequential
/// resolution pass.
pub struct ComputedFieldResolver<'a> {
    database: &'a dyn Database,
    cache: &'a ComputeCache,
}

impl<'a> ComputedFieldResolver<'a> {
    /// Create a resolver over a database capability and a request cache.
    pub fn new(database: &'a dyn Database, cache: &'a ComputeCache) -> Self {
        Self { database, cache }
    }

    /// Resolve one computed field of an entity instance.
    ///
    /// In [`ComputeMode::Seed`], a declared mock function takes the place
    /// of the resolver. Fails with [`Error::UnknownComputed`] when the
    /// entity declares no such field.
    pub async fn resolve_field(
        &self,
        decl: &EntityDecl,
        row: &Row,
        field: &str,
        context: Option<&Context>,
        mode: ComputeMode,
    ) -> Result<Value, Error> {
        let spec = decl
            .computed_field(field)
            .ok_or_else(|| Error::UnknownComputed {
                entity: decl.name.clone(),
                field: field.to_string(),
            })?;
        self.resolve_spec(decl, row, field, spec, context, mode).await
    }

    /// Resolve every computed field of an entity instance in dependency
    /// order, writing each result onto the row.
    ///
    /// A field's resolver runs after all of its computed dependencies, so
    /// it may read sibling computed values already present on the row.
    #[instrument(skip_all, fields(entity = %decl.name, mode = ?mode))]
    pub async fn resolve_fields(
        &self,
        decl: &EntityDecl,
        row: &mut Row,
        context: Option<&Context>,
        mode: ComputeMode,
    ) -> Result<(), Error> {
        if decl.computed.is_empty() {
            return Ok(());
        }
        let fields: Vec<String> = decl.computed.keys().cloned().collect();
        let order = topological_sort(&fields, &decl.computed)?;
        for field in order {
            let Some(spec) = decl.computed.get(&field) else {
                continue;
            };
            let value = self
                .resolve_spec(decl, row, &field, spec, context, mode)
                .await?;
            row.set(field, value);
        }
        Ok(())
    }

    async fn resolve_spec(
        &self,
        decl: &EntityDecl,
        row: &Row,
        field: &str,
        spec: &ComputedSpec,
        context: Option<&Context>,
        mode: ComputeMode,
    ) -> Result<Value, Error> {
        let cache_key = decl.id_of(row).map(|id| id.to_string());
        if let Some(id) = &cache_key {
            if let Some(value) = self.cache.get(id, field) {
                trace!(entity = %decl.name, field, "compute cache hit");
                return Ok(value);
            }
        }

        let value = match (mode, &spec.mock) {
            (ComputeMode::Seed, Some(mock)) => mock(row),
            _ => spec.resolver.resolve(row, self.database, context).await?,
        };

        if let Some(id) = cache_key {
            self.cache.insert(id, field, value.clone());
        }
        Ok(value)
    }
}
