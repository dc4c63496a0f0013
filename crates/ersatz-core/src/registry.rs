//! Schema registry for entity and view declarations.
//!
//! The registry is the single lookup point the resolvers go through.
//! Relation targets stay weak name references resolved here at call time, so
//! declarations may be registered in any order and may be mutually recursive
//! without ever forming an object graph that points at itself.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use ersatz_model::{EntityDecl, RelationSpec, ViewDecl};

use crate::error::Error;

#[derive(Default)]
struct Inner {
    entities: HashMap<String, Arc<EntityDecl>>,
    /// Entity names in first-registration order.
    order: Vec<String>,
    views: HashMap<String, Arc<ViewDecl>>,
}

/// Holds every registered entity and view declaration, keyed by name.
///
/// Registration order is tracked so scans and ordering walks stay
/// deterministic. Lookups hand out cheap `Arc` clones.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity declaration under its name.
    ///
    /// Registering a name twice replaces the earlier declaration (last write
    /// wins) and logs a warning; the entity keeps its original position in
    /// the registration order.
    pub fn register(&self, decl: EntityDecl) {
        let name = decl.name.clone();
        let mut inner = self.inner.write();
        if inner.entities.insert(name.clone(), Arc::new(decl)).is_some() {
            warn!(entity = %name, "entity already registered, replacing declaration");
        } else {
            debug!(entity = %name, "entity registered");
            inner.order.push(name);
        }
    }

    /// Look up an entity declaration.
    pub fn get(&self, name: &str) -> Option<Arc<EntityDecl>> {
        self.inner.read().entities.get(name).cloned()
    }

    /// Look up an entity declaration, failing if it was never registered.
    pub fn require(&self, name: &str) -> Result<Arc<EntityDecl>, Error> {
        self.get(name)
            .ok_or_else(|| Error::NotRegistered(name.to_string()))
    }

    /// Check whether an entity is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().entities.contains_key(name)
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.inner.read().entities.len()
    }

    /// Check whether no entities are registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().entities.is_empty()
    }

    /// Registered entity names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.inner.read().order.clone()
    }

    /// An entity's relations by name; empty when the entity is unknown or
    /// declares none.
    pub fn relations_for(&self, name: &str) -> BTreeMap<String, RelationSpec> {
        self.get(name)
            .map(|decl| decl.relations.clone())
            .unwrap_or_default()
    }

    /// Every entity with at least one relation targeting `target`.
    ///
    /// Full scan over all registered declarations, in registration order.
    pub fn referencing(&self, target: &str) -> Vec<String> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter(|name| {
                inner
                    .entities
                    .get(*name)
                    .is_some_and(|decl| decl.relations.values().any(|r| r.target == target))
            })
            .cloned()
            .collect()
    }

    /// Entity names in dependency-friendly order.
    ///
    /// Depth-first postorder over the relation graph: on an acyclic graph,
    /// every entity referenced by another entity's relations appears no
    /// later than its referrer. The walk carries a visited set only, so
    /// cycles terminate silently instead of erroring; on a cyclic graph the
    /// result is advisory and individual edges may be violated. Callers
    /// needing a strict insertion order should supply their own.
    pub fn entity_order(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut visited = HashSet::new();
        let mut out = Vec::with_capacity(inner.order.len());
        for name in &inner.order {
            Self::postorder(&inner, name, &mut visited, &mut out);
        }
        out
    }

    fn postorder(inner: &Inner, name: &str, visited: &mut HashSet<String>, out: &mut Vec<String>) {
        if !visited.insert(name.to_string()) {
            return;
        }
        let Some(decl) = inner.entities.get(name) else {
            // Relation targets that were never registered have no subtree.
            return;
        };
        for spec in decl.relations.values() {
            Self::postorder(inner, &spec.target, visited, out);
        }
        out.push(name.to_string());
    }

    /// Register a view declaration under its name.
    ///
    /// Views never join the relation graph or the entity ordering; they are
    /// stored purely for lookup. Duplicate names replace with a warning.
    pub fn register_view(&self, view: ViewDecl) {
        let name = view.name.clone();
        let mut inner = self.inner.write();
        if inner.views.insert(name.clone(), Arc::new(view)).is_some() {
            warn!(view = %name, "view already registered, replacing declaration");
        } else {
            debug!(view = %name, "view registered");
        }
    }

    /// Look up a view declaration.
    pub fn view(&self, name: &str) -> Option<Arc<ViewDecl>> {
        self.inner.read().views.get(name).cloned()
    }
}
