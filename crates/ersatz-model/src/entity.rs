//! Entity and view declarations.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::computed::ComputedSpec;
use crate::field::FieldSpec;
use crate::policy::RlsPolicy;
use crate::query::Filter;
use crate::relation::RelationSpec;
use crate::row::Row;
use crate::value::Value;

/// A complete entity declaration.
///
/// One declaration carries everything derivable behavior needs: plain
/// fields, relations, computed fields, and an optional row-level security
/// policy. Declarations are registered into the registry by name and looked
/// up from there at resolution time.
#[derive(Clone)]
pub struct EntityDecl {
    /// Entity name, the unique registry key.
    pub name: String,
    /// Identity field, `"id"` unless overridden.
    pub id_field: String,
    /// Plain fields in declaration order.
    pub fields: Vec<FieldSpec>,
    /// Relations by name.
    pub relations: BTreeMap<String, RelationSpec>,
    /// Computed fields by name.
    pub computed: BTreeMap<String, ComputedSpec>,
    /// Row-level security policy, if any.
    pub rls: Option<RlsPolicy>,
    /// Whether createdAt/updatedAt bookkeeping is expected.
    pub timestamps: bool,
}

impl EntityDecl {
    /// Create a declaration with the conventional `"id"` identity field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_field: "id".to_string(),
            fields: Vec::new(),
            relations: BTreeMap::new(),
            computed: BTreeMap::new(),
            rls: None,
            timestamps: false,
        }
    }

    /// Override the identity field.
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Add a field.
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a relation.
    pub fn with_relation(mut self, name: impl Into<String>, spec: RelationSpec) -> Self {
        self.relations.insert(name.into(), spec);
        self
    }

    /// Add a computed field.
    pub fn with_computed(mut self, name: impl Into<String>, spec: ComputedSpec) -> Self {
        self.computed.insert(name.into(), spec);
        self
    }

    /// Attach a row-level security policy.
    pub fn with_rls(mut self, policy: RlsPolicy) -> Self {
        self.rls = Some(policy);
        self
    }

    /// Enable timestamp bookkeeping.
    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a relation by name.
    pub fn relation(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.get(name)
    }

    /// Look up a computed field by name.
    pub fn computed_field(&self, name: &str) -> Option<&ComputedSpec> {
        self.computed.get(name)
    }

    /// The identity value of a row, if present and non-null.
    pub fn id_of<'r>(&self, row: &'r Row) -> Option<&'r Value> {
        row.get(&self.id_field).filter(|v| !v.is_null())
    }

    /// Fill declared defaults into a row's missing fields.
    ///
    /// Fields already present keep their value, explicit nulls included.
    pub fn apply_defaults(&self, row: &mut Row) {
        for field in &self.fields {
            if let Some(default) = &field.default {
                if !row.contains(&field.name) {
                    row.set(field.name.clone(), default.clone());
                }
            }
        }
    }
}

impl fmt::Debug for EntityDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDecl")
            .field("name", &self.name)
            .field("id_field", &self.id_field)
            .field("fields", &self.fields.len())
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("rls", &self.rls.is_some())
            .field("timestamps", &self.timestamps)
            .finish()
    }
}

/// A view declaration: a named projection over a base entity.
///
/// Views never participate in the relation graph or in entity ordering;
/// the registry stores them purely for lookup by generators and callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDecl {
    /// View name, unique among views.
    pub name: String,
    /// Base entity name.
    pub base: String,
    /// Projected fields; empty means all fields.
    pub fields: Vec<String>,
    /// Baked-in filters applied before any caller filters.
    pub filters: Vec<Filter>,
}

impl ViewDecl {
    /// Create a view over a base entity.
    pub fn new(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            fields: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Project a field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Bake in a filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
}
