//! Relation specifications between entities.

use serde::{Deserialize, Serialize};

use crate::query::OrderBy;

/// The kind of a relation.
///
/// This is a closed enum: declarations carry an already-classified kind, so
/// resolution never has to re-discriminate loosely shaped input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    /// Single related record; the foreign key lives on the target entity.
    HasOne,
    /// Many related records; the foreign key lives on the target entity.
    HasMany,
    /// Single owning record; the foreign key lives on the source entity.
    BelongsTo,
}

/// A relation from one entity to another.
///
/// The target is a weak reference by name, resolved through the registry at
/// use time. Declarations may therefore be registered in any order and may
/// be mutually recursive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationSpec {
    /// Relation kind.
    pub kind: RelationKind,
    /// Target entity name.
    pub target: String,
    /// Explicit foreign-key field; derived from entity names when absent.
    pub foreign_key: Option<String>,
    /// Whether the relation loads automatically during resolution.
    pub eager: bool,
    /// Default ordering for hasMany results.
    pub order_by: Option<OrderBy>,
    /// Default limit for hasMany results.
    pub limit: Option<usize>,
    /// Join entity for many-to-many relations.
    pub through: Option<String>,
    /// Foreign key on the join entity pointing at the target.
    pub through_foreign_key: Option<String>,
}

impl RelationSpec {
    /// Create a hasOne relation.
    pub fn has_one(target: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::HasOne,
            target: target.into(),
            foreign_key: None,
            eager: false,
            order_by: None,
            limit: None,
            through: None,
            through_foreign_key: None,
        }
    }

    /// Create a hasMany relation.
    pub fn has_many(target: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::HasMany,
            ..Self::has_one(target)
        }
    }

    /// Create a belongsTo relation.
    pub fn belongs_to(target: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::BelongsTo,
            ..Self::has_one(target)
        }
    }

    /// Set an explicit foreign-key field.
    pub fn with_foreign_key(mut self, field: impl Into<String>) -> Self {
        self.foreign_key = Some(field.into());
        self
    }

    /// Mark the relation eager.
    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    /// Set the default ordering (hasMany).
    pub fn with_order(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    /// Set the default limit (hasMany).
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Route the relation through a join entity (many-to-many).
    pub fn through(mut self, join_entity: impl Into<String>) -> Self {
        self.through = Some(join_entity.into());
        self
    }

    /// Set the join entity's foreign key pointing at the target.
    pub fn with_through_foreign_key(mut self, field: impl Into<String>) -> Self {
        self.through_foreign_key = Some(field.into());
        self
    }

    /// Check if this relation resolves to a list.
    pub fn is_collection(&self) -> bool {
        self.kind == RelationKind::HasMany
    }

    /// The foreign-key field for this relation, defaulting by convention.
    ///
    /// `referenced` is the entity whose id the key points at: the target for
    /// belongsTo, the source for hasOne/hasMany.
    pub fn resolved_foreign_key(&self, referenced: &str) -> String {
        match &self.foreign_key {
            Some(field) => field.clone(),
            None => default_foreign_key(referenced),
        }
    }
}

/// The conventional foreign-key field name for an entity: the entity name
/// with its first character lowercased, suffixed with `Id`.
pub fn default_foreign_key(entity: &str) -> String {
    let mut chars = entity.chars();
    match chars.next() {
        Some(first) => format!("{}{}Id", first.to_lowercase(), chars.as_str()),
        None => "id".to_string(),
    }
}
