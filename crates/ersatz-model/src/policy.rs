//! Row-level security policy declarations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::row::Row;
use crate::value::Value;

/// Operations a policy can gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Read operations.
    Select,
    /// Insert operations.
    Insert,
    /// Update operations.
    Update,
    /// Delete operations.
    Delete,
}

/// A scope mapping: the row's field must equal the context's key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeRule {
    /// Field on the row.
    pub field: String,
    /// Key in the caller context.
    pub context_key: String,
}

/// A bypass condition: if the context's key holds one of the allowed
/// values, every scope check is skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BypassRule {
    /// Key in the caller context.
    pub context_key: String,
    /// Values that trigger the bypass.
    pub values: Vec<Value>,
}

/// Custom per-operation predicate; overrides scope and bypass entirely.
pub type RowPredicate = Arc<dyn Fn(&Row, Option<&Context>) -> bool + Send + Sync>;

/// Row-level security policy for one entity.
///
/// Evaluation order: a custom predicate for the operation wins outright;
/// otherwise a matching bypass allows; otherwise all scope rules must hold.
/// A policy with no scope rules and no predicate for an operation leaves
/// that operation unrestricted.
#[derive(Clone, Default)]
pub struct RlsPolicy {
    /// Scope mappings, ANDed together.
    pub scopes: Vec<ScopeRule>,
    /// Bypass conditions, any one suffices.
    pub bypasses: Vec<BypassRule>,
    predicates: HashMap<Operation, RowPredicate>,
}

impl RlsPolicy {
    /// Create an empty (unrestricted) policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scope mapping.
    pub fn with_scope(
        mut self,
        field: impl Into<String>,
        context_key: impl Into<String>,
    ) -> Self {
        self.scopes.push(ScopeRule {
            field: field.into(),
            context_key: context_key.into(),
        });
        self
    }

    /// Add a bypass condition.
    pub fn with_bypass(mut self, context_key: impl Into<String>, values: Vec<Value>) -> Self {
        self.bypasses.push(BypassRule {
            context_key: context_key.into(),
            values,
        });
        self
    }

    /// Set a custom predicate for one operation.
    pub fn with_predicate(
        mut self,
        operation: Operation,
        predicate: impl Fn(&Row, Option<&Context>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.predicates.insert(operation, Arc::new(predicate));
        self
    }

    /// The custom predicate for an operation, if declared.
    pub fn predicate_for(&self, operation: Operation) -> Option<&RowPredicate> {
        self.predicates.get(&operation)
    }

    /// Check whether the policy restricts nothing at all.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty() && self.bypasses.is_empty() && self.predicates.is_empty()
    }
}

impl fmt::Debug for RlsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut operations: Vec<&Operation> = self.predicates.keys().collect();
        operations.sort_by_key(|op| format!("{:?}", op));
        f.debug_struct("RlsPolicy")
            .field("scopes", &self.scopes)
            .field("bypasses", &self.bypasses)
            .field("predicate_operations", &operations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_builder() {
        let policy = RlsPolicy::new()
            .with_scope("tenantId", "tenantId")
            .with_bypass("role", vec![Value::String("admin".into())])
            .with_predicate(Operation::Delete, |_, _| false);

        assert_eq!(policy.scopes.len(), 1);
        assert_eq!(policy.bypasses.len(), 1);
        assert!(policy.predicate_for(Operation::Delete).is_some());
        assert!(policy.predicate_for(Operation::Select).is_none());
        assert!(!policy.is_empty());
    }

    #[test]
    fn test_empty_policy() {
        assert!(RlsPolicy::new().is_empty());
    }

    #[test]
    fn test_predicate_receives_row_and_context() {
        let policy = RlsPolicy::new().with_predicate(Operation::Select, |row, ctx| {
            row.get("ownerId").map(|v| v.to_string()) == ctx.and_then(|c| c.get_str("userId").map(String::from))
        });

        let predicate = policy.predicate_for(Operation::Select).unwrap();
        let row = Row::new().with("ownerId", "u1");
        let ctx = Context::new().with("userId", "u1");

        assert!(predicate(&row, Some(&ctx)));
        assert!(!predicate(&row, None));
    }
}
