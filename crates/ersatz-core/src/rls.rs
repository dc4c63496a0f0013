//! Row-level security evaluation.
//!
//! Evaluation is pure and synchronous: it returns a boolean and never
//! performs I/O or errors, so the same policy model can be applied to
//! individually fetched rows here and translated 1:1 into persisted access
//! rules by the generators. Denial is a normal outcome the caller checks,
//! not an exception.

use tracing::trace;

use ersatz_model::{Context, EntityDecl, Operation, RlsPolicy, Row};

/// Decides whether a context may perform an operation on a row.
///
/// Order of evaluation:
/// 1. a custom predicate declared for the operation wins outright;
/// 2. otherwise any matching bypass condition allows;
/// 3. otherwise every scope mapping must hold (ANDed);
/// 4. no scope mappings and no predicate leaves the operation unrestricted.
///
/// An absent context satisfies no scope mapping, so any declared scope
/// denies it. Callers wanting default-deny declare a predicate or a scope.
pub struct RlsEvaluator;

impl RlsEvaluator {
    /// Evaluate a policy against one row.
    pub fn evaluate(
        policy: &RlsPolicy,
        row: &Row,
        operation: Operation,
        context: Option<&Context>,
    ) -> bool {
        if let Some(predicate) = policy.predicate_for(operation) {
            return predicate(row, context);
        }

        for bypass in &policy.bypasses {
            let held = context
                .and_then(|ctx| ctx.get(&bypass.context_key))
                .is_some_and(|value| bypass.values.iter().any(|allowed| value.equals(allowed)));
            if held {
                trace!(context_key = %bypass.context_key, "bypass condition matched");
                return true;
            }
        }

        policy.scopes.iter().all(|scope| {
            let expected = context.and_then(|ctx| ctx.get(&scope.context_key));
            match (row.get(&scope.field), expected) {
                (Some(actual), Some(expected)) => actual.equals(expected),
                _ => false,
            }
        })
    }

    /// Evaluate an entity's declared policy; entities without one are
    /// unrestricted.
    pub fn evaluate_entity(
        decl: &EntityDecl,
        row: &Row,
        operation: Operation,
        context: Option<&Context>,
    ) -> bool {
        match &decl.rls {
            Some(policy) => Self::evaluate(policy, row, operation, context),
            None => true,
        }
    }

    /// Keep only the rows the context may perform the operation on.
    pub fn filter_rows(
        policy: &RlsPolicy,
        rows: Vec<Row>,
        operation: Operation,
        context: Option<&Context>,
    ) -> Vec<Row> {
        rows.into_iter()
            .filter(|row| Self::evaluate(policy, row, operation, context))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ersatz_model::Value;

    fn tenant_policy() -> RlsPolicy {
        RlsPolicy::new()
            .with_scope("tenantId", "tenantId")
            .with_bypass("role", vec![Value::String("admin".into())])
    }

    #[test]
    fn test_scope_and_bypass_matrix() {
        let policy = tenant_policy();
        let row = Row::new().with("tenantId", "t1");

        let matching = Context::new().with("tenantId", "t1");
        assert!(RlsEvaluator::evaluate(&policy, &row, Operation::Select, Some(&matching)));

        let wrong_tenant = Context::new().with("tenantId", "t2");
        assert!(!RlsEvaluator::evaluate(&policy, &row, Operation::Select, Some(&wrong_tenant)));

        let admin = Context::new().with("role", "admin").with("tenantId", "t2");
        assert!(RlsEvaluator::evaluate(&policy, &row, Operation::Select, Some(&admin)));

        assert!(!RlsEvaluator::evaluate(&policy, &row, Operation::Select, None));
    }

    #[test]
    fn test_scopes_are_anded() {
        let policy = RlsPolicy::new()
            .with_scope("tenantId", "tenantId")
            .with_scope("region", "region");
        let row = Row::new().with("tenantId", "t1").with("region", "eu");

        let both = Context::new().with("tenantId", "t1").with("region", "eu");
        assert!(RlsEvaluator::evaluate(&policy, &row, Operation::Select, Some(&both)));

        let one = Context::new().with("tenantId", "t1");
        assert!(!RlsEvaluator::evaluate(&policy, &row, Operation::Select, Some(&one)));
    }

    #[test]
    fn test_missing_row_field_denies() {
        let policy = RlsPolicy::new().with_scope("tenantId", "tenantId");
        let ctx = Context::new().with("tenantId", "t1");
        assert!(!RlsEvaluator::evaluate(&policy, &Row::new(), Operation::Select, Some(&ctx)));
    }

    #[test]
    fn test_empty_policy_is_unrestricted() {
        let policy = RlsPolicy::new();
        assert!(RlsEvaluator::evaluate(&policy, &Row::new(), Operation::Delete, None));
    }

    #[test]
    fn test_no_policy_allows() {
        let decl = EntityDecl::new("Public");
        assert!(RlsEvaluator::evaluate_entity(&decl, &Row::new(), Operation::Select, None));

        let decl = EntityDecl::new("Scoped").with_rls(tenant_policy());
        let row = Row::new().with("tenantId", "t1");
        assert!(!RlsEvaluator::evaluate_entity(&decl, &row, Operation::Select, None));
    }

    #[test]
    fn test_predicate_overrides_scope_and_bypass() {
        // The predicate denies deletes outright; bypass must not rescue it.
        let policy = tenant_policy().with_predicate(Operation::Delete, |_, _| false);
        let row = Row::new().with("tenantId", "t1");
        let admin = Context::new().with("role", "admin").with("tenantId", "t1");

        assert!(!RlsEvaluator::evaluate(&policy, &row, Operation::Delete, Some(&admin)));
        // Other operations still follow scope/bypass.
        assert!(RlsEvaluator::evaluate(&policy, &row, Operation::Update, Some(&admin)));
    }

    #[test]
    fn test_predicates_are_per_operation() {
        let policy = RlsPolicy::new()
            .with_predicate(Operation::Insert, |row, _| row.contains("id"))
            .with_scope("ownerId", "userId");

        let row = Row::new().with("id", "r1").with("ownerId", "u1");
        // Insert consults only the predicate.
        assert!(RlsEvaluator::evaluate(&policy, &row, Operation::Insert, None));
        // Select falls through to the scope, which an absent context fails.
        assert!(!RlsEvaluator::evaluate(&policy, &row, Operation::Select, None));
    }

    #[test]
    fn test_scope_equality_coerces_numerics() {
        let policy = RlsPolicy::new().with_scope("orgId", "orgId");
        let row = Row::new().with("orgId", 42i64);
        let ctx = Context::new().with("orgId", 42.0f64);
        assert!(RlsEvaluator::evaluate(&policy, &row, Operation::Select, Some(&ctx)));
    }

    #[test]
    fn test_filter_rows_post_filters() {
        let policy = tenant_policy();
        let rows = vec![
            Row::new().with("id", "r1").with("tenantId", "t1"),
            Row::new().with("id", "r2").with("tenantId", "t2"),
            Row::new().with("id", "r3").with("tenantId", "t1"),
        ];
        let ctx = Context::new().with("tenantId", "t1");

        let visible = RlsEvaluator::filter_rows(&policy, rows.clone(), Operation::Select, Some(&ctx));
        assert_eq!(visible.len(), 2);

        let admin = Context::new().with("role", "admin");
        let visible = RlsEvaluator::filter_rows(&policy, rows, Operation::Select, Some(&admin));
        assert_eq!(visible.len(), 3);
    }
}
