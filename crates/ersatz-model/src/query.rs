//! Query IR consumed by the database capability.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A single field condition.
///
/// Conditions inside one [`Query`] are ANDed together. The vocabulary
/// deliberately stays small: it is what the resolution runtime itself needs
/// (equality, membership, string matching, null checks), not a general
/// predicate language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Field equals value.
    Eq { field: String, value: Value },
    /// Field does not equal value.
    Ne { field: String, value: Value },
    /// Field is less than value.
    Lt { field: String, value: Value },
    /// Field is less than or equal to value.
    Le { field: String, value: Value },
    /// Field is greater than value.
    Gt { field: String, value: Value },
    /// Field is greater than or equal to value.
    Ge { field: String, value: Value },
    /// Field is one of the given values.
    In { field: String, values: Vec<Value> },
    /// Field is none of the given values.
    NotIn { field: String, values: Vec<Value> },
    /// String field contains the substring.
    Contains { field: String, value: String },
    /// String field starts with the prefix.
    StartsWith { field: String, value: String },
    /// String field ends with the suffix.
    EndsWith { field: String, value: String },
    /// Field is null or absent.
    IsNull { field: String },
    /// Field is present and not null.
    IsNotNull { field: String },
}

impl Filter {
    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an inequality filter.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-than filter.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-than-or-equal filter.
    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Le {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than filter.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than-or-equal filter.
    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ge {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a membership filter.
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::In {
            field: field.into(),
            values,
        }
    }

    /// Create a non-membership filter.
    pub fn not_in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::NotIn {
            field: field.into(),
            values,
        }
    }

    /// Create a substring filter.
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a prefix filter.
    pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::StartsWith {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a suffix filter.
    pub fn ends_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::EndsWith {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an is-null filter.
    pub fn is_null(field: impl Into<String>) -> Self {
        Filter::IsNull {
            field: field.into(),
        }
    }

    /// Create an is-not-null filter.
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Filter::IsNotNull {
            field: field.into(),
        }
    }

    /// The field this condition applies to.
    pub fn field(&self) -> &str {
        match self {
            Filter::Eq { field, .. }
            | Filter::Ne { field, .. }
            | Filter::Lt { field, .. }
            | Filter::Le { field, .. }
            | Filter::Gt { field, .. }
            | Filter::Ge { field, .. }
            | Filter::In { field, .. }
            | Filter::NotIn { field, .. }
            | Filter::Contains { field, .. }
            | Filter::StartsWith { field, .. }
            | Filter::EndsWith { field, .. }
            | Filter::IsNull { field }
            | Filter::IsNotNull { field } => field,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Ordering on a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Field to order by.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Ascending order on a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Descending order on a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// A query against one entity collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Field conditions, ANDed together.
    pub filters: Vec<Filter>,
    /// Ordering, applied in sequence.
    pub order_by: Vec<OrderBy>,
    /// Rows to skip after ordering.
    pub skip: Option<usize>,
    /// Maximum rows to return.
    pub take: Option<usize>,
}

impl Query {
    /// Create an empty query matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add an ordering.
    pub fn with_order(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Set the number of rows to skip.
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the maximum number of rows to return.
    pub fn with_take(mut self, take: usize) -> Self {
        self.take = Some(take);
        self
    }
}
