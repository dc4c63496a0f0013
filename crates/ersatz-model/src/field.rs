//! Field specifications for entity declarations.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// The primitive or composite type of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit floating point.
    Float,
    /// UTF-8 string.
    String,
    /// UUID, carried as a string value.
    Uuid,
    /// Timestamp, carried as a string value.
    Timestamp,
    /// Homogeneous list of an item type.
    List(Box<FieldType>),
    /// Nested object with a fixed shape.
    Object(Vec<FieldSpec>),
}

/// Validation constraints on a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraints {
    /// Minimum numeric value or string length.
    pub min: Option<f64>,
    /// Maximum numeric value or string length.
    pub max: Option<f64>,
    /// Regular expression the value must match.
    pub pattern: Option<String>,
}

/// A field specification within an entity declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Field data type.
    pub field_type: FieldType,
    /// Whether the field may hold null.
    pub nullable: bool,
    /// Whether values must be unique across the entity.
    pub unique: bool,
    /// Whether the field is rejected on writes after creation.
    pub read_only: bool,
    /// Default value applied when the field is absent.
    pub default: Option<Value>,
    /// Validation constraints.
    pub constraints: Option<FieldConstraints>,
}

impl FieldSpec {
    /// Create a new non-nullable field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            unique: false,
            read_only: false,
            default: None,
            constraints: None,
        }
    }

    /// Create a nullable field.
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            nullable: true,
            ..Self::new(name, field_type)
        }
    }

    /// Mark the field nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark the field unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark the field read-only.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set validation constraints.
    pub fn with_constraints(mut self, constraints: FieldConstraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Check if this field has a default value.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}
