//! Metadata filtering for vector search
//!
//! Filters are a flat list of comparison conditions on top-level metadata
//! fields joined by a single logical operator. Values are JSON scalars;
//! arrays and objects cannot be compared. Adapters either translate a filter
//! into the engine's native syntax or evaluate it with [`MetadataFilter::matches`].

use crate::document::Metadata;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// JSON scalar value for filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonScalar {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (stored as f64)
    Number(f64),
    /// String value
    String(String),
}

impl JsonScalar {
    /// Check if this scalar equals a JSON value
    pub fn matches_json(&self, value: &JsonValue) -> bool {
        match (self, value) {
            (JsonScalar::Null, JsonValue::Null) => true,
            (JsonScalar::Bool(a), JsonValue::Bool(b)) => a == b,
            (JsonScalar::Number(a), JsonValue::Number(b)) => {
                b.as_f64().is_some_and(|n| (a - n).abs() < f64::EPSILON)
            }
            (JsonScalar::String(a), JsonValue::String(b)) => a == b,
            _ => false,
        }
    }

    /// Convert back into a JSON value (for engine filter syntax)
    pub fn to_json(&self) -> JsonValue {
        match self {
            JsonScalar::Null => JsonValue::Null,
            JsonScalar::Bool(b) => JsonValue::Bool(*b),
            JsonScalar::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            JsonScalar::String(s) => JsonValue::String(s.clone()),
        }
    }
}

impl From<bool> for JsonScalar {
    fn from(v: bool) -> Self {
        JsonScalar::Bool(v)
    }
}

impl From<i32> for JsonScalar {
    fn from(v: i32) -> Self {
        JsonScalar::Number(v as f64)
    }
}

impl From<i64> for JsonScalar {
    fn from(v: i64) -> Self {
        JsonScalar::Number(v as f64)
    }
}

impl From<f64> for JsonScalar {
    fn from(v: f64) -> Self {
        JsonScalar::Number(v)
    }
}

impl From<String> for JsonScalar {
    fn from(v: String) -> Self {
        JsonScalar::String(v)
    }
}

impl From<&str> for JsonScalar {
    fn from(v: &str) -> Self {
        JsonScalar::String(v.to_string())
    }
}

/// Logical operator joining the conditions of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    /// Every condition must match
    #[default]
    And,
    /// At least one condition must match
    Or,
}

/// A single comparison on a top-level metadata field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FilterCondition {
    /// `field == value`
    Eq {
        /// Field name
        field: String,
        /// Expected value
        value: JsonScalar,
    },
    /// `field != value` (a missing field counts as not equal)
    Ne {
        /// Field name
        field: String,
        /// Excluded value
        value: JsonScalar,
    },
    /// `field` is one of `values`
    In {
        /// Field name
        field: String,
        /// Allowed values
        values: Vec<JsonScalar>,
    },
    /// `field` is none of `values` (a missing field matches)
    NotIn {
        /// Field name
        field: String,
        /// Excluded values
        values: Vec<JsonScalar>,
    },
    /// `field > value`
    Gt {
        /// Field name
        field: String,
        /// Bound
        value: f64,
    },
    /// `field >= value`
    Gte {
        /// Field name
        field: String,
        /// Bound
        value: f64,
    },
    /// `field < value`
    Lt {
        /// Field name
        field: String,
        /// Bound
        value: f64,
    },
    /// `field <= value`
    Lte {
        /// Field name
        field: String,
        /// Bound
        value: f64,
    },
}

impl FilterCondition {
    /// Field this condition inspects
    pub fn field(&self) -> &str {
        match self {
            FilterCondition::Eq { field, .. }
            | FilterCondition::Ne { field, .. }
            | FilterCondition::In { field, .. }
            | FilterCondition::NotIn { field, .. }
            | FilterCondition::Gt { field, .. }
            | FilterCondition::Gte { field, .. }
            | FilterCondition::Lt { field, .. }
            | FilterCondition::Lte { field, .. } => field,
        }
    }

    /// Evaluate against metadata
    pub fn matches(&self, metadata: &Metadata) -> bool {
        let actual = metadata.get(self.field());
        match self {
            FilterCondition::Eq { value, .. } => actual.is_some_and(|a| value.matches_json(a)),
            FilterCondition::Ne { value, .. } => !actual.is_some_and(|a| value.matches_json(a)),
            FilterCondition::In { values, .. } => {
                actual.is_some_and(|a| values.iter().any(|v| v.matches_json(a)))
            }
            FilterCondition::NotIn { values, .. } => {
                !actual.is_some_and(|a| values.iter().any(|v| v.matches_json(a)))
            }
            FilterCondition::Gt { value, .. } => number(actual).is_some_and(|n| n > *value),
            FilterCondition::Gte { value, .. } => number(actual).is_some_and(|n| n >= *value),
            FilterCondition::Lt { value, .. } => number(actual).is_some_and(|n| n < *value),
            FilterCondition::Lte { value, .. } => number(actual).is_some_and(|n| n <= *value),
        }
    }
}

fn number(value: Option<&JsonValue>) -> Option<f64> {
    value.and_then(JsonValue::as_f64)
}

/// Metadata filter for search
///
/// An empty filter matches everything regardless of the logical operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// How conditions combine
    #[serde(default)]
    pub logical_operator: LogicalOp,
    /// Conditions in declaration order
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
}

impl MetadataFilter {
    /// Create an empty AND filter (matches all)
    pub fn new() -> Self {
        MetadataFilter::default()
    }

    /// Create an empty OR filter
    pub fn any() -> Self {
        MetadataFilter {
            logical_operator: LogicalOp::Or,
            conditions: Vec::new(),
        }
    }

    /// Add an arbitrary condition
    pub fn with(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add an equality condition
    pub fn eq(self, field: impl Into<String>, value: impl Into<JsonScalar>) -> Self {
        self.with(FilterCondition::Eq {
            field: field.into(),
            value: value.into(),
        })
    }

    /// Add an inequality condition
    pub fn ne(self, field: impl Into<String>, value: impl Into<JsonScalar>) -> Self {
        self.with(FilterCondition::Ne {
            field: field.into(),
            value: value.into(),
        })
    }

    /// Add an in-set condition
    pub fn is_in<V: Into<JsonScalar>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.with(FilterCondition::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Add a not-in-set condition
    pub fn not_in<V: Into<JsonScalar>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.with(FilterCondition::NotIn {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Add a `>` condition
    pub fn gt(self, field: impl Into<String>, value: f64) -> Self {
        self.with(FilterCondition::Gt {
            field: field.into(),
            value,
        })
    }

    /// Add a `>=` condition
    pub fn gte(self, field: impl Into<String>, value: f64) -> Self {
        self.with(FilterCondition::Gte {
            field: field.into(),
            value,
        })
    }

    /// Add a `<` condition
    pub fn lt(self, field: impl Into<String>, value: f64) -> Self {
        self.with(FilterCondition::Lt {
            field: field.into(),
            value,
        })
    }

    /// Add a `<=` condition
    pub fn lte(self, field: impl Into<String>, value: f64) -> Self {
        self.with(FilterCondition::Lte {
            field: field.into(),
            value,
        })
    }

    /// Check if metadata matches this filter
    pub fn matches(&self, metadata: &Metadata) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        match self.logical_operator {
            LogicalOp::And => self.conditions.iter().all(|c| c.matches(metadata)),
            LogicalOp::Or => self.conditions.iter().any(|c| c.matches(metadata)),
        }
    }

    /// Check if filter is empty (matches all)
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of conditions
    pub fn len(&self) -> usize {
        self.conditions.len()
    }
}
