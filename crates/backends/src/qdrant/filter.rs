//! Qdrant filter translation
//!
//! Metadata lives under the `metadata` payload key, so a condition on field
//! `f` targets `metadata.f`. Each [`MetadataFilter`] becomes one nested
//! Qdrant filter; several filters are AND-ed with `must`.
//!
//! Negations (`ne`, `not_in`) are expressed with `must_not` so that points
//! lacking the field match, the same as in-process evaluation.

use serde_json::{json, Value as JsonValue};
use strata_vdb_core::{FilterCondition, JsonScalar, LogicalOp, MetadataFilter, VdbError, VdbResult};

const BACKEND: &str = "qdrant";

/// Payload key for a metadata field
pub fn payload_key(field: &str) -> String {
    format!("metadata.{}", field)
}

fn unsupported(reason: impl Into<String>) -> VdbError {
    VdbError::UnsupportedFilter {
        backend: BACKEND.to_string(),
        reason: reason.into(),
    }
}

/// Positive match on a single value
fn match_value(key: &str, value: &JsonScalar) -> VdbResult<JsonValue> {
    Ok(match value {
        JsonScalar::Null => json!({"is_null": {"key": key}}),
        JsonScalar::Bool(b) => json!({"key": key, "match": {"value": b}}),
        JsonScalar::String(s) => json!({"key": key, "match": {"value": s}}),
        JsonScalar::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
            json!({"key": key, "match": {"value": *n as i64}})
        }
        // Float equality has no match form; use a closed range
        JsonScalar::Number(n) => json!({"key": key, "range": {"gte": n, "lte": n}}),
    })
}

/// Positive match on any of several values
fn match_any(key: &str, values: &[JsonScalar]) -> VdbResult<JsonValue> {
    if values.is_empty() {
        return Err(unsupported(format!("empty value list on '{}'", key)));
    }
    if let Some(strings) = values
        .iter()
        .map(|v| match v {
            JsonScalar::String(s) => Some(json!(s)),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
    {
        return Ok(json!({"key": key, "match": {"any": strings}}));
    }
    if let Some(ints) = values
        .iter()
        .map(|v| match v {
            JsonScalar::Number(n) if n.fract() == 0.0 => Some(json!(*n as i64)),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
    {
        return Ok(json!({"key": key, "match": {"any": ints}}));
    }
    // Mixed or non-keyword values: one `should` per value
    let options = values
        .iter()
        .map(|v| match_value(key, v))
        .collect::<VdbResult<Vec<_>>>()?;
    Ok(json!({"should": options}))
}

/// `(condition, negated)`
fn condition(cond: &FilterCondition) -> VdbResult<(JsonValue, bool)> {
    let key = payload_key(cond.field());
    Ok(match cond {
        FilterCondition::Eq { value, .. } => (match_value(&key, value)?, false),
        FilterCondition::Ne { value, .. } => (match_value(&key, value)?, true),
        FilterCondition::In { values, .. } => (match_any(&key, values)?, false),
        FilterCondition::NotIn { values, .. } => (match_any(&key, values)?, true),
        FilterCondition::Gt { value, .. } => (json!({"key": key, "range": {"gt": value}}), false),
        FilterCondition::Gte { value, .. } => (json!({"key": key, "range": {"gte": value}}), false),
        FilterCondition::Lt { value, .. } => (json!({"key": key, "range": {"lt": value}}), false),
        FilterCondition::Lte { value, .. } => (json!({"key": key, "range": {"lte": value}}), false),
    })
}

fn filter_object(filter: &MetadataFilter) -> VdbResult<JsonValue> {
    let mut positive = Vec::new();
    let mut negative = Vec::new();
    for cond in &filter.conditions {
        let (c, negated) = condition(cond)?;
        if negated {
            negative.push(c);
        } else {
            positive.push(c);
        }
    }

    Ok(match filter.logical_operator {
        LogicalOp::And => {
            let mut obj = serde_json::Map::new();
            if !positive.is_empty() {
                obj.insert("must".into(), JsonValue::Array(positive));
            }
            if !negative.is_empty() {
                obj.insert("must_not".into(), JsonValue::Array(negative));
            }
            JsonValue::Object(obj)
        }
        LogicalOp::Or => {
            let mut should = positive;
            should.extend(negative.into_iter().map(|c| json!({"must_not": [c]})));
            json!({"should": should})
        }
    })
}

/// Qdrant filter for a list of AND-ed filters, `None` when unrestricted
pub fn to_qdrant_filter(filters: &[MetadataFilter]) -> VdbResult<Option<JsonValue>> {
    let mut objects = filters
        .iter()
        .filter(|f| !f.is_empty())
        .map(filter_object)
        .collect::<VdbResult<Vec<_>>>()?;
    Ok(match objects.len() {
        0 => None,
        1 => objects.pop(),
        _ => Some(json!({"must": objects})),
    })
}
