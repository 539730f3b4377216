//! Chroma `where` clauses and metadata sanitizing

use serde_json::{json, Map, Value as JsonValue};
use strata_vdb_core::{FilterCondition, JsonScalar, LogicalOp, Metadata, MetadataFilter, VdbError, VdbResult};

const BACKEND: &str = "chroma";

fn unsupported(reason: impl Into<String>) -> VdbError {
    VdbError::UnsupportedFilter {
        backend: BACKEND.to_string(),
        reason: reason.into(),
    }
}

fn scalar(field: &str, value: &JsonScalar) -> VdbResult<JsonValue> {
    match value {
        JsonScalar::Null => Err(unsupported(format!(
            "null comparison on '{}' (chroma stores no nulls)",
            field
        ))),
        other => Ok(other.to_json()),
    }
}

fn scalars(field: &str, values: &[JsonScalar]) -> VdbResult<JsonValue> {
    if values.is_empty() {
        return Err(unsupported(format!("empty value list on '{}'", field)));
    }
    values
        .iter()
        .map(|v| scalar(field, v))
        .collect::<VdbResult<Vec<_>>>()
        .map(JsonValue::Array)
}

fn condition_clause(condition: &FilterCondition) -> VdbResult<JsonValue> {
    let field = condition.field();
    let (op, operand) = match condition {
        FilterCondition::Eq { value, .. } => ("$eq", scalar(field, value)?),
        FilterCondition::Ne { value, .. } => ("$ne", scalar(field, value)?),
        FilterCondition::In { values, .. } => ("$in", scalars(field, values)?),
        FilterCondition::NotIn { values, .. } => ("$nin", scalars(field, values)?),
        FilterCondition::Gt { value, .. } => ("$gt", json!(value)),
        FilterCondition::Gte { value, .. } => ("$gte", json!(value)),
        FilterCondition::Lt { value, .. } => ("$lt", json!(value)),
        FilterCondition::Lte { value, .. } => ("$lte", json!(value)),
    };
    Ok(json!({ field: { op: operand } }))
}

/// Chroma rejects `$and`/`$or` with fewer than two operands
fn combine(op: &str, mut clauses: Vec<JsonValue>) -> Option<JsonValue> {
    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(json!({ op: clauses })),
    }
}

fn filter_clause(filter: &MetadataFilter) -> VdbResult<Option<JsonValue>> {
    let clauses = filter
        .conditions
        .iter()
        .map(condition_clause)
        .collect::<VdbResult<Vec<_>>>()?;
    let op = match filter.logical_operator {
        LogicalOp::And => "$and",
        LogicalOp::Or => "$or",
    };
    Ok(combine(op, clauses))
}

/// `where` clause for a list of AND-ed filters, `None` when unrestricted
pub fn where_clause(filters: &[MetadataFilter]) -> VdbResult<Option<JsonValue>> {
    let mut clauses = Vec::with_capacity(filters.len());
    for filter in filters {
        if let Some(clause) = filter_clause(filter)? {
            clauses.push(clause);
        }
    }
    Ok(combine("$and", clauses))
}

/// Metadata in the shape Chroma accepts
///
/// Chroma stores string, number and bool values only: nulls are dropped and
/// arrays/objects are stored as their JSON text.
pub fn sanitize_metadata(metadata: &Metadata) -> JsonValue {
    let mut out = Map::with_capacity(metadata.len());
    for (key, value) in metadata {
        match value {
            JsonValue::Null => {}
            JsonValue::Array(_) | JsonValue::Object(_) => {
                out.insert(key.clone(), JsonValue::String(value.to_string()));
            }
            scalar => {
                out.insert(key.clone(), scalar.clone());
            }
        }
    }
    JsonValue::Object(out)
}
