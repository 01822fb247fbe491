//! Positional parameter lists used to declare protocol entities.
//!
//! Collector modules describe charts as loosely typed lists
//! (`["id", "name", "absolute", 1, 1000]`). These helpers validate the
//! container and read individual slots with the fallback rules the protocol
//! entities apply.

use serde_json::Value;

use crate::protocol::ChartError;

/// Borrow `params` as a list of at least `required` entries.
pub(crate) fn as_list<'a>(
    params: &'a Value,
    kind: &'static str,
    required: usize,
) -> Result<&'a [Value], ChartError> {
    let list = params.as_array().ok_or(ChartError::ItemType {
        kind,
        found: type_name(params),
    })?;
    if list.len() < required {
        return Err(ChartError::ItemValue {
            kind,
            reason: format!("expected at least {required} fields, got {}", list.len()),
        });
    }
    Ok(list)
}

/// Read the non-empty identifier in slot `idx`.
pub(crate) fn id(list: &[Value], idx: usize, kind: &'static str) -> Result<String, ChartError> {
    let id = text(list, idx);
    if id.is_empty() {
        return Err(ChartError::ItemValue {
            kind,
            reason: format!("field {idx} (id) is empty"),
        });
    }
    Ok(id)
}

/// Read slot `idx` as text. Missing, null and `false` slots read as empty.
pub(crate) fn text(list: &[Value], idx: usize) -> String {
    match list.get(idx) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Read slot `idx` only if it holds a JSON integer.
pub(crate) fn int(list: &[Value], idx: usize) -> Option<i64> {
    list.get(idx).and_then(Value::as_i64)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
