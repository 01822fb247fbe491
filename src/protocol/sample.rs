//! Per-cycle sample mappings.

use std::collections::HashMap;

use serde_json::Value;

/// One cycle of collected values keyed by dimension or variable id.
pub type Samples = HashMap<String, Value>;

/// Resolve the value stored under `id`.
///
/// Integers are taken as-is and strings are parsed as integers. Any other
/// type, an unparsable string, a missing key or a missing mapping yields
/// `None`, which omits the entity from the cycle.
pub fn resolve(data: Option<&Samples>, id: &str) -> Option<i64> {
    match data?.get(id)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
