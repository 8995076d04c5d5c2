//! Identifier extraction from raw events.

use crate::types::{Event, Identifier};
use serde_json::Value;

/// Marker used by LLRP readers (`EPC-96`, `EPCData`, ...).
pub const DEFAULT_MARKER: &str = "EPC";

/// Pull the identifier out of an event.
///
/// The first field whose name contains `marker` wins, in payload order. If
/// no field matches, or the matching field's value cannot be rendered as a
/// token, the result is [`Identifier::unknown`].
pub fn extract_identifier(event: &Event, marker: &str) -> Identifier {
    event
        .fields()
        .find(|(name, _)| name.contains(marker))
        .and_then(|(_, value)| identifier_text(value))
        .map(Identifier::new)
        .unwrap_or_else(Identifier::unknown)
}

fn identifier_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // raw EPC bytes
        Value::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .filter(|byte| *byte <= 0xFF)
                    .map(|byte| format!("{:02x}", byte))
            })
            .collect(),
        _ => None,
    }
}
