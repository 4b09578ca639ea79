//! Completion interpretation for structured endpoints.

use gw_domain::trace::TraceEvent;
use serde_json::{Map, Value};

/// Parse structured completion content.
///
/// Empty content reads as `{}`. Content that is not JSON takes the
/// fallback branch: a warning, a `StructuredFallback` trace event and `{}`.
/// No fields are required.
pub fn interpret_structured(endpoint: &str, content: &str) -> Value {
    if content.trim().is_empty() {
        return Value::Object(Map::new());
    }
    match serde_json::from_str(content) {
        Ok(value) => value,
        Err(e) => structured_fallback(endpoint, content, &e),
    }
}

fn structured_fallback(endpoint: &str, content: &str, cause: &serde_json::Error) -> Value {
    tracing::warn!(
        endpoint,
        content_chars = content.len(),
        error = %cause,
        "completion was not valid JSON, using empty object"
    );
    TraceEvent::StructuredFallback {
        endpoint: endpoint.to_owned(),
        content_chars: content.len(),
        reason: cause.to_string(),
    }
    .emit();
    Value::Object(Map::new())
}

/// The columns a summary completion writes back to its conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryFields {
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl SummaryFields {
    /// `summary` keeps strings as-is and stringifies other non-null values.
    /// `tags` keeps the string elements of an array.
    pub fn from_value(value: &Value) -> Self {
        let summary = match value.get("summary") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        let tags = value.get("tags").and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        });
        Self { summary, tags }
    }
}
