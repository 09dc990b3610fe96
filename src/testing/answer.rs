//! Answer extraction from loosely shaped chat responses

use serde_json::Value;

/// Fields probed for the answer text, in priority order
pub const ANSWER_FIELDS: &[&str] = &["answer", "response", "message"];

/// Pull the free-text answer out of a chat response
///
/// The first field of [`ANSWER_FIELDS`] that is present and not `null` wins.
/// Strings are returned verbatim, other values as compact JSON. When no
/// field matches (or the response is not an object) the whole response is
/// serialized.
pub fn extract_answer(response: &Value) -> String {
    ANSWER_FIELDS
        .iter()
        .find_map(|field| response.get(*field).filter(|v| !v.is_null()))
        .map(text_of)
        .unwrap_or_else(|| text_of(response))
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
