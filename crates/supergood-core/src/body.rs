//! Body capture over fully buffered payloads.
//!
//! Bodies are buffered in memory before capture; streaming bodies are not
//! supported. The captured value is a tagged [`serde_json::Value`] so the
//! redaction engine can walk it without runtime type introspection.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;

/// Parses buffered body bytes into their captured form.
///
/// - empty input captures nothing;
/// - bytes that are not valid UTF-8 capture as a base64 string, the opaque
///   binary sentinel;
/// - a JSON object or array captures as the decoded value;
/// - everything else, bare JSON scalars included, captures as the raw
///   string.
pub fn capture(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }

    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => return Some(Value::String(BASE64.encode(bytes))),
    };

    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => Some(Value::String(text.to_owned())),
    }
}

/// Structural byte estimate of a captured value.
///
/// Strings count their length, numbers count 8, booleans 1, nulls 0;
/// containers sum their contents (object keys included). This is the
/// `length` reported in redaction metadata and the unit of the queue's
/// size cap.
pub fn estimated_size(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 8,
        Value::String(s) => s.len(),
        Value::Array(items) => items.iter().map(estimated_size).sum(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| k.len() + estimated_size(v))
            .sum(),
    }
}
