//! Force-redact-all: zero every leaf except explicitly allowed paths.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::body::estimated_size;
use crate::cache::{KeyAction, SensitiveKeyRule};
use crate::event::{Event, RedactedKeyMeta};
use crate::redact::format::{kind_name, normalize_indices, Root};

/// Redacts every leaf of the event's four roots, honoring the matched
/// rule's ALLOW-listed key paths.
pub(crate) fn apply(event: &mut Event, sensitive_keys: &[SensitiveKeyRule]) {
    let allowed: HashSet<&str> = sensitive_keys
        .iter()
        .filter(|key| key.action == KeyAction::Allow)
        .map(|key| key.key_path.as_str())
        .collect();

    let mut collected = Vec::new();
    redact_header_map(
        &mut event.request.headers,
        Root::RequestHeaders,
        &allowed,
        &mut collected,
    );
    redact_root_body(
        &mut event.request.body,
        Root::RequestBody,
        &allowed,
        &mut collected,
    );
    if let Some(response) = event.response.as_mut() {
        redact_header_map(
            &mut response.headers,
            Root::ResponseHeaders,
            &allowed,
            &mut collected,
        );
        redact_root_body(
            &mut response.body,
            Root::ResponseBody,
            &allowed,
            &mut collected,
        );
    }
    event.metadata.sensitive_keys.extend(collected);
}

fn is_allowed(path: &str, allowed: &HashSet<&str>) -> bool {
    allowed.contains(path) || allowed.contains(normalize_indices(path).as_str())
}

fn meta_for(path: &str, value: &Value) -> RedactedKeyMeta {
    RedactedKeyMeta {
        key_path: path.to_string(),
        length: estimated_size(value),
        kind: kind_name(value).to_string(),
    }
}

fn redact_header_map(
    headers: &mut HashMap<String, String>,
    root: Root,
    allowed: &HashSet<&str>,
    out: &mut Vec<RedactedKeyMeta>,
) {
    for (name, value) in headers.iter_mut() {
        let path = format!("{}.{}", root.as_str(), name);
        if is_allowed(&path, allowed) {
            continue;
        }
        out.push(RedactedKeyMeta {
            key_path: path,
            length: value.len(),
            kind: "string".to_string(),
        });
        value.clear();
    }
}

fn redact_root_body(
    body: &mut Option<Value>,
    root: Root,
    allowed: &HashSet<&str>,
    out: &mut Vec<RedactedKeyMeta>,
) {
    let Some(value) = body.as_mut() else {
        return;
    };
    let path = root.as_str();
    match value {
        // A body that captured as a bare string is zeroed wholesale.
        Value::String(s) => {
            out.push(RedactedKeyMeta {
                key_path: path.to_string(),
                length: s.len(),
                kind: "string".to_string(),
            });
            s.clear();
        }
        Value::Null => {}
        _ if traversable(value) => redact_value(value, path, allowed, out),
        // Scalar-element sequences (and stray scalars) zero in one piece.
        _ => {
            if !is_allowed(path, allowed) {
                out.push(meta_for(path, value));
                *value = Value::Null;
            }
        }
    }
}

/// Whether a value is walked into rather than zeroed in one piece.
/// Sequences are traversable only when their elements are composite;
/// scalar elements of a sequence cannot carry an allow decision each, so
/// the sequence is treated as a single leaf.
fn traversable(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => {
            matches!(items.first(), Some(Value::Object(_) | Value::Array(_)))
        }
        _ => false,
    }
}

fn redact_value(
    value: &mut Value,
    path: &str,
    allowed: &HashSet<&str>,
    out: &mut Vec<RedactedKeyMeta>,
) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                let child_path = format!("{path}.{key}");
                redact_slot(child, &child_path, allowed, out);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter_mut().enumerate() {
                let child_path = format!("{path}[{index}]");
                redact_slot(item, &child_path, allowed, out);
            }
        }
        _ => {}
    }
}

/// Zeroes one slot, or recurses when the slot holds a composite value.
fn redact_slot(
    value: &mut Value,
    path: &str,
    allowed: &HashSet<&str>,
    out: &mut Vec<RedactedKeyMeta>,
) {
    if traversable(value) {
        redact_value(value, path, allowed, out);
        return;
    }
    // Nil sub-structures contribute no metadata and no error.
    if value.is_null() {
        return;
    }
    if is_allowed(path, allowed) {
        return;
    }
    out.push(meta_for(path, value));
    *value = Value::Null;
}
