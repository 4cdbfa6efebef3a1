//! Path-directed redaction: zero the slot a sensitive-key path resolves to.

use std::collections::HashMap;

use serde_json::Value;

use crate::body::estimated_size;
use crate::error::RedactError;
use crate::event::{Event, RedactedKeyMeta};
use crate::redact::format::{kind_name, tokenize, PathSeg, Root};

/// Applies one sensitive-key path to an event.
///
/// Metadata for every slot redacted before a traversal failure is still
/// appended to the event; the failure is returned for reporting.
pub(crate) fn apply(event: &mut Event, key_path: &str) -> Result<(), RedactError> {
    let (root, segments) = tokenize(key_path)?;
    let url = event.request.url.clone();
    let mut collected = Vec::new();

    let result = match root {
        Root::RequestHeaders => redact_headers(
            &mut event.request.headers,
            root,
            &segments,
            key_path,
            &url,
            &mut collected,
        ),
        Root::ResponseHeaders => match event.response.as_mut() {
            Some(response) => redact_headers(
                &mut response.headers,
                root,
                &segments,
                key_path,
                &url,
                &mut collected,
            ),
            None => Err(missing(key_path, &url)),
        },
        Root::RequestBody => redact_body(
            &mut event.request.body,
            root,
            &segments,
            key_path,
            &url,
            &mut collected,
        ),
        Root::ResponseBody => match event.response.as_mut() {
            Some(response) => redact_body(
                &mut response.body,
                root,
                &segments,
                key_path,
                &url,
                &mut collected,
            ),
            None => Err(missing(key_path, &url)),
        },
    };

    event.metadata.sensitive_keys.append(&mut collected);
    result
}

fn missing(key_path: &str, url: &str) -> RedactError {
    RedactError::KeyNotFound {
        key_path: key_path.to_string(),
        url: url.to_string(),
    }
}

/// Header maps are flat string maps: a path is either the bare root (zero
/// the whole map) or one header name (zero its value).
fn redact_headers(
    headers: &mut HashMap<String, String>,
    root: Root,
    segments: &[PathSeg],
    key_path: &str,
    url: &str,
    out: &mut Vec<RedactedKeyMeta>,
) -> Result<(), RedactError> {
    match segments {
        [] => {
            let length = headers.iter().map(|(k, v)| k.len() + v.len()).sum();
            out.push(RedactedKeyMeta {
                key_path: root.as_str().to_string(),
                length,
                kind: "object".to_string(),
            });
            headers.clear();
            Ok(())
        }
        [PathSeg::Key(name)] => {
            // Header names are matched case-insensitively.
            let Some(value) = headers
                .iter_mut()
                .find_map(|(key, value)| key.eq_ignore_ascii_case(name).then_some(value))
            else {
                return Err(missing(key_path, url));
            };
            out.push(RedactedKeyMeta {
                key_path: format!("{}.{}", root.as_str(), name),
                length: value.len(),
                kind: "string".to_string(),
            });
            value.clear();
            Ok(())
        }
        _ => Err(RedactError::Unsupported {
            key_path: key_path.to_string(),
            url: url.to_string(),
        }),
    }
}

fn redact_body(
    body: &mut Option<Value>,
    root: Root,
    segments: &[PathSeg],
    key_path: &str,
    url: &str,
    out: &mut Vec<RedactedKeyMeta>,
) -> Result<(), RedactError> {
    let Some(value) = body.as_mut() else {
        return Err(missing(key_path, url));
    };

    if segments.is_empty() {
        out.push(RedactedKeyMeta {
            key_path: root.as_str().to_string(),
            length: estimated_size(value),
            kind: kind_name(value).to_string(),
        });
        *body = None;
        return Ok(());
    }

    redact_value(value, segments, root.as_str(), key_path, url, out)
}

/// Walks the captured value along the remaining segments, zeroing the slot
/// the path resolves to. Wildcard segments fan out across every index,
/// emitting one metadata entry per redacted slot with the index spelled
/// out.
fn redact_value(
    value: &mut Value,
    segments: &[PathSeg],
    built: &str,
    key_path: &str,
    url: &str,
    out: &mut Vec<RedactedKeyMeta>,
) -> Result<(), RedactError> {
    let Some((first, rest)) = segments.split_first() else {
        out.push(RedactedKeyMeta {
            key_path: built.to_string(),
            length: estimated_size(value),
            kind: kind_name(value).to_string(),
        });
        *value = Value::Null;
        return Ok(());
    };

    match first {
        PathSeg::Key(name) => {
            let Value::Object(map) = value else {
                return Err(RedactError::Unsupported {
                    key_path: key_path.to_string(),
                    url: url.to_string(),
                });
            };
            let Some(child) = map.get_mut(name) else {
                return Err(missing(key_path, url));
            };
            redact_value(child, rest, &format!("{built}.{name}"), key_path, url, out)
        }
        PathSeg::AllIndices => {
            let Value::Array(items) = value else {
                return Err(RedactError::Unsupported {
                    key_path: key_path.to_string(),
                    url: url.to_string(),
                });
            };
            for (index, item) in items.iter_mut().enumerate() {
                redact_value(item, rest, &format!("{built}[{index}]"), key_path, url, out)?;
            }
            Ok(())
        }
        PathSeg::Index(index) => {
            let Value::Array(items) = value else {
                return Err(RedactError::Unsupported {
                    key_path: key_path.to_string(),
                    url: url.to_string(),
                });
            };
            let Some(item) = items.get_mut(*index) else {
                return Err(missing(key_path, url));
            };
            redact_value(item, rest, &format!("{built}[{index}]"), key_path, url, out)
        }
    }
}
