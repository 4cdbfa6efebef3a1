//! Key-path tokenization and canonical naming for redaction.

use serde_json::Value;

use crate::error::RedactError;

/// Structural root a sensitive-key path anchors to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Root {
    RequestHeaders,
    RequestBody,
    ResponseHeaders,
    ResponseBody,
}

impl Root {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Root::RequestHeaders => "requestHeaders",
            Root::RequestBody => "requestBody",
            Root::ResponseHeaders => "responseHeaders",
            Root::ResponseBody => "responseBody",
        }
    }
}

/// One segment of a tokenized key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PathSeg {
    /// Descend into an object by key.
    Key(String),
    /// Fan out across every index of a sequence (`[]`).
    AllIndices,
    /// Select one index of a sequence (`[<n>]`).
    Index(usize),
}

/// Tokenizes a sensitive-key path into its root and segments.
///
/// `requestBody.arrayOfObj[].field1` becomes
/// `(RequestBody, [Key("arrayOfObj"), AllIndices, Key("field1")])`.
pub(crate) fn tokenize(key_path: &str) -> Result<(Root, Vec<PathSeg>), RedactError> {
    let mut parts = key_path.split('.');
    let root = match parts.next() {
        Some("requestHeaders") => Root::RequestHeaders,
        Some("requestBody") => Root::RequestBody,
        Some("responseHeaders") => Root::ResponseHeaders,
        Some("responseBody") => Root::ResponseBody,
        _ => return Err(RedactError::InvalidRoot(key_path.to_string())),
    };

    let mut segments = Vec::new();
    for part in parts {
        push_segments(part, key_path, &mut segments)?;
    }
    Ok((root, segments))
}

/// Splits one dot-separated part into a key plus an optional array suffix.
fn push_segments(
    part: &str,
    key_path: &str,
    segments: &mut Vec<PathSeg>,
) -> Result<(), RedactError> {
    let invalid = || RedactError::InvalidIndex {
        key_path: key_path.to_string(),
        segment: part.to_string(),
    };

    let Some(bracket) = part.find('[') else {
        segments.push(PathSeg::Key(part.to_string()));
        return Ok(());
    };

    let (name, suffix) = part.split_at(bracket);
    if !name.is_empty() {
        segments.push(PathSeg::Key(name.to_string()));
    }
    match suffix.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some("") => segments.push(PathSeg::AllIndices),
        Some(digits) if digits.chars().all(|c| c.is_ascii_digit()) => {
            let index = digits.parse().map_err(|_| invalid())?;
            segments.push(PathSeg::Index(index));
        }
        _ => return Err(invalid()),
    }
    Ok(())
}

/// Canonical kind name for a captured value.
pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "invalid",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Rewrites specific indices to the wildcard form: `a[3].b` → `a[].b`.
/// Allow-list comparisons accept either spelling.
pub(crate) fn normalize_indices(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '[' {
            out.push(c);
            continue;
        }
        let mut digits = String::new();
        while let Some(&d) = chars.peek() {
            if d.is_ascii_digit() {
                digits.push(d);
                chars.next();
            } else {
                break;
            }
        }
        if !digits.is_empty() && chars.peek() == Some(&']') {
            chars.next();
            out.push_str("[]");
        } else {
            out.push('[');
            out.push_str(&digits);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tokenize_roots() {
        for (path, root) in [
            ("requestHeaders.Auth", Root::RequestHeaders),
            ("requestBody.key", Root::RequestBody),
            ("responseHeaders.Auth", Root::ResponseHeaders),
            ("responseBody.key", Root::ResponseBody),
        ] {
            assert_eq!(tokenize(path).unwrap().0, root);
        }
    }

    #[test]
    fn tokenize_invalid_root() {
        assert!(matches!(
            tokenize("body.key"),
            Err(RedactError::InvalidRoot(_))
        ));
        assert!(matches!(tokenize(""), Err(RedactError::InvalidRoot(_))));
    }

    #[test]
    fn tokenize_plain_keys() {
        let (_, segs) = tokenize("requestBody.nested.key").unwrap();
        assert_eq!(
            segs,
            vec![
                PathSeg::Key("nested".to_string()),
                PathSeg::Key("key".to_string())
            ]
        );
    }

    #[test]
    fn tokenize_array_wildcard() {
        let (_, segs) = tokenize("requestBody.arrayOfObj[].field1").unwrap();
        assert_eq!(
            segs,
            vec![
                PathSeg::Key("arrayOfObj".to_string()),
                PathSeg::AllIndices,
                PathSeg::Key("field1".to_string())
            ]
        );
    }

    #[test]
    fn tokenize_specific_index() {
        let (_, segs) = tokenize("requestBody.items[2].id").unwrap();
        assert_eq!(
            segs,
            vec![
                PathSeg::Key("items".to_string()),
                PathSeg::Index(2),
                PathSeg::Key("id".to_string())
            ]
        );
    }

    #[test]
    fn tokenize_rejects_malformed_index() {
        assert!(matches!(
            tokenize("requestBody.items[x]"),
            Err(RedactError::InvalidIndex { .. })
        ));
        assert!(matches!(
            tokenize("requestBody.items[1"),
            Err(RedactError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn tokenize_root_only() {
        let (root, segs) = tokenize("requestBody").unwrap();
        assert_eq!(root, Root::RequestBody);
        assert!(segs.is_empty());
    }

    #[test]
    fn kind_names() {
        assert_eq!(kind_name(&json!(null)), "invalid");
        assert_eq!(kind_name(&json!(true)), "boolean");
        assert_eq!(kind_name(&json!(1)), "integer");
        assert_eq!(kind_name(&json!(1.5)), "float");
        assert_eq!(kind_name(&json!("s")), "string");
        assert_eq!(kind_name(&json!([1])), "array");
        assert_eq!(kind_name(&json!({"a": 1})), "object");
    }

    #[test]
    fn normalize_indices_rewrites_digits_only() {
        assert_eq!(normalize_indices("a[0].b"), "a[].b");
        assert_eq!(normalize_indices("a[12].b[3]"), "a[].b[]");
        assert_eq!(normalize_indices("a[].b"), "a[].b");
        assert_eq!(normalize_indices("a[x].b"), "a[x].b");
        assert_eq!(normalize_indices("plain.path"), "plain.path");
    }
}
