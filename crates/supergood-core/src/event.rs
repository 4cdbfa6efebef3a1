//! Request/response event records uploaded to the collector.
//!
//! Field names and optionality mirror the collector wire protocol exactly:
//! camelCase keys, RFC 3339 timestamps, `body`/`path`/`search` omitted when
//! empty, `duration` in integer milliseconds.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::body;

/// A correlated request/response pair plus redaction metadata.
///
/// The response is absent for request-only records sent by a forced flush
/// during shutdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// The recorded outbound request.
    pub request: Request,
    /// The paired response, once observed.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub response: Option<Response>,
    /// Endpoint attribution and redaction metadata.
    pub metadata: MetaData,
}

/// The captured request half of an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Correlation id, unique per intercepted call.
    pub id: String,
    /// Header map with multi-valued headers joined by `", "`.
    pub headers: HashMap<String, String>,
    /// HTTP method.
    pub method: String,
    /// Full request URL.
    pub url: String,
    /// URL path.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub path: String,
    /// Raw query string.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub search: String,
    /// Captured body, if any. See [`crate::body::capture`] for the forms.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub body: Option<Value>,
    /// When the request was dispatched.
    pub requested_at: DateTime<Utc>,
}

/// The captured response half of an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Response header map.
    pub headers: HashMap<String, String>,
    /// Status code; `0` for a transport failure.
    pub status: u16,
    /// Status line text; `"HTTP ERROR"` for a transport failure.
    pub status_text: String,
    /// Captured body, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub body: Option<Value>,
    /// When the response (or failure) was observed.
    pub responded_at: DateTime<Utc>,
    /// Milliseconds between `requested_at` and `responded_at`, stamped when
    /// the response is recorded.
    pub duration: i64,
}

/// Endpoint attribution and redaction metadata for an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaData {
    /// Id of the matched endpoint rule; empty when unmatched.
    #[serde(default)]
    pub endpoint_id: String,
    /// One entry per redacted slot.
    #[serde(default)]
    pub sensitive_keys: Vec<RedactedKeyMeta>,
}

/// Describes one redacted slot: where it was, roughly how big it was, and
/// what kind of value lived there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactedKeyMeta {
    /// Canonical key path, e.g. `requestBody.arrayOfObj[0].field1`.
    pub key_path: String,
    /// Approximate byte length of the redacted subtree.
    pub length: usize,
    /// Canonical kind name: `string`, `integer`, `float`, `boolean`,
    /// `object`, `array` or `invalid`.
    #[serde(rename = "type")]
    pub kind: String,
}

impl Event {
    /// Creates a request-only event attributed to `endpoint_id`.
    pub fn new(request: Request, endpoint_id: impl Into<String>) -> Self {
        Self {
            request,
            response: None,
            metadata: MetaData {
                endpoint_id: endpoint_id.into(),
                sensitive_keys: Vec::new(),
            },
        }
    }

    /// Approximate in-memory byte size, the unit of the queue's size cap.
    pub fn approx_size(&self) -> usize {
        let mut size = self.request.approx_size();
        if let Some(response) = &self.response {
            size += response.approx_size();
        }
        size
    }
}

impl Request {
    /// Builds a request record stamped with the current time.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        method: impl Into<String>,
        url: impl Into<String>,
        path: impl Into<String>,
        search: impl Into<String>,
        headers: HashMap<String, String>,
        body: Option<Value>,
    ) -> Self {
        Self {
            id: id.into(),
            headers,
            method: method.into(),
            url: url.into(),
            path: path.into(),
            search: search.into(),
            body,
            requested_at: Utc::now(),
        }
    }

    fn approx_size(&self) -> usize {
        self.id.len()
            + self.method.len()
            + self.url.len()
            + self.path.len()
            + self.search.len()
            + header_map_size(&self.headers)
            + self.body.as_ref().map(body::estimated_size).unwrap_or(0)
    }
}

impl Response {
    /// Builds a response record stamped with the current time. The duration
    /// is stamped later, when the record is paired with its request.
    pub fn new(
        status: u16,
        status_text: impl Into<String>,
        headers: HashMap<String, String>,
        body: Option<Value>,
    ) -> Self {
        Self {
            headers,
            status,
            status_text: status_text.into(),
            body,
            responded_at: Utc::now(),
            duration: 0,
        }
    }

    /// Builds the record for a transport failure: status `0`, status text
    /// `"HTTP ERROR"`, the error message as the body.
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            headers: HashMap::new(),
            status: 0,
            status_text: "HTTP ERROR".to_string(),
            body: Some(Value::String(message.into())),
            responded_at: Utc::now(),
            duration: 0,
        }
    }

    fn approx_size(&self) -> usize {
        self.status_text.len()
            + header_map_size(&self.headers)
            + self.body.as_ref().map(body::estimated_size).unwrap_or(0)
    }
}

fn header_map_size(headers: &HashMap<String, String>) -> usize {
    headers.iter().map(|(k, v)| k.len() + v.len()).sum()
}
