//! Error types for the core crate.

use thiserror::Error;

/// Errors raised while building a policy snapshot from a config response.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A rule's matching regex failed to compile. The previous snapshot
    /// stays in effect.
    #[error("invalid matching regex {pattern:?} for endpoint {endpoint_id}: {source}")]
    InvalidRegex {
        /// Endpoint the regex belongs to.
        endpoint_id: String,
        /// The pattern that failed to compile.
        pattern: String,
        /// The underlying compile error.
        #[source]
        source: regex::Error,
    },
}

/// Errors raised while classifying a request against endpoint rules.
///
/// A match error only disqualifies the rule that produced it; classification
/// falls through to the next rule.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The rule names a location this SDK does not know how to extract.
    #[error("unexpected location parameter for regex matching: {0}")]
    UnknownLocation(String),

    /// A nested body path was requested but the body is not valid JSON.
    #[error("request body is not valid JSON at location: {0}")]
    MalformedBody(String),

    /// The body path does not resolve to a value.
    #[error("field not found: {0}")]
    FieldNotFound(String),

    /// The header map could not be serialized for whole-map matching.
    #[error("failed to serialize headers: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised during redaction, one per failed sensitive key.
///
/// The event is still uploaded with whatever redactions succeeded.
#[derive(Debug, Error)]
pub enum RedactError {
    /// The key path's leading segment is not a known structural root.
    #[error("invalid sensitive key value provided: {0}")]
    InvalidRoot(String),

    /// An array segment is neither `[]` nor `[<n>]`.
    #[error("invalid index value provided at {segment:?} in {key_path}")]
    InvalidIndex {
        /// The full key path being applied.
        key_path: String,
        /// The offending path segment.
        segment: String,
    },

    /// The path does not resolve within the event.
    #[error("unable to find key at sensitive key {key_path} for url {url}")]
    KeyNotFound {
        /// The full key path being applied.
        key_path: String,
        /// URL of the event, for operator context.
        url: String,
    },

    /// The path descends through a value that cannot be traversed.
    #[error("unsupported value at sensitive key {key_path} for url {url}")]
    Unsupported {
        /// The full key path being applied.
        key_path: String,
        /// URL of the event, for operator context.
        url: String,
    },
}
