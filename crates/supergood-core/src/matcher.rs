//! Request classification against cached endpoint rules.
//!
//! A rule matches when its regex matches a test string extracted from the
//! request at the rule's location. The first matching rule wins; rules that
//! fail extraction are skipped and their errors accumulated.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::cache::{EndpointRule, PolicyCache};
use crate::domain;
use crate::error::MatchError;

/// A named extraction location parsed from a rule's `matchingRegex.location`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// The full request URL.
    Url,
    /// The registrable domain of the request host.
    Domain,
    /// The subdomain of the request host.
    Subdomain,
    /// The URL path.
    Path,
    /// The whole header map (`None`) or one header's value (`Some(name)`).
    RequestHeaders(Option<String>),
    /// The raw body (empty path) or the value at a JSON path within it.
    RequestBody(Vec<String>),
    /// A location token this SDK does not understand; surfaces a
    /// [`MatchError::UnknownLocation`] at match time.
    Unknown(String),
}

impl Location {
    /// Parses a location token. Unknown tokens are preserved so the error
    /// can be surfaced per classification attempt rather than rejecting the
    /// whole config snapshot.
    pub fn parse(location: &str) -> Self {
        match location {
            "url" => return Location::Url,
            "domain" => return Location::Domain,
            "subdomain" => return Location::Subdomain,
            "path" => return Location::Path,
            "requestHeaders" => return Location::RequestHeaders(None),
            "requestBody" => return Location::RequestBody(Vec::new()),
            _ => {}
        }

        if let Some(rest) = location.strip_prefix("requestHeaders.") {
            // A header location names exactly one header.
            if !rest.is_empty() && !rest.contains('.') {
                return Location::RequestHeaders(Some(rest.to_string()));
            }
        }
        if let Some(rest) = location.strip_prefix("requestBody.") {
            if !rest.is_empty() {
                return Location::RequestBody(rest.split('.').map(str::to_string).collect());
            }
        }
        Location::Unknown(location.to_string())
    }
}

/// The parts of an outbound request the classifier inspects. The body is
/// the fully buffered payload; probing it has no effect on what the inner
/// transport later sends.
#[derive(Debug)]
pub struct RequestProbe<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// Full URL string.
    pub url: &'a str,
    /// Request host (no port).
    pub host: &'a str,
    /// URL path.
    pub path: &'a str,
    /// Header map with multi-valued headers joined by `", "`.
    pub headers: &'a HashMap<String, String>,
    /// Buffered request body bytes.
    pub body: &'a [u8],
}

impl PolicyCache {
    /// Matches a request against the rules bound to its registrable domain.
    ///
    /// Returns the first matching rule and any extraction errors collected
    /// from rules that were skipped along the way.
    pub fn match_request(
        &self,
        probe: &RequestProbe<'_>,
    ) -> (Option<Arc<EndpointRule>>, Vec<MatchError>) {
        let mut errors = Vec::new();
        let domain = domain::registrable_domain(probe.host);
        if domain.is_empty() {
            return (None, errors);
        }
        let rules = self.get(&domain);
        for rule in rules.values() {
            if let Some(method) = &rule.method {
                if !method.eq_ignore_ascii_case(probe.method) {
                    continue;
                }
            }
            match extract(probe, &rule.location) {
                Ok(test_value) => {
                    if rule.regex.is_match(&test_value) {
                        return (Some(Arc::clone(rule)), errors);
                    }
                }
                Err(err) => errors.push(err),
            }
        }
        (None, errors)
    }
}

/// Extracts the test string for a location from the request.
fn extract(probe: &RequestProbe<'_>, location: &Location) -> Result<String, MatchError> {
    match location {
        Location::Url => Ok(probe.url.to_string()),
        Location::Domain => Ok(domain::registrable_domain(probe.host)),
        Location::Subdomain => Ok(domain::subdomain(probe.host)),
        Location::Path => Ok(probe.path.to_string()),
        Location::RequestHeaders(None) => stringify_headers(probe.headers),
        Location::RequestHeaders(Some(name)) => Ok(header_value(probe.headers, name)),
        Location::RequestBody(path) => body_value_at(probe.body, path),
        Location::Unknown(raw) => Err(MatchError::UnknownLocation(raw.clone())),
    }
}

/// Serializes the header map deterministically (sorted keys).
fn stringify_headers(headers: &HashMap<String, String>) -> Result<String, MatchError> {
    let ordered: BTreeMap<&String, &String> = headers.iter().collect();
    Ok(serde_json::to_string(&ordered)?)
}

/// Single header lookup, case-insensitive; empty when absent.
fn header_value(headers: &HashMap<String, String>, name: &str) -> String {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.clone())
        .unwrap_or_default()
}

/// Resolves a dot-path inside the body. An empty path yields the raw body
/// text. Descent stops at the first non-object value, which is stringified
/// even if path segments remain; a path ending on an object is a miss.
fn body_value_at(body: &[u8], path: &[String]) -> Result<String, MatchError> {
    if path.is_empty() {
        return Ok(String::from_utf8_lossy(body).into_owned());
    }

    let location = || format!("requestBody.{}", path.join("."));
    let parsed: Value =
        serde_json::from_slice(body).map_err(|_| MatchError::MalformedBody(location()))?;

    let mut current = &parsed;
    for segment in path {
        let Value::Object(map) = current else {
            return Ok(stringify_value(current));
        };
        current = map
            .get(segment)
            .ok_or_else(|| MatchError::FieldNotFound(location()))?;
    }
    if current.is_object() {
        return Err(MatchError::FieldNotFound(location()));
    }
    Ok(stringify_value(current))
}

fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
