//! Wire types for the collector's `GET /v2/config` response.
//!
//! Every field tolerates absence; the collector omits whole sections when
//! they are empty.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level config payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfigResponse {
    /// Per-domain endpoint rules.
    #[serde(default)]
    pub endpoint_config: Vec<EndpointConfig>,
    /// Proxy-enabled vendor hosts.
    #[serde(default)]
    pub proxy_config: ProxyConfig,
}

/// Endpoint rules scoped to one registrable domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Registrable domain the endpoints belong to.
    #[serde(default)]
    pub domain: String,
    /// The domain's endpoint rules.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// One endpoint rule as served by the collector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// HTTP method filter; empty means any method.
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub matching_regex: MatchingRegex,
    #[serde(default)]
    pub endpoint_configuration: EndpointConfiguration,
}

/// Where to extract the test string from and the pattern to match it with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingRegex {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub regex: String,
}

/// Routing decision and sensitive keys for a matched endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfiguration {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub acknowledged: bool,
    /// `Accept`, `Ignore` or `Block`; anything else is treated as Accept.
    #[serde(default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sensitive_keys: Vec<SensitiveKey>,
}

/// One sensitive-key entry: a key path plus `REDACT` or `ALLOW`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitiveKey {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub key_path: String,
    #[serde(default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Vendor credential proxy configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /// Host → proxy-enabled flag.
    #[serde(default)]
    pub vendor_credential_config: HashMap<String, ProxyEnabled>,
}

/// Whether proxy rewriting is enabled for one vendor host.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProxyEnabled {
    #[serde(default)]
    pub enabled: bool,
}
