//! Policy cache: compiled endpoint rules and proxy-enabled hosts.
//!
//! The cache holds two independent maps behind separate read/write locks so
//! proxy lookups never contend with rule lookups. Refreshes replace both
//! maps wholesale; readers hold `Arc` snapshots and never observe a torn
//! mix of old and new rules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;

use crate::config::{RemoteConfigResponse, SensitiveKey};
use crate::error::CacheError;
use crate::matcher::Location;

/// Routing decision carried by a matched endpoint rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Record the request and forward it.
    #[default]
    Accept,
    /// Forward without recording.
    Ignore,
    /// Synthesize a 429 without calling the inner transport.
    Block,
}

impl Action {
    /// Parses a wire action string; unknown or empty values are Accept.
    pub fn parse(value: &str) -> Self {
        match value {
            "Ignore" => Action::Ignore,
            "Block" => Action::Block,
            _ => Action::Accept,
        }
    }

    /// Returns the wire string for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Accept => "Accept",
            Action::Ignore => "Ignore",
            Action::Block => "Block",
        }
    }
}

/// What to do with a sensitive key during redaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyAction {
    /// Zero the slot the key path resolves to.
    #[default]
    Redact,
    /// Exempt the path in force-redact-all mode.
    Allow,
}

impl KeyAction {
    /// Parses a wire key action; anything but `ALLOW` redacts.
    pub fn parse(value: &str) -> Self {
        match value {
            "ALLOW" => KeyAction::Allow,
            _ => KeyAction::Redact,
        }
    }
}

/// A sensitive-key rule bound to an endpoint.
#[derive(Debug, Clone)]
pub struct SensitiveKeyRule {
    /// Key path rooted at `requestHeaders`, `requestBody`,
    /// `responseHeaders` or `responseBody`.
    pub key_path: String,
    /// Redact or allow.
    pub action: KeyAction,
}

/// A compiled endpoint rule.
#[derive(Debug)]
pub struct EndpointRule {
    /// Endpoint id; events matched by this rule carry it in metadata.
    pub id: String,
    /// Method filter; `None` matches any method.
    pub method: Option<String>,
    /// Compiled matching regex.
    pub regex: Regex,
    /// Where the test string is extracted from.
    pub location: Location,
    /// Routing decision on match.
    pub action: Action,
    /// Sensitive keys, server-provided plus user-configured.
    pub sensitive_keys: Vec<SensitiveKeyRule>,
}

/// Endpoint rules for one domain, keyed by endpoint id.
pub type RuleMap = HashMap<String, Arc<EndpointRule>>;

/// Static per-domain redaction lists supplied by the host application,
/// merged into every snapshot the cache builds.
#[derive(Debug, Clone, Default)]
pub struct RedactionOptions {
    /// Domain → request header names to redact.
    pub request_header_keys: HashMap<String, Vec<String>>,
    /// Domain → request body paths to redact.
    pub request_body_keys: HashMap<String, Vec<String>>,
    /// Domain → response body paths to redact.
    pub response_body_keys: HashMap<String, Vec<String>>,
}

/// Thread-safe snapshot of endpoint rules and proxy-enabled hosts.
pub struct PolicyCache {
    rules: RwLock<HashMap<String, Arc<RuleMap>>>,
    proxy_hosts: RwLock<HashMap<String, bool>>,
    initialized: AtomicBool,
    force_redact_all: bool,
    redaction_options: RedactionOptions,
}

impl PolicyCache {
    /// Creates an empty, uninitialized cache. Until the first successful
    /// [`replace`](Self::replace) all interception is gated off.
    pub fn new(force_redact_all: bool, redaction_options: RedactionOptions) -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            proxy_hosts: RwLock::new(HashMap::new()),
            initialized: AtomicBool::new(false),
            force_redact_all,
            redaction_options,
        }
    }

    /// Returns the rule snapshot for a domain. The snapshot is safe to
    /// iterate without holding any lock; missing domains yield an empty
    /// map.
    pub fn get(&self, domain: &str) -> Arc<RuleMap> {
        self.rules
            .read()
            .get(domain)
            .cloned()
            .unwrap_or_else(|| Arc::new(RuleMap::new()))
    }

    /// Returns whether proxy rewriting is enabled for a host.
    pub fn proxy_enabled(&self, host: &str) -> bool {
        self.proxy_hosts.read().get(host).copied().unwrap_or(false)
    }

    /// Returns whether at least one config fetch has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Returns whether force-redact-all mode is enabled.
    pub fn is_force_redact_all(&self) -> bool {
        self.force_redact_all
    }

    /// Atomically installs a new snapshot built from a config response.
    ///
    /// Every regex is compiled before anything becomes visible; a compile
    /// failure aborts the replace and leaves the prior snapshot in effect.
    /// Endpoints with an empty regex or location are skipped. Last write
    /// wins across concurrent calls.
    pub fn replace(&self, response: &RemoteConfigResponse) -> Result<(), CacheError> {
        let mut rules: HashMap<String, Arc<RuleMap>> = HashMap::new();
        for config in &response.endpoint_config {
            let mut rule_map = RuleMap::new();
            for endpoint in &config.endpoints {
                let matching = &endpoint.matching_regex;
                if matching.regex.is_empty() || matching.location.is_empty() {
                    continue;
                }
                let regex =
                    Regex::new(&matching.regex).map_err(|source| CacheError::InvalidRegex {
                        endpoint_id: endpoint.id.clone(),
                        pattern: matching.regex.clone(),
                        source,
                    })?;
                let configuration = &endpoint.endpoint_configuration;
                let rule = EndpointRule {
                    id: endpoint.id.clone(),
                    method: (!endpoint.method.is_empty()).then(|| endpoint.method.clone()),
                    regex,
                    location: Location::parse(&matching.location),
                    action: Action::parse(&configuration.action),
                    sensitive_keys: self
                        .merge_sensitive_keys(&config.domain, &configuration.sensitive_keys),
                };
                rule_map.insert(endpoint.id.clone(), Arc::new(rule));
            }
            rules.insert(config.domain.clone(), Arc::new(rule_map));
        }

        let proxy_hosts: HashMap<String, bool> = response
            .proxy_config
            .vendor_credential_config
            .iter()
            .map(|(host, flag)| (host.clone(), flag.enabled))
            .collect();

        tracing::debug!(
            domains = rules.len(),
            proxy_hosts = proxy_hosts.len(),
            "policy snapshot installed"
        );
        *self.rules.write() = rules;
        *self.proxy_hosts.write() = proxy_hosts;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    /// Appends the user-configured redaction lists for `domain` to the
    /// server-provided sensitive keys, prefixed with their structural root.
    fn merge_sensitive_keys(
        &self,
        domain: &str,
        server_keys: &[SensitiveKey],
    ) -> Vec<SensitiveKeyRule> {
        let mut merged: Vec<SensitiveKeyRule> = server_keys
            .iter()
            .map(|key| SensitiveKeyRule {
                key_path: key.key_path.clone(),
                action: KeyAction::parse(&key.action),
            })
            .collect();

        let domain = domain.to_ascii_lowercase();
        let options = &self.redaction_options;
        let static_lists = [
            ("requestHeaders", options.request_header_keys.get(&domain)),
            ("requestBody", options.request_body_keys.get(&domain)),
            ("responseBody", options.response_body_keys.get(&domain)),
        ];
        for (root, keys) in static_lists {
            for key in keys.into_iter().flatten() {
                merged.push(SensitiveKeyRule {
                    key_path: format!("{root}.{key}"),
                    action: KeyAction::Redact,
                });
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Endpoint, EndpointConfig, EndpointConfiguration, MatchingRegex, ProxyEnabled,
    };

    fn endpoint(id: &str, location: &str, regex: &str, action: &str) -> Endpoint {
        Endpoint {
            id: id.to_string(),
            matching_regex: MatchingRegex {
                location: location.to_string(),
                regex: regex.to_string(),
            },
            endpoint_configuration: EndpointConfiguration {
                action: action.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn config_for(domain: &str, endpoints: Vec<Endpoint>) -> RemoteConfigResponse {
        RemoteConfigResponse {
            endpoint_config: vec![EndpointConfig {
                domain: domain.to_string(),
                endpoints,
            }],
            ..Default::default()
        }
    }

    // ==================== Action Tests ====================

    #[test]
    fn action_parse() {
        assert_eq!(Action::parse("Accept"), Action::Accept);
        assert_eq!(Action::parse("Ignore"), Action::Ignore);
        assert_eq!(Action::parse("Block"), Action::Block);
        assert_eq!(Action::parse(""), Action::Accept);
        assert_eq!(Action::parse("bogus"), Action::Accept);
    }

    #[test]
    fn key_action_parse() {
        assert_eq!(KeyAction::parse("ALLOW"), KeyAction::Allow);
        assert_eq!(KeyAction::parse("REDACT"), KeyAction::Redact);
        assert_eq!(KeyAction::parse(""), KeyAction::Redact);
    }

    // ==================== PolicyCache Tests ====================

    #[test]
    fn starts_uninitialized_and_empty() {
        let cache = PolicyCache::new(false, RedactionOptions::default());
        assert!(!cache.is_initialized());
        assert!(cache.get("example.com").is_empty());
        assert!(!cache.proxy_enabled("example.com"));
    }

    #[test]
    fn replace_installs_rules_and_sets_initialized() {
        let cache = PolicyCache::new(false, RedactionOptions::default());
        let response = config_for(
            "example.com",
            vec![endpoint("ep-1", "path", "/users", "Ignore")],
        );
        cache.replace(&response).unwrap();

        assert!(cache.is_initialized());
        let rules = cache.get("example.com");
        let rule = rules.get("ep-1").unwrap();
        assert_eq!(rule.action, Action::Ignore);
        assert!(rule.regex.is_match("/users/42"));
    }

    #[test]
    fn replace_skips_endpoints_without_regex_or_location() {
        let cache = PolicyCache::new(false, RedactionOptions::default());
        let response = config_for(
            "example.com",
            vec![
                endpoint("no-regex", "path", "", "Ignore"),
                endpoint("no-location", "", "/x", "Ignore"),
                endpoint("kept", "path", "/x", "Ignore"),
            ],
        );
        cache.replace(&response).unwrap();

        let rules = cache.get("example.com");
        assert_eq!(rules.len(), 1);
        assert!(rules.contains_key("kept"));
    }

    #[test]
    fn invalid_regex_aborts_replace_and_keeps_prior_snapshot() {
        let cache = PolicyCache::new(false, RedactionOptions::default());
        cache
            .replace(&config_for(
                "example.com",
                vec![endpoint("ep-1", "path", "/users", "Accept")],
            ))
            .unwrap();

        let bad = config_for("other.example", vec![endpoint("ep-2", "path", "(", "Accept")]);
        let err = cache.replace(&bad).unwrap_err();
        assert!(matches!(err, CacheError::InvalidRegex { .. }));

        // Prior snapshot survives in full.
        assert!(cache.get("example.com").contains_key("ep-1"));
        assert!(cache.get("other.example").is_empty());
    }

    #[test]
    fn replace_is_wholesale() {
        let cache = PolicyCache::new(false, RedactionOptions::default());
        cache
            .replace(&config_for(
                "old.example",
                vec![endpoint("ep-1", "path", "/a", "Accept")],
            ))
            .unwrap();
        cache
            .replace(&config_for(
                "new.example",
                vec![endpoint("ep-2", "path", "/b", "Accept")],
            ))
            .unwrap();

        assert!(cache.get("old.example").is_empty());
        assert!(cache.get("new.example").contains_key("ep-2"));
    }

    #[test]
    fn proxy_hosts_replace() {
        let cache = PolicyCache::new(false, RedactionOptions::default());
        let mut response = RemoteConfigResponse::default();
        response
            .proxy_config
            .vendor_credential_config
            .insert("api.openai.com".to_string(), ProxyEnabled { enabled: true });
        response
            .proxy_config
            .vendor_credential_config
            .insert("api.off.com".to_string(), ProxyEnabled { enabled: false });
        cache.replace(&response).unwrap();

        assert!(cache.proxy_enabled("api.openai.com"));
        assert!(!cache.proxy_enabled("api.off.com"));
        assert!(!cache.proxy_enabled("unknown.example"));

        cache.replace(&RemoteConfigResponse::default()).unwrap();
        assert!(!cache.proxy_enabled("api.openai.com"));
    }

    #[test]
    fn snapshot_survives_replace() {
        let cache = PolicyCache::new(false, RedactionOptions::default());
        cache
            .replace(&config_for(
                "example.com",
                vec![endpoint("ep-1", "path", "/a", "Accept")],
            ))
            .unwrap();

        let snapshot = cache.get("example.com");
        cache.replace(&RemoteConfigResponse::default()).unwrap();

        // The held snapshot still iterates consistently.
        assert!(snapshot.contains_key("ep-1"));
        assert!(cache.get("example.com").is_empty());
    }

    #[test]
    fn merges_user_redaction_options() {
        let mut options = RedactionOptions::default();
        options
            .request_header_keys
            .insert("example.com".to_string(), vec!["client-secret".to_string()]);
        options
            .request_body_keys
            .insert("example.com".to_string(), vec!["nested.token".to_string()]);
        options
            .response_body_keys
            .insert("example.com".to_string(), vec!["ssn".to_string()]);

        let cache = PolicyCache::new(false, options);
        let mut ep = endpoint("ep-1", "path", "/a", "Accept");
        ep.endpoint_configuration.sensitive_keys = vec![SensitiveKey {
            key_path: "requestBody.server".to_string(),
            action: "REDACT".to_string(),
            ..Default::default()
        }];
        cache.replace(&config_for("example.com", vec![ep])).unwrap();

        let rules = cache.get("example.com");
        let keys: Vec<&str> = rules.get("ep-1").unwrap()
            .sensitive_keys
            .iter()
            .map(|k| k.key_path.as_str())
            .collect();
        assert_eq!(
            keys,
            vec![
                "requestBody.server",
                "requestHeaders.client-secret",
                "requestBody.nested.token",
                "responseBody.ssn",
            ]
        );
        assert!(rules.get("ep-1").unwrap()
            .sensitive_keys
            .iter()
            .all(|k| k.action == KeyAction::Redact));
    }
}
