//! SDK configuration.
//!
//! Credentials and collector URLs fall back to environment variables so a
//! host application can enable the SDK without code changes:
//! `SUPERGOOD_CLIENT_ID`, `SUPERGOOD_CLIENT_SECRET`, `SUPERGOOD_BASE_URL`,
//! `SUPERGOOD_TELEMETRY_URL`, `SUPERGOOD_PROXY_HOST`,
//! `SUPERGOOD_PROXY_SCHEME`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use supergood_core::RequestProbe;

use crate::error::{ConfigError, SupergoodError};

/// Default collector endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.supergood.ai";
/// Default telemetry endpoint.
pub const DEFAULT_TELEMETRY_URL: &str = "https://telemetry.supergood.ai";
/// Default credential-injection proxy host.
pub const DEFAULT_PROXY_HOST: &str = "proxy.supergood.ai";
/// Default proxy scheme.
pub const DEFAULT_PROXY_SCHEME: &str = "https";
/// Default queue size cap: 100 MB.
pub const DEFAULT_MAX_CACHE_SIZE_BYTES: usize = 100_000_000;

/// Predicate selecting which requests are recorded; overrides the
/// allowed-domains filter.
pub type SelectRequests = Arc<dyn Fn(&RequestProbe<'_>) -> bool + Send + Sync>;

/// Error callback invoked for every background failure.
pub type OnError = Arc<dyn Fn(&SupergoodError) + Send + Sync>;

/// Options for [`Supergood::init`](crate::Supergood::init).
#[derive(Clone)]
pub struct Options {
    /// API client id.
    pub client_id: String,
    /// API client secret.
    pub client_secret: String,
    /// Collector base URL.
    pub base_url: String,
    /// Telemetry base URL.
    pub telemetry_url: String,
    /// How often batches are flushed to the collector.
    pub flush_interval: Duration,
    /// How often the remote config is refreshed.
    pub remote_config_fetch_interval: Duration,
    /// Opt-in host filter; a request is recorded when its host contains any
    /// entry. Empty records all hosts (except the collector's own).
    pub allowed_domains: Vec<String>,
    /// Optional per-request predicate overriding `allowed_domains`.
    pub select_requests: Option<SelectRequests>,
    /// Whether request bodies are captured.
    pub record_request_body: bool,
    /// Whether response bodies are captured.
    pub record_response_body: bool,
    /// Domain → request body paths to always redact.
    pub redact_request_body_keys: HashMap<String, Vec<String>>,
    /// Domain → response body paths to always redact.
    pub redact_response_body_keys: HashMap<String, Vec<String>>,
    /// Domain → request header names to always redact.
    pub redact_request_header_keys: HashMap<String, Vec<String>>,
    /// Redact every leaf except allow-listed paths.
    pub force_redact_all: bool,
    /// Queue size cap in estimated bytes.
    pub max_cache_size_bytes: usize,
    /// Credential-injection proxy host.
    pub proxy_host: String,
    /// Credential-injection proxy scheme.
    pub proxy_scheme: String,
    /// Error callback; defaults to logging through `tracing::error!`.
    pub on_error: Option<OnError>,
    /// Service name included in telemetry, to tell apart services sharing
    /// one api key.
    pub service_name: String,
    /// HTTP client for the SDK's own collector calls.
    pub http_client: Option<reqwest::Client>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            base_url: String::new(),
            telemetry_url: String::new(),
            flush_interval: Duration::from_secs(1),
            remote_config_fetch_interval: Duration::from_secs(10),
            allowed_domains: Vec::new(),
            select_requests: None,
            record_request_body: true,
            record_response_body: true,
            redact_request_body_keys: HashMap::new(),
            redact_response_body_keys: HashMap::new(),
            redact_request_header_keys: HashMap::new(),
            force_redact_all: false,
            max_cache_size_bytes: DEFAULT_MAX_CACHE_SIZE_BYTES,
            proxy_host: String::new(),
            proxy_scheme: String::new(),
            on_error: None,
            service_name: String::new(),
            http_client: None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("client_id", &self.client_id)
            .field("base_url", &self.base_url)
            .field("telemetry_url", &self.telemetry_url)
            .field("flush_interval", &self.flush_interval)
            .field(
                "remote_config_fetch_interval",
                &self.remote_config_fetch_interval,
            )
            .field("allowed_domains", &self.allowed_domains)
            .field("select_requests", &self.select_requests.is_some())
            .field("force_redact_all", &self.force_redact_all)
            .field("max_cache_size_bytes", &self.max_cache_size_bytes)
            .field("proxy_host", &self.proxy_host)
            .field("service_name", &self.service_name)
            .finish()
    }
}

impl Options {
    /// Creates options with explicit credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Default::default()
        }
    }

    /// Sets the collector base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the telemetry base URL.
    pub fn with_telemetry_url(mut self, telemetry_url: impl Into<String>) -> Self {
        self.telemetry_url = telemetry_url.into();
        self
    }

    /// Sets the flush cadence.
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Sets the remote-config refresh cadence.
    pub fn with_fetch_interval(mut self, interval: Duration) -> Self {
        self.remote_config_fetch_interval = interval;
        self
    }

    /// Sets the opt-in host filter.
    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = domains;
        self
    }

    /// Sets the per-request selection predicate.
    pub fn with_select_requests(
        mut self,
        select: impl Fn(&RequestProbe<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.select_requests = Some(Arc::new(select));
        self
    }

    /// Enables or disables force-redact-all mode.
    pub fn with_force_redact_all(mut self, enabled: bool) -> Self {
        self.force_redact_all = enabled;
        self
    }

    /// Sets the queue size cap in estimated bytes.
    pub fn with_max_cache_size_bytes(mut self, max: usize) -> Self {
        self.max_cache_size_bytes = max;
        self
    }

    /// Sets the proxy rewrite target.
    pub fn with_proxy(mut self, host: impl Into<String>, scheme: impl Into<String>) -> Self {
        self.proxy_host = host.into();
        self.proxy_scheme = scheme.into();
        self
    }

    /// Sets the error callback.
    pub fn with_on_error(
        mut self,
        on_error: impl Fn(&SupergoodError) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(on_error));
        self
    }

    /// Sets the telemetry service name.
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Sets the HTTP client used for the SDK's own collector calls.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Resolves environment defaults and validates the result.
    pub fn validate(mut self) -> Result<Options, ConfigError> {
        if self.client_id.is_empty() {
            self.client_id = std::env::var("SUPERGOOD_CLIENT_ID").unwrap_or_default();
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::MissingClientId);
        }

        if self.client_secret.is_empty() {
            self.client_secret = std::env::var("SUPERGOOD_CLIENT_SECRET").unwrap_or_default();
        }
        if self.client_secret.is_empty() {
            return Err(ConfigError::MissingClientSecret);
        }

        if self.base_url.is_empty() {
            self.base_url = std::env::var("SUPERGOOD_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        }
        check_http_url(&self.base_url).map_err(ConfigError::InvalidBaseUrl)?;

        if self.telemetry_url.is_empty() {
            self.telemetry_url = std::env::var("SUPERGOOD_TELEMETRY_URL")
                .unwrap_or_else(|_| DEFAULT_TELEMETRY_URL.to_string());
        }
        check_http_url(&self.telemetry_url).map_err(ConfigError::InvalidTelemetryUrl)?;

        if self.flush_interval < Duration::from_millis(1) {
            return Err(ConfigError::FlushIntervalTooSmall);
        }
        if self.remote_config_fetch_interval < Duration::from_millis(1) {
            return Err(ConfigError::FetchIntervalTooSmall);
        }

        for domain in &self.allowed_domains {
            if self.base_url.contains(domain.as_str()) {
                return Err(ConfigError::AllowedDomainMatchesBaseUrl(domain.clone()));
            }
        }

        // Redaction maps are keyed by lowercase domain.
        self.redact_request_body_keys = lowercase_keys(self.redact_request_body_keys);
        self.redact_response_body_keys = lowercase_keys(self.redact_response_body_keys);
        self.redact_request_header_keys = lowercase_keys(self.redact_request_header_keys);

        if self.max_cache_size_bytes == 0 {
            self.max_cache_size_bytes = DEFAULT_MAX_CACHE_SIZE_BYTES;
        }

        if self.proxy_host.is_empty() {
            self.proxy_host = std::env::var("SUPERGOOD_PROXY_HOST")
                .unwrap_or_else(|_| DEFAULT_PROXY_HOST.to_string());
        }
        if self.proxy_scheme.is_empty() {
            self.proxy_scheme = std::env::var("SUPERGOOD_PROXY_SCHEME")
                .unwrap_or_else(|_| DEFAULT_PROXY_SCHEME.to_string());
        }

        Ok(self)
    }

    /// The collector's authority (`host[:port]`, `www.` trimmed). Traffic
    /// to it is never recorded.
    pub(crate) fn collector_authority(&self) -> String {
        let Ok(url) = Url::parse(&self.base_url) else {
            return String::new();
        };
        let mut authority = url.host_str().unwrap_or_default().to_string();
        if let Some(port) = url.port() {
            authority.push(':');
            authority.push_str(&port.to_string());
        }
        authority.trim_start_matches("www.").to_string()
    }

    /// Whether a request authority passes the allowed-domains filter.
    pub(crate) fn is_authority_allowed(&self, authority: &str) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        self.allowed_domains
            .iter()
            .any(|domain| authority.contains(domain.as_str()))
    }
}

fn check_http_url(value: &str) -> Result<(), String> {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        Ok(url) => Err(format!("unsupported scheme {:?}", url.scheme())),
        Err(err) => Err(err.to_string()),
    }
}

fn lowercase_keys(map: HashMap<String, Vec<String>>) -> HashMap<String, Vec<String>> {
    map.into_iter()
        .map(|(domain, keys)| (domain.to_ascii_lowercase(), keys))
        .collect()
}
