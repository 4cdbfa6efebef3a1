//! Error types for the SDK.

use thiserror::Error;

use supergood_core::{CacheError, MatchError, RedactError};

/// Configuration errors surfaced from [`crate::Options::validate`]. The SDK
/// refuses to start on any of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No client id in options or `SUPERGOOD_CLIENT_ID`.
    #[error("missing client id (SUPERGOOD_CLIENT_ID not set)")]
    MissingClientId,

    /// No client secret in options or `SUPERGOOD_CLIENT_SECRET`.
    #[error("missing client secret (SUPERGOOD_CLIENT_SECRET not set)")]
    MissingClientSecret,

    /// The base URL does not parse or is not http(s).
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    /// The telemetry URL does not parse or is not http(s).
    #[error("invalid telemetry url: {0}")]
    InvalidTelemetryUrl(String),

    /// Flush interval below one millisecond; a zero from a forgotten unit
    /// multiplication is the usual cause.
    #[error("flush interval too small, must be at least 1ms")]
    FlushIntervalTooSmall,

    /// Remote-config fetch interval below one millisecond.
    #[error("remote config fetch interval too small, must be at least 1ms")]
    FetchIntervalTooSmall,

    /// An allowed domain would match the collector itself; the SDK must
    /// never record its own traffic.
    #[error("allowed domain {0:?} matches the collector base url")]
    AllowedDomainMatchesBaseUrl(String),
}

/// Runtime errors routed through the `on_error` callback.
#[derive(Debug, Error)]
pub enum SupergoodError {
    /// 401 from any collector call. Permanent; reported but never posted to
    /// the error sink, which would loop.
    #[error("supergood: invalid ClientID or ClientSecret")]
    InvalidCredentials,

    /// Non-2xx, non-401 collector response. The batch is dropped and work
    /// continues.
    #[error("supergood: got HTTP {status} posting to {path}: {message}")]
    Http {
        /// Response status code.
        status: u16,
        /// Collector path the call targeted.
        path: String,
        /// Response body text, for operator context.
        message: String,
    },

    /// The collector could not be reached.
    #[error("supergood: transport error calling {path}: {source}")]
    Transport {
        /// Collector path the call targeted.
        path: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The config payload did not decode; the prior snapshot is retained.
    #[error("supergood: failed to decode collector response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A config snapshot failed to build (invalid regex).
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A rule could not be evaluated against a live request.
    #[error(transparent)]
    Classification(#[from] MatchError),

    /// A sensitive key could not be applied to an event.
    #[error(transparent)]
    Redaction(#[from] RedactError),
}

impl SupergoodError {
    /// Whether this is the permanent auth failure. Error reports for it are
    /// suppressed to avoid a report-error loop against the same credentials.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, SupergoodError::InvalidCredentials)
    }
}
