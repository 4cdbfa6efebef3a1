//! Service lifecycle: construction, wrapping transports, shutdown.

use std::sync::Arc;

use url::Url;

use supergood_core::{PolicyCache, RedactionOptions};

use crate::api::{CollectorApi, ErrorReport};
use crate::error::{ConfigError, SupergoodError};
use crate::flusher::{self, FlusherHandle};
use crate::options::{OnError, Options};
use crate::queue::EventQueue;
use crate::refresher::{self, RefresherHandle};
use crate::transport::{ReqwestTransport, SupergoodTransport, Transport};

/// State shared by the interceptor, the workers and the service handle.
pub(crate) struct ServiceCore {
    pub options: Options,
    pub collector_authority: String,
    pub cache: PolicyCache,
    pub queue: EventQueue,
    pub api: CollectorApi,
    on_error: OnError,
}

impl ServiceCore {
    /// Routes a failure to the host's callback and self-reports it to the
    /// error sink. Auth failures are never self-reported; posting them
    /// would fail with the same credentials and loop.
    pub fn handle_error(self: &Arc<Self>, error: SupergoodError) {
        (self.on_error)(&error);
        if error.is_auth_error() {
            return;
        }
        let report = ErrorReport::new(&error);
        let core = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(post_error) = core.api.post_error_report(&report).await {
                (core.on_error)(&post_error);
            }
        });
    }
}

/// The Supergood service: collates request logs and uploads them to the
/// collector in batches.
///
/// Logs are batched in memory, so call [`close`](Self::close) before the
/// process exits to upload anything still pending.
pub struct Supergood {
    core: Arc<ServiceCore>,
    flusher: FlusherHandle,
    refresher: RefresherHandle,
}

impl Supergood {
    /// Validates the options, performs the initial config fetch and starts
    /// the background workers.
    ///
    /// Only invalid configuration fails construction. A failed initial
    /// fetch is reported through the error callback and leaves the policy
    /// cache uninitialized, which gates all interception off until a
    /// refresh succeeds.
    pub async fn init(options: Options) -> Result<Self, ConfigError> {
        let options = options.validate()?;

        let base_url = Url::parse(&options.base_url)
            .map_err(|err| ConfigError::InvalidBaseUrl(err.to_string()))?;
        let telemetry_url = Url::parse(&options.telemetry_url)
            .map_err(|err| ConfigError::InvalidTelemetryUrl(err.to_string()))?;

        let http = options.http_client.clone().unwrap_or_default();
        let api = CollectorApi::new(
            http,
            base_url,
            telemetry_url,
            &options.client_id,
            &options.client_secret,
        );

        let cache = PolicyCache::new(
            options.force_redact_all,
            RedactionOptions {
                request_header_keys: options.redact_request_header_keys.clone(),
                request_body_keys: options.redact_request_body_keys.clone(),
                response_body_keys: options.redact_response_body_keys.clone(),
            },
        );

        let on_error: OnError = options.on_error.clone().unwrap_or_else(|| {
            Arc::new(|error: &SupergoodError| {
                tracing::error!(error = %error, "supergood error");
            })
        });

        let core = Arc::new(ServiceCore {
            collector_authority: options.collector_authority(),
            queue: EventQueue::new(options.max_cache_size_bytes),
            cache,
            api,
            on_error,
            options,
        });

        if let Err(error) = refresher::refresh(&core).await {
            core.handle_error(error);
        }

        let flusher = flusher::spawn(Arc::clone(&core));
        let refresher = refresher::spawn(Arc::clone(&core));

        Ok(Self {
            core,
            flusher,
            refresher,
        })
    }

    /// Wraps a transport so every request it sends passes through the
    /// interception pipeline.
    pub fn wrap<T: Transport>(&self, inner: T) -> SupergoodTransport<T> {
        SupergoodTransport::new(Arc::clone(&self.core), inner)
    }

    /// An intercepting transport over a default `reqwest::Client`.
    pub fn client(&self) -> SupergoodTransport<ReqwestTransport> {
        self.wrap(ReqwestTransport::default())
    }

    /// Force-flushes pending events (request-only records included), stops
    /// both workers and returns the final flush result.
    pub async fn close(self) -> Result<(), SupergoodError> {
        let result = self.flusher.close().await;
        self.refresher.close().await;
        result
    }
}
