//! The transport seam the interceptor wraps.
//!
//! A [`Transport`] sends one buffered HTTP request and returns one buffered
//! response. The SDK never interprets the inner transport's errors; they
//! pass back to the host verbatim (and are recorded as `status 0 /
//! "HTTP ERROR"` events along the way).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};

use crate::interceptor;
use crate::service::ServiceCore;

/// Error type surfaced by a transport; opaque to the SDK.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One hop of an HTTP round trip over fully buffered bodies.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends the request and returns the response.
    async fn round_trip(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BoxError>;
}

/// A [`Transport`] backed by a `reqwest::Client`.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wraps an existing client, keeping its pool, TLS and timeout
    /// configuration.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn round_trip(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
        let request = reqwest::Request::try_from(request)?;
        let outcome = self.client.execute(request).await?;

        let status = outcome.status();
        let version = outcome.version();
        let headers = outcome.headers().clone();
        let body = outcome.bytes().await?;

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.version_mut() = version;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// The intercepting transport returned by
/// [`Supergood::wrap`](crate::Supergood::wrap). Every request passes
/// through the policy gate; recorded pairs land in the service's queue.
pub struct SupergoodTransport<T: Transport> {
    core: Arc<ServiceCore>,
    inner: T,
}

impl<T: Transport> SupergoodTransport<T> {
    pub(crate) fn new(core: Arc<ServiceCore>, inner: T) -> Self {
        Self { core, inner }
    }
}

#[async_trait]
impl<T: Transport> Transport for SupergoodTransport<T> {
    async fn round_trip(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
        interceptor::intercept(&self.core, &self.inner, request).await
    }
}
