//! Authenticated client for the collector and telemetry APIs.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use url::Url;

use supergood_core::config::RemoteConfigResponse;
use supergood_core::Event;

use crate::error::SupergoodError;

/// Name reported in error payloads.
pub(crate) const PACKAGE_NAME: &str = "supergood-rs";
/// Version reported in error payloads.
pub(crate) const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Per-flush telemetry payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Telemetry {
    pub cache_key_count: usize,
    pub service_name: String,
}

/// Self-reported error payload.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ErrorReport {
    pub error: String,
    pub message: String,
    pub payload: PackageVersion,
}

impl ErrorReport {
    pub fn new(error: &SupergoodError) -> Self {
        let text = error.to_string();
        Self {
            error: text.clone(),
            message: text,
            payload: PackageVersion::current(),
        }
    }
}

/// Package identification attached to error reports.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct PackageVersion {
    #[serde(rename = "packageName")]
    pub name: &'static str,
    #[serde(rename = "packageVersion")]
    pub version: &'static str,
}

impl PackageVersion {
    pub fn current() -> Self {
        Self {
            name: PACKAGE_NAME,
            version: PACKAGE_VERSION,
        }
    }
}

/// HTTP client for the collector (`/v2/config`, `/events`) and the
/// telemetry service (`/telemetry`, `/errors`). All calls carry HTTP Basic
/// auth derived from the client id and secret.
pub(crate) struct CollectorApi {
    http: reqwest::Client,
    base_url: Url,
    telemetry_url: Url,
    auth_header: String,
}

impl CollectorApi {
    pub fn new(
        http: reqwest::Client,
        base_url: Url,
        telemetry_url: Url,
        client_id: &str,
        client_secret: &str,
    ) -> Self {
        let credentials = BASE64.encode(format!("{client_id}:{client_secret}"));
        Self {
            http,
            base_url,
            telemetry_url,
            auth_header: format!("Basic {credentials}"),
        }
    }

    /// `GET /v2/config`.
    pub async fn fetch_config(&self) -> Result<RemoteConfigResponse, SupergoodError> {
        let path = "/v2/config";
        let url = join(&self.base_url, path);
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|source| SupergoodError::Transport {
                path: path.to_string(),
                source,
            })?;
        let response = check_status(response, path).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| SupergoodError::Transport {
                path: path.to_string(),
                source,
            })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `POST /events` with the batch as a JSON array.
    pub async fn post_events(&self, events: &[Event]) -> Result<(), SupergoodError> {
        self.post_json(&self.base_url, "/events", events).await
    }

    /// `POST /telemetry`.
    pub async fn post_telemetry(&self, telemetry: &Telemetry) -> Result<(), SupergoodError> {
        self.post_json(&self.telemetry_url, "/telemetry", telemetry)
            .await
    }

    /// `POST /errors`.
    pub async fn post_error_report(&self, report: &ErrorReport) -> Result<(), SupergoodError> {
        self.post_json(&self.telemetry_url, "/errors", report).await
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        base: &Url,
        path: &str,
        body: &T,
    ) -> Result<(), SupergoodError> {
        let url = join(base, path);
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|source| SupergoodError::Transport {
                path: path.to_string(),
                source,
            })?;
        check_status(response, path).await?;
        Ok(())
    }
}

fn join(base: &Url, path: &str) -> Url {
    // Base URLs are validated at startup; a path join on an http(s) URL
    // cannot fail.
    base.join(path).unwrap_or_else(|_| base.clone())
}

/// Maps collector statuses to the error taxonomy: 401 is the permanent
/// auth failure, any other non-2xx is transient.
async fn check_status(
    response: reqwest::Response,
    path: &str,
) -> Result<reqwest::Response, SupergoodError> {
    let status = response.status();
    if status.as_u16() == 401 {
        return Err(SupergoodError::InvalidCredentials);
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(SupergoodError::Http {
            status: status.as_u16(),
            path: path.to_string(),
            message,
        });
    }
    Ok(response)
}
