//! The interception pipeline: gate, classify, correlate, record.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::header::HOST;
use http::{HeaderMap, Request, Response, StatusCode, Uri};
use uuid::Uuid;

use supergood_core::cache::Action;
use supergood_core::{body, Request as RequestRecord, RequestProbe, Response as ResponseRecord};

use crate::error::SupergoodError;
use crate::service::ServiceCore;
use crate::transport::{BoxError, Transport};

/// Status text recorded for blocked requests.
pub(crate) const BLOCKED_STATUS_TEXT: &str = "Blocked by Supergood: Too many requests";

/// Runs one intercepted round trip.
///
/// The inner transport's result is always returned to the caller verbatim;
/// the only synthesized response is the Block 429.
pub(crate) async fn intercept<T: Transport>(
    core: &Arc<ServiceCore>,
    inner: &T,
    mut request: Request<Bytes>,
) -> Result<Response<Bytes>, BoxError> {
    let parts = UrlParts::of(&request);
    let method = request.method().as_str().to_string();
    let headers = join_headers(request.headers());
    let body_bytes = request.body().clone();

    let probe = RequestProbe {
        method: &method,
        url: &parts.url,
        host: &parts.host,
        path: &parts.path,
        headers: &headers,
        body: &body_bytes,
    };

    let (rule, match_errors) = core.cache.match_request(&probe);
    for error in match_errors {
        core.handle_error(SupergoodError::Classification(error));
    }

    let (endpoint_id, action) = rule
        .as_ref()
        .map(|rule| (rule.id.clone(), rule.action))
        .unwrap_or((String::new(), Action::Accept));
    let should_proxy = core.cache.proxy_enabled(&parts.authority);
    let should_record = should_log(core, &probe, &parts.authority, action);
    drop(probe);

    if !should_record {
        if should_proxy {
            rewrite_through_proxy(core, &mut request, &parts.authority);
        }
        return inner.round_trip(request).await;
    }

    let id = Uuid::new_v4().to_string();
    let captured_body = core
        .options
        .record_request_body
        .then(|| body::capture(&body_bytes))
        .flatten();
    let record = RequestRecord::new(
        id.clone(),
        method,
        parts.url.clone(),
        parts.path.clone(),
        parts.search.clone(),
        headers,
        captured_body,
    );
    let logged = core.queue.log_request(id.clone(), record, endpoint_id);

    if action == Action::Block {
        if logged {
            core.queue.log_response(
                &id,
                ResponseRecord::new(429, BLOCKED_STATUS_TEXT, HashMap::new(), None),
            );
        }
        let mut blocked = Response::new(Bytes::new());
        *blocked.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        return Ok(blocked);
    }

    if should_proxy {
        rewrite_through_proxy(core, &mut request, &parts.authority);
    }

    let result = inner.round_trip(request).await;

    if logged {
        let record = match &result {
            Ok(response) => response_record(response, core.options.record_response_body),
            Err(error) => ResponseRecord::from_error(error.to_string()),
        };
        core.queue.log_response(&id, record);
    }

    result
}

/// The gate in front of recording. Initialization and the collector-host
/// exclusion are absolute; `select_requests`, when present, takes over the
/// allowed-domains decision.
fn should_log(
    core: &ServiceCore,
    probe: &RequestProbe<'_>,
    authority: &str,
    action: Action,
) -> bool {
    if !core.cache.is_initialized() {
        return false;
    }
    if action == Action::Ignore {
        return false;
    }
    if authority == core.collector_authority {
        return false;
    }
    if let Some(select) = &core.options.select_requests {
        return select(probe);
    }
    core.options.is_authority_allowed(authority)
}

/// Redirects the request at the credential-injection proxy: scheme, host
/// and `Host` header point at the proxy, and the original host travels in
/// `X-Supergood-Upstream`.
fn rewrite_through_proxy(core: &ServiceCore, request: &mut Request<Bytes>, original: &str) {
    let proxy_target = format!(
        "{}://{}",
        core.options.proxy_scheme, core.options.proxy_host
    );
    let mut parts = request.uri().clone().into_parts();
    match (
        core.options.proxy_scheme.parse().ok(),
        core.options.proxy_host.parse().ok(),
    ) {
        (Some(scheme), Some(authority)) => {
            parts.scheme = Some(scheme);
            parts.authority = Some(authority);
        }
        _ => {
            tracing::warn!(proxy = %proxy_target, "invalid proxy target, skipping rewrite");
            return;
        }
    }
    let Ok(uri) = Uri::from_parts(parts) else {
        tracing::warn!(proxy = %proxy_target, "invalid proxy target, skipping rewrite");
        return;
    };
    *request.uri_mut() = uri;

    let headers = request.headers_mut();
    if let Ok(host) = core.options.proxy_host.parse() {
        headers.insert(HOST, host);
    }
    let insert = |headers: &mut HeaderMap, name: &'static str, value: &str| {
        if let Ok(value) = value.parse() {
            headers.insert(name, value);
        }
    };
    insert(headers, "x-supergood-clientid", &core.options.client_id);
    insert(headers, "x-supergood-clientsecret", &core.options.client_secret);
    insert(
        headers,
        "x-supergood-upstream",
        &format!("https://{original}"),
    );
}

/// The URL views the pipeline needs: full string, authority with port,
/// bare host, path and query.
struct UrlParts {
    url: String,
    authority: String,
    host: String,
    path: String,
    search: String,
}

impl UrlParts {
    fn of(request: &Request<Bytes>) -> Self {
        let uri = request.uri();
        let authority = uri
            .authority()
            .map(|authority| authority.to_string())
            .or_else(|| {
                // Captured traffic occasionally carries an origin-form URI;
                // fall back to the Host header.
                request
                    .headers()
                    .get(HOST)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string)
            })
            .unwrap_or_default();
        let host = uri
            .host()
            .map(str::to_string)
            .unwrap_or_else(|| authority.split(':').next().unwrap_or_default().to_string());
        let url = if uri.scheme().is_some() {
            uri.to_string()
        } else {
            format!("http://{}{}", authority, uri)
        };
        Self {
            url,
            authority,
            host,
            path: uri.path().to_string(),
            search: uri.query().unwrap_or_default().to_string(),
        }
    }
}

/// Flattens an `http::HeaderMap` into the event's string map, joining
/// repeated headers with `", "`.
pub(crate) fn join_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

fn response_record(response: &Response<Bytes>, record_body: bool) -> ResponseRecord {
    let status = response.status();
    let status_text = match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    };
    ResponseRecord::new(
        status.as_u16(),
        status_text,
        join_headers(response.headers()),
        record_body.then(|| body::capture(response.body())).flatten(),
    )
}
