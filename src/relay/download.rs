//! The download pipeline: validate, verify, resolve, fetch.
//!
//! # Data Flow
//! ```text
//! DownloadRequest (method, path + query, client headers)
//!     → security::path (decode, reject traversal)       → 400
//!     → signature::Signer::verify (unless disabled)      → 401
//!     → security::headers::strip_request_headers
//!     → backend::BackendClient::resolve_link
//!         → PassThrough: backend body, HTTP 200
//!     → UpstreamTemplate (method + stripped headers + overrides)
//!     → fetch (streams the body, never buffers)
//!     → redirect.rs when the upstream answers 3xx
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{Method, Response, StatusCode, Uri};
use futures_util::future::{BoxFuture, FutureExt};
use url::Url;

use crate::backend::client::JSON_UTF8;
use crate::backend::{BackendClient, HeaderValues, Resolution};
use crate::config::{ProxyConfig, TimeoutConfig};
use crate::observability::metrics;
use crate::relay::error::ProxyError;
use crate::relay::redirect::RedirectState;
use crate::resilience::{with_deadline, Stage};
use crate::security::{decode_path, is_valid_path, strip_request_headers};
use crate::signature::Signer;

/// Query parameter carrying the signature token.
pub const SIGN_PARAM: &str = "sign";

/// The parts of a client request the pipeline needs. The body is never read.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl DownloadRequest {
    pub fn from_parts(parts: Parts) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
        }
    }

    /// Value of `?sign=`, or empty when absent.
    pub fn sign_token(&self) -> String {
        self.uri
            .query()
            .and_then(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .find(|(key, _)| key == SIGN_PARAM)
                    .map(|(_, value)| value.into_owned())
            })
            .unwrap_or_default()
    }
}

/// Method and headers reused for the first upstream fetch and every
/// redirect hop after it.
#[derive(Debug, Clone)]
pub struct UpstreamTemplate {
    pub method: Method,
    pub headers: HeaderMap,
}

/// HEAD stays HEAD; everything else is fetched with GET.
pub fn upstream_method(client: &Method) -> Method {
    if client == Method::HEAD {
        Method::HEAD
    } else {
        Method::GET
    }
}

/// Layer backend-supplied header overrides onto the stripped client headers.
/// The first value of a name replaces, later values are appended. Names or
/// values that are not valid HTTP are skipped.
pub fn apply_overrides(
    mut headers: HeaderMap,
    overrides: Option<&BTreeMap<String, HeaderValues>>,
) -> HeaderMap {
    let Some(overrides) = overrides else {
        return headers;
    };

    for (name, values) in overrides {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            tracing::warn!(header = %name, "Skipping invalid override header name");
            continue;
        };
        for (i, value) in values.iter().enumerate() {
            let Ok(value) = HeaderValue::from_str(value) else {
                tracing::warn!(header = %name, "Skipping invalid override header value");
                continue;
            };
            if i == 0 {
                headers.insert(name.clone(), value);
            } else {
                headers.append(name.clone(), value);
            }
        }
    }
    headers
}

/// Backend error reply forwarded verbatim with HTTP 200.
fn pass_through(body: Bytes) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
    response
}

/// Wrap an upstream response without touching its body.
fn into_response(upstream: reqwest::Response) -> Response<Body> {
    let status = upstream.status();
    let headers = upstream.headers().clone();
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

pub struct DownloadPipeline {
    backend: BackendClient,
    http: reqwest::Client,
    upstream_timeout: Duration,
}

impl DownloadPipeline {
    /// `http` must not follow redirects on its own.
    pub fn new(http: reqwest::Client, timeouts: &TimeoutConfig) -> Self {
        Self {
            backend: BackendClient::new(http.clone(), Duration::from_secs(timeouts.resolve_secs)),
            http,
            upstream_timeout: Duration::from_secs(timeouts.upstream_secs),
        }
    }

    /// Run the pipeline for one request. `hops` is the redirect budget
    /// already spent, non-zero only when re-entered from a self-loop redirect.
    ///
    /// The returned response still carries raw upstream headers; the
    /// dispatcher applies the client-facing header policy.
    pub fn download<'a>(
        &'a self,
        config: Arc<ProxyConfig>,
        request: DownloadRequest,
        hops: usize,
    ) -> BoxFuture<'a, Result<Response<Body>, ProxyError>> {
        async move {
            let path = decode_path(request.uri.path())
                .filter(|path| is_valid_path(path))
                .ok_or(ProxyError::InvalidPath)?;

            if !config.signature_disabled {
                Signer::new(&config.shared_secret)
                    .verify(&path, &request.sign_token())
                    .inspect_err(|e| metrics::record_signature_failure(e.reason()))?;
            }

            let forwarded = strip_request_headers(&request.headers);

            let link = match self.backend.resolve_link(&config, &path).await? {
                Resolution::Link(link) => link,
                Resolution::PassThrough { body, .. } => return Ok(pass_through(body)),
            };

            let url = Url::parse(&link.url).map_err(|_| ProxyError::InvalidUpstreamUrl)?;
            let template = UpstreamTemplate {
                method: upstream_method(&request.method),
                headers: apply_overrides(forwarded, link.header.as_ref()),
            };

            let response = self.fetch(&template, &url).await?;
            if response.status().is_redirection() {
                let state = RedirectState::new(url, hops);
                return self.follow_redirects(&config, &template, response, state).await;
            }
            Ok(response)
        }
        .boxed()
    }

    /// One upstream request. Resolves once the response head arrives; the
    /// body streams afterwards.
    pub(crate) async fn fetch(
        &self,
        template: &UpstreamTemplate,
        url: &Url,
    ) -> Result<Response<Body>, ProxyError> {
        tracing::debug!(
            method = %template.method,
            host = url.host_str().unwrap_or(""),
            "Fetching upstream"
        );

        let call = self
            .http
            .request(template.method.clone(), url.clone())
            .headers(template.headers.clone())
            .send();
        let upstream = with_deadline(Stage::Upstream, self.upstream_timeout, call).await?;
        Ok(into_response(upstream))
    }
}
