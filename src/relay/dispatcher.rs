//! Request dispatcher: entry point for every proxied request.
//!
//! OPTIONS is answered locally. Everything else runs through the download
//! pipeline with the current configuration snapshot, and the result (or
//! error) leaves with the client-facing header policy applied.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::header::{
    self, HeaderMap, HeaderValue, ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
};
use axum::http::{Method, Request, Response, StatusCode};
use tracing::Instrument;

use crate::config::{ConfigCache, TimeoutConfig};
use crate::http::request::RequestIdExt;
use crate::observability::metrics;
use crate::observability::monitor::PerformanceMonitor;
use crate::relay::download::{DownloadPipeline, DownloadRequest};
use crate::relay::error::ProxyError;
use crate::resilience::Stage;
use crate::security::{apply_cors, cors_origin, finalize_response};

pub const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";
pub const PREFLIGHT_MAX_AGE: &str = "86400";

pub struct Dispatcher {
    config: Arc<ConfigCache>,
    pipeline: DownloadPipeline,
    monitor: Arc<PerformanceMonitor>,
    request_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        config: Arc<ConfigCache>,
        http: reqwest::Client,
        timeouts: &TimeoutConfig,
        monitor: Arc<PerformanceMonitor>,
    ) -> Self {
        Self {
            config,
            pipeline: DownloadPipeline::new(http, timeouts),
            monitor,
            request_timeout: Duration::from_secs(timeouts.request_secs),
        }
    }

    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        if request.method() == Method::OPTIONS {
            return preflight(request.headers());
        }

        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let origin = cors_origin(request.headers());
        let span = tracing::info_span!(
            "download",
            request_id = %request.request_id(),
            method = %method,
            path = %path,
        );

        let trace = self.monitor.start_request(&method, &path);
        let response = match self.proxy(request).instrument(span.clone()).await {
            Ok(response) => finalize_response(response, &origin),
            Err(e) => {
                span.in_scope(|| log_failure(&e));
                e.into_response(&origin)
            }
        };
        self.monitor.end_request(trace, response.status());
        metrics::record_request(method.as_str(), response.status().as_u16(), start);

        response
    }

    /// Run the pipeline under the whole-request deadline. The deadline covers
    /// everything up to the response head; the body streams afterwards.
    async fn proxy(&self, request: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let config = self.config.get()?;
        let (parts, _) = request.into_parts();
        let download = self
            .pipeline
            .download(config, DownloadRequest::from_parts(parts), 0);

        tokio::time::timeout(self.request_timeout, download)
            .await
            .map_err(|_| ProxyError::Timeout {
                stage: Stage::Request,
                after: self.request_timeout,
            })?
    }
}

fn log_failure(error: &ProxyError) {
    match error {
        ProxyError::InvalidPath | ProxyError::Signature(_) => {
            tracing::info!(error = %error, "Request rejected");
        }
        ProxyError::Configuration(_) => {
            tracing::error!(error = %error, "Proxy is not configured");
        }
        _ => {
            tracing::error!(error = %error, "Download failed");
        }
    }
}

/// Answer an OPTIONS request without touching the backend.
///
/// A CORS preflight (`Origin` + `Access-Control-Request-Method`) gets 204 with
/// the allowed methods and the requested headers echoed back; any other
/// OPTIONS gets 200 with `Allow`.
pub fn preflight(headers: &HeaderMap) -> Response<Body> {
    let origin = cors_origin(headers);
    let is_cors_preflight = headers.contains_key(header::ORIGIN)
        && headers.contains_key(ACCESS_CONTROL_REQUEST_METHOD);

    let mut response = Response::new(Body::empty());
    if is_cors_preflight {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }

    let out = response.headers_mut();
    if is_cors_preflight {
        apply_cors(out, &origin);
        out.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        out.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(PREFLIGHT_MAX_AGE),
        );
        if let Some(requested) = headers.get(ACCESS_CONTROL_REQUEST_HEADERS) {
            out.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        }
    } else {
        out.insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
        out.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_preflight_echoes_origin_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("https://a.example"));
        headers.insert(ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("GET"));
        headers.insert(ACCESS_CONTROL_REQUEST_HEADERS, HeaderValue::from_static("range"));

        let response = preflight(&headers);

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let out = response.headers();
        assert_eq!(out[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://a.example");
        assert_eq!(out[header::ACCESS_CONTROL_ALLOW_METHODS], ALLOWED_METHODS);
        assert_eq!(out[header::ACCESS_CONTROL_MAX_AGE], "86400");
        assert_eq!(out[header::ACCESS_CONTROL_ALLOW_HEADERS], "range");
        assert_eq!(out[header::VARY], "Origin");
    }

    #[test]
    fn preflight_without_requested_headers_omits_allow_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("https://a.example"));
        headers.insert(ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("HEAD"));

        let response = preflight(&headers);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_HEADERS).is_none());
    }

    #[test]
    fn plain_options_lists_allowed_methods() {
        let response = preflight(&HeaderMap::new());

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ALLOW], ALLOWED_METHODS);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
