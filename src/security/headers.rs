//! Header sanitization.
//!
//! # Responsibilities
//! - Strip identity-leaking and hop-by-hop headers before a request leaves
//!   the proxy
//! - Allow-list upstream response headers before they reach the client
//! - Attach the CORS origin echo and media cache policy to client responses

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Response, StatusCode};

/// Request headers never forwarded upstream.
pub const STRIP_REQUEST_HEADERS: &[&str] = &[
    "referer",
    "referrer",
    "origin",
    "host",
    "hosts",
    "x-forwarded-host",
    "x-forwarded-for",
    "x-forwarded-proto",
    "x-forwarded-port",
    "x-real-ip",
    "forwarded",
    "via",
    "cf-connecting-ip",
    "true-client-ip",
    // proxy-internal correlation id
    "x-request-id",
    // hop-by-hop
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

/// Upstream response headers passed through to the client.
pub const ALLOWED_RESPONSE_HEADERS: &[HeaderName] = &[
    header::CONTENT_TYPE,
    header::CONTENT_DISPOSITION,
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
    header::ETAG,
    header::LAST_MODIFIED,
    header::CACHE_CONTROL,
    header::EXPIRES,
    header::CONTENT_ENCODING,
    header::CONTENT_LENGTH,
];

/// Cache directive for successful media responses.
pub const MEDIA_CACHE_CONTROL: &str = "public, max-age=3600";

/// Copy of `headers` without any deny-listed header.
pub fn strip_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut stripped = headers.clone();
    for name in STRIP_REQUEST_HEADERS {
        stripped.remove(*name);
    }
    stripped
}

/// Copy of `headers` holding only allow-listed headers (all their values).
pub fn filter_response_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::new();
    for name in ALLOWED_RESPONSE_HEADERS {
        for value in headers.get_all(name) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}

/// The request's `Origin`, or `*` when absent.
pub fn cors_origin(headers: &HeaderMap) -> HeaderValue {
    headers
        .get(header::ORIGIN)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"))
}

/// Set the CORS origin echo and `Vary: Origin`.
pub fn apply_cors(headers: &mut HeaderMap, origin: &HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
}

fn is_media(content_type: &HeaderValue) -> bool {
    content_type
        .to_str()
        .map(|ct| {
            let ct = ct.trim_start().to_ascii_lowercase();
            ct.starts_with("image/") || ct.starts_with("video/") || ct.starts_with("audio/")
        })
        .unwrap_or(false)
}

/// Turn an upstream response into the client response: allow-listed headers,
/// CORS, and a public cache directive for successful media.
pub fn finalize_response(response: Response<Body>, origin: &HeaderValue) -> Response<Body> {
    let (mut parts, body) = response.into_parts();

    let mut headers = filter_response_headers(&parts.headers);
    apply_cors(&mut headers, origin);

    if parts.status == StatusCode::OK && headers.get(header::CONTENT_TYPE).is_some_and(is_media) {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(MEDIA_CACHE_CONTROL));
    }

    parts.headers = headers;
    Response::from_parts(parts, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: StatusCode, headers: &[(&str, &str)]) -> Response<Body> {
        let mut builder = Response::builder().status(status);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn strips_identity_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("proxy.example.com"));
        headers.insert("origin", HeaderValue::from_static("https://site.example"));
        headers.insert("referer", HeaderValue::from_static("https://site.example/page"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));
        headers.insert("x-real-ip", HeaderValue::from_static("1.2.3.4"));
        headers.insert("forwarded", HeaderValue::from_static("for=1.2.3.4"));
        headers.insert("range", HeaderValue::from_static("bytes=0-99"));
        headers.insert("user-agent", HeaderValue::from_static("curl/8"));
        headers.insert("x-request-id", HeaderValue::from_static("7f1c2a"));

        let stripped = strip_request_headers(&headers);

        assert_eq!(stripped.len(), 2);
        assert_eq!(stripped["range"], "bytes=0-99");
        assert_eq!(stripped["user-agent"], "curl/8");
    }

    #[test]
    fn response_allow_list_drops_everything_else() {
        let mut upstream = HeaderMap::new();
        upstream.insert("x-internal-secret", HeaderValue::from_static("s3cr3t"));
        upstream.insert("server", HeaderValue::from_static("nginx/1.25"));
        upstream.insert("set-cookie", HeaderValue::from_static("sid=1"));
        upstream.insert("location", HeaderValue::from_static("https://internal/"));
        upstream.insert("content-type", HeaderValue::from_static("application/pdf"));
        upstream.insert("etag", HeaderValue::from_static("\"abc\""));

        let filtered = filter_response_headers(&upstream);

        assert_eq!(filtered.len(), 2);
        for name in filtered.keys() {
            assert!(ALLOWED_RESPONSE_HEADERS.contains(name), "{name} leaked");
        }
    }

    #[test]
    fn media_on_200_gets_public_cache() {
        let origin = HeaderValue::from_static("https://site.example");
        let out = finalize_response(
            response(StatusCode::OK, &[("content-type", "image/jpeg"), ("cache-control", "private")]),
            &origin,
        );

        assert_eq!(out.headers()[header::CACHE_CONTROL], MEDIA_CACHE_CONTROL);
        assert_eq!(out.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://site.example");
        assert_eq!(out.headers()[header::VARY], "Origin");
    }

    #[test]
    fn non_media_or_partial_keeps_upstream_cache() {
        let origin = HeaderValue::from_static("*");

        let partial = finalize_response(
            response(StatusCode::PARTIAL_CONTENT, &[("content-type", "video/mp4")]),
            &origin,
        );
        assert!(partial.headers().get(header::CACHE_CONTROL).is_none());

        let doc = finalize_response(
            response(StatusCode::OK, &[("content-type", "application/zip"), ("cache-control", "no-store")]),
            &origin,
        );
        assert_eq!(doc.headers()[header::CACHE_CONTROL], "no-store");
    }

    #[test]
    fn origin_falls_back_to_wildcard() {
        assert_eq!(cors_origin(&HeaderMap::new()), "*");
    }
}
