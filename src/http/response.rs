//! JSON response helpers shared by the dispatcher and service endpoints.

use axum::body::Body;
use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::{Response, StatusCode};
use serde::Serialize;

use crate::backend::client::JSON_UTF8;
use crate::security::apply_cors;

/// Body of every error the proxy produces itself.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub code: u16,
    pub message: &'a str,
}

/// Serialize `body` as `application/json;charset=UTF-8` with the CORS echo.
pub fn json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
    origin: &HeaderValue,
) -> Response<Body> {
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::empty())
                .unwrap_or_default();
        }
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
    apply_cors(headers, origin);
    response
}

/// `{"code": <status>, "message": ...}`.
pub fn error_response(status: StatusCode, message: &str, origin: &HeaderValue) -> Response<Body> {
    let body = ErrorBody {
        code: status.as_u16(),
        message,
    };
    json_response(status, &body, origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, VARY};

    #[tokio::test]
    async fn error_body_shape() {
        let origin = HeaderValue::from_static("https://a.example");
        let response = error_response(StatusCode::UNAUTHORIZED, "SignatureExpired", &origin);

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[CONTENT_TYPE], JSON_UTF8);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://a.example");
        assert_eq!(response.headers()[VARY], "Origin");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!({"code": 401, "message": "SignatureExpired"}));
    }
}
