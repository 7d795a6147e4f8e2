use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Response, StatusCode, Uri},
};
use serde::Serialize;

use crate::http::response::json_response;
use crate::http::server::AppState;
use crate::observability::HealthStatus;

fn any_origin() -> HeaderValue {
    HeaderValue::from_static("*")
}

#[derive(Serialize)]
pub struct Endpoints {
    pub test: &'static str,
    pub health: &'static str,
    pub metrics: &'static str,
}

#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub status: &'static str,
    pub version: &'static str,
    pub endpoints: Endpoints,
}

#[derive(Serialize)]
pub struct TestReply {
    pub status: &'static str,
    pub message: &'static str,
    pub path: String,
    pub method: String,
}

pub async fn service_info() -> Response<Body> {
    let info = ServiceInfo {
        service: env!("CARGO_PKG_NAME"),
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: Endpoints {
            test: "/_/test",
            health: "/_/health",
            metrics: "/_/metrics",
        },
    };
    json_response(StatusCode::OK, &info, &any_origin())
}

pub async fn test_route(method: Method, uri: Uri) -> Response<Body> {
    let reply = TestReply {
        status: "success",
        message: "Proxy is reachable",
        path: uri.path().to_string(),
        method: method.to_string(),
    };
    json_response(StatusCode::OK, &reply, &any_origin())
}

/// 503 while the monitor rates the service `poor`.
pub async fn health(State(state): State<AppState>) -> Response<Body> {
    let health = state.monitor.health();
    let status = if health.status == HealthStatus::Poor {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    json_response(status, &health, &any_origin())
}

pub async fn performance_report(State(state): State<AppState>) -> Response<Body> {
    json_response(StatusCode::OK, &state.monitor.report(), &any_origin())
}
