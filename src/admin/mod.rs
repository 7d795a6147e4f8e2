//! Service endpoints that bypass the download pipeline.

pub mod handlers;

use axum::{
    routing::{any, get},
    Router,
};

use self::handlers::*;
use crate::http::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(service_info))
        .route("/_/test", any(test_route))
        .route("/_/health", get(health))
        .route("/_/metrics", get(performance_report))
}
