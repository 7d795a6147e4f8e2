//! Backend link resolution.
//!
//! # Responsibilities
//! - POST the decoded path to the backend, authenticated with the shared secret
//! - Distinguish "here is the link" from a backend-side error reply
//! - Keep the raw bytes of error replies so they reach the client unchanged

use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::body::Bytes;

use crate::backend::types::{BackendLinkResult, LinkData, LinkRequest};
use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::relay::error::ProxyError;
use crate::resilience::{with_deadline, Stage};

pub const JSON_UTF8: &str = "application/json;charset=UTF-8";

/// Outcome of a resolve call.
#[derive(Debug)]
pub enum Resolution {
    /// `code == 200`: fetch `LinkData::url` with its header overrides.
    Link(LinkData),
    /// Any other `code`: the backend's reply, byte for byte.
    PassThrough { code: i64, body: Bytes },
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Ask the backend where `path` lives.
    pub async fn resolve_link(
        &self,
        config: &ProxyConfig,
        path: &str,
    ) -> Result<Resolution, ProxyError> {
        let endpoint = config.link_endpoint();

        let call = async {
            self.http
                .post(&endpoint)
                .header(CONTENT_TYPE, JSON_UTF8)
                .header(AUTHORIZATION, config.shared_secret.as_str())
                .json(&LinkRequest { path })
                .send()
                .await?
                .bytes()
                .await
        };

        let body = match with_deadline(Stage::Resolve, self.timeout, call).await {
            Ok(body) => body,
            Err(e) => {
                metrics::record_backend_resolve("transport_error");
                return Err(e);
            }
        };

        let result: BackendLinkResult = serde_json::from_slice(&body).inspect_err(|_| {
            metrics::record_backend_resolve("undecodable");
        })?;

        if result.code != 200 {
            tracing::info!(
                path = %path,
                code = result.code,
                message = result.message.as_deref().unwrap_or(""),
                "Backend declined link"
            );
            metrics::record_backend_resolve("declined");
            return Ok(Resolution::PassThrough { code: result.code, body });
        }

        metrics::record_backend_resolve("resolved");
        result
            .data
            .map(Resolution::Link)
            .ok_or(ProxyError::MissingLinkData)
    }
}
