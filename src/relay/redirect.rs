//! Manual redirect handling for upstream fetches.
//!
//! The HTTP client never follows redirects itself. Each 3xx is inspected
//! here so that hops pointing back at this proxy (the `PAGES_ADDRESS`
//! origin) re-enter the pipeline in-process instead of going out over the
//! network, and so that every hop carries the same sanitized headers.
//!
//! At most [`MAX_REDIRECT_HOPS`] hops are followed per client request,
//! self-loop re-entries included. When the budget runs out, or a 3xx has no
//! usable `Location`, that 3xx is returned as-is.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::LOCATION;
use axum::http::{Response, Uri};
use url::{Position, Url};

use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::relay::download::{DownloadPipeline, DownloadRequest, UpstreamTemplate};
use crate::relay::error::ProxyError;

pub const MAX_REDIRECT_HOPS: usize = 5;

#[derive(Debug, Clone)]
pub struct RedirectState {
    pub hops: usize,
    pub current_url: Url,
}

impl RedirectState {
    pub fn new(current_url: Url, hops: usize) -> Self {
        Self { hops, current_url }
    }

    pub fn exhausted(&self) -> bool {
        self.hops >= MAX_REDIRECT_HOPS
    }
}

/// The `Location` of `response`, resolved against `base`.
pub fn redirect_target(response: &Response<Body>, base: &Url) -> Option<Url> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    base.join(location).ok()
}

/// Same scheme, host and port as the public address of this proxy.
pub fn is_self_origin(target: &Url, pages_address: &Url) -> bool {
    target.origin() == pages_address.origin()
}

/// Request that re-enters the pipeline for a self-loop target.
fn self_loop_request(template: &UpstreamTemplate, target: &Url) -> Result<DownloadRequest, ProxyError> {
    let uri: Uri = target[Position::BeforePath..]
        .parse()
        .map_err(|_| ProxyError::InvalidUpstreamUrl)?;
    Ok(DownloadRequest {
        method: template.method.clone(),
        uri,
        headers: template.headers.clone(),
    })
}

impl DownloadPipeline {
    pub(crate) async fn follow_redirects(
        &self,
        config: &Arc<ProxyConfig>,
        template: &UpstreamTemplate,
        first: Response<Body>,
        mut state: RedirectState,
    ) -> Result<Response<Body>, ProxyError> {
        let mut current = first;

        while current.status().is_redirection() {
            if state.exhausted() {
                tracing::warn!(hops = state.hops, "Redirect limit reached");
                break;
            }
            let Some(target) = redirect_target(&current, &state.current_url) else {
                tracing::debug!(status = %current.status(), "Redirect without usable Location");
                break;
            };
            state.hops += 1;

            let self_loop = config
                .pages_address
                .as_ref()
                .is_some_and(|pages| is_self_origin(&target, pages));
            if self_loop {
                tracing::debug!(path = target.path(), hops = state.hops, "Re-entering for self-loop redirect");
                metrics::record_self_loop();
                let request = self_loop_request(template, &target)?;
                return self.download(Arc::clone(config), request, state.hops).await;
            }

            current = self.fetch(template, &target).await?;
            state.current_url = target;
        }

        metrics::record_redirect_hops(state.hops);
        Ok(current)
    }
}
