//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap every outbound call with a per-stage deadline
//! - Bound the whole download so that no stage combination outlives it
//! - Keep deadline expiry distinct from transport failure in logs
//!
//! Each call is attempted exactly once; there is no retry policy.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::relay::error::ProxyError;

/// Outbound call being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// POST to the backend link endpoint.
    Resolve,
    /// GET/HEAD of the resolved URL or a redirect hop.
    Upstream,
    /// The whole download, from config snapshot to response head.
    Request,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resolve => f.write_str("resolve"),
            Stage::Upstream => f.write_str("upstream"),
            Stage::Request => f.write_str("download"),
        }
    }
}

/// Run `call` under a deadline, mapping both failure modes to [`ProxyError`].
pub async fn with_deadline<T, F>(stage: Stage, after: Duration, call: F) -> Result<T, ProxyError>
where
    F: Future<Output = Result<T, reqwest::Error>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(ProxyError::Transport { stage, source }),
        Err(_) => Err(ProxyError::Timeout { stage, after }),
    }
}
