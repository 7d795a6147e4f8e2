//! Error taxonomy for the download pipeline.

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderValue, Response, StatusCode};

use crate::config::ConfigError;
use crate::http::response::error_response;
use crate::resilience::Stage;
use crate::signature::SignatureError;

/// Message returned for every failure whose details stay in the logs.
pub const GENERIC_FAILURE: &str = "Internal server error";

/// Everything that can stop a download before a response is produced.
///
/// Backend errors (non-200 `code`) are not here: they are forwarded verbatim
/// as successful responses.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("Invalid path")]
    InvalidPath,

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("{stage} request failed: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },

    #[error("{stage} request did not complete within {after:?}")]
    Timeout { stage: Stage, after: Duration },

    #[error("backend response is not a link result: {0}")]
    BackendDecode(#[from] serde_json::Error),

    #[error("backend reported success without link data")]
    MissingLinkData,

    #[error("backend returned an unusable upstream URL")]
    InvalidUpstreamUrl,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidPath => StatusCode::BAD_REQUEST,
            ProxyError::Signature(_) => StatusCode::UNAUTHORIZED,
            ProxyError::Configuration(_)
            | ProxyError::Transport { .. }
            | ProxyError::Timeout { .. }
            | ProxyError::BackendDecode(_)
            | ProxyError::MissingLinkData
            | ProxyError::InvalidUpstreamUrl => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show the client. Never includes URLs, secrets, or
    /// transport details.
    pub fn client_message(&self) -> String {
        match self {
            ProxyError::Configuration(ConfigError::Missing(_)) => self.to_string(),
            ProxyError::Configuration(_) => "Invalid configuration".to_string(),
            ProxyError::InvalidPath | ProxyError::Signature(_) => self.to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }

    /// JSON `{code, message}` response carrying the CORS origin echo.
    pub fn into_response(self, origin: &HeaderValue) -> Response<Body> {
        error_response(self.status(), &self.client_message(), origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ProxyError::InvalidPath.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ProxyError::Signature(SignatureError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ProxyError::Configuration(ConfigError::Missing(vec!["TOKEN".into()])).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ProxyError::MissingLinkData.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn client_messages_hide_internals() {
        let missing = ProxyError::Configuration(ConfigError::Missing(vec!["ADDRESS".into(), "TOKEN".into()]));
        assert_eq!(
            missing.client_message(),
            "Missing required environment variables: ADDRESS, TOKEN"
        );

        assert_eq!(
            ProxyError::Signature(SignatureError::InvalidFormat).client_message(),
            "InvalidSignatureFormat"
        );

        let timeout = ProxyError::Timeout {
            stage: Stage::Resolve,
            after: Duration::from_secs(10),
        };
        assert_eq!(timeout.client_message(), GENERIC_FAILURE);
    }
}
