//! Error translation to client-facing responses.
//!
//! Any failure escaping the forwarding pipeline renders as a JSON body
//! `{"message": "<description>"}` with a 5xx status, except the
//! invalid-request class which renders as 400. The failure kind and the
//! backend involved (when one was selected) are attached as response
//! extensions for the access log.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::http::forward::SelectedBackend;
use crate::load_balancer::registry::NoHealthyBackend;

/// Failures surfaced to the caller by the forwarding pipeline.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The healthy partition was empty at selection time.
    #[error(transparent)]
    NoHealthyBackend(#[from] NoHealthyBackend),

    /// Transport-level failure reaching the upstream (connect refused,
    /// DNS, connection reset).
    #[error("upstream request to {backend} failed: {source}")]
    UpstreamConnect {
        backend: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    /// The upstream did not respond within the configured bound.
    #[error("upstream {backend} timed out after {timeout:?}")]
    UpstreamTimeout { backend: String, timeout: Duration },

    /// The inbound request could not be forwarded as received.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Failure kind attached to error responses, for the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureKind(pub &'static str);

impl ProxyError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoHealthyBackend(_) => "no_healthy_backend",
            Self::UpstreamConnect { .. } => "upstream_connect",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NoHealthyBackend(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpstreamConnect { .. } => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn backend(&self) -> Option<&str> {
        match self {
            Self::UpstreamConnect { backend, .. } | Self::UpstreamTimeout { backend, .. } => {
                Some(backend)
            }
            _ => None,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let kind = FailureKind(self.kind());
        let backend = self.backend().map(|b| SelectedBackend(b.to_string()));

        let mut response =
            (self.status(), Json(json!({ "message": self.to_string() }))).into_response();
        response.extensions_mut().insert(kind);
        if let Some(backend) = backend {
            response.extensions_mut().insert(backend);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_class() {
        let no_backend = ProxyError::from(NoHealthyBackend);
        assert_eq!(no_backend.status(), StatusCode::SERVICE_UNAVAILABLE);

        let timeout = ProxyError::UpstreamTimeout {
            backend: "b1".into(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let invalid = ProxyError::InvalidRequest("body too large".into());
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn renders_json_message_with_extensions() {
        let response = ProxyError::UpstreamTimeout {
            backend: "b1".into(),
            timeout: Duration::from_secs(30),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            response.extensions().get::<FailureKind>(),
            Some(&FailureKind("upstream_timeout"))
        );
        assert_eq!(
            response.extensions().get::<SelectedBackend>().map(|b| b.0.as_str()),
            Some("b1")
        );

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["message"].as_str().unwrap().contains("timed out"));
    }
}
