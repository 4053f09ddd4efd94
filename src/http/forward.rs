//! Request forwarding.
//!
//! # Responsibilities
//! - Obtain a backend from the registry
//! - Build the outbound request: method, path + query, headers, body
//! - Send it with a bounded wait and hand the response to the relay
//!
//! # Design Decisions
//! - The inbound body is buffered up to a configured cap before
//!   forwarding; form bodies are re-encoded, everything else passes
//!   through as raw bytes
//! - A transport failure or timeout surfaces to the caller as a 5xx and
//!   never flips backend status; failure detection is the prober's job,
//!   which keeps one transient error from evicting a backend
//! - No retries: a failed forward is the caller's answer

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, request::Parts, HeaderValue, Request, Uri};
use axum::response::Response;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use tokio::time;
use url::form_urlencoded;

use crate::config::schema::{LimitsConfig, TimeoutConfig};
use crate::http::error::ProxyError;
use crate::http::response;
use crate::load_balancer::backend::Backend;
use crate::load_balancer::registry::BackendRegistry;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Name of the backend that served a request, attached to the response
/// as an extension for the access log.
#[derive(Debug, Clone)]
pub struct SelectedBackend(pub String);

/// Builds outbound requests and relays upstream responses.
pub struct Forwarder {
    registry: Arc<BackendRegistry>,
    client: Client<HttpConnector, Body>,
    upstream_timeout: Duration,
    max_body_bytes: usize,
}

impl Forwarder {
    pub fn new(
        registry: Arc<BackendRegistry>,
        client: Client<HttpConnector, Body>,
        timeouts: &TimeoutConfig,
        limits: &LimitsConfig,
    ) -> Self {
        Self {
            registry,
            client,
            upstream_timeout: Duration::from_secs(timeouts.upstream_secs),
            max_body_bytes: limits.max_body_bytes,
        }
    }

    /// Forward one inbound request and return the relayed response.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response, ProxyError> {
        let backend = self.registry.select()?;

        tracing::debug!(
            backend = %backend.name,
            method = %request.method(),
            path = %request.uri().path(),
            "forwarding request"
        );

        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| ProxyError::InvalidRequest(format!("unreadable request body: {e}")))?;

        let outbound = build_outbound(&parts, body, &backend)?;

        let upstream = match time::timeout(self.upstream_timeout, self.client.request(outbound)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(source)) => {
                tracing::error!(backend = %backend.name, error = %source, "upstream request failed");
                return Err(ProxyError::UpstreamConnect {
                    backend: backend.name.clone(),
                    source,
                });
            }
            Err(_) => {
                tracing::error!(
                    backend = %backend.name,
                    timeout_secs = self.upstream_timeout.as_secs(),
                    "upstream request timed out"
                );
                return Err(ProxyError::UpstreamTimeout {
                    backend: backend.name.clone(),
                    timeout: self.upstream_timeout,
                });
            }
        };

        tracing::debug!(backend = %backend.name, status = %upstream.status(), "relaying upstream response");

        let mut relayed = response::relay(upstream.map(Body::new));
        relayed.extensions_mut().insert(SelectedBackend(backend.name.clone()));
        Ok(relayed)
    }
}

/// Build the outbound request: same method and version, original path
/// and query appended to the backend base URL, every inbound header
/// copied verbatim.
fn build_outbound(parts: &Parts, body: Bytes, backend: &Backend) -> Result<Request<Body>, ProxyError> {
    let uri = upstream_uri(&backend.base_url, &parts.uri)?;
    let body = reencode_form_body(parts.headers.get(header::CONTENT_TYPE), body);

    let mut builder = Request::builder()
        .method(parts.method.clone())
        .uri(uri)
        .version(parts.version);

    if let Some(headers) = builder.headers_mut() {
        for (name, value) in parts.headers.iter() {
            headers.append(name.clone(), value.clone());
        }
        // The body was buffered (and form bodies re-encoded), so the
        // framing headers must describe the bytes actually sent.
        headers.remove(header::TRANSFER_ENCODING);
        if !body.is_empty() || headers.contains_key(header::CONTENT_LENGTH) {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len() as u64));
        }
        if !body.is_empty() && !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
        }
    }

    builder
        .body(Body::from(body))
        .map_err(|e| ProxyError::InvalidRequest(format!("cannot build upstream request: {e}")))
}

/// Original path and query appended to the backend base URL.
fn upstream_uri(base: &url::Url, inbound: &Uri) -> Result<Uri, ProxyError> {
    let path_and_query = inbound
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target = format!("{}{}", base.as_str().trim_end_matches('/'), path_and_query);
    target
        .parse()
        .map_err(|e| ProxyError::InvalidRequest(format!("cannot build upstream uri {target:?}: {e}")))
}

/// Re-encode a form body into an equivalent canonical form encoding.
/// Any other payload passes through untouched.
fn reencode_form_body(content_type: Option<&HeaderValue>, body: Bytes) -> Bytes {
    let is_form = content_type
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with(FORM_CONTENT_TYPE)
        });
    if !is_form || body.is_empty() {
        return body;
    }

    let pairs: Vec<(String, String)> = form_urlencoded::parse(&body).into_owned().collect();
    let mut reencoded = form_urlencoded::Serializer::new(String::new());
    reencoded.extend_pairs(pairs);
    Bytes::from(reencoded.finish())
}
