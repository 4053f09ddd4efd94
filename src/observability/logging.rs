//! Structured logging: subscriber setup and the per-request access log.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;
use crate::http::error::FailureKind;
use crate::http::forward::SelectedBackend;
use crate::observability::metrics;

/// Initialize the tracing subscriber. `RUST_LOG` wins over the
/// configured level when set.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Per-request access log middleware.
///
/// Emits one line per completed request: method, path, the backend that
/// served it (or `none`), response status, failure kind when the
/// pipeline failed, and elapsed time.
pub async fn access_log(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let status = response.status();
    let backend = response
        .extensions()
        .get::<SelectedBackend>()
        .map(|b| b.0.clone())
        .unwrap_or_else(|| "none".to_string());
    let failure = response
        .extensions()
        .get::<FailureKind>()
        .map(|f| f.0)
        .unwrap_or("none");

    tracing::info!(
        client = %addr.ip(),
        method = %method,
        path = %path,
        backend = %backend,
        status = status.as_u16(),
        failure = %failure,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );
    metrics::record_request(method.as_str(), status.as_u16(), &backend, started);

    response
}
