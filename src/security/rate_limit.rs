//! Fixed-window rate limiting keyed by client address.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::config::schema::RateLimitConfig;
use crate::observability::metrics;

/// One counting window per client.
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Shared state for the fixed-window limiter.
///
/// A client's first request opens a window; requests beyond the limit
/// within that window are rejected, and the counter resets when the
/// window expires. Windows are tracked per client address.
pub struct RateLimiterState {
    windows: DashMap<IpAddr, Window>,
    limit: u32,
    window: Duration,
}

impl RateLimiterState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            limit: config.max_requests,
            window: Duration::from_secs(config.window_secs),
        }
    }

    /// Count one request against the client's current window. Returns
    /// false when the window's budget is exhausted.
    pub fn admit(&self, client: IpAddr) -> bool {
        let now = Instant::now();
        let mut entry = self.windows.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.limit {
            return false;
        }
        entry.count += 1;
        true
    }
}

/// Middleware rejecting over-limit clients before the forwarding stage.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if state.admit(addr.ip()) {
        next.run(request).await
    } else {
        tracing::warn!(client = %addr.ip(), "rate limit exceeded");
        metrics::record_rate_limited();
        let mut response = Response::new(Body::from("Rate limit exceeded. Try again later."));
        *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        response
    }
}
