//! Upstream response relay.

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::Response;

/// Rebuild the upstream response for the client: status copied verbatim,
/// every header copied, body streamed through unchanged.
///
/// A 304 Not Modified carries no body, whatever content length the
/// upstream declared.
pub fn relay(upstream: Response) -> Response {
    let (parts, body) = upstream.into_parts();
    let body = if parts.status == StatusCode::NOT_MODIFIED {
        Body::empty()
    } else {
        body
    };
    Response::from_parts(parts, body)
}
