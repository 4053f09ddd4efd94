//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware wiring)
//!     → request.rs (request ID)
//!     → forward.rs (select backend, build outbound request, send)
//!     → response.rs (relay upstream response, 304 body rule)
//!     → error.rs (failures rendered as JSON responses)
//!     → Send to client
//! ```

pub mod error;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use error::ProxyError;
pub use forward::{Forwarder, SelectedBackend};
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
