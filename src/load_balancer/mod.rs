//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → registry.rs (snapshot healthy partition)
//!     → round_robin.rs (advance cursor, pick backend)
//!     → Return backend or NoHealthyBackend
//!
//! Health prober
//!     → registry.rs (idempotent status transitions)
//! ```
//!
//! # Design Decisions
//! - The backend set is closed after startup; only status flips
//! - Healthy/unhealthy partitions are derived from per-backend atomics,
//!   never stored as separate collections
//! - The cursor is re-derived against the live healthy count on every
//!   selection, so a shrinking pool cannot yield a stale index

pub mod backend;
pub mod registry;
pub mod round_robin;

pub use backend::{Backend, Status};
pub use registry::{BackendRegistry, NoHealthyBackend};
pub use round_robin::RoundRobin;
