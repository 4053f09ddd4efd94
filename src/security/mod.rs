//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (fixed window per client address)
//!     → admitted requests proceed to forwarding
//!     → rejected requests answer 429 and never reach the core
//! ```

pub mod rate_limit;

pub use rate_limit::RateLimiterState;
