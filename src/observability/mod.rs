//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, per-request access log)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging via tracing; level seeded from config,
//!   overridable with RUST_LOG
//! - The access log observes requests from the outside: it reads the
//!   selected backend and failure kind off response extensions and
//!   never touches pool state

pub mod logging;
pub mod metrics;
