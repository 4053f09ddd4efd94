//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! prober.rs:
//!     Periodic timer (fixed cadence)
//!     → probe every configured backend concurrently (GET probe path)
//!     → registry status transitions (idempotent, per backend)
//!     → log transitions only
//! ```
//!
//! # Design Decisions
//! - Both partitions are probed every cycle, so demoted backends recover
//!   automatically once reachable again
//! - Each cycle runs as its own task; a slow cycle never delays the
//!   ticker, and overlapping cycles are safe because transitions are
//!   idempotent single-backend operations
//! - Probe errors are contained per backend, never propagated

pub mod prober;

pub use prober::HealthProber;
