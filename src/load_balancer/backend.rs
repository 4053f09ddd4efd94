//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Hold the pre-parsed base URL
//! - Track liveness status (Healthy/Unhealthy)

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use url::Url;

/// Liveness status as last determined by the health prober.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Healthy = 0,
    Unhealthy = 1,
}

impl From<u8> for Status {
    fn from(val: u8) -> Self {
        match val {
            0 => Status::Healthy,
            _ => Status::Unhealthy,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Healthy => f.write_str("healthy"),
            Status::Unhealthy => f.write_str("unhealthy"),
        }
    }
}

/// A single configured upstream server.
///
/// Identity and base URL are fixed at startup. The status is the only
/// mutable field and flips exclusively through the registry's transition
/// operations. Every configured backend starts out Healthy.
#[derive(Debug)]
pub struct Backend {
    /// Identifier used in logs and metrics.
    pub name: String,
    /// Base URL (scheme + host + port) requests are forwarded to.
    pub base_url: Url,
    status: AtomicU8,
}

impl Backend {
    pub fn new(name: impl Into<String>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            base_url,
            status: AtomicU8::new(Status::Healthy as u8),
        }
    }

    /// Current liveness status.
    pub fn status(&self) -> Status {
        self.status.load(Ordering::Acquire).into()
    }

    pub fn is_healthy(&self) -> bool {
        self.status() == Status::Healthy
    }

    /// Store a status, returning the previous one. Storing the current
    /// status is a no-op observable as `previous == new`.
    pub(crate) fn set_status(&self, status: Status) -> Status {
        self.status.swap(status as u8, Ordering::AcqRel).into()
    }
}
