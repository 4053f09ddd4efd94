//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::backend::Backend;

/// Strategy for picking one backend out of a healthy snapshot.
pub trait Balancer: Send + Sync + std::fmt::Debug {
    /// Pick a backend from the snapshot, or `None` when it is empty.
    fn pick(&self, healthy: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}

/// Cycles through healthy backends in configuration order.
///
/// The cursor is a single shared counter, reduced modulo the snapshot
/// length on every call. Because the length is taken from the snapshot
/// passed in, a pool that shrank or grew since the last pick can never
/// yield an out-of-range index; fairness under concurrency is eventual,
/// not strict per-cycle.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Balancer for RoundRobin {
    fn pick(&self, healthy: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if healthy.is_empty() {
            return None;
        }
        let cursor = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(healthy[cursor % healthy.len()].clone())
    }
}
