//! Backend registry.
//!
//! # Responsibilities
//! - Hold the closed set of configured backends, in configuration order
//! - Expose the healthy partition as a stable-order snapshot
//! - Apply idempotent status transitions on behalf of the prober
//! - Select the next backend via the balancing strategy
//!
//! # Design Decisions
//! - The backend list is immutable after construction; shared mutation
//!   is confined to per-backend status atomics and the balancer cursor,
//!   so request handlers and the prober never contend on a lock
//! - Unhealthy backends are never discarded; they stay tracked and keep
//!   being probed, which guarantees automatic recovery

use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::config::BackendConfig;
use crate::load_balancer::backend::{Backend, Status};
use crate::load_balancer::round_robin::{Balancer, RoundRobin};

/// The healthy partition was empty at selection time.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("no healthy backend available")]
pub struct NoHealthyBackend;

/// A backend configuration entry could not be turned into a backend.
#[derive(Debug, Error)]
#[error("backend {name:?}: invalid url {url:?}: {source}")]
pub struct InvalidBackend {
    pub name: String,
    pub url: String,
    #[source]
    pub source: url::ParseError,
}

/// Canonical list of configured backends and their liveness status.
#[derive(Debug)]
pub struct BackendRegistry {
    backends: Vec<Arc<Backend>>,
    balancer: Box<dyn Balancer>,
}

impl BackendRegistry {
    /// Build the registry from configuration, preserving order.
    pub fn from_config(configs: &[BackendConfig]) -> Result<Self, InvalidBackend> {
        let mut backends = Vec::with_capacity(configs.len());
        for config in configs {
            let base_url = Url::parse(&config.url).map_err(|source| InvalidBackend {
                name: config.name.clone(),
                url: config.url.clone(),
                source,
            })?;
            backends.push(Arc::new(Backend::new(config.name.clone(), base_url)));
        }
        Ok(Self {
            backends,
            balancer: Box::new(RoundRobin::new()),
        })
    }

    /// All configured backends, configuration order, regardless of status.
    pub fn all(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    /// Snapshot of the healthy partition, configuration order.
    pub fn healthy(&self) -> Vec<Arc<Backend>> {
        self.backends
            .iter()
            .filter(|b| b.is_healthy())
            .cloned()
            .collect()
    }

    /// True when no backend is currently healthy.
    pub fn is_empty(&self) -> bool {
        !self.backends.iter().any(|b| b.is_healthy())
    }

    /// Select the next backend in rotation.
    pub fn select(&self) -> Result<Arc<Backend>, NoHealthyBackend> {
        let healthy = self.healthy();
        self.balancer.pick(&healthy).ok_or(NoHealthyBackend)
    }

    /// Transition a backend to Healthy. Returns true when the status
    /// actually changed; re-marking a healthy backend is a no-op.
    pub fn mark_healthy(&self, backend: &Backend) -> bool {
        backend.set_status(Status::Healthy) != Status::Healthy
    }

    /// Transition a backend to Unhealthy. Returns true when the status
    /// actually changed; re-marking an unhealthy backend is a no-op.
    pub fn mark_unhealthy(&self, backend: &Backend) -> bool {
        backend.set_status(Status::Unhealthy) != Status::Unhealthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(n: usize) -> BackendRegistry {
        let configs: Vec<BackendConfig> = (0..n)
            .map(|i| BackendConfig {
                name: format!("b{i}"),
                url: format!("http://127.0.0.1:{}", 4001 + i),
            })
            .collect();
        BackendRegistry::from_config(&configs).unwrap()
    }

    #[test]
    fn rejects_invalid_url() {
        let configs = vec![BackendConfig {
            name: "bad".into(),
            url: "not a url".into(),
        }];
        assert!(BackendRegistry::from_config(&configs).is_err());
    }

    #[test]
    fn every_backend_is_in_exactly_one_partition() {
        let registry = registry(4);
        registry.mark_unhealthy(&registry.all()[1]);
        registry.mark_unhealthy(&registry.all()[3]);

        let healthy = registry.healthy();
        let unhealthy: Vec<_> = registry.all().iter().filter(|b| !b.is_healthy()).collect();
        assert_eq!(healthy.len() + unhealthy.len(), registry.all().len());
        assert_eq!(
            healthy.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
            ["b0", "b2"]
        );
    }

    #[test]
    fn transitions_are_idempotent() {
        let registry = registry(2);
        let backend = registry.all()[0].clone();

        assert!(registry.mark_unhealthy(&backend));
        assert!(!registry.mark_unhealthy(&backend));
        assert!(registry.mark_healthy(&backend));
        assert!(!registry.mark_healthy(&backend));
        // Pool size and order are unchanged throughout.
        assert_eq!(registry.all().len(), 2);
        assert_eq!(registry.all()[0].name, "b0");
    }

    #[test]
    fn select_fails_on_empty_pool() {
        let registry = registry(2);
        for backend in registry.all().to_vec() {
            registry.mark_unhealthy(&backend);
        }
        assert!(registry.is_empty());
        assert_eq!(registry.select().unwrap_err(), NoHealthyBackend);
    }

    #[test]
    fn unhealthy_backend_is_skipped_until_recovery() {
        let registry = registry(3);
        let down = registry.all()[1].clone();
        registry.mark_unhealthy(&down);

        for _ in 0..9 {
            assert_ne!(registry.select().unwrap().name, "b1");
        }

        registry.mark_healthy(&down);
        let picked: Vec<String> = (0..6).map(|_| registry.select().unwrap().name.clone()).collect();
        assert!(picked.iter().any(|name| name == "b1"));
    }

    #[test]
    fn concurrent_selection_under_status_flips() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let registry = Arc::new(registry(4));
        let stop = Arc::new(AtomicBool::new(false));

        let flipper = {
            let registry = registry.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                let mut i = 0usize;
                while !stop.load(Ordering::Relaxed) {
                    let backend = &registry.all()[i % 4];
                    if i % 2 == 0 {
                        registry.mark_unhealthy(backend);
                    } else {
                        registry.mark_healthy(backend);
                    }
                    i += 1;
                }
            })
        };

        let selectors: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..5_000 {
                        // Must never panic or index out of range; an empty
                        // pool is a legal outcome mid-flip.
                        let _ = registry.select();
                    }
                })
            })
            .collect();

        for selector in selectors {
            selector.join().unwrap();
        }
        stop.store(true, Ordering::Relaxed);
        flipper.join().unwrap();

        // Once flips settle, rotation covers every backend again.
        for backend in registry.all().to_vec() {
            registry.mark_healthy(&backend);
        }
        let mut hits = vec![0usize; 4];
        for _ in 0..8 {
            let picked = registry.select().unwrap();
            let idx = registry.all().iter().position(|b| b.name == picked.name).unwrap();
            hits[idx] += 1;
        }
        assert_eq!(hits, [2, 2, 2, 2]);
    }
}
