//! Active health probing.
//!
//! # Responsibilities
//! - Periodically probe every backend, healthy and unhealthy alike
//! - Flip registry status on probe outcome
//! - Log promotions and demotions, and only those

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Uri};
use futures_util::future::join_all;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::load_balancer::backend::{Backend, Status};
use crate::load_balancer::registry::BackendRegistry;
use crate::observability::metrics;

/// Background prober that drives the per-backend status state machine:
/// `Healthy --(probe fails)--> Unhealthy`,
/// `Unhealthy --(probe succeeds)--> Healthy`.
pub struct HealthProber {
    registry: Arc<BackendRegistry>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthProber {
    pub fn new(registry: Arc<BackendRegistry>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            registry,
            config,
            client,
        }
    }

    /// Run until the shutdown signal fires.
    ///
    /// The ticker keeps its cadence regardless of how long a cycle takes:
    /// each cycle is spawned as its own task, and a cycle still running
    /// when the next one starts is harmless since status transitions are
    /// idempotent per-backend operations.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.config.interval_secs,
            path = %self.config.path,
            backends = self.registry.all().len(),
            "health prober starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        let prober = Arc::new(self);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let prober = prober.clone();
                    tokio::spawn(async move { prober.probe_cycle().await });
                }
                _ = shutdown.recv() => {
                    tracing::info!("health prober received shutdown signal, exiting");
                    break;
                }
            }
        }
    }

    /// Probe every configured backend concurrently. One dead or slow
    /// backend never delays the others.
    pub async fn probe_cycle(&self) {
        let probes = self
            .registry
            .all()
            .iter()
            .map(|backend| self.probe(backend.clone()));
        join_all(probes).await;
    }

    async fn probe(&self, backend: Arc<Backend>) {
        let alive = self.is_alive(&backend).await;

        let changed = if alive {
            self.registry.mark_healthy(&backend)
        } else {
            self.registry.mark_unhealthy(&backend)
        };

        if changed {
            if alive {
                tracing::info!(
                    backend = %backend.name,
                    url = %backend.base_url,
                    previous = %Status::Unhealthy,
                    now = %Status::Healthy,
                    "backend promoted"
                );
            } else {
                tracing::warn!(
                    backend = %backend.name,
                    url = %backend.base_url,
                    previous = %Status::Healthy,
                    now = %Status::Unhealthy,
                    "backend demoted"
                );
            }
        }

        metrics::record_backend_health(&backend.name, backend.is_healthy());
    }

    /// Issue one liveness probe. Any success status counts as alive;
    /// everything else, including timeouts, counts as dead. Failures are
    /// logged and swallowed here, never propagated.
    async fn is_alive(&self, backend: &Backend) -> bool {
        let uri = match probe_uri(backend, &self.config.path) {
            Ok(uri) => uri,
            Err(reason) => {
                tracing::error!(backend = %backend.name, %reason, "failed to build probe uri");
                return false;
            }
        };

        let request = match Request::builder()
            .method("GET")
            .uri(uri)
            .header("user-agent", "load-balancer-health-probe")
            .body(Body::empty())
        {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(backend = %backend.name, error = %e, "failed to build probe request");
                return false;
            }
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let alive = response.status().is_success();
                if !alive {
                    tracing::debug!(
                        backend = %backend.name,
                        status = %response.status(),
                        "probe returned non-success status"
                    );
                }
                alive
            }
            Ok(Err(e)) => {
                tracing::debug!(backend = %backend.name, error = %e, "probe connection failed");
                false
            }
            Err(_) => {
                tracing::debug!(backend = %backend.name, timeout_secs = self.config.timeout_secs, "probe timed out");
                false
            }
        }
    }
}

fn probe_uri(backend: &Backend, path: &str) -> Result<Uri, String> {
    let base = backend.base_url.as_str().trim_end_matches('/');
    let target = if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };
    target.parse().map_err(|e| format!("{target:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn probe_uri_joins_base_and_path() {
        let backend = Backend::new("b1", Url::parse("http://127.0.0.1:4001").unwrap());
        assert_eq!(
            probe_uri(&backend, "/").unwrap().to_string(),
            "http://127.0.0.1:4001/"
        );
        assert_eq!(
            probe_uri(&backend, "/healthz").unwrap().to_string(),
            "http://127.0.0.1:4001/healthz"
        );
    }
}
