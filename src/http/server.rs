//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, timeout, access log,
//!   rate limiting)
//! - Spawn the health prober alongside the server
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::health::HealthProber;
use crate::http::forward::Forwarder;
use crate::http::request::MakeRequestUuid;
use crate::lifecycle::Shutdown;
use crate::load_balancer::registry::{BackendRegistry, InvalidBackend};
use crate::observability::logging::access_log;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiterState};

/// Application state injected into the proxy handler.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    registry: Arc<BackendRegistry>,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, InvalidBackend> {
        let registry = Arc::new(BackendRegistry::from_config(&config.backends)?);

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let forwarder = Arc::new(Forwarder::new(
            registry.clone(),
            client,
            &config.timeouts,
            &config.limits,
        ));

        let router = Self::build_router(&config, AppState { forwarder });
        Ok(Self {
            router,
            registry,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state);

        // The limiter sits closest to the handler: a rejected request
        // never reaches the forwarding stage, but is still observed by
        // the access log further out.
        if config.rate_limit.enabled {
            let limiter = Arc::new(RateLimiterState::new(config.rate_limit.clone()));
            router = router.layer(middleware::from_fn_with_state(
                limiter,
                rate_limit_middleware,
            ));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(middleware::from_fn(access_log))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.registry.all().len(),
            "http server starting"
        );

        if self.config.health_check.enabled {
            let prober = HealthProber::new(self.registry.clone(), self.config.health_check.clone());
            let prober_shutdown = shutdown.subscribe();
            tokio::spawn(async move { prober.run(prober_shutdown).await });
        }

        let mut server_shutdown = shutdown.subscribe();
        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
            })
            .await?;

        tracing::info!("http server stopped");
        Ok(())
    }

    /// The backend registry backing this server.
    pub fn registry(&self) -> Arc<BackendRegistry> {
        self.registry.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler: forward the request, or translate the failure.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    match state.forwarder.forward(request).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    }
}
