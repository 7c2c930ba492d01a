//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request id, tracing, timeout, body limit)
//! - Bind the server to a listener and stop on shutdown

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::bulk::BulkOrchestrator;
use crate::client::ServiceApi;
use crate::config::{AppConfig, BulkConfig, ServerConfig, SharedDynamicConfig};
use crate::http::handlers;
use crate::http::request::request_id_middleware;
use crate::resilience::CircuitBreakerRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn ServiceApi>,
    pub orchestrator: BulkOrchestrator,
    pub dynamic: SharedDynamicConfig,
    pub bulk: BulkConfig,
    pub breakers: Arc<CircuitBreakerRegistry>,
    pub metrics: Option<PrometheusHandle>,
    /// Root token; every request works on a child of it.
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(
        client: Arc<dyn ServiceApi>,
        dynamic: SharedDynamicConfig,
        breakers: Arc<CircuitBreakerRegistry>,
    ) -> Self {
        Self {
            orchestrator: BulkOrchestrator::new(Arc::clone(&client)),
            client,
            dynamic,
            bulk: BulkConfig::default(),
            breakers,
            metrics: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// Inbound HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    pub fn new(config: &AppConfig, mut state: AppState) -> Self {
        state.bulk = config.bulk.clone();
        let router = Self::build_router(&config.server, state);
        Self {
            router,
            config: config.server.clone(),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/api/v1/services", post(handlers::create_services))
            .route("/api/v1/services/bulk", post(handlers::retrieve_services_bulk))
            .route("/api/v1/services/{service_id}", get(handlers::retrieve_service))
            .route("/live", get(handlers::live))
            .route("/ready", get(handlers::ready))
            .route("/metrics", get(handlers::metrics))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.max_body_bytes))
            .layer(
                ServiceBuilder::new()
                    .layer(middleware::from_fn(request_id_middleware))
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
            )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.config.request_timeout_secs,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
