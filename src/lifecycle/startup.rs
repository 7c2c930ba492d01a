//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize subsystems in dependency order
//! - Start the dynamic config watcher
//! - Bind the listener and serve until a shutdown signal

use arc_swap::ArcSwap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, ServiceApiClient};
use crate::config::{
    load_config, load_dynamic_config, AppConfig, ConfigError, ConfigPaths, ConfigWatcher,
    DynamicConfig, SharedDynamicConfig,
};
use crate::config::watcher::apply_updates;
use crate::http::{AppState, HttpServer};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{logging, metrics};
use crate::resilience::CircuitBreakerRegistry;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to build downstream client: {0}")]
    Client(#[from] ClientError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Load the dynamic tunables; a missing file means defaults.
pub fn load_dynamic_or_default(path: &Path) -> Result<DynamicConfig, ConfigError> {
    match load_dynamic_config(path) {
        Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = ?path, "Dynamic config not found, using defaults");
            Ok(DynamicConfig::default())
        }
        other => other,
    }
}

/// Wire the breaker registry, downstream client and handler state.
pub fn build_state(
    config: &AppConfig,
    dynamic: SharedDynamicConfig,
    cancel: CancellationToken,
) -> Result<AppState, StartupError> {
    let breakers = Arc::new(CircuitBreakerRegistry::new());
    let breaker = breakers.get_or_create(&config.service_api_client.circuit_breaker);
    let client = Arc::new(ServiceApiClient::new(&config.service_api_client, breaker)?);

    let mut state = AppState::new(client, dynamic, breakers);
    state.bulk = config.bulk.clone();
    state.cancel = cancel;
    Ok(state)
}

/// Start the gateway and block until it has shut down.
pub async fn run(paths: ConfigPaths) -> Result<(), StartupError> {
    let config = load_config(&paths.application)?;
    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?paths.application,
        "service-client starting"
    );

    let dynamic = load_dynamic_or_default(&paths.dynamic)?;
    tracing::info!(
        bind_address = %config.server.bind_address,
        downstream = %config.service_api_client.host,
        number_of_parallel_requests = dynamic.number_of_parallel_requests,
        number_of_steps = dynamic.number_of_steps,
        "Configuration loaded"
    );

    let metrics_handle = if config.observability.metrics_enabled {
        Some(metrics::install_recorder()?)
    } else {
        None
    };

    let shutdown = Shutdown::new();
    let shared: SharedDynamicConfig = Arc::new(ArcSwap::from_pointee(dynamic));

    let mut state = build_state(&config, shared.clone(), shutdown.token())?;
    state.metrics = metrics_handle;

    // Keep the watcher alive for the lifetime of the server.
    let (watcher, updates) = ConfigWatcher::new(&paths.dynamic);
    let _watcher = match watcher.run() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start dynamic config watcher; hot reload disabled");
            None
        }
    };
    tokio::spawn(apply_updates(shared, updates, shutdown.subscribe()));

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.server.bind_address.clone(),
            source,
        })?;

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            signals::wait_for_signal().await;
            shutdown.trigger();
        });
    }

    HttpServer::new(&config, state)
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}
