//! Service client gateway
//!
//! Accepts service requests over HTTP and forwards them, singly or in
//! bulk, to the downstream service API.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http (axum: request id, timeout, body limit)
//!                       │
//!                       ├── create / retrieve ──────────────┐
//!                       │                                    │
//!                       └── bulk ──▶ bulk orchestrator       │
//!                                    (steps, bounded fan-out)│
//!                                           │                │
//!                                           ▼                ▼
//!                                    client (ServiceApi) ──▶ circuit breaker
//!                                                              ──▶ retries + backoff
//!                                                              ──▶ reqwest ──▶ Downstream
//!
//!     Cross-cutting: config (static + hot-reloaded dynamic), observability
//!     (tracing, Prometheus), lifecycle (startup, signals, shutdown)
//! ```

use clap::Parser;
use std::path::PathBuf;

use service_client::config::ConfigPaths;
use service_client::lifecycle;

#[derive(Debug, Parser)]
#[command(name = "service-client", version, about = "Resilient service API gateway")]
struct Cli {
    /// Directory holding application*.toml and the dynamic config.
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Config profile (e.g. "prod" reads application-prod.toml).
    #[arg(long, env = "ACTIVE_PROFILE")]
    profile: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let paths = ConfigPaths::resolve(&cli.config_dir, cli.profile.as_deref());

    lifecycle::run(paths).await?;
    Ok(())
}
