//! Resilient service-API gateway library.

pub mod bulk;
pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use bulk::{BulkOrchestrator, BulkReport, BulkSettings};
pub use client::{ServiceApi, ServiceApiClient};
pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
