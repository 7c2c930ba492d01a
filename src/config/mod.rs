//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! application[-profile].toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable for the process lifetime)
//!
//! [profile/]dynamic.toml
//!     → loader.rs + validation.rs
//!     → DynamicConfig behind ArcSwap
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new dynamic config
//!     → validation.rs validates
//!     → atomic swap; bulk runs started afterwards see the new values
//! ```
//!
//! # Design Decisions
//! - Only the bulk tunables are hot-reloadable; everything else needs a restart
//! - All fields have defaults to allow minimal configs
//! - A reload that fails validation is logged and dropped

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_dynamic_config, ConfigError, ConfigPaths};
pub use schema::{
    AppConfig, BulkConfig, CircuitBreakerConfig, ClientConfig, DynamicConfig, LogFormat,
    ObservabilityConfig, RetryConfig, ServerConfig, TimeoutConfig,
};
pub use watcher::{ConfigWatcher, SharedDynamicConfig};
