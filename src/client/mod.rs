//! Downstream client subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceApi::retrieve_service_by_id / create_services
//!     → circuit breaker gate (process-wide, per dependency name)
//!     → retry executor (attempt budget, backoff, cancellation)
//!     → service_api.rs send_once (one HTTP attempt)
//!     → transport.rs (pooled reqwest client, connect/request timeouts)
//! ```
//!
//! # Design Decisions
//! - 200 and 201 are success; every other status is a typed failure
//! - The payload is serialized once and reused across attempts
//! - Cancellation is not a dependency failure and never moves the breaker

pub mod error;
pub mod service_api;
pub mod transport;
pub mod types;

pub use error::ClientError;
pub use service_api::{ServiceApi, ServiceApiClient};
pub use types::{
    CreateServiceRequest, CreateServiceResponse, DataEnvelope, Owner, Resource, ServiceModel,
    ServiceResponse,
};
