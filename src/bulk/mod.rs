//! Bulk retrieval subsystem.
//!
//! # Data Flow
//! ```text
//! identifiers + BulkSettings (from the live DynamicConfig)
//!     → steps.rs (partition [0, n) into sequential ranges)
//!     → orchestrator.rs (per step: one task per id, semaphore-bounded)
//!         → ServiceApi::retrieve_service_by_id
//!     → outcome.rs (ordered outcomes + summary)
//! ```
//!
//! # Design Decisions
//! - A step fully drains before the next one starts
//! - Each task owns one outcome slot by index, so output order is input order
//! - Item failures become outcomes; they never abort siblings or later steps
//! - Cancellation turns every unfinished item into a failure outcome

pub mod orchestrator;
pub mod outcome;
pub mod steps;

pub use orchestrator::{BulkOrchestrator, BulkSettings};
pub use outcome::{BulkReport, BulkSummary, ItemOutcome, Outcome};
pub use steps::plan_steps;

use thiserror::Error;

/// Bulk run errors. Item failures are outcomes, not errors; these only
/// signal bad parameters or a broken invariant.
#[derive(Debug, Error)]
pub enum BulkError {
    #[error("step count must be positive")]
    InvalidStepCount,

    #[error("parallelism must be positive")]
    InvalidParallelism,

    #[error("steps do not partition {total} identifiers: {detail}")]
    InvalidPartition { total: usize, detail: String },

    #[error("expected {expected} outcomes, collected {actual}")]
    OutcomeCountMismatch { expected: usize, actual: usize },
}
