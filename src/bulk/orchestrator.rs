//! Bulk orchestrator: sequential steps, bounded fan-out within a step.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::bulk::outcome::{BulkReport, BulkSummary, ItemOutcome};
use crate::bulk::steps::plan_steps;
use crate::bulk::BulkError;
use crate::client::{ClientError, ServiceApi};
use crate::config::DynamicConfig;
use crate::observability::metrics;

/// Tunables for one run, snapshotted from the dynamic config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkSettings {
    pub parallelism: usize,
    pub step_count: usize,
}

impl From<&DynamicConfig> for BulkSettings {
    fn from(config: &DynamicConfig) -> Self {
        Self {
            parallelism: config.number_of_parallel_requests,
            step_count: config.number_of_steps,
        }
    }
}

/// Runs bulk retrievals against a [`ServiceApi`].
#[derive(Clone)]
pub struct BulkOrchestrator {
    client: Arc<dyn ServiceApi>,
}

impl BulkOrchestrator {
    pub fn new(client: Arc<dyn ServiceApi>) -> Self {
        Self { client }
    }

    /// Retrieve every identifier and return one outcome per input, in order.
    ///
    /// Duplicates are kept and fetched independently. When `cancel` fires,
    /// finished outcomes are kept and everything else fails as cancelled.
    pub async fn run(
        &self,
        service_ids: Vec<String>,
        settings: BulkSettings,
        cancel: &CancellationToken,
    ) -> Result<BulkReport, BulkError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("bulk_run", %run_id, items = service_ids.len());
        self.run_inner(service_ids, settings, cancel).instrument(span).await
    }

    /// [`run`](Self::run) with its own deadline. The deadline cancels a
    /// child of `parent`, so a parent cancellation still reaches the run.
    pub async fn run_with_deadline(
        &self,
        service_ids: Vec<String>,
        settings: BulkSettings,
        parent: &CancellationToken,
        deadline: Duration,
    ) -> Result<BulkReport, BulkError> {
        let cancel = parent.child_token();

        let timer = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(deadline) => {
                        tracing::warn!(deadline = ?deadline, "Bulk deadline elapsed, cancelling outstanding items");
                        cancel.cancel();
                    }
                }
            })
        };

        let result = self.run(service_ids, settings, &cancel).await;
        timer.abort();
        result
    }

    async fn run_inner(
        &self,
        service_ids: Vec<String>,
        settings: BulkSettings,
        cancel: &CancellationToken,
    ) -> Result<BulkReport, BulkError> {
        let start = Instant::now();

        if settings.parallelism == 0 {
            return Err(BulkError::InvalidParallelism);
        }
        if settings.step_count == 0 {
            return Err(BulkError::InvalidStepCount);
        }

        let total = service_ids.len();
        if total == 0 {
            return Ok(BulkReport {
                outcomes: Vec::new(),
                summary: BulkSummary::from_outcomes(&[], start.elapsed()),
            });
        }

        let steps = plan_steps(total, settings.step_count)?;
        let permits = settings.parallelism.min(Semaphore::MAX_PERMITS);
        let mut slots: Vec<Option<ItemOutcome>> = vec![None; total];

        tracing::info!(
            steps = steps.len(),
            parallelism = settings.parallelism,
            "Starting bulk retrieval"
        );

        for (index, range) in steps.iter().enumerate() {
            let ids = &service_ids[range.clone()];

            if cancel.is_cancelled() {
                for (offset, id) in ids.iter().enumerate() {
                    slots[range.start + offset] = Some(cancelled(id.clone()));
                }
                continue;
            }

            let step_start = Instant::now();
            let semaphore = Arc::new(Semaphore::new(permits));

            let handles = ids.iter().map(|id| {
                tokio::spawn(fetch_one(
                    Arc::clone(&self.client),
                    id.clone(),
                    Arc::clone(&semaphore),
                    cancel.clone(),
                ))
            });

            for (offset, (joined, id)) in join_all(handles).await.into_iter().zip(ids).enumerate() {
                let outcome = match joined {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(service_id = %id, error = %e, "Bulk item task failed");
                        ItemOutcome::failure(id.clone(), format!("task failed: {}", e))
                    }
                };
                slots[range.start + offset] = Some(outcome);
            }

            metrics::record_bulk_step();
            tracing::debug!(
                step = index + 1,
                of = steps.len(),
                items = ids.len(),
                elapsed_ms = step_start.elapsed().as_millis() as u64,
                "Bulk step complete"
            );
        }

        let collected = slots.iter().filter(|s| s.is_some()).count();
        let outcomes: Vec<ItemOutcome> = slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(BulkError::OutcomeCountMismatch {
                expected: total,
                actual: collected,
            })?;

        let summary = BulkSummary::from_outcomes(&outcomes, start.elapsed());
        metrics::record_bulk_run(summary.successful_count, summary.failed_count, start);

        tracing::info!(
            total = summary.total_requests,
            succeeded = summary.successful_count,
            failed = summary.failed_count,
            duration_ms = summary.processing_time_ms,
            cancelled = cancel.is_cancelled(),
            "Bulk retrieval finished"
        );

        Ok(BulkReport { outcomes, summary })
    }
}

/// One item: wait for a permit, then make the downstream call.
async fn fetch_one(
    client: Arc<dyn ServiceApi>,
    service_id: String,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> ItemOutcome {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return cancelled(service_id),
        permit = semaphore.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return ItemOutcome::failure(service_id, "concurrency limiter closed"),
        },
    };

    match client.retrieve_service_by_id(&service_id, &cancel).await {
        Ok(response) => ItemOutcome::success(service_id, response.data),
        Err(e) => ItemOutcome::failure(service_id, e.to_string()),
    }
}

fn cancelled(service_id: String) -> ItemOutcome {
    ItemOutcome::failure(service_id, ClientError::Cancelled.to_string())
}
