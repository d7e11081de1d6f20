//! Chunk fan-out execution of one admitted job.
//!
//! Split the document, spread the units round-robin across the job's worker
//! allotment, run one blocking worker per sub-queue, then reassemble results
//! in ordinal order and write the output document.

mod partition;
mod worker;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::document::{self, WorkResult};
use crate::metrics::ProgressTracker;
use crate::queue_db::QueueJob;
use crate::transform::{TransformError, UnitTransformer};

/// Job-level failure: the whole run is aborted and per-unit partial results
/// are discarded. Unit-level failures are not represented here; they stay
/// inside their WorkResult.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("unreadable input {path}: {source}")]
    UnreadableInput {
        path: String,
        source: std::io::Error,
    },
    #[error("transformation service unavailable: {0}")]
    ServiceUnavailable(TransformError),
    #[error("write output {path}: {source}")]
    Storage {
        path: String,
        source: std::io::Error,
    },
    #[error("sub-queue worker task failed: {0}")]
    WorkerJoin(String),
}

/// Outcome summary of a successful run.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub doc_id: String,
    pub total_units: usize,
    /// Units whose transformation failed; they render as original text.
    pub failed_units: usize,
    pub output_path: PathBuf,
}

/// Run one admitted job to completion.
///
/// Per-unit failures are recovered locally and never abort the batch; only
/// unreadable input, a whole-service outage, or an output write failure
/// surface as `ProcessingError` for the retry policy.
pub async fn run_job(
    job: &QueueJob,
    transformer: Arc<dyn UnitTransformer>,
    tracker: Arc<ProgressTracker>,
    out_dir: &Path,
) -> Result<JobReport, ProcessingError> {
    let text = tokio::fs::read_to_string(&job.source_path)
        .await
        .map_err(|source| ProcessingError::UnreadableInput {
            path: job.source_path.clone(),
            source,
        })?;

    // A service outage is a job-level error before any unit is spent on it.
    transformer
        .probe()
        .map_err(ProcessingError::ServiceUnavailable)?;

    let units = document::split_units(&text);
    let total_units = units.len();
    tracker.begin_job(&job.doc_id, total_units);
    tracing::info!(
        job_id = job.id,
        doc_id = %job.doc_id,
        units = total_units,
        workers = job.estimated_workers,
        "fan-out started"
    );

    let queues = partition::partition_round_robin(units, job.estimated_workers.max(1) as usize);

    let mut join_set = tokio::task::JoinSet::new();
    for (queue_id, queue) in queues.into_iter().enumerate() {
        if queue.is_empty() {
            continue;
        }
        let transformer = Arc::clone(&transformer);
        let tracker = Arc::clone(&tracker);
        let doc_id = job.doc_id.clone();
        join_set
            .spawn_blocking(move || worker::process_subqueue(queue_id, doc_id, queue, transformer, tracker));
    }

    let mut results: Vec<WorkResult> = Vec::with_capacity(total_units);
    while let Some(joined) = join_set.join_next().await {
        let chunk = joined.map_err(|e| ProcessingError::WorkerJoin(e.to_string()))?;
        results.extend(chunk);
    }

    // Round-robin interleaves completion order; ordinal sort restores the
    // original document order.
    results.sort_by_key(|r| r.index);
    debug_assert_eq!(results.len(), total_units);
    let failed_units = results.iter().filter(|r| !r.is_success()).count();

    let output = document::assemble_output(&results);
    let output_path = out_dir.join(format!("formatted_{}.txt", job.doc_id));
    tokio::fs::write(&output_path, output)
        .await
        .map_err(|source| ProcessingError::Storage {
            path: output_path.display().to_string(),
            source,
        })?;

    tracker.end_job(&job.doc_id);
    tracing::info!(
        job_id = job.id,
        doc_id = %job.doc_id,
        units = total_units,
        failed_units,
        output = %output_path.display(),
        "fan-out finished"
    );

    Ok(JobReport {
        doc_id: job.doc_id.clone(),
        total_units,
        failed_units,
        output_path,
    })
}
