//! Event-driven scheduling loop.
//!
//! Enqueue, job completion, and the backstop tick all funnel into one drain
//! procedure guarded by a single-flight token. A trigger that arrives while
//! a drain is running sets a dirty flag, which forces at least one more pass
//! before the guard is released, so jobs that became admissible mid-drain are
//! never missed. Completion re-triggers the drain immediately; the tick only
//! covers lost signals.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::config::DfqConfig;
use crate::document;
use crate::metrics::ProgressTracker;
use crate::queue_db::{JobId, JobOutcome, JobStatus, QueueDb, QueueJob};
use crate::transform::UnitTransformer;

use super::admit::try_admit_next;
use super::execute;
use super::ledger::WorkerLedger;

/// Terminal outcome of one job, delivered to the completion sink exactly once
/// per transition into COMPLETED or FAILED. Retry-requeues do not fire it.
#[derive(Debug, Clone)]
pub struct JobCompletion {
    pub job_id: JobId,
    pub doc_id: String,
    pub status: JobStatus,
    pub error: Option<String>,
    pub output_path: Option<PathBuf>,
}

/// Downstream notification target (status updates, user notification).
pub trait CompletionSink: Send + Sync {
    fn job_finished(&self, completion: &JobCompletion);
}

/// Default sink: log the terminal transition.
pub struct LoggingSink;

impl CompletionSink for LoggingSink {
    fn job_finished(&self, completion: &JobCompletion) {
        match completion.status {
            JobStatus::Completed => tracing::info!(
                job_id = completion.job_id,
                doc_id = %completion.doc_id,
                output = ?completion.output_path,
                "job completed"
            ),
            _ => tracing::error!(
                job_id = completion.job_id,
                doc_id = %completion.doc_id,
                error = completion.error.as_deref().unwrap_or("unknown"),
                "job failed terminally"
            ),
        }
    }
}

struct Inner {
    db: QueueDb,
    ledger: Arc<WorkerLedger>,
    tracker: Arc<ProgressTracker>,
    transformer: Arc<dyn UnitTransformer>,
    sink: Arc<dyn CompletionSink>,
    out_dir: PathBuf,
    /// Single-flight token: set while a drain pass runs.
    draining: AtomicBool,
    /// Trigger arrived while draining; forces another pass.
    dirty: AtomicBool,
    /// When the in-progress drain started, for stuck-drain detection.
    drain_started: Mutex<Option<Instant>>,
    stuck_drain_after: Duration,
}

/// The scheduling loop. Cloning shares all state; triggers are safe to call
/// from any task.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(
        db: QueueDb,
        cfg: &DfqConfig,
        transformer: Arc<dyn UnitTransformer>,
        sink: Arc<dyn CompletionSink>,
        out_dir: PathBuf,
    ) -> Self {
        Scheduler {
            inner: Arc::new(Inner {
                db,
                ledger: Arc::new(WorkerLedger::new(cfg.worker_budget)),
                tracker: Arc::new(ProgressTracker::new()),
                transformer,
                sink,
                out_dir,
                draining: AtomicBool::new(false),
                dirty: AtomicBool::new(false),
                drain_started: Mutex::new(None),
                stuck_drain_after: Duration::from_secs(cfg.stuck_drain_secs),
            }),
        }
    }

    pub fn ledger(&self) -> Arc<WorkerLedger> {
        Arc::clone(&self.inner.ledger)
    }

    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.inner.tracker)
    }

    /// Trigger: a new job was written to the store.
    pub async fn on_job_enqueued(&self) {
        self.drain_admissible().await;
    }

    /// Trigger: a job released its capacity (success, retry-requeue, or
    /// terminal failure). Re-evaluates the queue immediately instead of
    /// waiting for the tick.
    pub async fn on_job_finished(&self, job_id: JobId) {
        tracing::debug!(
            job_id,
            in_use = self.inner.ledger.in_use(),
            "capacity released"
        );
        self.drain_admissible().await;
    }

    /// Trigger: periodic liveness backstop against missed or lost completion
    /// signals. Also reports a drain pass that appears stuck.
    pub async fn on_periodic_tick(&self) {
        let held_since = *self.inner.drain_started.lock().unwrap();
        if let Some(at) = held_since {
            if at.elapsed() > self.inner.stuck_drain_after {
                tracing::warn!(
                    held_secs = at.elapsed().as_secs(),
                    "drain pass held beyond threshold; queue may be starved"
                );
            }
        }
        self.drain_admissible().await;
    }

    /// Spawn the backstop tick task. Abort the handle to stop it.
    pub fn spawn_tick(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let sched = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so startup triggers
            // stay with the enqueue path.
            interval.tick().await;
            loop {
                interval.tick().await;
                sched.on_periodic_tick().await;
            }
        })
    }

    /// True when the store holds no pending and no running jobs (fresh read).
    pub async fn is_idle(&self) -> Result<bool> {
        let counts = self.inner.db.snapshot_counts(Duration::ZERO).await?;
        Ok(counts.pending == 0 && counts.running == 0)
    }

    /// One logical drain: admit and launch until nothing is admissible.
    /// Re-entrant calls collapse into the in-progress drain via the dirty
    /// flag instead of overlapping or recursing.
    async fn drain_admissible(&self) {
        loop {
            if self
                .inner
                .draining
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                // Someone is draining; make sure they go around once more.
                self.inner.dirty.store(true, Ordering::Release);
                return;
            }
            *self.inner.drain_started.lock().unwrap() = Some(Instant::now());

            loop {
                self.inner.dirty.store(false, Ordering::Release);
                self.drain_once().await;
                if !self.inner.dirty.load(Ordering::Acquire) {
                    break;
                }
            }

            *self.inner.drain_started.lock().unwrap() = None;
            self.inner.draining.store(false, Ordering::Release);

            // A trigger may have slipped in between the last dirty check and
            // releasing the guard; pick it up here rather than dropping it.
            if !self.inner.dirty.load(Ordering::Acquire) {
                return;
            }
        }
    }

    async fn drain_once(&self) {
        loop {
            match try_admit_next(&self.inner.db, &self.inner.ledger).await {
                Ok(Some(job)) => self.launch(job),
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("queue scan failed: {:#}", e);
                    break;
                }
            }
        }
    }

    /// Run an admitted job in its own task. The completion path releases the
    /// reservation, records the outcome, fires the sink on terminal
    /// transitions, and re-triggers the drain.
    fn launch(&self, job: QueueJob) {
        let sched = self.clone();
        tokio::spawn(async move {
            let inner = &sched.inner;
            let job_id = job.id;
            let doc_id = job.doc_id.clone();
            inner
                .tracker
                .estimate_pending(&doc_id, document::estimate_units(job.size_bytes.max(0) as u64));

            let result = execute::run_job(
                &job,
                Arc::clone(&inner.transformer),
                Arc::clone(&inner.tracker),
                &inner.out_dir,
            )
            .await;

            match result {
                Ok(report) => {
                    if let Err(e) = inner.db.mark_completed(job_id).await {
                        tracing::error!(job_id, "record completion failed: {:#}", e);
                    }
                    inner.sink.job_finished(&JobCompletion {
                        job_id,
                        doc_id,
                        status: JobStatus::Completed,
                        error: None,
                        output_path: Some(report.output_path),
                    });
                }
                Err(err) => {
                    inner.tracker.discard_job(&doc_id);
                    match inner.db.mark_failed_or_retry(job_id, &err.to_string()).await {
                        Ok(JobOutcome::Requeued { retries }) => {
                            tracing::warn!(job_id, retries, "job requeued after failure");
                        }
                        Ok(JobOutcome::Failed) => {
                            inner.sink.job_finished(&JobCompletion {
                                job_id,
                                doc_id,
                                status: JobStatus::Failed,
                                error: Some(err.to_string()),
                                output_path: None,
                            });
                        }
                        Err(e) => {
                            tracing::error!(job_id, "record failure failed: {:#}", e);
                        }
                    }
                }
            }

            inner.ledger.release(job_id);
            sched.on_job_finished(job_id).await;
        });
    }
}
