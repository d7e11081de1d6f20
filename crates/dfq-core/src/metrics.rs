//! Per-job progress and global load metrics.
//!
//! Unit counters are written from the executor's blocking workers; totals may
//! be revised while a job runs (the pre-split estimate is only a heuristic).
//! The invariant is that reported processed units never exceed the total, so
//! progress can never read above 100%.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct ActiveJob {
    total_units: usize,
    processed_units: usize,
    started_at: Instant,
    /// False while `total_units` is still the pre-split estimate.
    authoritative: bool,
}

/// Progress snapshot for one job.
#[derive(Debug, Clone)]
pub struct JobProgress {
    pub total_units: usize,
    pub processed_units: usize,
    pub started_at: Instant,
}

impl JobProgress {
    /// Percent complete in [0, 100]. An empty job reads as done.
    pub fn progress_pct(&self) -> f64 {
        if self.total_units == 0 {
            return 100.0;
        }
        (self.processed_units as f64 / self.total_units as f64 * 100.0).min(100.0)
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Coarse operator-facing load classification, derived purely from the count
/// of active jobs. Never used for admission decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadLevel {
    Low,
    Medium,
    High,
}

impl LoadLevel {
    pub fn for_active_jobs(n: usize) -> Self {
        match n {
            0 => LoadLevel::Low,
            1 => LoadLevel::Medium,
            _ => LoadLevel::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoadLevel::Low => "LOW",
            LoadLevel::Medium => "MEDIUM",
            LoadLevel::High => "HIGH",
        }
    }
}

/// Global counters across the process lifetime.
#[derive(Debug, Clone)]
pub struct GlobalStats {
    pub active_jobs: usize,
    pub total_completed: u64,
    pub avg_duration_ms: f64,
    pub load_level: LoadLevel,
}

/// Process-wide progress tracker. Cheap to share; all per-job state sits
/// behind one mutex, global totals are atomics.
#[derive(Default)]
pub struct ProgressTracker {
    active: Mutex<HashMap<String, ActiveJob>>,
    total_completed: AtomicU64,
    total_duration_ms: AtomicU64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pre-split estimate so callers see early progress before the
    /// document is actually split. No-op if the job is already tracked.
    pub fn estimate_pending(&self, doc_id: &str, estimated_units: usize) {
        let mut active = self.active.lock().unwrap();
        active.entry(doc_id.to_string()).or_insert_with(|| ActiveJob {
            total_units: estimated_units,
            processed_units: 0,
            started_at: Instant::now(),
            authoritative: false,
        });
    }

    /// Fix the authoritative unit count once splitting completes. Replaces
    /// any estimate, but never drops the total below units already counted.
    pub fn begin_job(&self, doc_id: &str, total_units: usize) {
        let mut active = self.active.lock().unwrap();
        match active.get_mut(doc_id) {
            Some(job) => {
                job.total_units = total_units.max(job.processed_units);
                job.authoritative = true;
            }
            None => {
                active.insert(
                    doc_id.to_string(),
                    ActiveJob {
                        total_units,
                        processed_units: 0,
                        started_at: Instant::now(),
                        authoritative: true,
                    },
                );
            }
        }
    }

    /// Count one processed unit, success or failure. If the count overtakes
    /// the recorded total (stale estimate), the total is raised to match.
    pub fn unit_completed(&self, doc_id: &str) {
        let mut active = self.active.lock().unwrap();
        if let Some(job) = active.get_mut(doc_id) {
            job.processed_units += 1;
            if job.processed_units > job.total_units {
                job.total_units = job.processed_units;
                tracing::debug!(
                    doc_id,
                    total = job.total_units,
                    "raised unit total to match processed count"
                );
            }
        }
    }

    /// Stop tracking a job and fold its duration into the global totals.
    pub fn end_job(&self, doc_id: &str) {
        let removed = self.active.lock().unwrap().remove(doc_id);
        if let Some(job) = removed {
            let elapsed = job.started_at.elapsed();
            self.total_completed.fetch_add(1, Ordering::Relaxed);
            self.total_duration_ms
                .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
            tracing::info!(
                doc_id,
                units = job.total_units,
                elapsed_ms = elapsed.as_millis() as u64,
                "job tracking finished"
            );
        }
    }

    /// Drop a job without counting it as processed. Used when a run fails
    /// job-level; a retry starts tracking afresh.
    pub fn discard_job(&self, doc_id: &str) {
        self.active.lock().unwrap().remove(doc_id);
    }

    /// Progress snapshot for one active job, None when not tracked.
    pub fn status_of(&self, doc_id: &str) -> Option<JobProgress> {
        let active = self.active.lock().unwrap();
        active.get(doc_id).map(|job| JobProgress {
            total_units: job.total_units,
            processed_units: job.processed_units,
            started_at: job.started_at,
        })
    }

    pub fn global_stats(&self) -> GlobalStats {
        let active_jobs = self.active.lock().unwrap().len();
        let total_completed = self.total_completed.load(Ordering::Relaxed);
        let total_ms = self.total_duration_ms.load(Ordering::Relaxed);
        let avg_duration_ms = if total_completed > 0 {
            total_ms as f64 / total_completed as f64
        } else {
            0.0
        };
        GlobalStats {
            active_jobs,
            total_completed,
            avg_duration_ms,
            load_level: LoadLevel::for_active_jobs(active_jobs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_is_replaced_by_authoritative_count() {
        let t = ProgressTracker::new();
        t.estimate_pending("doc", 22);
        assert_eq!(t.status_of("doc").unwrap().total_units, 22);

        // The real split found fewer units than the heuristic guessed.
        t.begin_job("doc", 7);
        let p = t.status_of("doc").unwrap();
        assert_eq!(p.total_units, 7);
        assert_eq!(p.processed_units, 0);
    }

    #[test]
    fn processed_never_exceeds_total() {
        let t = ProgressTracker::new();
        t.begin_job("doc", 2);
        t.unit_completed("doc");
        t.unit_completed("doc");
        // A third unit turned up that the split estimate missed.
        t.unit_completed("doc");
        let p = t.status_of("doc").unwrap();
        assert_eq!(p.processed_units, 3);
        assert_eq!(p.total_units, 3);
        assert!(p.progress_pct() <= 100.0);
    }

    #[test]
    fn progress_pct_clamps_and_handles_empty_jobs() {
        let t = ProgressTracker::new();
        t.begin_job("empty", 0);
        assert_eq!(t.status_of("empty").unwrap().progress_pct(), 100.0);

        t.begin_job("doc", 4);
        t.unit_completed("doc");
        let pct = t.status_of("doc").unwrap().progress_pct();
        assert!((pct - 25.0).abs() < 1e-9);
    }

    #[test]
    fn begin_after_progress_keeps_counted_units() {
        let t = ProgressTracker::new();
        t.estimate_pending("doc", 3);
        t.unit_completed("doc");
        t.unit_completed("doc");
        // Authoritative count below what is already processed must not win.
        t.begin_job("doc", 1);
        let p = t.status_of("doc").unwrap();
        assert_eq!(p.total_units, 2);
        assert_eq!(p.processed_units, 2);
    }

    #[test]
    fn unit_completed_for_unknown_doc_is_ignored() {
        let t = ProgressTracker::new();
        t.unit_completed("ghost");
        assert!(t.status_of("ghost").is_none());
    }

    #[test]
    fn discard_drops_tracking_without_counting() {
        let t = ProgressTracker::new();
        t.begin_job("doc", 5);
        t.unit_completed("doc");
        t.discard_job("doc");
        assert!(t.status_of("doc").is_none());
        assert_eq!(t.global_stats().total_completed, 0);
    }

    #[test]
    fn load_level_tracks_active_job_count() {
        let t = ProgressTracker::new();
        assert_eq!(t.global_stats().load_level, LoadLevel::Low);
        t.begin_job("a", 1);
        assert_eq!(t.global_stats().load_level, LoadLevel::Medium);
        t.begin_job("b", 1);
        assert_eq!(t.global_stats().load_level, LoadLevel::High);

        t.end_job("a");
        t.end_job("b");
        let stats = t.global_stats();
        assert_eq!(stats.load_level, LoadLevel::Low);
        assert_eq!(stats.active_jobs, 0);
        assert_eq!(stats.total_completed, 2);
    }
}
