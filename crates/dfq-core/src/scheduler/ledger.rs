//! Global worker ledger shared across jobs.
//!
//! Every running job holds its estimated worker allotment here; the sum of
//! held workers never exceeds the budget. Reservation is all-or-nothing and
//! atomic under one lock, so concurrent admission attempts cannot
//! over-commit the budget or double-reserve a job.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::queue_db::JobId;

/// Process-wide accounting of worker capacity, keyed by job id.
#[derive(Debug)]
pub struct WorkerLedger {
    max_total: usize,
    held: Mutex<HashMap<JobId, usize>>,
}

impl WorkerLedger {
    /// Create a ledger with the given budget (e.g. from config).
    pub fn new(max_total: usize) -> Self {
        Self {
            max_total: max_total.max(1),
            held: Mutex::new(HashMap::new()),
        }
    }

    pub fn budget(&self) -> usize {
        self.max_total
    }

    /// Workers currently reserved across all jobs.
    pub fn in_use(&self) -> usize {
        self.held.lock().unwrap().values().sum()
    }

    /// Free capacity (budget - in_use). May be 0 while jobs hold the budget.
    pub fn available(&self) -> usize {
        let held = self.held.lock().unwrap();
        self.max_total.saturating_sub(held.values().sum())
    }

    /// Reserve exactly `workers` for `job_id`, all or nothing. Returns false
    /// when the budget would be exceeded or the job already holds a
    /// reservation. Pair every successful reserve with a `release`.
    pub fn try_reserve(&self, job_id: JobId, workers: usize) -> bool {
        let workers = workers.max(1);
        let mut held = self.held.lock().unwrap();
        if held.contains_key(&job_id) {
            return false;
        }
        let in_use: usize = held.values().sum();
        if in_use + workers > self.max_total {
            return false;
        }
        held.insert(job_id, workers);
        true
    }

    /// Release the job's reservation. Returns the worker count freed
    /// (0 if the job held nothing).
    pub fn release(&self, job_id: JobId) -> usize {
        self.held.lock().unwrap().remove(&job_id).unwrap_or(0)
    }
}
