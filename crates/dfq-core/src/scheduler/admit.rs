//! Admission: pick the next queued job the worker budget can carry.

use anyhow::Result;

use crate::queue_db::{QueueDb, QueueJob};

use super::ledger::WorkerLedger;

/// Try to admit the highest-priority PENDING job.
///
/// Reserves the job's worker allotment all-or-nothing, then takes the
/// PENDING -> RUNNING transition in the store. Losing that transition to a
/// concurrent admitter returns the reservation and rescans. An exhausted
/// budget or an empty queue is a normal `Ok(None)`, never an error; the
/// caller waits for the next trigger instead of busy-waiting.
pub async fn try_admit_next(db: &QueueDb, ledger: &WorkerLedger) -> Result<Option<QueueJob>> {
    loop {
        let Some(job) = db.next_pending().await? else {
            return Ok(None);
        };
        let required = job.estimated_workers.max(1) as usize;

        if !ledger.try_reserve(job.id, required) {
            tracing::debug!(
                job_id = job.id,
                required,
                available = ledger.available(),
                "budget cannot carry next candidate"
            );
            return Ok(None);
        }

        if db.mark_running(job.id).await? {
            tracing::info!(
                job_id = job.id,
                doc_id = %job.doc_id,
                workers = required,
                in_use = ledger.in_use(),
                budget = ledger.budget(),
                "job admitted"
            );
            return Ok(Some(job));
        }

        // A concurrent admitter took this job between the scan and the
        // update; give the capacity back and look again.
        ledger.release(job.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue_db::db::open_memory;
    use crate::queue_db::JobStatus;

    #[tokio::test]
    async fn admits_in_priority_order_until_budget_is_full() {
        let db = open_memory().await.unwrap();
        let ledger = WorkerLedger::new(6);
        let small = db.add_job("doc-s", "/tmp/s.txt", 500 * 1024).await.unwrap();
        let medium = db.add_job("doc-m", "/tmp/m.txt", 2 * 1024 * 1024).await.unwrap();
        let large = db.add_job("doc-l", "/tmp/l.txt", 6 * 1024 * 1024).await.unwrap();

        // 1 + 2 + 3 = 6: all three fit the budget, admitted by priority.
        let a = try_admit_next(&db, &ledger).await.unwrap().unwrap();
        assert_eq!(a.id, small);
        assert_eq!(ledger.in_use(), 1);
        let b = try_admit_next(&db, &ledger).await.unwrap().unwrap();
        assert_eq!(b.id, medium);
        assert_eq!(ledger.in_use(), 3);
        let c = try_admit_next(&db, &ledger).await.unwrap().unwrap();
        assert_eq!(c.id, large);
        assert_eq!(ledger.in_use(), 6);

        assert!(try_admit_next(&db, &ledger).await.unwrap().is_none());
        for id in [small, medium, large] {
            let job = db.get_job(id).await.unwrap().unwrap();
            assert_eq!(job.status, JobStatus::Running);
        }
    }

    #[tokio::test]
    async fn high_priority_waits_only_for_capacity_not_arrival() {
        let db = open_memory().await.unwrap();
        let ledger = WorkerLedger::new(3);
        let large = db.add_job("doc-l", "/tmp/l.txt", 6 * 1024 * 1024).await.unwrap();
        let admitted = try_admit_next(&db, &ledger).await.unwrap().unwrap();
        assert_eq!(admitted.id, large);
        assert_eq!(ledger.available(), 0);

        // Small job arrives later; no capacity yet.
        let small = db.add_job("doc-s", "/tmp/s.txt", 500 * 1024).await.unwrap();
        assert!(try_admit_next(&db, &ledger).await.unwrap().is_none());

        // The instant one slot frees, the HIGH job goes in.
        ledger.release(large);
        let next = try_admit_next(&db, &ledger).await.unwrap().unwrap();
        assert_eq!(next.id, small);
    }

    #[tokio::test]
    async fn running_jobs_are_not_candidates() {
        let db = open_memory().await.unwrap();
        let ledger = WorkerLedger::new(6);
        let first = db.add_job("doc-1", "/tmp/a.txt", 100).await.unwrap();
        let second = db.add_job("doc-2", "/tmp/b.txt", 100).await.unwrap();

        // A concurrent admitter already took the first candidate.
        assert!(db.mark_running(first).await.unwrap());

        let admitted = try_admit_next(&db, &ledger).await.unwrap().unwrap();
        assert_eq!(admitted.id, second);
        assert_eq!(ledger.in_use(), 1);
        // No capacity leaked for the job this admitter never won.
        assert_eq!(ledger.release(first), 0);
    }

    #[tokio::test]
    async fn concurrent_admitters_never_double_admit() {
        let db = open_memory().await.unwrap();
        let ledger = WorkerLedger::new(6);
        let a = db.add_job("doc-a", "/tmp/a.txt", 100).await.unwrap();
        let b = db.add_job("doc-b", "/tmp/b.txt", 100).await.unwrap();

        let (left, right) = tokio::join!(
            try_admit_next(&db, &ledger),
            try_admit_next(&db, &ledger)
        );
        let left = left.unwrap().expect("one job each");
        let right = right.unwrap().expect("one job each");
        assert_ne!(left.id, right.id);
        assert!([a, b].contains(&left.id));
        assert!([a, b].contains(&right.id));
        assert_eq!(ledger.in_use(), 2);
    }

    #[tokio::test]
    async fn empty_queue_admits_nothing() {
        let db = open_memory().await.unwrap();
        let ledger = WorkerLedger::new(6);
        assert!(try_admit_next(&db, &ledger).await.unwrap().is_none());
        assert_eq!(ledger.in_use(), 0);
    }
}
