//! `dfq queue` – queue snapshot: counts plus pending jobs in admission order.

use anyhow::Result;
use std::time::Duration;

use dfq_core::config::DfqConfig;
use dfq_core::queue_db::{JobStatus, QueueDb};

pub async fn run_queue(db: &QueueDb, cfg: &DfqConfig) -> Result<()> {
    let counts = db
        .snapshot_counts(Duration::from_secs(cfg.stats_cache_secs))
        .await?;
    println!(
        "pending {}  running {}  completed {}  failed {}",
        counts.pending, counts.running, counts.completed, counts.failed
    );

    let mut pending: Vec<_> = db
        .list_jobs()
        .await?
        .into_iter()
        .filter(|j| j.status == JobStatus::Pending)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    // Admission order, not insertion order.
    let mut ordered = Vec::with_capacity(pending.len());
    for job in pending.drain(..) {
        let pos = db.queue_position(job.id).await?.unwrap_or(usize::MAX);
        ordered.push((pos, job));
    }
    ordered.sort_by_key(|(pos, _)| *pos);

    println!("{:<4} {:<6} {:<8} {:<8} {:<10} SOURCE", "POS", "ID", "PRIO", "WORKERS", "SIZE");
    for (pos, job) in ordered {
        println!(
            "{:<4} {:<6} {:<8} {:<8} {:<10} {}",
            pos,
            job.id,
            job.priority.as_str(),
            job.estimated_workers,
            job.size_bytes,
            job.source_path
        );
    }
    Ok(())
}
