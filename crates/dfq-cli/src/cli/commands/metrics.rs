//! `dfq metrics` – global queue metrics and long-running jobs.

use anyhow::Result;
use std::time::Duration;

use dfq_core::config::DfqConfig;
use dfq_core::metrics::LoadLevel;
use dfq_core::queue_db::QueueDb;

pub async fn run_metrics(db: &QueueDb, cfg: &DfqConfig) -> Result<()> {
    let counts = db
        .snapshot_counts(Duration::from_secs(cfg.stats_cache_secs))
        .await?;
    let load = LoadLevel::for_active_jobs(counts.running as usize);

    println!("active jobs:    {}", counts.running);
    println!("pending jobs:   {}", counts.pending);
    println!("completed jobs: {}", counts.completed);
    println!("failed jobs:    {}", counts.failed);
    println!("load level:     {}", load.as_str());

    let stuck = db
        .stuck_running_jobs(Duration::from_secs(cfg.stuck_job_secs))
        .await?;
    if !stuck.is_empty() {
        println!();
        println!("Jobs running longer than {}s (operator attention):", cfg.stuck_job_secs);
        for job in stuck {
            println!("  job {} ({}) since {:?}", job.id, job.doc_id, job.started_at);
        }
    }
    Ok(())
}
