//! `dfq run` – drive the scheduler until the queue drains (or forever).

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dfq_core::config::DfqConfig;
use dfq_core::queue_db::QueueDb;
use dfq_core::scheduler::{LoggingSink, Scheduler};
use dfq_core::transform::ServiceTransformer;

pub async fn run_scheduler(
    db: &QueueDb,
    cfg: &DfqConfig,
    out_dir: PathBuf,
    watch: bool,
) -> Result<()> {
    // Jobs stranded RUNNING by a previous crash go back to the queue.
    let recovered = db.recover_running_jobs().await?;
    if recovered > 0 {
        println!("Requeued {} job(s) left running by a previous run.", recovered);
    }
    db.cleanup_old_records(Duration::from_secs(cfg.cleanup_max_age_days * 24 * 3600))
        .await?;

    let transformer =
        Arc::new(ServiceTransformer::new(&cfg.service()).context("transformation service setup")?);
    let sched = Scheduler::new(
        db.clone(),
        cfg,
        transformer,
        Arc::new(LoggingSink),
        out_dir,
    );

    let tick = sched.spawn_tick(Duration::from_secs(cfg.tick_interval_secs.max(1)));
    sched.on_job_enqueued().await;

    if watch {
        println!(
            "Watching queue (worker budget {}). Stop with Ctrl-C.",
            cfg.worker_budget
        );
        std::future::pending::<()>().await;
    }

    loop {
        if sched.is_idle().await? {
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    tick.abort();

    let stats = sched.tracker().global_stats();
    let counts = db.snapshot_counts(Duration::ZERO).await?;
    println!(
        "Queue drained: {} completed this run, {} failed total, avg {:.0} ms per job.",
        stats.total_completed, counts.failed, stats.avg_duration_ms
    );
    Ok(())
}
