//! `dfq status <id>` – show one job's queue state.

use anyhow::Result;
use dfq_core::queue_db::{JobStatus, QueueDb};

pub async fn run_status(db: &QueueDb, id: i64) -> Result<()> {
    let Some(job) = db.get_job(id).await? else {
        println!("No job with id {}.", id);
        return Ok(());
    };

    println!("Job {} ({})", job.id, job.doc_id);
    println!("  source:   {}", job.source_path);
    println!("  size:     {} bytes", job.size_bytes);
    println!(
        "  class:    {} priority, {} workers",
        job.priority.as_str(),
        job.estimated_workers
    );
    println!("  status:   {}", job.status.as_str());
    if job.retry_count > 0 {
        println!("  retries:  {}", job.retry_count);
    }
    if let Some(err) = &job.error_message {
        println!("  last err: {}", err);
    }
    if job.status == JobStatus::Pending {
        if let Some(pos) = db.queue_position(job.id).await? {
            println!("  position: {} in queue", pos);
        }
    }
    if let Some(started) = job.started_at {
        println!("  started:  {}s ago", now_secs().saturating_sub(started));
    }
    Ok(())
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
