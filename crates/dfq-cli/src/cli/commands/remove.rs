//! `dfq remove <id>` – delete a job row.

use anyhow::Result;
use dfq_core::queue_db::{JobStatus, QueueDb};

pub async fn run_remove(db: &QueueDb, id: i64) -> Result<()> {
    let Some(job) = db.get_job(id).await? else {
        println!("No job with id {}.", id);
        return Ok(());
    };
    if job.status == JobStatus::Running {
        println!("Job {} is running; it will finish, but its record is removed now.", id);
    }
    db.remove_job(id).await?;
    println!("Removed job {} ({}).", id, job.doc_id);
    Ok(())
}
