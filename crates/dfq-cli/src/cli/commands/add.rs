//! `dfq add <path>` – enqueue a document for formatting.

use anyhow::{Context, Result};
use dfq_core::document;
use dfq_core::queue_db::QueueDb;
use std::path::Path;

pub async fn run_add(db: &QueueDb, path: &Path) -> Result<()> {
    let abs = std::fs::canonicalize(path)
        .with_context(|| format!("document not found: {}", path.display()))?;
    let size_bytes = std::fs::metadata(&abs)
        .with_context(|| format!("stat document: {}", abs.display()))?
        .len() as i64;
    let doc_id = document::doc_id_for_file(&abs)?;

    if let Some(existing) = db.find_by_doc_id(&doc_id).await? {
        println!(
            "Document already enqueued as job {} ({})",
            existing.id,
            existing.status.as_str()
        );
        return Ok(());
    }

    let id = db
        .add_job(&doc_id, &abs.to_string_lossy(), size_bytes)
        .await?;
    let job = db.get_job(id).await?.context("job vanished after insert")?;
    let position = db.queue_position(id).await?;
    println!(
        "Added job {} for {} ({} bytes, priority {}, {} workers, queue position {})",
        id,
        abs.display(),
        size_bytes,
        job.priority.as_str(),
        job.estimated_workers,
        position.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
    );
    Ok(())
}
