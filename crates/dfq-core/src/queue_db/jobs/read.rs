//! Job read operations: candidate selection, lookups, counts.

use anyhow::Result;
use sqlx::Row;
use std::time::{Duration, Instant};

use super::super::db::{unix_timestamp, QueueDb};
use super::super::types::{JobId, JobStatus, Priority, QueueCounts, QueueJob};

/// Shared SELECT column list + row mapping for full job rows.
const JOB_COLUMNS: &str = r#"
    id, doc_id, source_path, size_bytes, priority, estimated_workers,
    status, retry_count, error_message, created_at, started_at, updated_at
"#;

fn job_from_row(row: &sqlx::sqlite::SqliteRow) -> QueueJob {
    let priority: String = row.get("priority");
    let status: String = row.get("status");
    QueueJob {
        id: row.get("id"),
        doc_id: row.get("doc_id"),
        source_path: row.get("source_path"),
        size_bytes: row.get("size_bytes"),
        priority: Priority::from_str(&priority),
        estimated_workers: row.get("estimated_workers"),
        status: JobStatus::from_str(&status),
        retry_count: row.get("retry_count"),
        error_message: row.get("error_message"),
        created_at: row.get("created_at"),
        started_at: row.get("started_at"),
        updated_at: row.get("updated_at"),
    }
}

impl QueueDb {
    /// List all jobs, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<QueueJob>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM queue_jobs ORDER BY created_at DESC, id DESC",
            JOB_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(job_from_row).collect())
    }

    /// Fetch a single job row.
    pub async fn get_job(&self, id: JobId) -> Result<Option<QueueJob>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM queue_jobs WHERE id = ?1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(job_from_row))
    }

    /// Fetch a job by its content-derived document id.
    pub async fn find_by_doc_id(&self, doc_id: &str) -> Result<Option<QueueJob>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM queue_jobs WHERE doc_id = ?1",
            JOB_COLUMNS
        ))
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(job_from_row))
    }

    /// The next admission candidate: highest priority class first, then
    /// arrival order. Priority strictly dominates arrival order.
    pub async fn next_pending(&self) -> Result<Option<QueueJob>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM queue_jobs
            WHERE status = 'pending'
            ORDER BY CASE priority WHEN 'high' THEN 0 WHEN 'normal' THEN 1 ELSE 2 END,
                     created_at ASC, id ASC
            LIMIT 1
            "#,
            JOB_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(job_from_row))
    }

    /// 1-based position of a job among PENDING candidates, in admission
    /// order. None if the job is not pending.
    pub async fn queue_position(&self, id: JobId) -> Result<Option<usize>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM queue_jobs
            WHERE status = 'pending'
            ORDER BY CASE priority WHEN 'high' THEN 0 WHEN 'normal' THEN 1 ELSE 2 END,
                     created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .position(|row| row.get::<i64, _>("id") == id)
            .map(|i| i + 1))
    }

    /// Per-status counts, served from a cache while it is younger than
    /// `max_age`. Pass `Duration::ZERO` to force a fresh read. Counts are
    /// eventually consistent under polling load.
    pub async fn snapshot_counts(&self, max_age: Duration) -> Result<QueueCounts> {
        if let Some((at, counts)) = *self.counts_cache.lock().unwrap() {
            if at.elapsed() < max_age {
                return Ok(counts);
            }
        }

        let rows = sqlx::query(
            r#"SELECT status, COUNT(*) AS n FROM queue_jobs GROUP BY status"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = QueueCounts::default();
        for row in rows {
            let status: String = row.get("status");
            let n: i64 = row.get("n");
            match JobStatus::from_str(&status) {
                JobStatus::Pending => counts.pending = n,
                JobStatus::Running => counts.running = n,
                JobStatus::Completed => counts.completed = n,
                JobStatus::Failed => counts.failed = n,
            }
        }

        *self.counts_cache.lock().unwrap() = Some((Instant::now(), counts));
        Ok(counts)
    }

    /// RUNNING jobs whose start exceeds `threshold`, for operator display.
    /// Never cancels anything.
    pub async fn stuck_running_jobs(&self, threshold: Duration) -> Result<Vec<QueueJob>> {
        let cutoff = unix_timestamp() - threshold.as_secs() as i64;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM queue_jobs
            WHERE status = 'running' AND started_at IS NOT NULL AND started_at < ?1
            ORDER BY started_at ASC
            "#,
            JOB_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(job_from_row).collect())
    }
}
