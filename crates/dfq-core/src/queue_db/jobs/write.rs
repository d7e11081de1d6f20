//! Job write operations: enqueue, status transitions, recovery, cleanup.

use anyhow::Result;
use sqlx::Row;
use std::time::Duration;

use super::super::db::{unix_timestamp, QueueDb};
use super::super::types::{
    workers_for_size, JobId, JobOutcome, JobStatus, Priority, MAX_RETRIES,
};

impl QueueDb {
    /// Insert a new PENDING job. Priority and worker allotment are derived
    /// from the byte size here and never recomputed.
    pub async fn add_job(&self, doc_id: &str, source_path: &str, size_bytes: i64) -> Result<JobId> {
        let now = unix_timestamp();
        let priority = Priority::for_size(size_bytes);
        let workers = workers_for_size(size_bytes);

        let row_id = sqlx::query(
            r#"
            INSERT INTO queue_jobs (
                doc_id, source_path, size_bytes, priority, estimated_workers,
                status, retry_count, error_message, created_at, started_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, ?7, NULL, ?7)
            "#,
        )
        .bind(doc_id)
        .bind(source_path)
        .bind(size_bytes)
        .bind(priority.as_str())
        .bind(workers)
        .bind(JobStatus::Pending.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        tracing::info!(
            job_id = row_id,
            doc_id,
            size_bytes,
            priority = priority.as_str(),
            workers,
            "job enqueued"
        );
        Ok(row_id)
    }

    /// Transition PENDING -> RUNNING, setting the start timestamp. The update
    /// is conditioned on the current status so two concurrent admitters can
    /// never both take the same job; returns whether this caller won.
    pub async fn mark_running(&self, id: JobId) -> Result<bool> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE queue_jobs
            SET status = 'running',
                started_at = ?1,
                updated_at = ?1
            WHERE id = ?2 AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() == 1)
    }

    /// Transition to terminal COMPLETED.
    pub async fn mark_completed(&self, id: JobId) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE queue_jobs
            SET status = 'completed',
                updated_at = ?1
            WHERE id = ?2
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a job-level failure: requeue as PENDING with an incremented
    /// retry count while under the cap, otherwise terminal FAILED. The last
    /// error message is retained either way.
    pub async fn mark_failed_or_retry(&self, id: JobId, error: &str) -> Result<JobOutcome> {
        let now = unix_timestamp();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(r#"SELECT retry_count FROM queue_jobs WHERE id = ?1"#)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.commit().await?;
            anyhow::bail!("job {} not found", id);
        };
        let retries: i64 = row.get::<i64, _>("retry_count") + 1;

        let outcome = if retries >= MAX_RETRIES {
            sqlx::query(
                r#"
                UPDATE queue_jobs
                SET status = 'failed',
                    retry_count = ?1,
                    error_message = ?2,
                    updated_at = ?3
                WHERE id = ?4
                "#,
            )
            .bind(retries)
            .bind(error)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
            JobOutcome::Failed
        } else {
            sqlx::query(
                r#"
                UPDATE queue_jobs
                SET status = 'pending',
                    retry_count = ?1,
                    error_message = ?2,
                    started_at = NULL,
                    updated_at = ?3
                WHERE id = ?4
                "#,
            )
            .bind(retries)
            .bind(error)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
            JobOutcome::Requeued { retries }
        };

        tx.commit().await?;
        match outcome {
            JobOutcome::Failed => {
                tracing::error!(job_id = id, retries, error, "job failed terminally")
            }
            JobOutcome::Requeued { retries } => {
                tracing::warn!(job_id = id, retries, error, "job requeued for retry")
            }
        }
        Ok(outcome)
    }

    /// Normalize any job left RUNNING back to PENDING (e.g. after a crash).
    /// Call before scheduling so stranded jobs are picked up again; safe
    /// because unit execution is at-least-once. Returns the number reset.
    pub async fn recover_running_jobs(&self) -> Result<u64> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE queue_jobs
            SET status = 'pending',
                started_at = NULL,
                updated_at = ?1
            WHERE status = 'running'
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }

    /// Delete terminal rows older than `max_age`. Returns the number removed.
    pub async fn cleanup_old_records(&self, max_age: Duration) -> Result<u64> {
        let cutoff = unix_timestamp() - max_age.as_secs() as i64;
        let r = sqlx::query(
            r#"
            DELETE FROM queue_jobs
            WHERE status IN ('completed', 'failed') AND created_at < ?1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        if r.rows_affected() > 0 {
            tracing::info!(removed = r.rows_affected(), "cleaned up old queue rows");
        }
        Ok(r.rows_affected())
    }

    /// Permanently remove a job row.
    pub async fn remove_job(&self, id: JobId) -> Result<()> {
        sqlx::query(r#"DELETE FROM queue_jobs WHERE id = ?1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
