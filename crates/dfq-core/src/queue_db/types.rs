//! Types used by the job queue database.

/// Job identifier (row id).
pub type JobId = i64;

/// Documents under this size are HIGH priority with a 1-worker allotment.
pub const SMALL_DOC_BYTES: i64 = 1024 * 1024;

/// Documents at or over this size are LOW priority with a 3-worker allotment.
pub const LARGE_DOC_BYTES: i64 = 5 * 1024 * 1024;

/// A job failing this many times becomes terminal FAILED.
pub const MAX_RETRIES: i64 = 3;

/// High-level job status stored as a string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            _ => JobStatus::Failed,
        }
    }

    /// COMPLETED and FAILED are terminal; the completion sink fires once per
    /// transition into either.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Queueing priority, derived solely from the document size at enqueue.
/// Small documents are cheap and fast, so they go first; large documents are
/// still serviced FIFO within their class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    pub fn for_size(size_bytes: i64) -> Self {
        if size_bytes < SMALL_DOC_BYTES {
            Priority::High
        } else if size_bytes < LARGE_DOC_BYTES {
            Priority::Normal
        } else {
            Priority::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Normal,
        }
    }
}

/// Worker allotment for a document of the given size: 1, 2, or 3.
/// Fixed at enqueue, never recomputed.
pub fn workers_for_size(size_bytes: i64) -> i64 {
    if size_bytes < SMALL_DOC_BYTES {
        1
    } else if size_bytes < LARGE_DOC_BYTES {
        2
    } else {
        3
    }
}

/// Full job row used by the scheduler and status queries.
#[derive(Debug, Clone)]
pub struct QueueJob {
    pub id: JobId,
    /// Content-derived document id, unique across the table.
    pub doc_id: String,
    pub source_path: String,
    pub size_bytes: i64,
    pub priority: Priority,
    pub estimated_workers: i64,
    pub status: JobStatus,
    pub retry_count: i64,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub updated_at: i64,
}

/// Per-status row counts, served through a short-lived cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub pending: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
}

/// Result of `mark_failed_or_retry`: back to the queue or terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Requeued { retries: i64 },
    Failed,
}
