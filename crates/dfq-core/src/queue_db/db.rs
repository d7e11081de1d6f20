//! SQLite-backed queue database: connection, migration, timestamp helpers.
//! Job reads/writes live in `jobs`.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use super::types::QueueCounts;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the SQLite-backed queue database.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/dfq/jobs.db`. Cloning shares the pool and the count cache.
#[derive(Clone)]
pub struct QueueDb {
    pub(crate) pool: Pool<Sqlite>,
    /// Cached `snapshot_counts` result, shared across clones so status
    /// polling does not hammer the store.
    pub(crate) counts_cache: Arc<Mutex<Option<(Instant, QueueCounts)>>>,
}

impl QueueDb {
    /// Open (or create) the default queue database and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("dfq")?;
        let state_dir = xdg_dirs.get_state_home().join("dfq");
        let db_path = state_dir.join("jobs.db");

        tokio::fs::create_dir_all(&state_dir).await?;

        let uri = path_to_sqlite_uri(&db_path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;

        let db = Self::from_pool(pool);
        db.migrate().await?;
        Ok(db)
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    /// Intended for tests so the DB can be placed in a temp directory.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;
        let db = Self::from_pool(pool);
        db.migrate().await?;
        Ok(db)
    }

    fn from_pool(pool: Pool<Sqlite>) -> Self {
        QueueDb {
            pool,
            counts_cache: Arc::new(Mutex::new(None)),
        }
    }

    async fn migrate(&self) -> Result<()> {
        // Single-table schema. Priority and status are stored as strings;
        // candidate ordering maps priority to a rank in the query itself.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue_jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                doc_id TEXT NOT NULL UNIQUE,
                source_path TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                priority TEXT NOT NULL,
                estimated_workers INTEGER NOT NULL,
                status TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                created_at INTEGER NOT NULL,
                started_at INTEGER,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Current time as Unix seconds (for DB timestamps). Pub for use by `jobs`.
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<QueueDb> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let db = QueueDb::from_pool(pool);
    db.migrate().await?;
    Ok(db)
}
