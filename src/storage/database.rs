//! SQLite Database
//!
//! Embedded document store for tasks, sub-tasks, style templates, and assets,
//! using rusqlite with r2d2 connection pooling.

use chrono::{SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::models::asset::{Asset, GenerationMetadata};
use crate::models::style::StyleTemplate;
use crate::models::subtask::{SubTask, SubTaskStatus};
use crate::models::task::{ExpandedPrompt, Task, TaskStatus};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::database_path;

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Current UTC time as an RFC3339 string (the timestamp format stored in
/// every column this crate writes).
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Per-status sub-task counts for one parent task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubTaskStatusCounts {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub success: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Database service for managing SQLite operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

fn json_column_error<E>(index: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
}

fn task_from_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let style_ids: String = row.get(2)?;
    let model_ids: String = row.get(3)?;
    let prompts: String = row.get(8)?;
    let status: String = row.get(9)?;
    Ok(Task {
        id: row.get(0)?,
        subject: row.get(1)?,
        style_ids: serde_json::from_str(&style_ids).map_err(|e| json_column_error(2, e))?,
        model_ids: serde_json::from_str(&model_ids).map_err(|e| json_column_error(3, e))?,
        count_per_prompt: row.get(4)?,
        include_base_style: row.get(5)?,
        variant_count: row.get(6)?,
        aspect_ratio: row.get(7)?,
        prompts: serde_json::from_str(&prompts).map_err(|e| json_column_error(8, e))?,
        status: status.parse().map_err(|e| json_column_error(9, e))?,
        progress: row.get(10)?,
        error_message: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn subtask_from_row(row: &rusqlite::Row) -> rusqlite::Result<SubTask> {
    let status: String = row.get(2)?;
    Ok(SubTask {
        id: row.get(0)?,
        task_id: row.get(1)?,
        status: status.parse().map_err(|e| json_column_error(2, e))?,
        style_id: row.get(3)?,
        model_id: row.get(4)?,
        prompt_id: row.get(5)?,
        final_prompt: row.get(6)?,
        negative_prompt: row.get(7)?,
        batch_index: row.get(8)?,
        aspect_ratio: row.get(9)?,
        seed: row.get(10)?,
        retry_count: row.get(11)?,
        error_log: row.get(12)?,
        error_category: row.get(13)?,
        request_snapshot: row.get(14)?,
        response_snapshot: row.get(15)?,
        started_at: row.get(16)?,
        completed_at: row.get(17)?,
        locked_by: row.get(18)?,
        lock_expires_at: row.get(19)?,
        created_at: row.get(20)?,
        updated_at: row.get(21)?,
    })
}

const TASK_COLUMNS: &str = "id, subject, style_ids, model_ids, count_per_prompt, \
     include_base_style, variant_count, aspect_ratio, prompts, status, progress, \
     error_message, created_at, updated_at";

const SUBTASK_COLUMNS: &str = "id, task_id, status, style_id, model_id, prompt_id, \
     final_prompt, negative_prompt, batch_index, aspect_ratio, seed, retry_count, \
     error_log, error_category, request_snapshot, response_snapshot, started_at, \
     completed_at, locked_by, lock_expires_at, created_at, updated_at";

impl Database {
    /// Create a database from an existing connection pool.
    pub fn from_pool(pool: DbPool) -> AppResult<Self> {
        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database for testing.
    ///
    /// Uses an in-memory SQLite database with the same schema as the
    /// production database. Useful for integration and unit tests.
    pub fn new_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;
        Self::from_pool(pool)
    }

    /// Create a new database instance with connection pooling
    pub fn new() -> AppResult<Self> {
        let db_path = database_path()?;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;
        Self::from_pool(pool)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> AppResult<()> {
        let conn = self.get_connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                subject TEXT NOT NULL,
                style_ids TEXT NOT NULL DEFAULT '[]',
                model_ids TEXT NOT NULL DEFAULT '[]',
                count_per_prompt INTEGER NOT NULL DEFAULT 1,
                include_base_style INTEGER NOT NULL DEFAULT 0,
                variant_count INTEGER NOT NULL DEFAULT 4,
                aspect_ratio TEXT NOT NULL DEFAULT '1:1',
                prompts TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL DEFAULT 'draft',
                progress INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS subtasks (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                style_id TEXT NOT NULL,
                model_id TEXT NOT NULL,
                prompt_id TEXT NOT NULL,
                final_prompt TEXT NOT NULL,
                negative_prompt TEXT NOT NULL DEFAULT '',
                batch_index INTEGER NOT NULL,
                aspect_ratio TEXT NOT NULL DEFAULT '1:1',
                seed INTEGER,
                retry_count INTEGER NOT NULL DEFAULT 0,
                error_log TEXT,
                error_category TEXT,
                request_snapshot TEXT,
                response_snapshot TEXT,
                started_at TEXT,
                completed_at TEXT,
                locked_by TEXT,
                lock_expires_at TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (task_id) REFERENCES tasks(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_subtasks_task_id ON subtasks(task_id)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_subtasks_status ON subtasks(status)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS style_templates (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                positive TEXT NOT NULL,
                negative TEXT NOT NULL DEFAULT '',
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS assets (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL,
                subtask_id TEXT NOT NULL,
                filename TEXT NOT NULL,
                content_type TEXT NOT NULL,
                byte_len INTEGER NOT NULL,
                data BLOB NOT NULL,
                metadata TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (task_id) REFERENCES tasks(id),
                FOREIGN KEY (subtask_id) REFERENCES subtasks(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_assets_task_id ON assets(task_id)",
            [],
        )?;

        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> AppResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))
    }

    /// Access the underlying pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Check database health with a trivial query
    pub fn is_healthy(&self) -> bool {
        self.get_connection()
            .and_then(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))
                    .map_err(AppError::from)
            })
            .is_ok()
    }

    // =======================================================================
    // Tasks
    // =======================================================================

    pub fn insert_task(&self, task: &Task) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO tasks (id, subject, style_ids, model_ids, count_per_prompt,
                 include_base_style, variant_count, aspect_ratio, prompts, status, progress,
                 error_message, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                 CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
            params![
                task.id,
                task.subject,
                serde_json::to_string(&task.style_ids)?,
                serde_json::to_string(&task.model_ids)?,
                task.count_per_prompt,
                task.include_base_style,
                task.variant_count,
                task.aspect_ratio,
                serde_json::to_string(&task.prompts)?,
                task.status.as_str(),
                task.progress,
                task.error_message,
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> AppResult<Option<Task>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
            params![id],
            task_from_row,
        );
        match result {
            Ok(task) => Ok(Some(task)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    pub fn list_tasks_by_status(&self, status: TaskStatus) -> AppResult<Vec<Task>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tasks WHERE status = ?1 ORDER BY created_at DESC",
            TASK_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![status.as_str()], task_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Update a task's lifecycle status (orchestrator transitions, not the
    /// aggregator's derived write).
    pub fn update_task_status(
        &self,
        id: &str,
        status: TaskStatus,
        error_message: Option<&str>,
    ) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE tasks SET status = ?2, error_message = ?3, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1",
            params![id, status.as_str(), error_message],
        )?;
        Ok(())
    }

    /// Persist the expanded prompt variants on a task.
    pub fn set_task_prompts(&self, id: &str, prompts: &[ExpandedPrompt]) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE tasks SET prompts = ?2, updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
            params![id, serde_json::to_string(prompts)?],
        )?;
        Ok(())
    }

    /// Write the aggregator's derived progress/status snapshot.
    ///
    /// Never overwrites a task that has been cancelled; last-write-wins
    /// between concurrent aggregator runs is acceptable (derived cache).
    pub fn update_task_progress(
        &self,
        id: &str,
        progress: u8,
        status: TaskStatus,
    ) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE tasks SET progress = ?2, status = ?3, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1 AND status != 'cancelled'",
            params![id, progress, status.as_str()],
        )?;
        Ok(())
    }

    // =======================================================================
    // Sub-tasks
    // =======================================================================

    pub fn insert_subtask(&self, subtask: &SubTask) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO subtasks (id, task_id, status, style_id, model_id, prompt_id,
                 final_prompt, negative_prompt, batch_index, aspect_ratio, seed, retry_count,
                 error_log, error_category, request_snapshot, response_snapshot, started_at,
                 completed_at, locked_by, lock_expires_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19, ?20, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
            params![
                subtask.id,
                subtask.task_id,
                subtask.status.as_str(),
                subtask.style_id,
                subtask.model_id,
                subtask.prompt_id,
                subtask.final_prompt,
                subtask.negative_prompt,
                subtask.batch_index,
                subtask.aspect_ratio,
                subtask.seed,
                subtask.retry_count,
                subtask.error_log,
                subtask.error_category,
                subtask.request_snapshot,
                subtask.response_snapshot,
                subtask.started_at,
                subtask.completed_at,
                subtask.locked_by,
                subtask.lock_expires_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_subtask(&self, id: &str) -> AppResult<Option<SubTask>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            &format!("SELECT {} FROM subtasks WHERE id = ?1", SUBTASK_COLUMNS),
            params![id],
            subtask_from_row,
        );
        match result {
            Ok(subtask) => Ok(Some(subtask)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    pub fn list_subtasks_for_task(&self, task_id: &str) -> AppResult<Vec<SubTask>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM subtasks WHERE task_id = ?1 ORDER BY created_at, id",
            SUBTASK_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![task_id], subtask_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn list_subtasks_by_status(
        &self,
        task_id: &str,
        status: SubTaskStatus,
    ) -> AppResult<Vec<SubTask>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM subtasks WHERE task_id = ?1 AND status = ?2 ORDER BY created_at, id",
            SUBTASK_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![task_id, status.as_str()], subtask_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Per-status counts over all sub-tasks of one parent, read in a single
    /// grouped query (the aggregator's read half).
    pub fn subtask_status_counts(&self, task_id: &str) -> AppResult<SubTaskStatusCounts> {
        let conn = self.get_connection()?;
        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM subtasks WHERE task_id = ?1 GROUP BY status")?;
        let rows: Vec<(String, usize)> = stmt
            .query_map(params![task_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();

        let mut counts = SubTaskStatusCounts::default();
        for (status, count) in rows {
            counts.total += count;
            match status.parse::<SubTaskStatus>() {
                Ok(SubTaskStatus::Pending) => counts.pending += count,
                Ok(SubTaskStatus::Processing) => counts.processing += count,
                Ok(SubTaskStatus::Success) => counts.success += count,
                Ok(SubTaskStatus::Failed) => counts.failed += count,
                Ok(SubTaskStatus::Cancelled) => counts.cancelled += count,
                Err(_) => {}
            }
        }
        Ok(counts)
    }

    /// Claim a pending sub-task for a worker: a conditional write that moves
    /// `pending -> processing`, stamps `started_at`, and records the advisory
    /// lock. Returns false when the claim is lost (already taken and the
    /// previous lock has not expired).
    pub fn try_acquire_subtask(
        &self,
        id: &str,
        worker_id: &str,
        ttl_secs: i64,
    ) -> AppResult<bool> {
        let now = now_rfc3339();
        let expires = (Utc::now() + chrono::Duration::seconds(ttl_secs))
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let conn = self.get_connection()?;
        let changed = conn.execute(
            "UPDATE subtasks SET status = 'processing', locked_by = ?2, lock_expires_at = ?3,
                 started_at = ?4, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1 AND status = 'pending'
                 AND (locked_by IS NULL OR lock_expires_at IS NULL OR lock_expires_at < ?4)",
            params![id, worker_id, expires, now],
        )?;
        Ok(changed == 1)
    }

    /// Persist the outbound request snapshot before the provider call.
    pub fn set_subtask_request_snapshot(&self, id: &str, snapshot: &str) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE subtasks SET request_snapshot = ?2, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1",
            params![id, snapshot],
        )?;
        Ok(())
    }

    /// Persist the raw provider response snapshot.
    pub fn set_subtask_response_snapshot(&self, id: &str, snapshot: &str) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE subtasks SET response_snapshot = ?2, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1",
            params![id, snapshot],
        )?;
        Ok(())
    }

    /// Terminal success: stamp completion, store the enriched response
    /// snapshot and final seed, release the lock.
    pub fn mark_subtask_success(
        &self,
        id: &str,
        response_snapshot: &str,
        seed: Option<i64>,
    ) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE subtasks SET status = 'success', response_snapshot = ?2, seed = ?3,
                 completed_at = ?4, locked_by = NULL, lock_expires_at = NULL,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1",
            params![id, response_snapshot, seed, now_rfc3339()],
        )?;
        Ok(())
    }

    /// Terminal failure: persist diagnostics, stamp completion, release the
    /// lock.
    pub fn mark_subtask_failed(
        &self,
        id: &str,
        error_log: &str,
        error_category: &str,
    ) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE subtasks SET status = 'failed', error_log = ?2, error_category = ?3,
                 completed_at = ?4, locked_by = NULL, lock_expires_at = NULL,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1",
            params![id, error_log, error_category, now_rfc3339()],
        )?;
        Ok(())
    }

    /// Signaled retry: back to pending with the incremented retry count and
    /// the failure diagnostics, lock released for the next attempt.
    pub fn schedule_subtask_retry(
        &self,
        id: &str,
        retry_count: u32,
        error_log: &str,
        error_category: &str,
    ) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE subtasks SET status = 'pending', retry_count = ?2, error_log = ?3,
                 error_category = ?4, locked_by = NULL, lock_expires_at = NULL,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1",
            params![id, retry_count, error_log, error_category],
        )?;
        Ok(())
    }

    /// Terminal cancellation observed at dispatch time.
    pub fn mark_subtask_cancelled(&self, id: &str) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE subtasks SET status = 'cancelled', completed_at = ?2, locked_by = NULL,
                 lock_expires_at = NULL, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1",
            params![id, now_rfc3339()],
        )?;
        Ok(())
    }

    /// Human-initiated retry: only a failed sub-task resets to pending, with
    /// retry budget and diagnostics cleared. Returns false when the sub-task
    /// was not in `failed`.
    pub fn reset_subtask_for_retry(&self, id: &str) -> AppResult<bool> {
        let conn = self.get_connection()?;
        let changed = conn.execute(
            "UPDATE subtasks SET status = 'pending', retry_count = 0, error_log = NULL,
                 error_category = NULL, started_at = NULL, completed_at = NULL,
                 locked_by = NULL, lock_expires_at = NULL, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1 AND status = 'failed'",
            params![id],
        )?;
        Ok(changed == 1)
    }

    // =======================================================================
    // Style templates
    // =======================================================================

    pub fn upsert_style_template(&self, template: &StyleTemplate) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO style_templates (id, name, positive, negative, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
             ON CONFLICT(id) DO UPDATE SET name = ?2, positive = ?3, negative = ?4,
                 updated_at = CURRENT_TIMESTAMP",
            params![template.id, template.name, template.positive, template.negative],
        )?;
        Ok(())
    }

    pub fn get_style_template(&self, id: &str) -> AppResult<Option<StyleTemplate>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT id, name, positive, negative FROM style_templates WHERE id = ?1",
            params![id],
            |row| {
                Ok(StyleTemplate {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    positive: row.get(2)?,
                    negative: row.get(3)?,
                })
            },
        );
        match result {
            Ok(template) => Ok(Some(template)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    pub fn list_style_templates(&self) -> AppResult<Vec<StyleTemplate>> {
        let conn = self.get_connection()?;
        let mut stmt =
            conn.prepare("SELECT id, name, positive, negative FROM style_templates ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StyleTemplate {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    positive: row.get(2)?,
                    negative: row.get(3)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    // =======================================================================
    // Assets
    // =======================================================================

    pub fn insert_asset(&self, asset: &Asset) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO assets (id, task_id, subtask_id, filename, content_type, byte_len,
                 data, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, CURRENT_TIMESTAMP)",
            params![
                asset.id,
                asset.task_id,
                asset.subtask_id,
                asset.filename,
                asset.content_type,
                asset.byte_len as i64,
                asset.data,
                serde_json::to_string(&asset.metadata)?,
            ],
        )?;
        Ok(())
    }

    pub fn get_asset(&self, id: &str) -> AppResult<Option<Asset>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT id, task_id, subtask_id, filename, content_type, byte_len, data, metadata,
                 created_at
             FROM assets WHERE id = ?1",
            params![id],
            |row| {
                let metadata: String = row.get(7)?;
                let metadata: GenerationMetadata =
                    serde_json::from_str(&metadata).map_err(|e| json_column_error(7, e))?;
                Ok(Asset {
                    id: row.get(0)?,
                    task_id: row.get(1)?,
                    subtask_id: row.get(2)?,
                    filename: row.get(3)?,
                    content_type: row.get(4)?,
                    byte_len: row.get::<_, i64>(5)? as u64,
                    data: row.get(6)?,
                    metadata,
                    created_at: row.get(8)?,
                })
            },
        );
        match result {
            Ok(asset) => Ok(Some(asset)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// List a task's assets without their blobs (listing surface).
    pub fn list_assets_for_task(&self, task_id: &str) -> AppResult<Vec<Asset>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, task_id, subtask_id, filename, content_type, byte_len, metadata,
                 created_at
             FROM assets WHERE task_id = ?1 ORDER BY created_at, id",
        )?;
        let rows = stmt
            .query_map(params![task_id], |row| {
                let metadata: String = row.get(6)?;
                let metadata: GenerationMetadata =
                    serde_json::from_str(&metadata).map_err(|e| json_column_error(6, e))?;
                Ok(Asset {
                    id: row.get(0)?,
                    task_id: row.get(1)?,
                    subtask_id: row.get(2)?,
                    filename: row.get(3)?,
                    content_type: row.get(4)?,
                    byte_len: row.get::<_, i64>(5)? as u64,
                    data: Vec::new(),
                    metadata,
                    created_at: row.get(7)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}
