//! TaskStore implementation backed by SQLite.
//!
//! Two tables: `tasks` and `chunks` (many chunks per task). Tags are stored
//! as serialized JSON text and decoded back into structured values on read.
//!
//! Decomposition runs under a per-task claim: `claim_unchunked` flips eligible
//! tasks from `unchunked` to `chunking` in one transaction, and
//! `complete_claim` writes all chunks and marks the tasks `chunked` in another.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::domain::{Chunk, ChunkStatus, Tags, Task, TaskWithChunks};
use crate::error::{ChunkdError, Result};
use crate::id::now_ms;

const TASK_COLUMNS: &str =
    "id, title, estimate, deadline, tags, depends_on, chunk_status, created_at, updated_at";

const CHUNK_COLUMNS: &str =
    "id, task_id, title, duration, scheduled_at, calendar_event_id, tags, created_at";

/// TaskStore manages tasks and chunks in a SQLite database.
pub struct TaskStore {
    /// Database location (None for in-memory stores)
    db_path: Option<PathBuf>,

    db: Connection,
}

impl TaskStore {
    /// Open or create a store at the given database file.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;

        Ok(Self {
            db_path: Some(db_path.to_path_buf()),
            db,
        })
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db_path: None, db })
    }

    /// Initialize the SQLite schema.
    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                estimate INTEGER NOT NULL,
                deadline TEXT,
                tags TEXT NOT NULL DEFAULT '{}',
                depends_on TEXT,
                chunk_status TEXT NOT NULL DEFAULT 'unchunked',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(chunk_status);
            CREATE INDEX IF NOT EXISTS idx_tasks_created ON tasks(created_at);

            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL REFERENCES tasks(id),
                title TEXT NOT NULL,
                duration INTEGER NOT NULL,
                scheduled_at TEXT,
                calendar_event_id TEXT,
                tags TEXT NOT NULL DEFAULT '{}',
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_task ON chunks(task_id);
            "#,
        )?;

        Ok(())
    }

    /// Database file backing this store, if any.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Insert a new task. A `depends_on` reference must name an existing task.
    pub fn create_task(&mut self, task: &Task) -> Result<()> {
        if let Some(dep) = &task.depends_on
            && self.get_task(dep)?.is_none()
        {
            return Err(ChunkdError::Validation(format!("dependsOn references unknown task '{}'", dep)));
        }

        let tags = serde_json::to_string(&task.tags)?;
        self.db.execute(
            r#"
            INSERT INTO tasks
            (id, title, estimate, deadline, tags, depends_on, chunk_status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                task.id,
                task.title,
                task.estimate,
                task.deadline,
                tags,
                task.depends_on,
                task.chunk_status.as_str(),
                task.created_at,
                task.updated_at,
            ],
        )?;

        Ok(())
    }

    /// Get a task by ID.
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let task = self
            .db
            .query_row(&format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS), [id], task_from_row)
            .optional()?;
        Ok(task)
    }

    /// List all tasks in creation order.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.query_tasks(&format!("SELECT {} FROM tasks ORDER BY created_at, rowid", TASK_COLUMNS))
    }

    /// List all tasks, optionally attaching each task's chunks.
    pub fn list_tasks_with_chunks(&self, include_chunks: bool) -> Result<Vec<TaskWithChunks>> {
        let tasks = self.list_tasks()?;
        tasks
            .into_iter()
            .map(|task| -> Result<TaskWithChunks> {
                let chunks = if include_chunks {
                    Some(self.chunks_for_task(&task.id)?)
                } else {
                    None
                };
                Ok(TaskWithChunks { task, chunks })
            })
            .collect()
    }

    /// Get one task with its chunks.
    pub fn get_task_with_chunks(&self, id: &str) -> Result<Option<TaskWithChunks>> {
        match self.get_task(id)? {
            Some(task) => {
                let chunks = self.chunks_for_task(&task.id)?;
                Ok(Some(TaskWithChunks {
                    task,
                    chunks: Some(chunks),
                }))
            }
            None => Ok(None),
        }
    }

    /// Tasks with no chunks that nobody has claimed.
    pub fn list_unchunked(&self) -> Result<Vec<Task>> {
        self.query_tasks(&format!(
            "SELECT {} FROM tasks WHERE chunk_status = 'unchunked' \
             AND NOT EXISTS (SELECT 1 FROM chunks WHERE chunks.task_id = tasks.id) \
             ORDER BY created_at, rowid",
            TASK_COLUMNS
        ))
    }

    /// Claim every eligible task for decomposition.
    ///
    /// Returned tasks are already marked `chunking`; a concurrent caller will
    /// not see them until the claim is completed or released.
    pub fn claim_unchunked(&mut self) -> Result<Vec<Task>> {
        let now = now_ms();
        let tx = self.db.transaction()?;

        let mut tasks = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM tasks WHERE chunk_status = 'unchunked' \
                 AND NOT EXISTS (SELECT 1 FROM chunks WHERE chunks.task_id = tasks.id) \
                 ORDER BY created_at, rowid",
                TASK_COLUMNS
            ))?;
            let rows = stmt.query_map([], task_from_row)?;
            rows.collect::<rusqlite::Result<Vec<Task>>>()?
        };

        for task in &mut tasks {
            tx.execute(
                "UPDATE tasks SET chunk_status = ?1, updated_at = ?2 WHERE id = ?3",
                params![ChunkStatus::Chunking.as_str(), now, task.id],
            )?;
            task.chunk_status = ChunkStatus::Chunking;
            task.updated_at = now;
        }

        tx.commit()?;
        Ok(tasks)
    }

    /// Persist chunks and mark the claimed tasks `chunked`, all or nothing.
    ///
    /// Fails with `ClaimLost` if any task has left the `chunking` state.
    pub fn complete_claim(&mut self, task_ids: &[String], chunks: &[Chunk]) -> Result<()> {
        let now = now_ms();
        let tx = self.db.transaction()?;

        for id in task_ids {
            let updated = tx.execute(
                "UPDATE tasks SET chunk_status = ?1, updated_at = ?2 WHERE id = ?3 AND chunk_status = ?4",
                params![ChunkStatus::Chunked.as_str(), now, id, ChunkStatus::Chunking.as_str()],
            )?;
            // Dropping the transaction rolls back the tasks already updated
            if updated == 0 {
                return Err(ChunkdError::ClaimLost(format!("task '{}' is no longer claimed", id)));
            }
        }
        for chunk in chunks {
            insert_chunk(&tx, chunk)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Return claimed tasks to `unchunked` so a later run can retry them.
    pub fn release_claim(&mut self, task_ids: &[String]) -> Result<usize> {
        let now = now_ms();
        let tx = self.db.transaction()?;
        let mut released = 0;
        for id in task_ids {
            released += tx.execute(
                "UPDATE tasks SET chunk_status = ?1, updated_at = ?2 WHERE id = ?3 AND chunk_status = ?4",
                params![ChunkStatus::Unchunked.as_str(), now, id, ChunkStatus::Chunking.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(released)
    }

    /// Reset claims left behind by a process that died mid-decomposition.
    ///
    /// Only safe at startup, before any request can hold a live claim.
    pub fn recover_stale_claims(&mut self) -> Result<usize> {
        let now = now_ms();
        // Tasks that already got chunks are finished, the rest go back to the pool
        let finished = self.db.execute(
            "UPDATE tasks SET chunk_status = ?1, updated_at = ?2 WHERE chunk_status = ?3 \
             AND EXISTS (SELECT 1 FROM chunks WHERE chunks.task_id = tasks.id)",
            params![ChunkStatus::Chunked.as_str(), now, ChunkStatus::Chunking.as_str()],
        )?;
        let reset = self.db.execute(
            "UPDATE tasks SET chunk_status = ?1, updated_at = ?2 WHERE chunk_status = ?3",
            params![ChunkStatus::Unchunked.as_str(), now, ChunkStatus::Chunking.as_str()],
        )?;
        Ok(finished + reset)
    }

    /// Chunks belonging to one task, in creation order.
    pub fn chunks_for_task(&self, task_id: &str) -> Result<Vec<Chunk>> {
        let mut stmt = self.db.prepare(&format!(
            "SELECT {} FROM chunks WHERE task_id = ?1 ORDER BY created_at, rowid",
            CHUNK_COLUMNS
        ))?;
        let rows = stmt.query_map([task_id], chunk_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<Chunk>>>()?)
    }

    /// All chunks, in creation order.
    pub fn list_chunks(&self) -> Result<Vec<Chunk>> {
        let mut stmt = self
            .db
            .prepare(&format!("SELECT {} FROM chunks ORDER BY created_at, rowid", CHUNK_COLUMNS))?;
        let rows = stmt.query_map([], chunk_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<Chunk>>>()?)
    }

    /// Count tasks in a given claim state.
    pub fn count_by_status(&self, status: ChunkStatus) -> Result<usize> {
        let count: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM tasks WHERE chunk_status = ?1",
            [status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn query_tasks(&self, sql: &str) -> Result<Vec<Task>> {
        let mut stmt = self.db.prepare(sql)?;
        let rows = stmt.query_map([], task_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<Task>>>()?)
    }
}

fn insert_chunk(db: &Connection, chunk: &Chunk) -> Result<()> {
    let tags = serde_json::to_string(&chunk.tags)?;
    db.execute(
        r#"
        INSERT INTO chunks
        (id, task_id, title, duration, scheduled_at, calendar_event_id, tags, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            chunk.id,
            chunk.task_id,
            chunk.title,
            chunk.duration,
            chunk.scheduled_at,
            chunk.calendar_event_id,
            tags,
            chunk.created_at,
        ],
    )?;
    Ok(())
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(6)?;
    let chunk_status = status
        .parse::<ChunkStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        estimate: row.get(2)?,
        deadline: row.get(3)?,
        tags: tags_from_column(row, 4)?,
        depends_on: row.get(5)?,
        chunk_status,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<Chunk> {
    Ok(Chunk {
        id: row.get(0)?,
        task_id: row.get(1)?,
        title: row.get(2)?,
        duration: row.get(3)?,
        scheduled_at: row.get(4)?,
        calendar_event_id: row.get(5)?,
        tags: tags_from_column(row, 6)?,
        created_at: row.get(7)?,
    })
}

fn tags_from_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Tags> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
