//! SQLite-backed storage for tasks, notes and durable key-value state.
//!
//! Provides persistent storage for:
//! - The task list, including each task's cumulative focus seconds
//! - The markdown note log (newest first)
//! - Key-value entries (timer state, the active task selection)

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{data_dir, KvBackend};
use crate::error::{CoreError, DatabaseError, Result, ValidationError};
use crate::task::{Note, Task, TaskRef};

const ACTIVE_TASK_KEY: &str = "activeTask";

/// SQLite database for tasks, notes and the kv table.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/focusdeck.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("focusdeck.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database. Every call gets its own private database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.busy_timeout(Duration::from_secs(2))?;
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                id          TEXT PRIMARY KEY,
                text        TEXT NOT NULL,
                completed   INTEGER NOT NULL DEFAULT 0,
                focus_time  INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notes (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);
            CREATE INDEX IF NOT EXISTS idx_notes_created_at ON notes(created_at);",
        )?;
        Ok(())
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn create_task(&self, text: &str) -> Result<Task> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText("task text").into());
        }
        let task = Task {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            completed: false,
            focus_time: 0,
            created_at: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO tasks (id, text, completed, focus_time, created_at)
             VALUES (?1, ?2, 0, 0, ?3)",
            params![task.id, task.text, task.created_at.to_rfc3339()],
        )?;
        Ok(task)
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, text, completed, focus_time, created_at
             FROM tasks
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([], row_to_task)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                "SELECT id, text, completed, focus_time, created_at FROM tasks WHERE id = ?1",
                params![id],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    pub fn set_task_completed(&self, id: &str, completed: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks SET completed = ?2 WHERE id = ?1",
            params![id, completed],
        )?;
        require_row(changed, id)
    }

    /// Delete a task. Clears the active selection if it pointed at this task.
    pub fn delete_task(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        require_row(changed, id)?;
        if self.kv_get(ACTIVE_TASK_KEY)?.as_deref() == Some(id) {
            self.kv_delete(ACTIVE_TASK_KEY)?;
        }
        Ok(())
    }

    /// Atomically add `seconds` to a task's focus time. Returns the new total.
    pub fn increment_focus_time(&self, id: &str, seconds: u64) -> Result<u64> {
        let changed = self.conn.execute(
            "UPDATE tasks SET focus_time = focus_time + ?2 WHERE id = ?1",
            params![id, seconds],
        )?;
        require_row(changed, id)?;
        self.focus_time(id)
    }

    /// Overwrite a task's focus time with an absolute total.
    pub fn set_focus_time(&self, id: &str, total: u64) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks SET focus_time = ?2 WHERE id = ?1",
            params![id, total],
        )?;
        require_row(changed, id)
    }

    pub fn focus_time(&self, id: &str) -> Result<u64> {
        self.conn
            .query_row(
                "SELECT focus_time FROM tasks WHERE id = ?1",
                params![id],
                |row| row.get::<_, u64>(0),
            )
            .optional()?
            .ok_or_else(|| CoreError::TaskNotFound(id.to_string()))
    }

    // ── Active task selection ────────────────────────────────────────

    pub fn select_task(&self, id: &str) -> Result<TaskRef> {
        let task = self
            .get_task(id)?
            .ok_or_else(|| CoreError::TaskNotFound(id.to_string()))?;
        self.kv_set(ACTIVE_TASK_KEY, &task.id)?;
        Ok(task.to_ref())
    }

    pub fn clear_selection(&self) -> Result<()> {
        self.kv_delete(ACTIVE_TASK_KEY)
    }

    /// The selected task, if it still exists.
    pub fn active_task(&self) -> Result<Option<TaskRef>> {
        let Some(id) = self.kv_get(ACTIVE_TASK_KEY)? else {
            return Ok(None);
        };
        Ok(self.get_task(&id)?.map(|t| t.to_ref()))
    }

    // ── Notes ────────────────────────────────────────────────────────

    pub fn add_note(&self, content: &str) -> Result<Note> {
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyText("note content").into());
        }
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO notes (content, created_at) VALUES (?1, ?2)",
            params![content, created_at.to_rfc3339()],
        )?;
        Ok(Note {
            id: self.conn.last_insert_rowid(),
            content: content.to_string(),
            created_at,
        })
    }

    /// All notes, most recent first.
    pub fn list_notes(&self) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, created_at FROM notes ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Note {
                id: row.get(0)?,
                content: row.get(1)?,
                created_at: parse_timestamp(row.get::<_, String>(2)?),
            })
        })?;
        let mut notes = Vec::new();
        for row in rows {
            notes.push(row?);
        }
        Ok(notes)
    }

    pub fn delete_note(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(CoreError::NoteNotFound(id));
        }
        Ok(())
    }

    // ── Key-value ────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl KvBackend for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.kv_get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.kv_set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.kv_delete(key)
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        text: row.get(1)?,
        completed: row.get(2)?,
        focus_time: row.get(3)?,
        created_at: parse_timestamp(row.get::<_, String>(4)?),
    })
}

fn parse_timestamp(raw: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

fn require_row(changed: usize, id: &str) -> Result<()> {
    if changed == 0 {
        return Err(CoreError::TaskNotFound(id.to_string()));
    }
    Ok(())
}
