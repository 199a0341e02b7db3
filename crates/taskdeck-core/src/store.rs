use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::lock::{FileLock, LockError, LockOptions};
use crate::migrate::{migrate_legacy, parse_shape, FileShape, MigrateError, ShapeError};
use crate::task::{next_task_id, SessionTasks, Task, TaskStatus};

pub const TASKS_FILE: &str = "tasks.json";
pub const BACKUP_FILE: &str = "tasks.json.backup";
pub const LOCK_FILE: &str = "tasks.json.lock";

/// Directory holding the canonical task file: `TASKS_DIR` when set and
/// non-empty, the current directory otherwise.
pub fn resolve_tasks_dir() -> PathBuf {
    if let Ok(value) = std::env::var("TASKS_DIR") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    PathBuf::from(".")
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Task file is corrupt: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Migrate(#[from] MigrateError),
    #[error("Store IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize tasks: {0}")]
    Serialize(serde_json::Error),
}

impl StoreError {
    /// Lock contention is the one failure a caller should simply retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Lock(LockError::Timeout { .. }))
    }
}

/// Serialized read/modify/write access to the persisted session-task map.
///
/// Every mutating operation runs as one critical section under the
/// inter-process advisory lock: read current state, compute the next state,
/// persist via temp + atomic rename. The rename matters even under the
/// lock, because the viewer reads without participating in locking.
#[derive(Clone, Debug)]
pub struct TaskStore {
    dir: PathBuf,
    lock_options: LockOptions,
}

impl TaskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        TaskStore {
            dir: dir.into(),
            lock_options: LockOptions::default(),
        }
    }

    pub fn with_lock_options(mut self, options: LockOptions) -> Self {
        self.lock_options = options;
        self
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.dir.join(TASKS_FILE)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(BACKUP_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    /// Current session map. Missing file reads as empty; a legacy array
    /// file is migrated (backup + rewrite) before returning.
    pub fn read_all(&self) -> Result<SessionTasks, StoreError> {
        let _guard = self.lock()?;
        self.read_locked()
    }

    /// Persist the full map atomically.
    pub fn write_all(&self, sessions: &SessionTasks) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        self.write_locked(sessions)
    }

    /// Append tasks with per-session monotonic ids, status `pending`.
    /// An empty `titles` slice is a safe no-op: nothing is written.
    pub fn add_tasks(&self, session_id: &str, titles: &[String]) -> Result<Vec<Task>, StoreError> {
        if titles.is_empty() {
            return Ok(Vec::new());
        }
        let _guard = self.lock()?;
        let mut sessions = self.read_locked()?;
        let tasks = sessions.entry(session_id.to_string()).or_default();

        let mut next_id = next_task_id(tasks);
        let mut added = Vec::with_capacity(titles.len());
        for title in titles {
            let task = Task {
                id: next_id,
                title: title.clone(),
                status: TaskStatus::Pending,
            };
            tasks.push(task.clone());
            added.push(task);
            next_id += 1;
        }

        self.write_locked(&sessions)?;
        Ok(added)
    }

    /// Set a task's status. `Ok(None)` when the session or id does not
    /// exist; nothing is written in that case.
    pub fn update_task(
        &self,
        session_id: &str,
        id: u64,
        status: TaskStatus,
    ) -> Result<Option<Task>, StoreError> {
        let _guard = self.lock()?;
        let mut sessions = self.read_locked()?;

        let Some(tasks) = sessions.get_mut(session_id) else {
            return Ok(None);
        };
        let Some(task) = tasks.iter_mut().find(|task| task.id == id) else {
            return Ok(None);
        };
        task.status = status;
        let updated = task.clone();

        self.write_locked(&sessions)?;
        Ok(Some(updated))
    }

    /// Remove tasks from a session and return how many went away. With
    /// `clear_all` every task goes; otherwise only `done` tasks. An absent
    /// session clears nothing and skips the write entirely.
    pub fn clear_tasks(&self, session_id: &str, clear_all: bool) -> Result<usize, StoreError> {
        let _guard = self.lock()?;
        let mut sessions = self.read_locked()?;

        let Some(tasks) = sessions.get_mut(session_id) else {
            return Ok(0);
        };
        let before = tasks.len();
        if clear_all {
            tasks.clear();
        } else {
            tasks.retain(|task| task.status != TaskStatus::Done);
        }
        let removed = before - tasks.len();

        self.write_locked(&sessions)?;
        Ok(removed)
    }

    /// Read without taking the lock and without migrating. For read-only
    /// observers that must never contend with writers.
    pub fn load_view(&self) -> Result<SessionTasks, StoreError> {
        let path = self.tasks_path();
        if !path.exists() {
            return Ok(SessionTasks::new());
        }
        let raw = read_file(&path)?;
        match parse_shape(&raw).map_err(shape_to_store_error)? {
            FileShape::Sessions(sessions) => Ok(sessions),
            FileShape::Legacy(legacy) => {
                let mut sessions = SessionTasks::new();
                sessions.insert(crate::migrate::DEFAULT_SESSION.to_string(), legacy);
                Ok(sessions)
            }
        }
    }

    fn lock(&self) -> Result<FileLock, LockError> {
        FileLock::acquire(&self.lock_path(), self.lock_options)
    }

    fn read_locked(&self) -> Result<SessionTasks, StoreError> {
        let path = self.tasks_path();
        if !path.exists() {
            return Ok(SessionTasks::new());
        }
        let raw = read_file(&path)?;
        match parse_shape(&raw).map_err(shape_to_store_error)? {
            FileShape::Sessions(sessions) => Ok(sessions),
            FileShape::Legacy(legacy) => {
                let sessions = migrate_legacy(&raw, legacy, &path, &self.backup_path())?;
                Ok(sessions)
            }
        }
    }

    fn write_locked(&self, sessions: &SessionTasks) -> Result<(), StoreError> {
        let rendered = serde_json::to_string_pretty(sessions).map_err(StoreError::Serialize)?;
        let path = self.tasks_path();
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, rendered).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &path).map_err(|source| StoreError::Io { path, source })
    }
}

fn read_file(path: &Path) -> Result<String, StoreError> {
    fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn shape_to_store_error(err: ShapeError) -> StoreError {
    StoreError::Corrupt(err.to_string())
}
