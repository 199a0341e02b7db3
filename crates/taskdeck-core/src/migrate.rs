use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::task::{SessionTasks, Task};

/// Session key legacy array-shaped files are folded into.
pub const DEFAULT_SESSION: &str = "default";

/// Parsed shape of the on-disk file. Anything that is valid JSON but
/// neither an object nor an array is corruption, not a shape to repair.
#[derive(Debug)]
pub enum FileShape {
    Sessions(SessionTasks),
    Legacy(Vec<Task>),
}

#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("Invalid task file JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported task file shape: expected session object or legacy array")]
    Unsupported,
}

pub fn parse_shape(raw: &str) -> Result<FileShape, ShapeError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    match value {
        serde_json::Value::Object(_) => Ok(FileShape::Sessions(serde_json::from_value(value)?)),
        serde_json::Value::Array(_) => Ok(FileShape::Legacy(serde_json::from_value(value)?)),
        _ => Err(ShapeError::Unsupported),
    }
}

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Failed to write migration backup {path}: {source}")]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write migrated task file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize migrated tasks: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One-time upgrade of a legacy array file to the session map shape.
///
/// Order matters: the raw pre-migration bytes go to the backup first, and a
/// backup failure aborts with the canonical file untouched. Only then is
/// the migrated map written, via temp + rename so an unlocked reader never
/// observes a half-written file. Once the file is map-shaped this never
/// runs again.
pub fn migrate_legacy(
    raw: &str,
    legacy: Vec<Task>,
    tasks_path: &Path,
    backup_path: &Path,
) -> Result<SessionTasks, MigrateError> {
    fs::write(backup_path, raw).map_err(|source| MigrateError::Backup {
        path: backup_path.to_path_buf(),
        source,
    })?;

    let mut sessions = SessionTasks::new();
    sessions.insert(DEFAULT_SESSION.to_string(), legacy);

    let rendered = serde_json::to_string_pretty(&sessions)?;
    let tmp_path = tasks_path.with_extension("json.tmp");
    fs::write(&tmp_path, rendered).map_err(|source| MigrateError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, tasks_path).map_err(|source| MigrateError::Write {
        path: tasks_path.to_path_buf(),
        source,
    })?;

    Ok(sessions)
}
