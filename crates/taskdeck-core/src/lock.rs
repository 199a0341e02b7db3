use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use chrono::Local;
use fs2::FileExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Timed out waiting for lock on {path} after {attempts} attempts")]
    Timeout { path: PathBuf, attempts: u32 },
    #[error("Lock IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Retry/backoff policy for advisory lock acquisition. Contended callers
/// back off between `backoff_min` and `backoff_max` (doubling each round)
/// and give up after `max_retries` attempts rather than blocking forever.
#[derive(Clone, Copy, Debug)]
pub struct LockOptions {
    pub max_retries: u32,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
    pub stale_after: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        LockOptions {
            max_retries: 10,
            backoff_min: Duration::from_millis(50),
            backoff_max: Duration::from_secs(1),
            stale_after: Duration::from_secs(10),
        }
    }
}

/// Exclusive inter-process lock on a sibling `.lock` file, taken with the
/// OS advisory primitive via `fs2`. The OS releases the lock when the
/// holding process dies; the mtime-based stale check additionally reclaims
/// a lock whose holder is alive but wedged past `stale_after`.
#[derive(Debug)]
pub struct FileLock {
    file: File,
}

impl FileLock {
    pub fn acquire(path: &Path, options: LockOptions) -> Result<FileLock, LockError> {
        let mut backoff = options.backoff_min;
        for attempt in 0..options.max_retries {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)
                .map_err(|source| LockError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;

            match file.try_lock_exclusive() {
                Ok(()) => {
                    let lock = FileLock { file };
                    lock.write_holder_info();
                    return Ok(lock);
                }
                Err(_) => {
                    if is_stale(path, options.stale_after) {
                        // Abandoned holder: unlink so the next open starts
                        // from a fresh inode and retry without sleeping.
                        let _ = fs::remove_file(path);
                        continue;
                    }
                }
            }

            if attempt + 1 < options.max_retries {
                thread::sleep(backoff);
                backoff = (backoff * 2).min(options.backoff_max);
            }
        }
        Err(LockError::Timeout {
            path: path.to_path_buf(),
            attempts: options.max_retries,
        })
    }

    /// Holder pid and timestamp, for humans inspecting a contended lock.
    /// Best-effort: the lock is valid even if this write fails.
    fn write_holder_info(&self) {
        let mut file = &self.file;
        let _ = file.set_len(0);
        let _ = writeln!(
            file,
            "{} {}",
            std::process::id(),
            Local::now().to_rfc3339()
        );
        let _ = file.flush();
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Unlock on every exit path, error or not. Leave the file in place:
        // unlinking here would race a contender that already opened it.
        let _ = self.file.unlock();
    }
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age > stale_after)
        .unwrap_or(false)
}
