//! Mutual exclusion for read-modify-write cycles on a persisted file.
//!
//! Two layers guard each file: an in-process mutex keyed by the file path, so
//! threads of one server queue up without touching the filesystem, and an
//! exclusive advisory lock on a sibling `.lock` file for other processes.

use crate::{LabelError, Result};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Registry of per-path mutexes.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding both the in-process and the file lock for `path`.
    pub fn with_exclusive<T>(&self, path: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let entry = self.entry(path)?;
        let _guard = entry.lock().map_err(|_| LabelError::Lock {
            path: path.to_path_buf(),
            message: "in-process lock poisoned".to_string(),
        })?;
        let _file_lock = FileLock::acquire(&lock_path_for(path))?;
        f()
    }

    fn entry(&self, path: &Path) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| LabelError::Lock {
            path: path.to_path_buf(),
            message: "lock registry poisoned".to_string(),
        })?;
        Ok(locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }
}

/// Exclusive advisory lock held until drop.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Block until the exclusive lock on `path` is held, creating the file if needed.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| LabelError::io_with_path(e, parent))?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| LabelError::io_with_path(e, path))?;

        FileExt::lock_exclusive(&file).map_err(|e| LabelError::Lock {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        debug!("Acquired lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    path.with_extension("json.lock")
}
