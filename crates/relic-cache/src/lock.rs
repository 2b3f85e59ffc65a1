//! File-based advisory locking for relic projects.
//!
//! The cache and index are not internally serialized against concurrent
//! processes, so every mutating command takes this lock first. The lock is
//! a `create_new` file: creation succeeds for exactly one process, and the
//! file is removed when the guard drops. A lock left behind by a crashed
//! process is surfaced to the operator rather than broken automatically.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{CacheError, CacheResult};

/// Guard holding the project's advisory lock for a command's duration.
#[derive(Debug)]
pub struct CacheLock {
    path: PathBuf,
}

impl CacheLock {
    /// Acquire the lock at `path`, failing fast if another process holds
    /// it. The lock file records the owning process id for diagnosis.
    pub fn acquire(path: impl Into<PathBuf>) -> CacheResult<Self> {
        let path = path.into();
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(CacheError::LockHeld { path });
            }
            Err(err) => {
                return Err(CacheError::io(format!("creating lock file {path:?}"), err));
            }
        };
        writeln!(file, "{}", std::process::id())
            .map_err(|e| CacheError::io(format!("writing lock file {path:?}"), e))?;
        debug!(path = %path.display(), "acquired advisory lock");
        Ok(Self { path })
    }

    /// The lock file's path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        // Nothing useful to do with a failure here; the operator will see
        // the stale file on the next acquire.
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_creates_and_drop_removes() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("lock");
        {
            let lock = CacheLock::acquire(&lock_path).unwrap();
            assert!(lock.path().exists());
        }
        assert!(!lock_path.exists());
    }

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("lock");
        let _held = CacheLock::acquire(&lock_path).unwrap();
        let err = CacheLock::acquire(&lock_path).unwrap_err();
        assert!(matches!(err, CacheError::LockHeld { .. }));
    }

    #[test]
    fn lock_is_reacquirable_after_release() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("lock");
        drop(CacheLock::acquire(&lock_path).unwrap());
        let again = CacheLock::acquire(&lock_path);
        assert!(again.is_ok());
    }

    #[test]
    fn lock_file_records_pid() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("lock");
        let _held = CacheLock::acquire(&lock_path).unwrap();
        let contents = fs::read_to_string(&lock_path).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());
    }
}
