//! Advisory `flock`-based locks keyed by name.
//!
//! Long-running store maintenance (compaction, index rebuilds) takes a lock named after the
//! blob store so that two processes never compact the same store at once.

use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use nix::fcntl::{Flock, FlockArg};

use crate::{
    error::{LockError, LockResult},
    fs::ensure_dir_exists,
};

/// An exclusive lock held on `<dir>/<name>.lock`.
///
/// The lock is released when `FileLock` is dropped.
pub struct FileLock {
    _file: Flock<File>,
    path: PathBuf,
}

impl FileLock {
    fn lock_path(dir: &Path, name: &str) -> LockResult<PathBuf> {
        ensure_dir_exists(dir).map_err(|err| LockError::AcquireFailed(err.to_string()))?;

        let sanitized: String = name
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        Ok(dir.join(format!("{sanitized}.lock")))
    }

    fn open(path: &Path) -> LockResult<File> {
        Ok(OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?)
    }

    /// Acquires the lock, blocking until it becomes available.
    pub fn acquire<P: AsRef<Path>>(dir: P, name: &str) -> LockResult<Self> {
        let path = Self::lock_path(dir.as_ref(), name)?;
        let file = Self::open(&path)?;

        let file = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, err)| {
            LockError::AcquireFailed(format!("{}: {}", path.display(), err))
        })?;

        Ok(Self {
            _file: file,
            path,
        })
    }

    /// Tries to acquire the lock without blocking.
    ///
    /// Returns `None` if another holder has it.
    pub fn try_acquire<P: AsRef<Path>>(dir: P, name: &str) -> LockResult<Option<Self>> {
        let path = Self::lock_path(dir.as_ref(), name)?;
        let file = Self::open(&path)?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(file) => {
                Ok(Some(Self {
                    _file: file,
                    path,
                }))
            }
            Err((_, nix::errno::Errno::EWOULDBLOCK)) => Ok(None),
            Err((_, err)) => {
                Err(LockError::AcquireFailed(format!(
                    "{}: {}",
                    path.display(),
                    err
                )))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
