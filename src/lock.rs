//! Advisory file locking for daytask
//!
//! Every rewrite of the canonical to-do list happens while holding an
//! exclusive lock on a `<target>.lock` sidecar file:
//! - Locking goes through [`LockCapability`] so each platform supplies its own
//! - Acquisition polls every 50ms until the timeout elapses
//! - A non-blocking variant reports "busy" instead of waiting
//!
//! Lock files are created on demand and never deleted.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Default lock timeout in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Retry interval while waiting for a lock
const LOCK_RETRY_INTERVAL_MS: u64 = 50;

/// Platform capability for exclusive advisory locks on an open file.
pub trait LockCapability {
    /// Try to take the lock without waiting. `Ok(false)` means another holder has it.
    fn try_lock(file: &File) -> io::Result<bool>;

    fn unlock(file: &File) -> io::Result<()>;
}

/// flock(2) on unix, LockFileEx on windows.
#[cfg(any(unix, windows))]
pub struct NativeLock;

#[cfg(any(unix, windows))]
impl LockCapability for NativeLock {
    fn try_lock(file: &File) -> io::Result<bool> {
        match fs2::FileExt::try_lock_exclusive(file) {
            Ok(()) => Ok(true),
            Err(e) if is_lock_contended(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn unlock(file: &File) -> io::Result<()> {
        fs2::FileExt::unlock(file)
    }
}

/// Fallback for targets without advisory locking.
///
/// Acquisition always succeeds. This is best-effort only: callers get no
/// exclusivity guarantee on such platforms.
pub struct BestEffortLock;

impl LockCapability for BestEffortLock {
    fn try_lock(_file: &File) -> io::Result<bool> {
        Ok(true)
    }

    fn unlock(_file: &File) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(any(unix, windows))]
pub type PlatformLock = NativeLock;

#[cfg(not(any(unix, windows)))]
pub type PlatformLock = BestEffortLock;

#[cfg(any(unix, windows))]
fn is_lock_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }

    // On Windows, sharing/lock violations surface as "Other".
    #[cfg(windows)]
    {
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }
    #[cfg(not(windows))]
    {
        false
    }
}

/// Path of the lock sidecar guarding `target`
pub fn lock_path_for(target: &Path) -> PathBuf {
    PathBuf::from(format!("{}.lock", target.display()))
}

/// A file lock guard that releases the lock when dropped
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire an exclusive lock guarding `target`, waiting up to `timeout`
    ///
    /// The lock is taken on `<target>.lock`, which is created if missing.
    pub fn acquire(target: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let path = lock_path_for(target.as_ref());
        let file = open_lock_file(&path)?;

        let start = Instant::now();
        let retry_interval = Duration::from_millis(LOCK_RETRY_INTERVAL_MS);

        loop {
            let locked = PlatformLock::try_lock(&file)
                .map_err(|e| Error::file_op("lock", &path, e))?;
            if locked {
                tracing::debug!(lock = %path.display(), "lock acquired");
                return Ok(FileLock { file, path });
            }
            if start.elapsed() >= timeout {
                return Err(Error::LockFailed(path));
            }
            std::thread::sleep(retry_interval);
        }
    }

    /// Try to acquire the lock guarding `target` without waiting
    ///
    /// Returns `Ok(Some(lock))` if acquired, `Ok(None)` if busy.
    pub fn try_acquire(target: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = lock_path_for(target.as_ref());
        let file = open_lock_file(&path)?;

        if PlatformLock::try_lock(&file).map_err(|e| Error::file_op("lock", &path, e))? {
            Ok(Some(FileLock { file, path }))
        } else {
            Ok(None)
        }
    }

    /// Path to the lock sidecar file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Ignore errors during drop; closing the handle releases it anyway.
        let _ = PlatformLock::unlock(&self.file);
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::file_op("create directory", parent, e))?;
        }
    }

    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| Error::file_op("open lock file", path, e))
}
