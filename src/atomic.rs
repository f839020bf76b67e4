//! Crash-safe file replacement
//!
//! All persistence in daytask goes through [`write_atomic`]: data lands in a
//! temporary file in the target's directory, is synced to disk, and is then
//! renamed over the target. Readers see either the old or the new content,
//! never a truncated file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Permissions for user-facing markdown files
pub const MARKDOWN_FILE_MODE: u32 = 0o644;

/// Permissions for the machine-only state file
pub const STATE_FILE_MODE: u32 = 0o600;

/// Fixed headroom required on top of the payload size
const FREE_SPACE_SLACK_BYTES: u64 = 4096;

/// Atomically replace `path` with `data`
///
/// Runs [`preflight`] first. On any failure the temporary file is removed and
/// `path` keeps its previous content.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8], mode: u32) -> Result<()> {
    write_atomic_with(path.as_ref(), data, mode, |_| Ok(()))
}

/// Atomically replace `path` with string data
pub fn write_atomic_str(path: impl AsRef<Path>, data: &str, mode: u32) -> Result<()> {
    write_atomic(path, data.as_bytes(), mode)
}

/// [`write_atomic`] with a hook that runs after the temp file is synced and
/// before it is renamed into place.
pub(crate) fn write_atomic_with<F>(path: &Path, data: &[u8], mode: u32, before_rename: F) -> Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let dir = parent_dir(path);
    fs::create_dir_all(&dir).map_err(|e| Error::file_op("create directory", &dir, e))?;

    preflight(path, data.len())?;

    // Same directory as the target so the rename never crosses filesystems.
    let mut temp =
        NamedTempFile::new_in(&dir).map_err(|e| Error::file_op("create temp file in", &dir, e))?;
    temp.write_all(data)
        .map_err(|e| Error::file_op("write temp file for", path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::file_op("sync temp file for", path, e))?;
    set_mode(temp.path(), mode)?;

    before_rename(temp.path()).map_err(|e| Error::file_op("replace", path, e))?;

    temp.persist(path)
        .map_err(|e| Error::file_op("replace", path, e.error))?;

    tracing::debug!(path = %path.display(), bytes = data.len(), "atomic write complete");
    Ok(())
}

/// Copy the current content of `path` to `<path>.backup`
///
/// No-op when `path` does not exist. Returns the backup path when written.
pub fn backup_before_overwrite(path: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }

    let data = fs::read(path).map_err(|e| Error::file_op("read", path, e))?;
    let backup = backup_path_for(path);
    write_atomic(&backup, &data, current_mode(path))?;
    Ok(Some(backup))
}

/// Path of the backup copy for `path`
pub fn backup_path_for(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.backup", path.display()))
}

/// Check that `len` bytes can be written to `path`
///
/// Fails with [`Error::PermissionDenied`] when the directory (or the existing
/// target) is not writable, and with [`Error::InsufficientSpace`] when the
/// filesystem has less than `len * 1.1 + 4096` bytes free. If free space cannot
/// be determined the check is skipped.
pub fn preflight(path: &Path, len: usize) -> Result<()> {
    let dir = parent_dir(path);
    check_writable(path, &dir)?;
    check_free_space(path, &dir, len)
}

/// Bytes of free space required to write `len` bytes
pub fn required_space(len: usize) -> u64 {
    let len = len as u64;
    len + len.div_ceil(10) + FREE_SPACE_SLACK_BYTES
}

fn check_writable(path: &Path, dir: &Path) -> Result<()> {
    let access = if path.exists() {
        OpenOptions::new().write(true).open(path).map(drop)
    } else {
        // Unlinked on drop.
        tempfile::tempfile_in(dir).map(drop)
    };

    match access {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            Err(Error::PermissionDenied(path.to_path_buf()))
        }
        Err(e) => Err(Error::file_op("check write access to", path, e)),
    }
}

fn check_free_space(path: &Path, dir: &Path, len: usize) -> Result<()> {
    let needed = required_space(len);
    match fs2::available_space(dir) {
        Ok(available) if available < needed => Err(Error::InsufficientSpace {
            path: path.to_path_buf(),
            needed,
            available,
        }),
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "could not determine free space; skipping check");
            Ok(())
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| Error::file_op("set permissions on", path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn current_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o777)
        .unwrap_or(MARKDOWN_FILE_MODE)
}

#[cfg(not(unix))]
fn current_mode(_path: &Path) -> u32 {
    MARKDOWN_FILE_MODE
}
