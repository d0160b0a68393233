//! Atomic file replacement for implemented edits.
//!
//! A file run only ever touches its target through this module. Writes go to
//! a hidden sibling (`.{filename}.aiedit.tmp`), are fsynced, then renamed over
//! the target. A crash at any point leaves either the old content or the new
//! content in place, never a mix.
//!
//! Source and destination are always in the same directory, so the rename
//! never crosses a filesystem boundary. `std::fs::rename` replaces an existing
//! destination on both POSIX and Windows.
//!
//! The replacement keeps the permissions of the file it replaces. A symlink
//! is written through: the file it points at gets the new content and the
//! link stays in place.

use crate::error::{AieditError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Suffix appended to backups written by [`write_backup`].
pub const BACKUP_SUFFIX: &str = "orig";

/// Atomically write bytes to a file.
///
/// ```no_run
/// use aiedit::fs::atomic::atomic_write;
/// use std::path::Path;
///
/// atomic_write(Path::new("handler.py"), b"print('patched')\n")?;
/// # Ok::<(), aiedit::error::AieditError>(())
/// ```
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let resolved = resolve_symlink(path.as_ref());
    let path = resolved.as_path();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            AieditError::IoError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path)?;
    write_and_sync(&temp_path, content)?;
    keep_permissions(path, &temp_path)?;
    replace(&temp_path, path)
}

/// Atomically write a string to a file.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Path of the backup kept for `target` (`{target}.orig`).
pub fn backup_path_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".");
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Save `original` next to `target` before it is replaced.
///
/// Returns the backup path.
pub fn write_backup(target: &Path, original: &str) -> Result<PathBuf> {
    let backup = backup_path_for(target);
    atomic_write_file(&backup, original)?;
    Ok(backup)
}

fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            AieditError::IoError(format!("invalid file path '{}'", target.display()))
        })?;

    Ok(parent.join(format!(".{}.aiedit.tmp", filename)))
}

/// A symlinked target is written through to the file it points at.
fn resolve_symlink(path: &Path) -> PathBuf {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

/// Give the replacement the mode bits of the file it replaces.
fn keep_permissions(target: &Path, temp_path: &Path) -> Result<()> {
    let Ok(metadata) = fs::metadata(target) else {
        return Ok(());
    };
    fs::set_permissions(temp_path, metadata.permissions()).map_err(|e| {
        let _ = fs::remove_file(temp_path);
        AieditError::IoError(format!(
            "failed to copy permissions of '{}': {}",
            target.display(),
            e
        ))
    })
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    // Truncates any stale temp file left by an interrupted run.
    let mut file = File::create(path).map_err(|e| {
        AieditError::IoError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        AieditError::IoError(format!("failed to write temporary file: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        AieditError::IoError(format!("failed to sync temporary file to disk: {}", e))
    })?;

    Ok(())
}

fn replace(source: &Path, target: &Path) -> Result<()> {
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        AieditError::IoError(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        ))
    })?;

    // Persist the directory entry as well.
    #[cfg(unix)]
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        })
    {
        let _ = dir.sync_all();
    }

    Ok(())
}
