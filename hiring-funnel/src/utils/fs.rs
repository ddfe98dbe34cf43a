//! Filesystem helpers shared across modules.
//!
//! These helpers provide consistent error context (operation + path) and
//! reduce duplicated `create_dir_all` / parent-directory checks.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Convert an IO error into an application error with operation + path context.
pub fn io_error(op: &'static str, path: &Path, source: std::io::Error) -> Error {
    Error::io_path(op, path, source)
}

/// Ensure a directory exists, creating it (recursively) if needed.
pub async fn ensure_dir_all_with_op(op: &'static str, path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| io_error(op, path, e))
}

/// Ensure the parent directory of a file path exists with a custom operation label.
pub async fn ensure_parent_dir_with_op(op: &'static str, path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    ensure_dir_all_with_op(op, parent).await
}

/// Ensure a directory exists (synchronous variant) with a custom operation label.
pub fn ensure_dir_all_sync_with_op(op: &'static str, path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| io_error(op, path, e))
}

/// `<path>.<suffix>` next to `path` (e.g. `tokens.json` -> `tokens.json.bak`).
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Path of the backup kept by [`write_atomic_with_backup`].
pub fn backup_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "bak")
}

/// Replace `path` with `contents` without ever leaving a torn file behind.
///
/// The data is written to `<path>.tmp` and fsynced, the current file (if any)
/// is copied to `<path>.bak`, then the temp file is renamed over `path`.
/// The target is untouched when any step before the rename fails.
pub async fn write_atomic_with_backup(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent_dir_with_op("creating directory", path).await?;

    let tmp_path = sibling_with_suffix(path, "tmp");
    if let Err(e) = write_synced(&tmp_path, contents).await {
        discard_temp(&tmp_path).await;
        return Err(e);
    }

    match tokio::fs::copy(path, backup_path(path)).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No previous file to back up");
        }
        Err(e) => {
            discard_temp(&tmp_path).await;
            return Err(io_error("backing up", path, e));
        }
    }

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        discard_temp(&tmp_path).await;
        return Err(io_error("replacing", path, e));
    }

    Ok(())
}

async fn write_synced(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| io_error("creating temp file", path, e))?;
    file.write_all(contents)
        .await
        .map_err(|e| io_error("writing temp file", path, e))?;
    file.sync_all()
        .await
        .map_err(|e| io_error("syncing temp file", path, e))
}

async fn discard_temp(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "Failed to remove temp file");
    }
}
