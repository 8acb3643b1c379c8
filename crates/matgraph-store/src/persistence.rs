//! Backed-up atomic persistence.
//!
//! Every in-place rewrite is preceded by a timestamped copy of the file being
//! replaced. The new content is written to a sibling temp file and renamed over
//! the original, so readers never observe a half-written document.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_yaml::Value;

use crate::error::StoreError;

const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3fZ";

/// Current backup timestamp. One timestamp is shared by every file of a commit.
pub fn backup_timestamp() -> String {
    Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string()
}

/// Copy `path` into `backup_dir` as `<stem>.<timestamp>.<ext>`.
///
/// Returns `Ok(None)` when there is nothing on disk to back up yet.
pub fn backup_file(
    path: &Path,
    backup_dir: &Path,
    timestamp: &str,
) -> Result<Option<PathBuf>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    fs::create_dir_all(backup_dir).map_err(|source| StoreError::Backup {
        path: path.to_path_buf(),
        source,
    })?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let ext = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "yaml".to_string());

    let mut target = backup_dir.join(format!("{stem}.{timestamp}.{ext}"));
    let mut n = 1usize;
    while target.exists() {
        target = backup_dir.join(format!("{stem}.{timestamp}-{n}.{ext}"));
        n += 1;
    }

    fs::copy(path, &target).map_err(|source| StoreError::Backup {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), backup = %target.display(), "backed up document");
    Ok(Some(target))
}

/// Serialize a YAML document without touching the filesystem.
pub fn render_yaml(path: &Path, value: &Value) -> Result<String, StoreError> {
    serde_yaml::to_string(value).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace `path` with `text` via temp file + rename.
pub fn write_text_atomic(path: &Path, text: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let tmp = path.with_extension("yaml.tmp");
    fs::write(&tmp, text).map_err(|source| StoreError::Write {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Back up (when the file exists) and atomically rewrite a standalone document.
pub fn write_document_atomic(
    path: &Path,
    value: &Value,
    backup_dir: &Path,
) -> Result<Option<PathBuf>, StoreError> {
    let text = render_yaml(path, value)?;
    let backup = backup_file(path, backup_dir, &backup_timestamp())?;
    write_text_atomic(path, &text)?;
    Ok(backup)
}

/// Read and parse a YAML document, returning its text alongside the value.
pub fn read_yaml_document(path: &Path) -> Result<(String, Value), StoreError> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_yaml::from_str(&text).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((text, value))
}
