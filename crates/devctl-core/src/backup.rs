//! Backup artifacts: naming, discovery, and safe path resolution.
//!
//! Artifacts are flat files in one directory. devctl creates them and reads
//! them back for restore; it never deletes or overwrites one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{DevctlError, Result};
use crate::validate::validate_name;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupArtifact {
    pub filename: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

impl BackupArtifact {
    pub fn from_path(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path)?;
        let created = meta.created().or_else(|_| meta.modified())?;
        Ok(Self {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            created_at: created.into(),
            size_bytes: meta.len(),
        })
    }
}

/// `backup_<UTC timestamp>.sql`, second precision.
pub fn default_filename(now: DateTime<Utc>) -> String {
    format!("backup_{}.sql", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// All regular files in `dir` with a safe name, newest first.
/// A missing directory is an empty listing.
pub fn list_artifacts(dir: &Path) -> Result<Vec<BackupArtifact>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut artifacts = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // Staging files from in-flight dumps start with '.'.
        if name.starts_with('.') || validate_name(&name).is_err() {
            continue;
        }
        if !entry.file_type()?.is_file() {
            continue;
        }
        artifacts.push(BackupArtifact::from_path(&entry.path())?);
    }
    artifacts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.filename.cmp(&b.filename))
    });
    Ok(artifacts)
}

/// Resolve `filename` to an existing file strictly inside `dir`.
///
/// The name is re-validated and the canonical path is checked against the
/// canonical directory, so symlinks that point elsewhere are refused too.
pub fn resolve_restore_path(dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.is_empty() {
        return Err(DevctlError::MissingFilename);
    }
    validate_name(filename)?;

    let candidate = dir.join(filename);
    if !candidate.is_file() {
        return Err(DevctlError::FileNotFound(filename.to_string()));
    }

    let canonical_dir = dir.canonicalize()?;
    let canonical = candidate.canonicalize()?;
    if canonical.parent() != Some(canonical_dir.as_path()) {
        return Err(DevctlError::InvalidTargetName(filename.to_string()));
    }
    Ok(canonical)
}
