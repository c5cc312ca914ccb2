//! Recoverable backup store for deleted files.
//!
//! Layout: one directory holding, per deleted file, a byte copy named
//! `<timestamp>_<original name>` and a sidecar `<same>.meta.json`.

mod metadata;

pub use metadata::{BackupMetadata, SIDECAR_SUFFIX, sidecar_path};

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use metadata::{read_sidecar, write_sidecar};

use crate::hashing::{HashAlgorithm, hash_bytes};
use crate::{ReclaimError, Result};

/// `chrono` format of the backup name prefix, safe on every filesystem
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";

/// Length of a prefix produced by [`TIMESTAMP_FORMAT`]
const TIMESTAMP_LEN: usize = 24;

/// Suffix for copies that are still being written
const PARTIAL_SUFFIX: &str = ".partial";

/// A file held in the backup store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub id: String,
    pub original_path: Option<PathBuf>,
    pub backup_path: PathBuf,
    /// Original name, without the timestamp prefix
    pub file_name: String,
    pub size: u64,
    pub backup_date: DateTime<Utc>,
}

/// What to do when the restore target already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestoreMode {
    /// Report [`ReclaimError::RestoreConflict`] and leave the target alone
    #[default]
    FailOnConflict,
    /// Replace the existing target
    Overwrite,
}

/// Directory-backed store of deleted files
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy a file into the store. Returns only once both the copy and its
    /// sidecar are on disk, so the original may be removed afterwards.
    pub fn backup(&self, path: &Path) -> Result<BackupRecord> {
        let metadata = fs::metadata(path).map_err(|e| ReclaimError::from_io(e, path))?;
        if !metadata.is_file() {
            return Err(ReclaimError::NotAFile(path.to_path_buf()));
        }
        let base_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ReclaimError::NotAFile(path.to_path_buf()))?;
        let original_path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

        fs::create_dir_all(&self.dir).map_err(|e| backup_failed(path, e))?;

        let backup_date = Utc::now();
        let backup_path = self.unique_backup_path(backup_date, &base_name);

        self.copy_content(path, &backup_path, metadata.len())?;

        let meta = BackupMetadata::new(original_path, &metadata, backup_date);
        if let Err(e) = write_sidecar(&sidecar_path(&backup_path), &meta) {
            let _ = fs::remove_file(&backup_path);
            return Err(backup_failed(path, e));
        }

        debug!(path = %path.display(), backup = %backup_path.display(), "backed up file");
        self.load_record(&backup_path)
    }

    /// All backups, newest first. Unreadable entries are logged and skipped.
    pub fn list(&self) -> Result<Vec<BackupRecord>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ReclaimError::from_io(e, &self.dir)),
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(content_name) = name.strip_suffix(SIDECAR_SUFFIX) else {
                continue;
            };
            // a backed-up `*.meta.json` file has a sidecar of its own
            if sidecar_path(&entry.path()).is_file() {
                continue;
            }
            let backup_path = self.dir.join(content_name);
            match self.load_record(&backup_path) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(path = %backup_path.display(), error = %e, "skipping invalid backup");
                }
            }
        }

        records.sort_by(|a, b| {
            b.backup_date
                .cmp(&a.backup_date)
                .then_with(|| a.backup_path.cmp(&b.backup_path))
        });
        Ok(records)
    }

    pub fn get(&self, id: &str) -> Result<BackupRecord> {
        self.list()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ReclaimError::BackupNotFound(id.to_string()))
    }

    /// Copy a backup back to `target`, or to its original path.
    /// The backup itself is kept, so a restore can be repeated.
    pub fn restore(&self, id: &str, target: Option<&Path>, mode: RestoreMode) -> Result<PathBuf> {
        let record = self.get(id)?;
        let target = target
            .map(Path::to_path_buf)
            .or_else(|| record.original_path.clone())
            .ok_or_else(|| ReclaimError::NoRestoreTarget(id.to_string()))?;

        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
            && !parent.is_dir()
        {
            return Err(ReclaimError::RestoreTargetMissing(target));
        }
        if mode == RestoreMode::FailOnConflict && fs::symlink_metadata(&target).is_ok() {
            return Err(ReclaimError::RestoreConflict(target));
        }

        // Copy next to the target, then swap it in
        let temp_path = restore_temp_path(&target);
        fs::copy(&record.backup_path, &temp_path)
            .and_then(|_| File::open(&temp_path)?.sync_all())
            .and_then(|_| fs::rename(&temp_path, &target))
            .map_err(|e| {
                let _ = fs::remove_file(&temp_path);
                ReclaimError::from_io(e, &target)
            })?;

        info!(id, target = %target.display(), "restored backup");
        Ok(target)
    }

    /// Delete a backup and its sidecar for good
    pub fn purge(&self, id: &str) -> Result<BackupRecord> {
        let record = self.get(id)?;
        fs::remove_file(&record.backup_path)
            .map_err(|e| ReclaimError::from_io(e, &record.backup_path))?;
        let sidecar = sidecar_path(&record.backup_path);
        fs::remove_file(&sidecar).map_err(|e| ReclaimError::from_io(e, &sidecar))?;
        info!(id, path = %record.backup_path.display(), "purged backup");
        Ok(record)
    }

    /// Bytes held by all listed backups
    pub fn total_size(&self) -> Result<u64> {
        Ok(self.list()?.iter().map(|r| r.size).sum())
    }

    fn unique_backup_path(&self, backup_date: DateTime<Utc>, base_name: &str) -> PathBuf {
        let stamp = backup_date.format(TIMESTAMP_FORMAT).to_string();
        let mut candidate = self.dir.join(format!("{stamp}_{base_name}"));
        let mut counter = 1;
        while candidate.exists() || sidecar_path(&candidate).exists() {
            candidate = self.dir.join(format!("{stamp}-{counter}_{base_name}"));
            counter += 1;
        }
        candidate
    }

    /// Copy to a `.partial` file, fsync, check the length, then rename
    fn copy_content(&self, source: &Path, backup_path: &Path, expected_len: u64) -> Result<()> {
        let mut partial_name = backup_path.as_os_str().to_os_string();
        partial_name.push(PARTIAL_SUFFIX);
        let partial = PathBuf::from(partial_name);

        let result = fs::copy(source, &partial).and_then(|copied| {
            File::open(&partial)?.sync_all()?;
            Ok(copied)
        });
        match result {
            Ok(copied) if copied == expected_len => {}
            Ok(copied) => {
                let _ = fs::remove_file(&partial);
                return Err(ReclaimError::BackupFailed {
                    path: source.to_path_buf(),
                    reason: format!("copied {copied} bytes, expected {expected_len}"),
                });
            }
            Err(e) => {
                let _ = fs::remove_file(&partial);
                return Err(backup_failed(source, e));
            }
        }

        fs::rename(&partial, backup_path).map_err(|e| {
            let _ = fs::remove_file(&partial);
            backup_failed(source, e)
        })
    }

    fn load_record(&self, backup_path: &Path) -> Result<BackupRecord> {
        let meta = read_sidecar(&sidecar_path(backup_path))?;
        let content = fs::metadata(backup_path).map_err(|e| ReclaimError::from_io(e, backup_path))?;

        let id = meta
            .id
            .unwrap_or_else(|| derived_id(backup_path, content.modified().ok()));
        let stored_name = backup_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(BackupRecord {
            id,
            original_path: meta.original_path,
            backup_path: backup_path.to_path_buf(),
            file_name: strip_timestamp_prefix(&stored_name).to_string(),
            size: meta.size,
            backup_date: meta.backup_date,
        })
    }
}

/// Identifier for sidecars that carry none: a hash of the backup path
/// and the copy's modification time
fn derived_id(backup_path: &Path, modified: Option<SystemTime>) -> String {
    let nanos = modified
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let key = format!("{}{}", backup_path.display(), nanos);
    let mut digest = hash_bytes(key.as_bytes(), HashAlgorithm::Blake3);
    digest.truncate(16);
    digest
}

/// `2024-05-01T10-00-00-000Z_report.txt` -> `report.txt`
fn strip_timestamp_prefix(name: &str) -> &str {
    match name.split_once('_') {
        Some((prefix, rest)) if is_timestamp_prefix(prefix) => rest,
        _ => name,
    }
}

/// A timestamp, optionally followed by a `-N` collision counter
fn is_timestamp_prefix(prefix: &str) -> bool {
    let bytes = prefix.as_bytes();
    if bytes.len() < TIMESTAMP_LEN
        || !bytes[..4].iter().all(u8::is_ascii_digit)
        || bytes[10] != b'T'
        || bytes[TIMESTAMP_LEN - 1] != b'Z'
    {
        return false;
    }
    let counter = &prefix[TIMESTAMP_LEN..];
    counter.is_empty()
        || counter
            .strip_prefix('-')
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn restore_temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.reclaim-restore"))
}

fn backup_failed(path: &Path, err: impl std::fmt::Display) -> ReclaimError {
    ReclaimError::BackupFailed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
