//! Backup-then-remove deletion of many paths with per-path outcomes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ErrorKind;
use crate::trash::BackupStore;
use crate::ReclaimError;

/// Where a single path ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeleteState {
    /// Backed up, then removed
    Removed,
    /// Nothing happened; the original is untouched
    BackupFailed,
    /// Backup exists but the original is still there
    RemoveFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ReclaimError> for DeleteFailure {
    fn from(err: &ReclaimError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result for one requested path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub path: PathBuf,
    pub state: DeleteState,
    pub deleted: bool,
    pub size: u64,
    pub backup_path: Option<PathBuf>,
    pub backup_id: Option<String>,
    pub error: Option<DeleteFailure>,
}

/// One outcome per requested path, in request order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub outcomes: Vec<DeleteOutcome>,
}

impl DeleteReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.deleted).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.deleted)
    }

    pub fn bytes_freed(&self) -> u64 {
        self.outcomes.iter().filter(|o| o.deleted).map(|o| o.size).sum()
    }
}

/// Deletes files by moving them into a [`BackupStore`] first
pub struct Deleter {
    store: BackupStore,
}

impl Deleter {
    pub fn new(store: BackupStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &BackupStore {
        &self.store
    }

    /// Delete every path independently. The original is only removed once
    /// its backup and sidecar are on disk.
    pub fn delete<P: AsRef<Path>>(&self, paths: &[P]) -> DeleteReport {
        let outcomes: Vec<DeleteOutcome> = paths.iter().map(|p| self.delete_one(p.as_ref())).collect();
        let report = DeleteReport { outcomes };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            bytes = report.bytes_freed(),
            "delete finished"
        );
        report
    }

    /// Remove the original of a `RemoveFailed` outcome again, reusing its
    /// existing backup. Other outcomes are returned unchanged.
    pub fn retry_remove(&self, outcome: &DeleteOutcome) -> DeleteOutcome {
        if outcome.state != DeleteState::RemoveFailed {
            return outcome.clone();
        }
        let mut retried = outcome.clone();
        match remove_original(&outcome.path, outcome.backup_path.as_deref()) {
            Ok(()) => {
                retried.state = DeleteState::Removed;
                retried.deleted = true;
                retried.error = None;
            }
            Err(e) => retried.error = Some(DeleteFailure::from(&e)),
        }
        retried
    }

    fn delete_one(&self, path: &Path) -> DeleteOutcome {
        let record = match self.store.backup(path) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "backup failed, keeping original");
                return DeleteOutcome {
                    path: path.to_path_buf(),
                    state: DeleteState::BackupFailed,
                    deleted: false,
                    size: 0,
                    backup_path: None,
                    backup_id: None,
                    error: Some(DeleteFailure::from(&e)),
                };
            }
        };

        let removed = remove_original(path, Some(record.backup_path.as_path()));
        if let Err(e) = &removed {
            warn!(path = %path.display(), error = %e, "removal failed after backup");
        }
        DeleteOutcome {
            path: path.to_path_buf(),
            state: if removed.is_ok() {
                DeleteState::Removed
            } else {
                DeleteState::RemoveFailed
            },
            deleted: removed.is_ok(),
            size: record.size,
            backup_path: Some(record.backup_path),
            backup_id: Some(record.id),
            error: removed.err().as_ref().map(DeleteFailure::from),
        }
    }
}

fn remove_original(path: &Path, backup_path: Option<&Path>) -> Result<(), ReclaimError> {
    fs::remove_file(path).map_err(|source| ReclaimError::RemoveFailed {
        path: path.to_path_buf(),
        backup_path: backup_path.map(Path::to_path_buf).unwrap_or_default(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Deleter) {
        let temp = TempDir::new().unwrap();
        let deleter = Deleter::new(BackupStore::new(temp.path().join("trash")));
        (temp, deleter)
    }

    #[test]
    fn test_delete_backs_up_then_removes() {
        let (temp, deleter) = setup();
        let file = temp.path().join("old.log");
        fs::write(&file, "log lines").unwrap();

        let report = deleter.delete(&[&file]);

        assert!(report.all_succeeded());
        assert_eq!(report.bytes_freed(), 9);
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.state, DeleteState::Removed);
        assert!(!file.exists());
        let backup = outcome.backup_path.as_ref().unwrap();
        assert_eq!(fs::read_to_string(backup).unwrap(), "log lines");
        assert_eq!(deleter.store().list().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_path_is_not_backed_up() {
        let (temp, deleter) = setup();
        let report = deleter.delete(&[temp.path().join("ghost.txt")]);

        assert_eq!(report.outcomes.len(), 1);
        let outcome = &report.outcomes[0];
        assert!(!outcome.deleted);
        assert_eq!(outcome.state, DeleteState::BackupFailed);
        assert_eq!(outcome.error.as_ref().unwrap().kind, ErrorKind::NotFound);
        assert!(outcome.backup_path.is_none());
        assert!(deleter.store().list().unwrap().is_empty());
    }

    #[test]
    fn test_paths_are_independent() {
        let (temp, deleter) = setup();
        let a = temp.path().join("a.tmp");
        let b = temp.path().join("b.tmp");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();
        let dir = temp.path().join("folder");
        fs::create_dir(&dir).unwrap();

        let missing = temp.path().join("missing");

        let report = deleter.delete(&[a.clone(), missing.clone(), dir.clone(), b.clone()]);

        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 2);
        assert!(!report.all_succeeded());
        assert!(!a.exists() && !b.exists());
        assert!(dir.exists());
        assert_eq!(report.outcomes[2].error.as_ref().unwrap().kind, ErrorKind::NotAFile);
        let paths: Vec<&Path> = report.outcomes.iter().map(|o| o.path.as_path()).collect();
        assert_eq!(paths, [a.as_path(), missing.as_path(), dir.as_path(), b.as_path()]);
    }

    #[test]
    fn test_retry_remove_reuses_backup() {
        let (temp, deleter) = setup();
        let file = temp.path().join("stuck.txt");
        fs::write(&file, "x").unwrap();
        let record = deleter.store().backup(&file).unwrap();

        let failed = DeleteOutcome {
            path: file.clone(),
            state: DeleteState::RemoveFailed,
            deleted: false,
            size: 1,
            backup_path: Some(record.backup_path.clone()),
            backup_id: Some(record.id.clone()),
            error: None,
        };
        let retried = deleter.retry_remove(&failed);

        assert_eq!(retried.state, DeleteState::Removed);
        assert!(retried.deleted);
        assert!(!file.exists());
        assert_eq!(deleter.store().list().unwrap().len(), 1);

        let again = deleter.retry_remove(&retried);
        assert_eq!(again, retried);
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_failure_keeps_backup() {
        use std::os::unix::fs::PermissionsExt;

        let (temp, deleter) = setup();
        let locked = temp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        let file = locked.join("file.txt");
        fs::write(&file, "precious").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // Root ignores directory permissions; nothing to observe then
        if fs::File::create(locked.join("canary")).is_ok() {
            let _ = fs::remove_file(locked.join("canary"));
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let report = deleter.delete(&[&file]);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let outcome = &report.outcomes[0];
        assert_eq!(outcome.state, DeleteState::RemoveFailed);
        assert_eq!(outcome.error.as_ref().unwrap().kind, ErrorKind::RemoveFailed);
        assert!(file.exists());
        assert!(outcome.backup_path.as_ref().unwrap().exists());

        let retried = deleter.retry_remove(outcome);
        assert!(retried.deleted);
        assert!(!file.exists());
    }
}
