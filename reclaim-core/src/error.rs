use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReclaimError {
    #[error("Path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Path is not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Backup of {path} failed: {reason}")]
    BackupFailed { path: PathBuf, reason: String },

    #[error("Backed up to {backup_path} but removing {path} failed: {source}")]
    RemoveFailed {
        path: PathBuf,
        backup_path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Restore target already exists: {0}")]
    RestoreConflict(PathBuf),

    #[error("Parent directory of restore target does not exist: {0}")]
    RestoreTargetMissing(PathBuf),

    #[error("No backup with id {0}")]
    BackupNotFound(String),

    #[error("Backup {0} has no recorded original path and no target was given")]
    NoRestoreTarget(String),

    #[error("Invalid backup metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Operation was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ReclaimError>;

/// Flat classification of [`ReclaimError`], stable across messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    NotADirectory,
    NotAFile,
    InvalidConfig,
    BackupFailed,
    RemoveFailed,
    RestoreConflict,
    RestoreTargetMissing,
    BackupNotFound,
    NoRestoreTarget,
    Metadata,
    Io,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::NotADirectory => "NotADirectory",
            ErrorKind::NotAFile => "NotAFile",
            ErrorKind::InvalidConfig => "InvalidConfig",
            ErrorKind::BackupFailed => "BackupFailed",
            ErrorKind::RemoveFailed => "RemoveFailed",
            ErrorKind::RestoreConflict => "RestoreConflict",
            ErrorKind::RestoreTargetMissing => "RestoreTargetMissing",
            ErrorKind::BackupNotFound => "BackupNotFound",
            ErrorKind::NoRestoreTarget => "NoRestoreTarget",
            ErrorKind::Metadata => "Metadata",
            ErrorKind::Io => "Io",
            ErrorKind::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ReclaimError {
    /// Attach a path to an IO error, keeping the common kinds distinguishable
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ReclaimError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => ReclaimError::PermissionDenied(path.to_path_buf()),
            _ => ReclaimError::Io(err),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ReclaimError::NotFound(_) => ErrorKind::NotFound,
            ReclaimError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ReclaimError::NotADirectory(_) => ErrorKind::NotADirectory,
            ReclaimError::NotAFile(_) => ErrorKind::NotAFile,
            ReclaimError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            ReclaimError::BackupFailed { .. } => ErrorKind::BackupFailed,
            ReclaimError::RemoveFailed { .. } => ErrorKind::RemoveFailed,
            ReclaimError::RestoreConflict(_) => ErrorKind::RestoreConflict,
            ReclaimError::RestoreTargetMissing(_) => ErrorKind::RestoreTargetMissing,
            ReclaimError::BackupNotFound(_) => ErrorKind::BackupNotFound,
            ReclaimError::NoRestoreTarget(_) => ErrorKind::NoRestoreTarget,
            ReclaimError::Metadata(_) => ErrorKind::Metadata,
            ReclaimError::Io(_) => ErrorKind::Io,
            ReclaimError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_maps_common_kinds() {
        let path = Path::new("/nowhere/file.txt");

        let err = ReclaimError::from_io(io::Error::from(io::ErrorKind::NotFound), path);
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = ReclaimError::from_io(io::Error::from(io::ErrorKind::PermissionDenied), path);
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        let err = ReclaimError::from_io(io::Error::other("disk on fire"), path);
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::NotFound.to_string(), "NotFound");
        assert_eq!(ErrorKind::RestoreTargetMissing.as_str(), "RestoreTargetMissing");
    }
}
