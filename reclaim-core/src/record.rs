use std::collections::BTreeSet;
use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::{ReclaimError, Result};

/// Reclaimable category assigned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    /// Big and not accessed for a long time
    LargeUnused,
    /// Transient files (temp, backups, caches, logs)
    Temporary,
    /// Installers and archives
    Installer,
    /// Name looks like a copy of another file
    PotentialDuplicate,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::LargeUnused,
        Category::Temporary,
        Category::Installer,
        Category::PotentialDuplicate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::LargeUnused => "Large & unused",
            Category::Temporary => "Temporary",
            Category::Installer => "Installer",
            Category::PotentialDuplicate => "Potential duplicate",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A regular file discovered on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub path: PathBuf,
    pub name: String,
    /// Apparent length in bytes
    pub size: u64,
    pub accessed_at: Option<SystemTime>,
    pub modified_at: Option<SystemTime>,
    pub created_at: Option<SystemTime>,
    /// Lower-cased, with leading dot; empty when the name has none
    pub extension: String,
    pub categories: BTreeSet<Category>,
    pub is_reclaimable: bool,
}

impl FileRecord {
    /// Build an unclassified record from already-fetched metadata
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let extension = extension_of(&path);

        Self {
            name,
            size: metadata.len(),
            accessed_at: metadata.accessed().ok(),
            modified_at: metadata.modified().ok(),
            created_at: metadata.created().ok(),
            extension,
            categories: BTreeSet::new(),
            is_reclaimable: false,
            path,
        }
    }

    /// Stat `path` (following symlinks) and build a record for it
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path).map_err(|e| ReclaimError::from_io(e, path))?;
        if !metadata.is_file() {
            return Err(ReclaimError::NotAFile(path.to_path_buf()));
        }
        Ok(Self::from_metadata(path.to_path_buf(), &metadata))
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}

/// Lower-cased extension with its leading dot, or an empty string.
/// Dotfiles such as `.bashrc` have no extension.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("/a/Setup.EXE")), ".exe");
        assert_eq!(extension_of(Path::new("/a/archive.tar.gz")), ".gz");
        assert_eq!(extension_of(Path::new("/a/README")), "");
        assert_eq!(extension_of(Path::new("/a/.bashrc")), "");
    }

    #[test]
    fn test_from_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.TXT");
        fs::write(&path, "hello").unwrap();

        let record = FileRecord::from_path(&path).unwrap();
        assert_eq!(record.name, "notes.TXT");
        assert_eq!(record.size, 5);
        assert_eq!(record.extension, ".txt");
        assert!(record.modified_at.is_some());
        assert!(!record.is_reclaimable);
    }

    #[test]
    fn test_from_path_rejects_directories_and_missing() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            FileRecord::from_path(temp.path()),
            Err(ReclaimError::NotAFile(_))
        ));
        assert!(matches!(
            FileRecord::from_path(&temp.path().join("missing")),
            Err(ReclaimError::NotFound(_))
        ));
    }
}
