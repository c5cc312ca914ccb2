use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Suffix of the sidecar written next to each backup copy
pub const SIDECAR_SUFFIX: &str = ".meta.json";

/// Sidecar record stored as `<backup name>.meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    /// Assigned at backup time; absent in sidecars from older writers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub original_path: Option<PathBuf>,
    pub size: u64,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub backup_date: DateTime<Utc>,
}

impl BackupMetadata {
    pub(crate) fn new(
        original_path: PathBuf,
        metadata: &fs::Metadata,
        backup_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(uuid::Uuid::new_v4().simple().to_string()),
            original_path: Some(original_path),
            size: metadata.len(),
            created: metadata.created().ok().map(to_utc),
            modified: metadata.modified().ok().map(to_utc),
            backup_date,
        }
    }
}

/// Sidecar location for a backup copy
pub fn sidecar_path(backup_path: &Path) -> PathBuf {
    let mut name = backup_path.as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Write the sidecar durably: temp file, fsync, rename
pub(crate) fn write_sidecar(path: &Path, meta: &BackupMetadata) -> Result<()> {
    let data = serde_json::to_vec_pretty(meta)?;

    let mut temp_name = path.as_os_str().to_os_string();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let written = File::create(&temp_path).and_then(|mut file| {
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, path)
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

pub(crate) fn read_sidecar(path: &Path) -> Result<BackupMetadata> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
