//! Heuristic tagging of files as reclaimable.
//!
//! Classification is advisory: a tag means "worth a look", never "safe to delete".

use std::collections::BTreeSet;
use std::sync::LazyLock;
use std::time::SystemTime;

use regex::Regex;

use crate::record::{Category, FileRecord};

const SECS_PER_DAY: u64 = 86_400;

/// Extensions of transient files
pub const TEMPORARY_EXTENSIONS: &[&str] = &[
    ".tmp", ".temp", ".bak", ".cache", ".log", ".old", ".swp", ".crdownload", ".part",
];

/// Extensions of installers, disk images and archives
pub const INSTALLER_EXTENSIONS: &[&str] = &[
    ".dmg", ".exe", ".msi", ".pkg", ".deb", ".rpm", ".appimage", ".iso", ".zip", ".tar", ".gz",
    ".tgz", ".bz2", ".xz", ".7z", ".rar",
];

/// "copy" in the languages file managers commonly name duplicates in,
/// e.g. `report copy.txt`, `report - Kopie.txt`, `report (copie).txt`
static COPY_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(copy|kopie|copie|copia|kopia|kopio|kopi|cópia)\b")
        .expect("copy word pattern is valid")
});

/// `report (1)` or `report_2`
static COPY_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\s*\(\d+\)|_\d+)$").expect("copy suffix pattern is valid")
});

/// Size and age limits used for the `LargeUnused` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Files strictly larger than this many bytes count as large
    pub large_file_size: u64,
    /// Files not accessed for strictly more than this many days count as stale
    pub stale_age_days: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            large_file_size: 100 * 1024 * 1024,
            stale_age_days: 180,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub categories: BTreeSet<Category>,
    pub is_reclaimable: bool,
}

/// Tag a record. Pure: the same record, thresholds and `now` always give
/// the same answer. A missing access time counts as never accessed.
pub fn classify(record: &FileRecord, thresholds: &Thresholds, now: SystemTime) -> Classification {
    let mut categories = BTreeSet::new();

    if record.size > thresholds.large_file_size
        && days_since(record.accessed_at, now) > thresholds.stale_age_days
    {
        categories.insert(Category::LargeUnused);
    }

    let ext = record.extension.as_str();
    if TEMPORARY_EXTENSIONS.contains(&ext) {
        categories.insert(Category::Temporary);
    }
    if INSTALLER_EXTENSIONS.contains(&ext) {
        categories.insert(Category::Installer);
    }

    if looks_like_copy(&record.name) {
        categories.insert(Category::PotentialDuplicate);
    }

    Classification {
        is_reclaimable: !categories.is_empty(),
        categories,
    }
}

/// Classify and store the result on the record
pub fn annotate(record: &mut FileRecord, thresholds: &Thresholds, now: SystemTime) {
    let Classification {
        categories,
        is_reclaimable,
    } = classify(record, thresholds, now);
    record.categories = categories;
    record.is_reclaimable = is_reclaimable;
}

/// Whether a file name follows one of the usual "copy of" naming schemes.
/// Only the part before the final extension is inspected.
pub fn looks_like_copy(name: &str) -> bool {
    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };
    COPY_WORD.is_match(stem) || COPY_SUFFIX.is_match(stem)
}

fn days_since(time: Option<SystemTime>, now: SystemTime) -> u64 {
    match time {
        // Timestamps in the future are treated as "just now"
        Some(t) => now
            .duration_since(t)
            .map(|age| age.as_secs() / SECS_PER_DAY)
            .unwrap_or(0),
        None => u64::MAX,
    }
}
