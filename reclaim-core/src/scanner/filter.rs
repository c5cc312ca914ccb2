use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use super::ScanConfig;

/// Directory names that only hold system or indexing metadata
pub const DENIED_NAMES: &[&str] = &[
    ".Spotlight-V100",
    ".fseventsd",
    ".DocumentRevisions-V100",
    ".TemporaryItems",
    ".Trashes",
    ".MobileBackups",
    "System Volume Information",
    "$RECYCLE.BIN",
    "lost+found",
];

/// Path fragments of virtual or problematic filesystems
const DENIED_PATTERNS: &[&str] = &[
    "/proc/",                   // Linux proc filesystem
    "/sys/",                    // Linux sys filesystem
    "/dev/",                    // Device files
    "/private/var/folders/",    // macOS temp folders (can hang)
    "/private/var/db/dyld/",    // dyld cache (permission issues)
    "/private/var/db/uuidtext/",
    "CoreSimulator/Volumes/", // iOS Simulator disk images
];

/// Whether a dot-prefixed entry should be left out
pub(crate) fn is_hidden_excluded(name: &OsStr, config: &ScanConfig) -> bool {
    config.ignore_dotfiles && !config.include_hidden && name.to_string_lossy().starts_with('.')
}

/// Canonical forms of excluded paths, so they compare against resolved
/// scan paths. Paths that do not exist are kept as given.
pub(crate) fn resolve_excludes(exclude: &[PathBuf]) -> Vec<PathBuf> {
    exclude
        .iter()
        .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
        .collect()
}

/// Whether `path` is on the deny-list or under an explicitly excluded path.
/// The root and its ancestors are never denied, so scanning inside a
/// denied location works when it is chosen on purpose.
pub(crate) fn is_denied(path: &Path, root: &Path, exclude: &[PathBuf]) -> bool {
    if path == root || root.starts_with(path) {
        return false;
    }

    if exclude.iter().any(|ex| path.starts_with(ex)) {
        return true;
    }

    if let Some(name) = path.file_name()
        && DENIED_NAMES.iter().any(|denied| name == OsStr::new(denied))
    {
        return true;
    }

    let path_str = format!("{}/", path.to_string_lossy());
    let root_str = format!("{}/", root.to_string_lossy());
    DENIED_PATTERNS
        .iter()
        .any(|pattern| path_str.contains(pattern) && !root_str.contains(pattern))
}
