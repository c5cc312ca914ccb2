use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use super::estimate::estimate_file_count;
use super::filter::{is_denied, is_hidden_excluded, resolve_excludes};
use super::progress::{ProgressTracker, ScanMessage, ScanSummary};
use crate::classify::{Thresholds, annotate};
use crate::record::FileRecord;
use crate::{CancellationToken, ReclaimError, Result};

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory levels below the root to descend (None = unlimited).
    /// `Some(0)` only lists files directly inside the root.
    pub max_depth: Option<usize>,
    /// Skip entries whose name starts with `.`
    pub ignore_dotfiles: bool,
    /// Overrides `ignore_dotfiles`
    pub include_hidden: bool,
    /// Skip files larger than this many bytes (0 = unlimited)
    pub max_file_size: u64,
    /// Size above which a stale file is tagged large & unused
    pub large_file_size_threshold: u64,
    /// Days without access after which a large file is tagged
    pub stale_age_threshold_days: u64,
    /// Descend into symlinked directories and report symlinked files
    pub follow_symlinks: bool,
    /// Count files up front so progress has a percentage
    pub estimate_total: bool,
    /// Files per emitted batch
    pub batch_size: usize,
    /// Emit a progress update every this many files
    pub progress_interval: u64,
    /// Paths never descended into (e.g. the backup store)
    pub exclude: Vec<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            max_depth: None,
            ignore_dotfiles: true,
            include_hidden: false,
            max_file_size: 0,
            large_file_size_threshold: thresholds.large_file_size,
            stale_age_threshold_days: thresholds.stale_age_days,
            follow_symlinks: false,
            estimate_total: true,
            batch_size: 500,
            progress_interval: 10,
            exclude: Vec::new(),
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ReclaimError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.progress_interval == 0 {
            return Err(ReclaimError::InvalidConfig(
                "progress_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            large_file_size: self.large_file_size_threshold,
            stale_age_days: self.stale_age_threshold_days,
        }
    }

    fn descends_into(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth <= max)
    }
}

/// Breadth-first directory scanner
pub struct Scanner {
    config: ScanConfig,
    cancel_token: CancellationToken,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Scan a directory on a background thread.
    /// The receiver yields batches and progress; it closes when the scan ends.
    pub fn scan(
        self,
        root_path: PathBuf,
    ) -> (Receiver<ScanMessage>, std::thread::JoinHandle<Result<ScanSummary>>) {
        let (tx, rx) = crossbeam_channel::unbounded();

        let handle = std::thread::spawn(move || self.scan_blocking(&root_path, &tx));

        (rx, handle)
    }

    /// Scan on the calling thread, sending messages to `tx`
    pub fn scan_blocking(&self, root_path: &Path, tx: &Sender<ScanMessage>) -> Result<ScanSummary> {
        let root = match self.resolve_root(root_path) {
            Ok(root) => root,
            Err(e) => {
                let _ = tx.send(ScanMessage::Error(e.to_string()));
                return Err(e);
            }
        };
        let _ = tx.send(ScanMessage::Started(root.clone()));

        let estimated = if self.config.estimate_total {
            estimate_file_count(&root, &self.config, &self.cancel_token)
        } else {
            0
        };

        let exclude = resolve_excludes(&self.config.exclude);
        let thresholds = self.config.thresholds();
        let now = SystemTime::now();
        let mut progress = ProgressTracker::new(estimated, self.config.progress_interval);
        let mut summary = ScanSummary {
            root: root.clone(),
            ..Default::default()
        };
        let mut batch: Vec<FileRecord> = Vec::with_capacity(self.config.batch_size);

        // Each entry carries its own depth below the root
        let mut pending: VecDeque<(PathBuf, usize)> = VecDeque::new();
        let mut visited: HashSet<PathBuf> = HashSet::new();
        pending.push_back((root.clone(), 0));

        while let Some((dir, depth)) = pending.pop_front() {
            if self.cancel_token.is_cancelled() {
                return self.cancelled(batch, tx);
            }

            let resolved = fs::canonicalize(&dir).unwrap_or_else(|_| dir.clone());
            if !visited.insert(resolved) {
                debug!(path = %dir.display(), "directory already visited");
                continue;
            }

            let read_dir = match fs::read_dir(&dir) {
                Ok(rd) => rd,
                Err(e) if depth == 0 => {
                    let err = ReclaimError::from_io(e, &dir);
                    let _ = tx.send(ScanMessage::Error(err.to_string()));
                    return Err(err);
                }
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "skipping unreadable directory");
                    progress.error();
                    continue;
                }
            };
            progress.dir_scanned(dir.clone());

            for entry in read_dir {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        debug!(path = %dir.display(), error = %e, "skipping unreadable entry");
                        progress.error();
                        continue;
                    }
                };

                if is_hidden_excluded(&entry.file_name(), &self.config) {
                    continue;
                }
                let path = entry.path();
                if is_denied(&path, &root, &exclude) {
                    continue;
                }

                let is_symlink = entry.file_type().map(|t| t.is_symlink()).unwrap_or(false);
                if is_symlink && !self.config.follow_symlinks {
                    continue;
                }
                let metadata = if is_symlink {
                    fs::metadata(&path)
                } else {
                    entry.metadata()
                };
                let metadata = match metadata {
                    Ok(m) => m,
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "skipping entry without metadata");
                        progress.error();
                        continue;
                    }
                };

                if metadata.is_dir() {
                    if self.config.descends_into(depth + 1) {
                        pending.push_back((path, depth + 1));
                    }
                    continue;
                }
                if !metadata.is_file() {
                    continue;
                }
                if self.config.max_file_size > 0 && metadata.len() > self.config.max_file_size {
                    continue;
                }

                let mut record = FileRecord::from_metadata(path, &metadata);
                annotate(&mut record, &thresholds, now);

                summary.files_found += 1;
                summary.total_bytes += record.size;
                if record.is_reclaimable {
                    summary.reclaimable_files += 1;
                    summary.reclaimable_bytes += record.size;
                }
                batch.push(record);

                if let Some(snapshot) = progress.file_processed() {
                    let _ = tx.send(ScanMessage::Progress(snapshot));
                }

                if batch.len() >= self.config.batch_size {
                    let full = std::mem::replace(
                        &mut batch,
                        Vec::with_capacity(self.config.batch_size),
                    );
                    let _ = tx.send(ScanMessage::Batch(full));
                    // Suspension point: let consumers catch up
                    std::thread::yield_now();
                    if self.cancel_token.is_cancelled() {
                        return self.cancelled(batch, tx);
                    }
                }
            }
        }

        if !batch.is_empty() {
            let _ = tx.send(ScanMessage::Batch(batch));
        }

        summary.dirs_scanned = progress.snapshot().dirs_scanned;
        summary.errors = progress.snapshot().errors;
        let _ = tx.send(ScanMessage::Progress(progress.finish()));

        info!(
            root = %root.display(),
            files = summary.files_found,
            reclaimable = summary.reclaimable_files,
            errors = summary.errors,
            "scan completed"
        );
        let _ = tx.send(ScanMessage::Completed(summary.clone()));

        Ok(summary)
    }

    fn resolve_root(&self, root_path: &Path) -> Result<PathBuf> {
        self.config.validate()?;

        let root = root_path
            .canonicalize()
            .map_err(|e| ReclaimError::from_io(e, root_path))?;
        if !root.is_dir() {
            return Err(ReclaimError::NotADirectory(root));
        }
        Ok(root)
    }

    /// Flush what was already discovered, then report cancellation
    fn cancelled(&self, batch: Vec<FileRecord>, tx: &Sender<ScanMessage>) -> Result<ScanSummary> {
        if !batch.is_empty() {
            let _ = tx.send(ScanMessage::Batch(batch));
        }
        let _ = tx.send(ScanMessage::Cancelled);
        Err(ReclaimError::Cancelled)
    }
}
