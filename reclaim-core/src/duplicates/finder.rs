use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender};
use jwalk::WalkDir;
use rayon::prelude::*;
use tracing::{debug, info};

use super::group::{DuplicateGroup, DuplicateReport};
use crate::hashing::{HashAlgorithm, HashMode, hash_file};
use crate::record::FileRecord;
use crate::scanner::{is_denied, resolve_excludes};
use crate::{CancellationToken, ReclaimError, Result};

/// Duplicate search options
#[derive(Debug, Clone)]
pub struct DuplicateOptions {
    /// Hash whole files; when false, large files are hashed from samples
    pub exact_match: bool,
    /// Bytes per sampled window (head, middle, tail)
    pub sample_size: u64,
    pub hash_algorithm: HashAlgorithm,
    /// Drop files with a unique size before hashing anything
    pub compare_size_first: bool,
    /// Smaller files are skipped (the default of 1 leaves out empty files)
    pub min_file_size: u64,
    /// Larger files are skipped (0 = unlimited)
    pub max_file_size: u64,
    /// Files hashed concurrently between progress updates
    pub hash_batch_size: usize,
    /// Paths never descended into when walking a root (e.g. the backup store)
    pub exclude: Vec<PathBuf>,
}

impl Default for DuplicateOptions {
    fn default() -> Self {
        Self {
            exact_match: true,
            sample_size: 64 * 1024,
            hash_algorithm: HashAlgorithm::default(),
            compare_size_first: true,
            min_file_size: 1,
            max_file_size: 0,
            hash_batch_size: 20,
            exclude: Vec::new(),
        }
    }
}

impl DuplicateOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.exact_match && self.sample_size == 0 {
            return Err(ReclaimError::InvalidConfig(
                "sample_size must be at least 1 when sampling".to_string(),
            ));
        }
        if self.hash_batch_size == 0 {
            return Err(ReclaimError::InvalidConfig(
                "hash_batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_file_size > 0 && self.max_file_size < self.min_file_size {
            return Err(ReclaimError::InvalidConfig(
                "max_file_size is below min_file_size".to_string(),
            ));
        }
        Ok(())
    }

    fn hash_mode(&self) -> HashMode {
        if self.exact_match {
            HashMode::Full
        } else {
            HashMode::Sampled {
                sample_size: self.sample_size,
            }
        }
    }

    fn size_in_bounds(&self, size: u64) -> bool {
        size >= self.min_file_size && (self.max_file_size == 0 || size <= self.max_file_size)
    }
}

/// Where the candidate files come from
#[derive(Debug, Clone)]
pub enum DuplicateSource {
    /// Explicit file list, e.g. from a previous scan
    Paths(Vec<PathBuf>),
    /// Every regular file below a directory
    Root(PathBuf),
}

/// Message sent from a running duplicate search
#[derive(Debug, Clone)]
pub enum DuplicateMessage {
    Progress(DuplicateProgress),
    Completed(DuplicateReport),
    Cancelled,
    Error(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicateProgress {
    pub files_processed: u64,
    pub files_total: u64,
    /// 0-100, never decreasing; the last update is 100
    pub percentage: f64,
}

impl DuplicateProgress {
    pub fn new(files_processed: u64, files_total: u64) -> Self {
        let percentage = if files_total == 0 {
            100.0
        } else {
            (files_processed as f64 / files_total as f64 * 100.0).min(100.0)
        };
        Self {
            files_processed,
            files_total,
            percentage,
        }
    }
}

/// Groups files by size and content hash.
/// All intermediate maps live inside one call, so finders can run side by side.
pub struct DuplicateFinder {
    options: DuplicateOptions,
    cancel_token: CancellationToken,
}

impl DuplicateFinder {
    pub fn new(options: DuplicateOptions) -> Self {
        Self {
            options,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Search on a background thread
    pub fn find(
        self,
        source: DuplicateSource,
    ) -> (Receiver<DuplicateMessage>, std::thread::JoinHandle<Result<DuplicateReport>>) {
        let (tx, rx) = crossbeam_channel::unbounded();

        let handle = std::thread::spawn(move || self.find_blocking(source, &tx));

        (rx, handle)
    }

    /// Search on the calling thread, sending messages to `tx`
    pub fn find_blocking(
        &self,
        source: DuplicateSource,
        tx: &Sender<DuplicateMessage>,
    ) -> Result<DuplicateReport> {
        match self.run(source, tx) {
            Ok(report) => {
                info!(
                    groups = report.groups.len(),
                    duplicates = report.total_duplicates,
                    savings = report.potential_savings_bytes,
                    "duplicate search completed"
                );
                let _ = tx.send(DuplicateMessage::Completed(report.clone()));
                Ok(report)
            }
            Err(ReclaimError::Cancelled) => {
                let _ = tx.send(DuplicateMessage::Cancelled);
                Err(ReclaimError::Cancelled)
            }
            Err(e) => {
                let _ = tx.send(DuplicateMessage::Error(e.to_string()));
                Err(e)
            }
        }
    }

    fn run(&self, source: DuplicateSource, tx: &Sender<DuplicateMessage>) -> Result<DuplicateReport> {
        self.options.validate()?;

        let paths = match source {
            DuplicateSource::Paths(paths) => paths,
            DuplicateSource::Root(root) => {
                collect_files(&root, &self.options.exclude, &self.cancel_token)?
            }
        };
        let total = paths.len() as u64;
        let mut processed = 0u64;
        let mut errors = 0u64;

        // Stage 1: stat every candidate, optionally dropping unique sizes.
        // A file reached through several names is kept once.
        let mut seen: HashSet<FileIdentity> = HashSet::new();
        let mut by_size: BTreeMap<u64, Vec<FileRecord>> = BTreeMap::new();
        for path in &paths {
            self.cancel_token.check()?;
            let record = FileRecord::from_path(path).and_then(|record| {
                let identity = FileIdentity::of(path)?;
                Ok((record, identity))
            });
            match record {
                Ok((record, identity)) if !seen.insert(identity.clone()) => {
                    debug!(path = %record.path.display(), "skipping second name for the same file");
                    processed += 1;
                }
                Ok((record, _)) if self.options.size_in_bounds(record.size) => {
                    by_size.entry(record.size).or_default().push(record);
                }
                Ok(_) => processed += 1,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping duplicate candidate");
                    processed += 1;
                }
            }
        }

        let mut candidates: Vec<FileRecord> = Vec::new();
        for (_, bucket) in by_size {
            if self.options.compare_size_first && bucket.len() < 2 {
                processed += bucket.len() as u64;
            } else {
                candidates.extend(bucket);
            }
        }
        let _ = tx.send(DuplicateMessage::Progress(DuplicateProgress::new(processed, total)));

        // Stage 2: hash in small concurrent sub-batches
        let algorithm = self.options.hash_algorithm;
        let mode = self.options.hash_mode();
        let mut by_content: HashMap<(u64, String), Vec<FileRecord>> = HashMap::new();

        for chunk in candidates.chunks(self.options.hash_batch_size) {
            self.cancel_token.check()?;

            let hashes: Vec<std::io::Result<String>> = chunk
                .par_iter()
                .map(|record| hash_file(&record.path, algorithm, mode))
                .collect();

            for (record, hash) in chunk.iter().zip(hashes) {
                match hash {
                    Ok(hash) => by_content
                        .entry((record.size, hash))
                        .or_default()
                        .push(record.clone()),
                    Err(e) => {
                        debug!(path = %record.path.display(), error = %e, "failed to hash file");
                        errors += 1;
                    }
                }
            }

            processed += chunk.len() as u64;
            let _ = tx.send(DuplicateMessage::Progress(DuplicateProgress::new(processed, total)));
            std::thread::yield_now();
        }

        // Stage 3: every (size, hash) with two or more files is a group
        let groups: Vec<DuplicateGroup> = by_content
            .into_iter()
            .filter(|(_, members)| members.len() >= 2)
            .map(|((file_size, content_hash), mut members)| {
                members.sort_by(|a, b| a.path.cmp(&b.path));
                DuplicateGroup {
                    content_hash,
                    file_size,
                    members,
                }
            })
            .collect();

        if processed < total || total == 0 {
            let _ = tx.send(DuplicateMessage::Progress(DuplicateProgress::new(total, total)));
        }

        Ok(DuplicateReport::from_groups(groups, processed, errors))
    }
}

/// What makes two paths the same file on disk
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FileIdentity {
    #[cfg(unix)]
    Inode { dev: u64, ino: u64 },
    #[cfg(not(unix))]
    Canonical(PathBuf),
}

impl FileIdentity {
    /// Follows symlinks, so a link and its target share an identity.
    /// On unix hard links do too.
    #[cfg(unix)]
    fn of(path: &Path) -> Result<Self> {
        use std::os::unix::fs::MetadataExt;

        let metadata = std::fs::metadata(path).map_err(|e| ReclaimError::from_io(e, path))?;
        Ok(Self::Inode {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn of(path: &Path) -> Result<Self> {
        path.canonicalize()
            .map(Self::Canonical)
            .map_err(|e| ReclaimError::from_io(e, path))
    }
}

/// Every regular file below `root`, skipping deny-listed directories
fn collect_files(
    root: &Path,
    exclude: &[PathBuf],
    cancel: &CancellationToken,
) -> Result<Vec<PathBuf>> {
    let root = root
        .canonicalize()
        .map_err(|e| ReclaimError::from_io(e, root))?;
    if !root.is_dir() {
        return Err(ReclaimError::NotADirectory(root));
    }
    let exclude = resolve_excludes(exclude);

    let root_for_filter = root.clone();
    let walker = WalkDir::new(&root)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .process_read_dir(move |_depth, path, _read_dir_state, children| {
            if is_denied(path, &root_for_filter, &exclude) {
                children.clear();
                return;
            }
            children.retain(|entry| match entry {
                Ok(e) => !is_denied(&e.path(), &root_for_filter, &exclude),
                Err(_) => true,
            });
        });

    let mut files = Vec::new();
    for entry in walker {
        cancel.check()?;
        match entry {
            Ok(e) if e.file_type().is_file() => files.push(e.path()),
            Ok(_) => {}
            Err(e) => debug!(error = %e, "skipping unreadable entry"),
        }
    }
    Ok(files)
}
