use std::path::PathBuf;

use serde::Serialize;

use crate::record::FileRecord;

/// Message sent from a running scan
#[derive(Debug, Clone)]
pub enum ScanMessage {
    /// Scan started at this (resolved) root
    Started(PathBuf),
    /// A classified batch of files
    Batch(Vec<FileRecord>),
    /// Progress update
    Progress(ScanProgress),
    /// Scan completed; always preceded by a 100% progress update
    Completed(ScanSummary),
    /// Scan was cancelled
    Cancelled,
    /// Fatal error, the scan did not run
    Error(String),
}

/// Scanning progress statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanProgress {
    /// Number of files emitted so far
    pub files_processed: u64,
    /// Estimated number of files in the whole scan (0 = unknown)
    pub files_estimated_total: u64,
    /// 0-100, never decreasing within one scan
    pub percentage: f64,
    /// Number of directories read
    pub dirs_scanned: u64,
    /// Number of entries skipped because of errors
    pub errors: u64,
    /// Directory currently being read
    pub current_path: Option<PathBuf>,
}

/// Totals for a finished scan
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub root: PathBuf,
    pub files_found: u64,
    pub total_bytes: u64,
    pub reclaimable_files: u64,
    pub reclaimable_bytes: u64,
    pub dirs_scanned: u64,
    pub errors: u64,
}

/// Progress bookkeeping owned by a single scan
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    progress: ScanProgress,
    interval: u64,
}

impl ProgressTracker {
    pub(crate) fn new(estimated_total: u64, interval: u64) -> Self {
        Self {
            progress: ScanProgress {
                files_estimated_total: estimated_total,
                ..Default::default()
            },
            interval: interval.max(1),
        }
    }

    /// Count one file. Returns a snapshot when a report is due.
    pub(crate) fn file_processed(&mut self) -> Option<ScanProgress> {
        self.progress.files_processed += 1;
        if self.progress.files_processed % self.interval == 0 {
            self.refresh_percentage();
            Some(self.progress.clone())
        } else {
            None
        }
    }

    pub(crate) fn dir_scanned(&mut self, path: PathBuf) {
        self.progress.dirs_scanned += 1;
        self.progress.current_path = Some(path);
    }

    pub(crate) fn error(&mut self) {
        self.progress.errors += 1;
    }

    pub(crate) fn snapshot(&self) -> &ScanProgress {
        &self.progress
    }

    /// Final 100% report
    pub(crate) fn finish(mut self) -> ScanProgress {
        self.progress.files_estimated_total = self.progress.files_processed;
        self.progress.percentage = 100.0;
        self.progress.current_path = None;
        self.progress
    }

    fn refresh_percentage(&mut self) {
        let processed = self.progress.files_processed;
        // The estimate may be short (depth cap, files added meanwhile)
        let total = self.progress.files_estimated_total.max(processed);
        self.progress.files_estimated_total = total;
        let pct = if total == 0 {
            0.0
        } else {
            (processed as f64 / total as f64) * 100.0
        };
        self.progress.percentage = pct.clamp(self.progress.percentage, 99.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_every_interval() {
        let mut tracker = ProgressTracker::new(100, 10);
        let reports: Vec<_> = (0..25).filter_map(|_| tracker.file_processed()).collect();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].files_processed, 10);
        assert_eq!(reports[0].percentage, 10.0);
        assert_eq!(reports[1].percentage, 20.0);
    }

    #[test]
    fn test_percentage_caps_below_100_until_finish() {
        let mut tracker = ProgressTracker::new(5, 1);
        let mut last = 0.0;
        for _ in 0..20 {
            let p = tracker.file_processed().unwrap();
            assert!(p.percentage >= last);
            assert!(p.percentage <= 99.0);
            assert!(p.files_estimated_total >= p.files_processed);
            last = p.percentage;
        }
        let done = tracker.finish();
        assert_eq!(done.percentage, 100.0);
        assert_eq!(done.files_estimated_total, 20);
    }

    #[test]
    fn test_unknown_total() {
        let mut tracker = ProgressTracker::new(0, 1);
        let p = tracker.file_processed().unwrap();
        assert_eq!(p.files_estimated_total, 1);
        assert_eq!(p.percentage, 99.0);
    }
}
