pub mod cancel;
pub mod classify;
pub mod delete;
pub mod duplicates;
pub mod error;
pub mod hashing;
pub mod record;
pub mod scanner;
pub mod size;
pub mod trash;

pub use cancel::CancellationToken;
pub use classify::{Classification, Thresholds, annotate, classify, looks_like_copy};
pub use delete::{DeleteFailure, DeleteOutcome, DeleteReport, DeleteState, Deleter};
pub use duplicates::{
    DuplicateFinder, DuplicateGroup, DuplicateMessage, DuplicateOptions, DuplicateProgress,
    DuplicateReport, DuplicateSource, KeepPolicy,
};
pub use error::{ErrorKind, ReclaimError, Result};
pub use hashing::{HashAlgorithm, HashMode, hash_file};
pub use record::{Category, FileRecord};
pub use scanner::{ScanConfig, ScanMessage, ScanProgress, ScanSummary, Scanner};
pub use size::{format_size, parse_size};
pub use trash::{BackupRecord, BackupStore, RestoreMode};
