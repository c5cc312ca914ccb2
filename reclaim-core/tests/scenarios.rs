use std::fs::{self, File, FileTimes};
use std::path::Path;
use std::time::{Duration, SystemTime};

use reclaim_core::{
    BackupStore, Category, DeleteState, Deleter, DuplicateFinder, DuplicateOptions,
    DuplicateSource, ErrorKind, FileRecord, KeepPolicy, ReclaimError, RestoreMode, ScanConfig,
    ScanMessage, Scanner,
};
use tempfile::TempDir;

const MB: u64 = 1024 * 1024;
const DAY: u64 = 86_400;

fn scan_files(root: &Path, config: ScanConfig) -> Vec<FileRecord> {
    let (rx, handle) = Scanner::new(config).scan(root.to_path_buf());
    let mut files = Vec::new();
    for msg in rx {
        if let ScanMessage::Batch(batch) = msg {
            files.extend(batch);
        }
    }
    handle.join().unwrap().unwrap();
    files
}

#[test]
fn large_stale_file_is_reclaimable() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("archive.bin");
    let file = File::create(&path).unwrap();
    file.set_len(200 * MB).unwrap();
    let long_ago = SystemTime::now() - Duration::from_secs(400 * DAY);
    file.set_times(FileTimes::new().set_accessed(long_ago).set_modified(long_ago))
        .unwrap();
    drop(file);

    let config = ScanConfig {
        large_file_size_threshold: 100 * MB,
        stale_age_threshold_days: 180,
        ..Default::default()
    };
    let files = scan_files(temp.path(), config);

    assert_eq!(files.len(), 1);
    assert!(files[0].has_category(Category::LargeUnused));
    assert!(files[0].is_reclaimable);
}

#[test]
fn copy_named_duplicates_are_grouped() {
    let temp = TempDir::new().unwrap();
    let content = "the same report body\n".repeat(50);
    fs::write(temp.path().join("report.txt"), &content).unwrap();
    fs::write(temp.path().join("report (1).txt"), &content).unwrap();

    let options = DuplicateOptions {
        exact_match: true,
        ..Default::default()
    };
    let (rx, handle) = DuplicateFinder::new(options)
        .find(DuplicateSource::Root(temp.path().to_path_buf()));
    for _ in rx {}
    let report = handle.join().unwrap().unwrap();

    let size = content.len() as u64;
    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].file_size, size);
    assert_eq!(report.groups[0].members.len(), 2);
    assert_eq!(report.total_duplicates, 1);
    assert_eq!(report.potential_savings_bytes, size);

    // The scanner flags the copy by name alone
    let files = scan_files(temp.path(), ScanConfig::default());
    let copy = files.iter().find(|f| f.name == "report (1).txt").unwrap();
    assert!(copy.has_category(Category::PotentialDuplicate));
}

#[test]
fn delete_then_restore_round_trip() {
    let temp = TempDir::new().unwrap();
    let store = BackupStore::new(temp.path().join(".trash"));
    let deleter = Deleter::new(store.clone());

    let path = temp.path().join("photo.jpg");
    let content: Vec<u8> = (0..10_000u32).map(|i| (i * 7 % 256) as u8).collect();
    fs::write(&path, &content).unwrap();

    let report = deleter.delete(&[&path]);
    assert!(report.all_succeeded());
    assert!(!path.exists());

    let backups = store.list().unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0].size, content.len() as u64);
    assert_eq!(Some(backups[0].id.as_str()), report.outcomes[0].backup_id.as_deref());

    store
        .restore(&backups[0].id, Some(path.as_path()), RestoreMode::FailOnConflict)
        .unwrap();
    assert_eq!(fs::read(&path).unwrap(), content);
}

#[test]
fn deleting_missing_path_creates_no_backup() {
    let temp = TempDir::new().unwrap();
    let store = BackupStore::new(temp.path().join(".trash"));
    let deleter = Deleter::new(store.clone());

    let report = deleter.delete(&[temp.path().join("nope.txt")]);

    assert_eq!(report.outcomes.len(), 1);
    let outcome = &report.outcomes[0];
    assert!(!outcome.deleted);
    assert_eq!(outcome.state, DeleteState::BackupFailed);
    assert_eq!(outcome.error.as_ref().unwrap().kind.as_str(), "NotFound");
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn restore_into_missing_directory_fails_without_copy() {
    let temp = TempDir::new().unwrap();
    let store = BackupStore::new(temp.path().join(".trash"));
    let path = temp.path().join("notes.txt");
    fs::write(&path, "notes").unwrap();
    let record = store.backup(&path).unwrap();

    let target = temp.path().join("does/not/exist/notes.txt");
    let err = store
        .restore(&record.id, Some(target.as_path()), RestoreMode::Overwrite)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RestoreTargetMissing);
    assert!(matches!(err, ReclaimError::RestoreTargetMissing(_)));
    assert!(!temp.path().join("does").exists());
}

#[test]
fn duplicates_resolved_and_deleted_through_backup() {
    let temp = TempDir::new().unwrap();
    let old = temp.path().join("old.txt");
    let new = temp.path().join("new.txt");
    fs::write(&old, "payload").unwrap();
    fs::write(&new, "payload").unwrap();
    let earlier = SystemTime::now() - Duration::from_secs(10 * DAY);
    File::options()
        .write(true)
        .open(&old)
        .unwrap()
        .set_modified(earlier)
        .unwrap();

    let (tx, _rx) = crossbeam_channel::unbounded();
    let report = DuplicateFinder::new(DuplicateOptions::default())
        .find_blocking(DuplicateSource::Paths(vec![old.clone(), new.clone()]), &tx)
        .unwrap();

    let doomed = report.paths_to_remove(&KeepPolicy::Newest);
    assert_eq!(doomed, [old.clone()]);

    let deleter = Deleter::new(BackupStore::new(temp.path().join(".trash")));
    let outcome = deleter.delete(&doomed);
    assert!(outcome.all_succeeded());
    assert!(!old.exists());
    assert!(new.exists());
}
