use std::path::PathBuf;
use std::process::ExitCode;

use color_eyre::Section;
use color_eyre::eyre::{Result, WrapErr, eyre};
use reclaim_core::{
    BackupStore, DeleteReport, Deleter, DuplicateFinder, DuplicateMessage, DuplicateOptions,
    DuplicateReport, DuplicateSource, FileRecord, KeepPolicy, ReclaimError, RestoreMode,
    ScanConfig, ScanMessage, Scanner, format_size,
};
use tracing::{debug, info, warn};

use crate::args::{BackupsArgs, DeleteArgs, DupesArgs, PurgeArgs, RestoreArgs, ScanArgs};
use crate::progress::Progress;

/// Settings shared by every subcommand
pub struct Context {
    pub store: BackupStore,
    pub quiet: bool,
}

pub fn scan(args: ScanArgs, ctx: &Context) -> Result<ExitCode> {
    let config = ScanConfig {
        max_depth: args.max_depth,
        ignore_dotfiles: !args.all,
        include_hidden: args.all,
        max_file_size: args.max_file_size.unwrap_or(0),
        large_file_size_threshold: args.large_size,
        stale_age_threshold_days: args.stale_days,
        follow_symlinks: args.follow_symlinks,
        estimate_total: !args.no_estimate,
        exclude: vec![ctx.store.dir().to_path_buf()],
        ..Default::default()
    };

    let (rx, handle) = Scanner::new(config).scan(args.path.clone());
    let progress = Progress::scanning(ctx.quiet || args.json);
    let mut files: Vec<FileRecord> = Vec::new();
    for msg in rx {
        match msg {
            ScanMessage::Started(root) => info!(root = %root.display(), "scan started"),
            ScanMessage::Batch(batch) => files.extend(batch),
            ScanMessage::Progress(p) => progress.scan(&p),
            ScanMessage::Error(e) => debug!(error = %e, "scan failed"),
            ScanMessage::Completed(_) | ScanMessage::Cancelled => {}
        }
    }
    progress.finish();
    let summary = handle
        .join()
        .map_err(|_| eyre!("scanner thread panicked"))??;

    files.retain(|f| {
        (args.every_file || f.is_reclaimable)
            && args.category.is_none_or(|c| f.has_category(c))
    });
    files.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
    if let Some(limit) = args.limit {
        files.truncate(limit);
    }

    if args.json {
        let out = serde_json::json!({ "summary": summary, "files": files });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(ExitCode::SUCCESS);
    }

    for file in &files {
        let categories: Vec<&str> = file.categories.iter().map(|c| c.label()).collect();
        println!(
            "{:>10}  {:<28}  {}",
            format_size(file.size),
            categories.join(", "),
            file.path.display()
        );
    }
    if !files.is_empty() {
        println!();
    }
    println!(
        "{} files, {} scanned in {} directories",
        summary.files_found,
        format_size(summary.total_bytes),
        summary.dirs_scanned
    );
    println!(
        "{} reclaimable files, {} reclaimable",
        summary.reclaimable_files,
        format_size(summary.reclaimable_bytes)
    );
    if summary.errors > 0 {
        println!("{} entries could not be read (run with -v for details)", summary.errors);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn dupes(args: DupesArgs, ctx: &Context) -> Result<ExitCode> {
    let options = DuplicateOptions {
        exact_match: !args.sampled,
        sample_size: args.sample_size,
        hash_algorithm: args.algorithm,
        compare_size_first: !args.no_size_first,
        min_file_size: args.min_size,
        max_file_size: args.max_size.unwrap_or(0),
        exclude: vec![ctx.store.dir().to_path_buf()],
        ..Default::default()
    };
    let source = match args.paths.as_slice() {
        [single] if single.is_dir() => DuplicateSource::Root(single.clone()),
        paths => DuplicateSource::Paths(paths.to_vec()),
    };

    let (rx, handle) = DuplicateFinder::new(options).find(source);
    let progress = Progress::hashing(ctx.quiet || args.json);
    for msg in rx {
        match msg {
            DuplicateMessage::Progress(p) => progress.duplicates(&p),
            DuplicateMessage::Error(e) => debug!(error = %e, "duplicate search failed"),
            DuplicateMessage::Completed(_) | DuplicateMessage::Cancelled => {}
        }
    }
    progress.finish();
    let report = handle
        .join()
        .map_err(|_| eyre!("duplicate finder thread panicked"))??;

    let policy = args.keep_policy();
    let deleted = if args.delete {
        let doomed = report.paths_to_remove(&policy);
        info!(files = doomed.len(), policy = %policy, "deleting duplicates");
        Some(Deleter::new(ctx.store.clone()).delete(&doomed))
    } else {
        None
    };

    if args.json {
        let out = serde_json::json!({ "report": report, "deleted": deleted });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_duplicates(&report, &policy, args.delete);
        if let Some(deleted) = &deleted {
            println!();
            print_delete_report(deleted);
        }
    }

    Ok(match deleted {
        Some(report) if !report.all_succeeded() => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

pub fn delete(args: DeleteArgs, ctx: &Context) -> Result<ExitCode> {
    let report = Deleter::new(ctx.store.clone()).delete(&args.paths);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_delete_report(&report);
    }

    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub fn backups(args: BackupsArgs, ctx: &Context) -> Result<ExitCode> {
    let records = ctx
        .store
        .list()
        .wrap_err_with(|| format!("could not list backups in {}", ctx.store.dir().display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(ExitCode::SUCCESS);
    }

    if records.is_empty() {
        println!("No backups in {}", ctx.store.dir().display());
        return Ok(ExitCode::SUCCESS);
    }
    for record in &records {
        let origin = record
            .original_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("{} (original location unknown)", record.file_name));
        println!(
            "{:<32}  {}  {:>10}  {}",
            record.id,
            record.backup_date.format("%Y-%m-%d %H:%M:%S"),
            format_size(record.size),
            origin
        );
    }
    let total: u64 = records.iter().map(|r| r.size).sum();
    println!();
    println!(
        "{} backups, {} in {}",
        records.len(),
        format_size(total),
        ctx.store.dir().display()
    );
    Ok(ExitCode::SUCCESS)
}

pub fn restore(args: RestoreArgs, ctx: &Context) -> Result<ExitCode> {
    let mode = if args.overwrite {
        RestoreMode::Overwrite
    } else {
        RestoreMode::FailOnConflict
    };

    match ctx.store.restore(&args.id, args.to.as_deref(), mode) {
        Ok(target) => {
            println!("Restored {} to {}", args.id, target.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ ReclaimError::RestoreConflict(_)) => Err(e)
            .suggestion("pass --overwrite to replace it, or --to to restore somewhere else"),
        Err(e @ ReclaimError::RestoreTargetMissing(_)) => {
            Err(e).suggestion("create the directory first, or pass --to with another location")
        }
        Err(e @ ReclaimError::NoRestoreTarget(_)) => {
            Err(e).suggestion("pass --to with the location to restore to")
        }
        Err(e) => Err(e.into()),
    }
}

pub fn purge(args: PurgeArgs, ctx: &Context) -> Result<ExitCode> {
    let ids: Vec<String> = if args.all {
        ctx.store
            .list()
            .wrap_err("could not list backups to purge")?
            .into_iter()
            .map(|r| r.id)
            .collect()
    } else {
        args.ids
    };

    let mut freed = 0u64;
    let mut failed = 0usize;
    for id in &ids {
        match ctx.store.purge(id) {
            Ok(record) => {
                freed += record.size;
                println!("Purged {id} ({})", record.file_name);
            }
            Err(e) => {
                warn!(id = %id, error = %e, "purge failed");
                eprintln!("Could not purge {id}: {e}");
                failed += 1;
            }
        }
    }
    println!(
        "Purged {} of {} backups, freed {}",
        ids.len() - failed,
        ids.len(),
        format_size(freed)
    );

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_duplicates(report: &DuplicateReport, policy: &KeepPolicy, deleting: bool) {
    for group in &report.groups {
        let removed: Vec<PathBuf> = group
            .files_to_remove(policy)
            .into_iter()
            .map(|r| r.path.clone())
            .collect();
        println!(
            "{} x {}  ({} reclaimable)  {}",
            group.members.len(),
            format_size(group.file_size),
            format_size(group.reclaimable_bytes()),
            short_hash(&group.content_hash)
        );
        for member in &group.members {
            let marker = if removed.contains(&member.path) { "-" } else { "+" };
            println!("  {marker} {}", member.path.display());
        }
    }
    if !report.groups.is_empty() {
        println!();
    }
    println!(
        "{} groups, {} duplicate files, {} reclaimable ({} files checked)",
        report.groups.len(),
        report.total_duplicates,
        format_size(report.potential_savings_bytes),
        report.files_processed
    );
    if !deleting && !report.groups.is_empty() {
        println!("Files marked - would be removed with --delete (keep policy: {policy})");
    }
}

fn print_delete_report(report: &DeleteReport) {
    for outcome in &report.outcomes {
        match (&outcome.error, &outcome.backup_id) {
            (None, Some(id)) => println!(
                "removed  {}  ({}, backup {id})",
                outcome.path.display(),
                format_size(outcome.size)
            ),
            (Some(err), Some(id)) => println!(
                "FAILED   {}  {}: {} (backup {id} kept)",
                outcome.path.display(),
                err.kind,
                err.message
            ),
            (Some(err), None) => println!(
                "FAILED   {}  {}: {}",
                outcome.path.display(),
                err.kind,
                err.message
            ),
            (None, None) => println!("skipped  {}", outcome.path.display()),
        }
    }
    println!(
        "Deleted {} of {} files, freed {}",
        report.succeeded(),
        report.outcomes.len(),
        format_size(report.bytes_freed())
    );
    if report.succeeded() > 0 {
        println!("Undo with `reclaim restore <backup id>`");
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
