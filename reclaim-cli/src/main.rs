mod args;
mod commands;
mod logging;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use color_eyre::Section;
use color_eyre::eyre::{Result, eyre};
use reclaim_core::BackupStore;

use args::{Cli, Command};
use commands::Context;

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init(cli.verbose);

    let backup_dir = resolve_backup_dir(cli.backup_dir)?;
    tracing::debug!(dir = %backup_dir.display(), "using backup store");
    let ctx = Context {
        store: BackupStore::new(backup_dir),
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Scan(args) => commands::scan(args, &ctx),
        Command::Dupes(args) => commands::dupes(args, &ctx),
        Command::Delete(args) => commands::delete(args, &ctx),
        Command::Backups(args) => commands::backups(args, &ctx),
        Command::Restore(args) => commands::restore(args, &ctx),
        Command::Purge(args) => commands::purge(args, &ctx),
    }
}

/// `--backup-dir`, then `RECLAIM_BACKUP_DIR`, then the user data directory
fn resolve_backup_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(dir) => Ok(dir),
        None => dirs::data_dir()
            .map(|d| d.join("reclaim").join("trash"))
            .ok_or_else(|| eyre!("could not determine the user data directory"))
            .suggestion("pass --backup-dir or set RECLAIM_BACKUP_DIR"),
    }
}
