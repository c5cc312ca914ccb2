use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use reclaim_core::{Category, HashAlgorithm, KeepPolicy, parse_size};

/// RECLAIM - find reclaimable disk space and delete it recoverably
#[derive(Parser, Debug)]
#[command(name = "reclaim")]
#[command(about = "Find large stale files, temporaries and duplicates; delete them with a recoverable backup")]
#[command(version)]
pub struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG overrides this.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Hide the progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding deleted files and their metadata
    #[arg(long, global = true, env = "RECLAIM_BACKUP_DIR")]
    pub backup_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a directory and list reclaimable files
    Scan(ScanArgs),
    /// Find files with identical content
    Dupes(DupesArgs),
    /// Delete files, keeping a backup of each
    Delete(DeleteArgs),
    /// List backed-up files
    Backups(BackupsArgs),
    /// Put a backed-up file back
    Restore(RestoreArgs),
    /// Permanently remove backups
    Purge(PurgeArgs),
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Directory to scan (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Directory levels below the root to descend
    #[arg(short, long)]
    pub max_depth: Option<usize>,

    /// Include files and directories starting with a dot
    #[arg(short = 'a', long)]
    pub all: bool,

    /// Skip files larger than this (e.g. 4GiB)
    #[arg(long, value_parser = parse_size)]
    pub max_file_size: Option<u64>,

    /// Size from which a stale file counts as large
    #[arg(long, default_value = "100MiB", value_parser = parse_size)]
    pub large_size: u64,

    /// Days without access after which a large file is stale
    #[arg(long, default_value_t = 180)]
    pub stale_days: u64,

    /// Follow symbolic links
    #[arg(short, long)]
    pub follow_symlinks: bool,

    /// Skip the counting pass (progress shows no percentage)
    #[arg(long)]
    pub no_estimate: bool,

    /// List every file, not only reclaimable ones
    #[arg(long)]
    pub every_file: bool,

    /// Only list files in this category
    #[arg(short, long, value_parser = parse_category)]
    pub category: Option<Category>,

    /// Show at most this many files, largest first
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Print the summary and files as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DupesArgs {
    /// One directory to walk, or an explicit list of files
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Hash head, middle and tail samples instead of whole files
    #[arg(long)]
    pub sampled: bool,

    /// Bytes per sample window
    #[arg(long, default_value = "64KiB", value_parser = parse_size)]
    pub sample_size: u64,

    /// Content hash to group by
    #[arg(long, default_value_t = HashAlgorithm::default())]
    pub algorithm: HashAlgorithm,

    /// Hash every file, even ones with a unique size
    #[arg(long)]
    pub no_size_first: bool,

    /// Ignore files smaller than this
    #[arg(long, default_value = "1", value_parser = parse_size)]
    pub min_size: u64,

    /// Ignore files larger than this
    #[arg(long, value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Which copy survives: newest, oldest, none or all
    #[arg(short, long, default_value_t = KeepPolicy::default())]
    pub keep: KeepPolicy,

    /// Keep exactly this file in its group (overrides --keep)
    #[arg(long)]
    pub keep_path: Option<PathBuf>,

    /// Delete the copies the keep policy selects
    #[arg(long)]
    pub delete: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl DupesArgs {
    pub fn keep_policy(&self) -> KeepPolicy {
        match &self.keep_path {
            Some(path) => KeepPolicy::Specific(path.clone()),
            None => self.keep.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Files to delete
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Print the outcomes as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct BackupsArgs {
    /// Print the backups as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Backup id, as shown by `reclaim backups`
    pub id: String,

    /// Restore here instead of the original location
    #[arg(long)]
    pub to: Option<PathBuf>,

    /// Replace an existing file at the target
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args, Debug)]
pub struct PurgeArgs {
    /// Backup ids to remove
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub ids: Vec<String>,

    /// Remove every backup
    #[arg(long)]
    pub all: bool,
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::ALL
        .into_iter()
        .find(|c| letters(c.label()) == letters(s))
        .ok_or_else(|| {
            format!(
                "unknown category '{s}' (expected large-unused, temporary, installer or potential-duplicate)"
            )
        })
}

fn letters(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
