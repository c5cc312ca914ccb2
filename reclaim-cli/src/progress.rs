use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use reclaim_core::{DuplicateProgress, ScanProgress};

const PATH_WIDTH: usize = 48;
const STEADY_TICK_MS: u64 = 100;

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner} {prefix:.bold} {pos} files {wide_msg}";
const BAR_TEMPLATE: &str =
    "[{elapsed_precise}] {prefix:.bold} ▕{bar:30.blue}▏{percent:>3}% {pos}/{len} {wide_msg}";

/// Live progress on stderr for the scan and hashing phases.
/// Draws nothing for `--quiet`, `--json` or when stderr is not a terminal.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Spinner until the scanner reports an estimated total, then a bar
    pub fn scanning(hidden: bool) -> Self {
        let bar = new_bar(hidden, None);
        bar.set_style(spinner_style());
        bar.set_prefix("Scanning");
        Self { bar }
    }

    /// Bar sized by the candidate count in the first progress report
    pub fn hashing(hidden: bool) -> Self {
        let bar = new_bar(hidden, Some(0));
        bar.set_style(bar_style());
        bar.set_prefix("Hashing");
        Self { bar }
    }

    pub fn scan(&self, progress: &ScanProgress) {
        if progress.files_estimated_total > 0 && self.bar.length().is_none() {
            self.bar.set_length(progress.files_estimated_total);
            self.bar.set_style(bar_style());
        }
        if let Some(len) = self.bar.length()
            && progress.files_processed > len
        {
            // the estimate undercounted
            self.bar.set_length(progress.files_processed);
        }
        self.bar.set_position(progress.files_processed);
        if let Some(path) = progress.current_path.as_deref() {
            self.bar.set_message(shorten(path, PATH_WIDTH));
        }
    }

    pub fn duplicates(&self, progress: &DuplicateProgress) {
        if self.bar.length() != Some(progress.files_total) {
            self.bar.set_length(progress.files_total);
        }
        self.bar.set_position(progress.files_processed);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    #[cfg(test)]
    fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

fn new_bar(hidden: bool, len: Option<u64>) -> ProgressBar {
    if hidden {
        return ProgressBar::with_draw_target(len, ProgressDrawTarget::hidden());
    }
    let bar = match len {
        Some(len) => ProgressBar::new(len),
        None => ProgressBar::new_spinner(),
    };
    bar.enable_steady_tick(Duration::from_millis(STEADY_TICK_MS));
    bar
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .map(|style| style.progress_chars("█▓▒░  "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Keep the tail of a long path, which is the part that changes
pub fn shorten(path: &Path, width: usize) -> String {
    let text = path.display().to_string();
    let count = text.chars().count();
    if count <= width {
        return text;
    }
    let tail: String = text.chars().skip(count - width + 3).collect();
    format!("...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scan_progress(processed: u64, estimate: u64) -> ScanProgress {
        ScanProgress {
            files_processed: processed,
            files_estimated_total: estimate,
            current_path: Some(PathBuf::from("/data/file.bin")),
            ..Default::default()
        }
    }

    #[test]
    fn test_templates_parse() {
        assert!(ProgressStyle::with_template(SPINNER_TEMPLATE).is_ok());
        assert!(ProgressStyle::with_template(BAR_TEMPLATE).is_ok());
    }

    #[test]
    fn test_scan_spins_without_estimate() {
        let progress = Progress::scanning(true);
        progress.scan(&scan_progress(3, 0));
        assert_eq!(progress.bar().length(), None);
        assert_eq!(progress.bar().position(), 3);
        assert_eq!(progress.bar().message(), "/data/file.bin");
    }

    #[test]
    fn test_scan_becomes_bar_with_estimate() {
        let progress = Progress::scanning(true);
        progress.scan(&scan_progress(2, 10));
        assert_eq!(progress.bar().length(), Some(10));
        assert_eq!(progress.bar().position(), 2);

        progress.scan(&scan_progress(12, 10));
        assert_eq!(progress.bar().length(), Some(12));

        progress.finish();
        assert!(progress.bar().is_finished());
    }

    #[test]
    fn test_hashing_bar_tracks_total() {
        let progress = Progress::hashing(true);
        progress.duplicates(&DuplicateProgress::new(4, 9));
        assert_eq!(progress.bar().length(), Some(9));
        assert_eq!(progress.bar().position(), 4);
        assert!(progress.bar().is_hidden());
    }

    #[test]
    fn test_shorten_keeps_tail() {
        assert_eq!(shorten(Path::new("/a/b"), 10), "/a/b");

        let long = Path::new("/home/user/projects/some/deeply/nested/file.txt");
        let short = shorten(long, 20);
        assert_eq!(short.chars().count(), 20);
        assert!(short.starts_with("..."));
        assert!(short.ends_with("nested/file.txt"));
    }

    #[test]
    fn test_shorten_multibyte() {
        let path = Path::new("/tmp/ååååååååååååååå.txt");
        let short = shorten(path, 10);
        assert_eq!(short.chars().count(), 10);
    }
}
