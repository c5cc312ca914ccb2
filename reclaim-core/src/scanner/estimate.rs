use std::path::Path;

use jwalk::WalkDir;

use super::ScanConfig;
use super::filter::{is_denied, resolve_excludes};
use crate::CancellationToken;

/// Directory levels the estimation pass descends at most
const ESTIMATE_DEPTH_CAP: usize = 8;

/// Count files under `root` with the scan's visibility rules, capped in
/// depth so large trees stay cheap. Stops early (returning the partial
/// count) if the token is cancelled.
pub(crate) fn estimate_file_count(
    root: &Path,
    config: &ScanConfig,
    cancel: &CancellationToken,
) -> u64 {
    let dir_levels = config
        .max_depth
        .map_or(ESTIMATE_DEPTH_CAP, |d| d.min(ESTIMATE_DEPTH_CAP));

    let root_for_filter = root.to_path_buf();
    let exclude = resolve_excludes(&config.exclude);
    let walker = WalkDir::new(root)
        .skip_hidden(config.ignore_dotfiles && !config.include_hidden)
        .follow_links(false)
        .sort(false)
        // jwalk counts the root as depth 0, its files as depth 1
        .max_depth(dir_levels + 1)
        .process_read_dir(move |_depth, path, _read_dir_state, children| {
            if is_denied(path, &root_for_filter, &exclude) {
                children.clear();
                return;
            }
            children.retain(|entry| match entry {
                Ok(e) => !is_denied(&e.path(), &root_for_filter, &exclude),
                Err(_) => false,
            });
        });

    let mut count = 0;
    for entry in walker {
        if cancel.is_cancelled() {
            break;
        }
        if let Ok(e) = entry
            && e.file_type().is_file()
        {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_estimate_matches_visible_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        fs::write(temp.path().join(".hidden"), "h").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub/b.txt"), "b").unwrap();

        let token = CancellationToken::new();
        let config = ScanConfig::default();
        assert_eq!(estimate_file_count(temp.path(), &config, &token), 2);

        let config = ScanConfig {
            include_hidden: true,
            ..Default::default()
        };
        assert_eq!(estimate_file_count(temp.path(), &config, &token), 3);

        let config = ScanConfig {
            max_depth: Some(0),
            ..Default::default()
        };
        assert_eq!(estimate_file_count(temp.path(), &config, &token), 1);
    }
}
