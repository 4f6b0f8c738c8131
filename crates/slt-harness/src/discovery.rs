//! Locating test scripts on disk.

use std::fs;
use std::path::{Path, PathBuf};

use slt_error::{Result, SltError};
use tracing::{debug, info};

use crate::config::DiscoveryConfig;

/// Expand `paths` into the list of scripts to run.
///
/// Regular files are taken as given, whatever their extension. Each
/// directory is walked (depth-bounded, denylisted names skipped) and its
/// matching files are appended in sorted order.
///
/// # Errors
///
/// Returns [`SltError::PathNotFound`] for a path that does not exist.
pub fn discover_test_files<P: AsRef<Path>>(
    paths: &[P],
    config: &DiscoveryConfig,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let Ok(meta) = fs::metadata(path) else {
            return Err(SltError::PathNotFound {
                path: path.to_path_buf(),
            });
        };
        if meta.is_dir() {
            let mut found = Vec::new();
            walk_dir(path, 0, config, &mut found);
            found.sort();
            found.dedup();
            debug!(root = %path.display(), count = found.len(), "walked test directory");
            files.extend(found);
        } else {
            files.push(path.to_path_buf());
        }
    }
    info!(count = files.len(), "test files discovered");
    Ok(files)
}

fn walk_dir(dir: &Path, depth: usize, config: &DiscoveryConfig, out: &mut Vec<PathBuf>) {
    if depth > config.max_depth {
        return;
    }

    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries {
        let Ok(entry) = entry else { continue };
        let path = entry.path();

        // Follow symlinks for the type check, keep the original path.
        let Ok(meta) = fs::metadata(&path) else {
            continue;
        };

        if meta.is_dir() {
            let dir_name = entry.file_name();
            let name = dir_name.to_string_lossy();
            if config.denylist.iter().any(|d| d == name.as_ref()) {
                continue;
            }
            walk_dir(&path, depth + 1, config, out);
        } else if meta.is_file() && has_extension(&path, &config.extension) {
            out.push(path);
        }
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(has_extension(Path::new("a/select1.test"), "test"));
        assert!(has_extension(Path::new("a/select1.TEST"), "test"));
        assert!(!has_extension(Path::new("a/select1.test.generated"), "test"));
        assert!(!has_extension(Path::new("a/test"), "test"));
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = discover_test_files(&[&missing], &DiscoveryConfig::default()).unwrap_err();
        assert!(matches!(err, SltError::PathNotFound { path } if path == missing));
    }

    #[test]
    fn depth_bound_limits_walk() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("a/b");
        fs::create_dir_all(&deep).unwrap();
        fs::write(dir.path().join("top.test"), "").unwrap();
        fs::write(deep.join("deep.test"), "").unwrap();

        let shallow = DiscoveryConfig {
            max_depth: 1,
            ..DiscoveryConfig::default()
        };
        let files = discover_test_files(&[dir.path()], &shallow).unwrap();
        assert_eq!(files, vec![dir.path().join("top.test")]);

        let files = discover_test_files(&[dir.path()], &DiscoveryConfig::default()).unwrap();
        assert_eq!(files.len(), 2);
    }
}
