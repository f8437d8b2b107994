use crate::config::DEFAULT_FILE_PATTERN;
use crate::error::EtlError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

static DEFAULT_PATTERN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(DEFAULT_FILE_PATTERN).unwrap());

/// Compile a file name pattern, reusing the built-in one when possible
pub fn file_pattern(pattern: &str) -> Result<Regex, EtlError> {
    if pattern == DEFAULT_FILE_PATTERN {
        return Ok(DEFAULT_PATTERN_REGEX.clone());
    }
    Regex::new(pattern).map_err(|e| EtlError::Config(format!("invalid file pattern {:?}: {}", pattern, e)))
}

/// Recursively collect files under `root` whose name matches `pattern`
///
/// Paths are absolute and come back in traversal order, with siblings sorted by
/// name. Symlinked files count as files; symlinked directories are not descended
/// into. A missing root yields no files.
pub fn find_files(root: &Path, pattern: &Regex) -> Result<Vec<PathBuf>, EtlError> {
    let root = std::path::absolute(root).map_err(|source| EtlError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    if !root.exists() {
        tracing::warn!("Data directory {} does not exist", root.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable path: {}", e);
                continue;
            }
        };

        // Follows a symlink to its target; dangling links are skipped
        if !entry.path().is_file() {
            continue;
        }

        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| pattern.is_match(name));
        if matches {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// `find_files` with the default `*.json` pattern
pub fn find_json_files(root: &Path) -> Result<Vec<PathBuf>, EtlError> {
    find_files(root, &DEFAULT_PATTERN_REGEX)
}
