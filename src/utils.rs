//! General utility functions for modpatch
//!
//! This module contains common helper functions used across the library.

use crate::error::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Format a file size in human-readable form (B, KB, MB, GB)
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} B", size)
    }
}

/// Recursively collect all regular files below `dir`, sorted by path
///
/// A missing directory yields an empty list.
pub fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Archive member name for `path` relative to `root`, with "/" separators
pub fn relative_member_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Join a "/"-separated relative path onto a host directory
pub fn join_relative(base: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .fold(base.to_path_buf(), |acc, part| acc.join(part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_relative_member_name() {
        let root = Path::new("/tmp/ws");
        let file = root.join("Server").join("Item").join("a.json");
        assert_eq!(
            relative_member_name(root, &file).as_deref(),
            Some("Server/Item/a.json")
        );
        assert_eq!(relative_member_name(root, root), None);
    }

    #[test]
    fn test_join_relative() {
        let joined = join_relative(Path::new("base"), "Server/./Drops/");
        assert_eq!(joined, Path::new("base").join("Server").join("Drops"));
    }

    #[test]
    fn test_collect_files_missing_dir() {
        let files = collect_files(Path::new("definitely/not/here")).unwrap();
        assert!(files.is_empty());
    }
}
