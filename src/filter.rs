//! Member path normalization and extraction filters

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Normalize an archive member path
///
/// Backslashes become `/` and any leading `./` or `/` segments are dropped,
/// so `.\Server\a.json`, `./Server/a.json` and `Server/a.json` compare equal.
pub fn normalize_member_path(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    loop {
        if let Some(rest) = normalized.strip_prefix("./") {
            normalized = rest.to_string();
        } else if let Some(rest) = normalized.strip_prefix('/') {
            normalized = rest.to_string();
        } else {
            break;
        }
    }
    normalized
}

/// Whether a member name denotes a directory entry rather than a file
pub fn is_directory_member(name: &str) -> bool {
    name.is_empty() || name.ends_with('/') || name.ends_with('\\')
}

/// How a [`FilterSpec`] treats its path set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Retain only the listed members
    Keep,
    /// Retain everything except the listed members
    Remove,
    /// Retain every file member
    Passthrough,
}

/// Selection applied to archive members while building a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub mode: FilterMode,
    #[serde(default)]
    pub paths: BTreeSet<String>,
}

impl FilterSpec {
    /// Retain only members whose normalized path is in `paths`
    pub fn keep<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_mode(FilterMode::Keep, paths)
    }

    /// Drop members whose normalized path is in `paths`
    pub fn remove<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_mode(FilterMode::Remove, paths)
    }

    /// Retain all file members
    pub fn passthrough() -> Self {
        Self {
            mode: FilterMode::Passthrough,
            paths: BTreeSet::new(),
        }
    }

    fn with_mode<I, S>(mode: FilterMode, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            mode,
            paths: paths
                .into_iter()
                .map(|p| normalize_member_path(p.as_ref()))
                .collect(),
        }
    }

    /// Decide whether a member is materialized
    ///
    /// Directory entries are never admitted.
    pub fn admits(&self, member_name: &str) -> bool {
        if is_directory_member(member_name) {
            return false;
        }
        let name = normalize_member_path(member_name);
        match self.mode {
            FilterMode::Keep => self.paths.contains(&name),
            FilterMode::Remove => !self.paths.contains(&name),
            FilterMode::Passthrough => true,
        }
    }
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self::passthrough()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_member_path() {
        assert_eq!(normalize_member_path("./Server/a.json"), "Server/a.json");
        assert_eq!(normalize_member_path(".\\Server\\a.json"), "Server/a.json");
        assert_eq!(normalize_member_path("/././manifest.json"), "manifest.json");
        assert_eq!(normalize_member_path("Common/x.png"), "Common/x.png");
    }

    #[test]
    fn test_keep_filter() {
        let filter = FilterSpec::keep(["./manifest.json", "Common\\Icons\\a.png"]);
        assert!(filter.admits("manifest.json"));
        assert!(filter.admits("Common/Icons/a.png"));
        assert!(!filter.admits("Common/Icons/b.png"));
    }

    #[test]
    fn test_keep_empty_admits_nothing() {
        let filter = FilterSpec::keep(Vec::<String>::new());
        assert!(!filter.admits("manifest.json"));
    }

    #[test]
    fn test_remove_filter() {
        let filter = FilterSpec::remove(["Server/Languages/en.lang"]);
        assert!(!filter.admits("Server/Languages/en.lang"));
        assert!(filter.admits("manifest.json"));
    }

    #[test]
    fn test_directories_never_admitted() {
        assert!(!FilterSpec::passthrough().admits("Server/"));
        assert!(!FilterSpec::remove(Vec::<String>::new()).admits("Common/Icons/"));
        assert!(FilterSpec::passthrough().admits("Server/a.json"));
    }
}
