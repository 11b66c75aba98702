//! Run configuration

use std::path::PathBuf;

/// Default directory holding the input mod archives
pub const DEFAULT_MODS_DIR: &str = "mods";
/// Default root of the external patch data tree
pub const DEFAULT_PATCH_DATA_DIR: &str = "patch_data";
/// Default suffix marking patched output, also used to skip earlier outputs
pub const DEFAULT_MARKER: &str = "trw";

/// Settings for one batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatcherConfig {
    /// Flat directory of input archives; output goes to `<mods_dir>/patched`
    pub mods_dir: PathBuf,
    /// Root of the external patch data tree, one subdirectory per rule
    pub patch_data_dir: PathBuf,
    /// Output marker; archives whose name contains it are never processed
    pub marker: String,
    /// Extra rules evaluated before the built-in table
    pub rules_file: Option<PathBuf>,
}

impl Default for PatcherConfig {
    fn default() -> Self {
        Self {
            mods_dir: PathBuf::from(DEFAULT_MODS_DIR),
            patch_data_dir: PathBuf::from(DEFAULT_PATCH_DATA_DIR),
            marker: DEFAULT_MARKER.to_string(),
            rules_file: None,
        }
    }
}

impl PatcherConfig {
    /// Directory patched archives are written to
    pub fn output_dir(&self) -> PathBuf {
        self.mods_dir.join(crate::workspace::PATCHED_DIR)
    }
}
