//! Streaming swap of an embedded resource directory
//!
//! Some mods only need one subtree replaced wholesale. Instead of extracting
//! the archive to disk, members are streamed straight into a sibling temp
//! archive: everything outside the prefix is raw-copied and the replacement
//! files are written under the prefix. The temp archive is then renamed onto
//! the output path.

use crate::error::{Error, Result};
use crate::filter::{is_directory_member, normalize_member_path};
use crate::utils::{collect_files, relative_member_name};
use crate::workspace::{fresh_member_options, open_archive, scratch_path};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;
use zip::ZipWriter;

/// Counts reported by [`swap_resource_dir`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapSummary {
    /// Members copied through unchanged
    pub kept: usize,
    /// Members under the prefix that were dropped
    pub dropped: usize,
    /// Replacement files written under the prefix
    pub injected: usize,
}

/// Replace everything under `prefix` in `archive` with the files of `replacement_dir`
///
/// # Arguments
/// * `archive` - Input archive, never modified
/// * `prefix` - Member prefix to swap, e.g. `Server/YmmersiveMelodies/`
/// * `replacement_dir` - Directory whose files are injected under `prefix`;
///   a missing directory injects nothing
/// * `output` - Final archive path
pub fn swap_resource_dir(
    archive: &Path,
    prefix: &str,
    replacement_dir: &Path,
    output: &Path,
) -> Result<SwapSummary> {
    let temp = scratch_path(archive);
    let result = write_swapped(archive, prefix, replacement_dir, &temp).and_then(|summary| {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(Error::fs(parent))?;
        }
        fs::rename(&temp, output).map_err(Error::fs(output))?;
        Ok(summary)
    });

    if result.is_err() && temp.exists() {
        let _ = fs::remove_file(&temp);
    }
    result
}

fn write_swapped(
    archive: &Path,
    prefix: &str,
    replacement_dir: &Path,
    dest: &Path,
) -> Result<SwapSummary> {
    let prefix = normalize_member_path(prefix);
    let prefix = if prefix.ends_with('/') {
        prefix
    } else {
        format!("{}/", prefix)
    };

    let mut source = open_archive(archive)?;
    let out = File::create(dest).map_err(Error::fs(dest))?;
    let mut writer = ZipWriter::new(BufWriter::new(out));
    let mut summary = SwapSummary::default();

    for i in 0..source.len() {
        let entry = source.by_index_raw(i)?;
        if normalize_member_path(entry.name()).starts_with(&prefix) {
            summary.dropped += 1;
            continue;
        }
        writer.raw_copy_file(entry)?;
        summary.kept += 1;
    }

    let options = fresh_member_options();
    for path in collect_files(replacement_dir)? {
        let Some(relative) = relative_member_name(replacement_dir, &path) else {
            continue;
        };
        let name = format!("{}{}", prefix, relative);
        if is_directory_member(&name) {
            continue;
        }
        let data = fs::read(&path).map_err(Error::fs(&path))?;
        writer.start_file(name, options)?;
        writer.write_all(&data).map_err(Error::fs(dest))?;
        summary.injected += 1;
    }

    writer.finish()?.flush().map_err(Error::fs(dest))?;
    debug!(
        archive = %archive.display(),
        kept = summary.kept,
        dropped = summary.dropped,
        injected = summary.injected,
        "resource directory swapped"
    );
    Ok(summary)
}
