//! Binary delta codec
//!
//! Thin wrapper over `qbsdiff`. Deltas use the BSDIFF40 layout, so patch
//! files produced by other bsdiff tools apply here too.

use crate::error::{Error, Result};
use qbsdiff::{Bsdiff, Bspatch};
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Compute a delta that turns `old` into `new`
pub fn diff(old: &[u8], new: &[u8]) -> Result<Vec<u8>> {
    let mut patch = Vec::new();
    Bsdiff::new(old, new)
        .compare(Cursor::new(&mut patch))
        .map_err(|e| Error::Delta(format!("diff failed: {}", e)))?;
    Ok(patch)
}

/// Reconstruct the new buffer from `old` and a delta
///
/// The target size recorded in the delta header is checked against the
/// bytes actually produced, so a truncated delta is an error.
pub fn apply(old: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let patcher =
        Bspatch::new(delta).map_err(|e| Error::Delta(format!("invalid delta: {}", e)))?;
    let expected = patcher.hint_target_size();
    // The header size is untrusted; a corrupt delta may claim anything.
    let capacity = expected.min(old.len().saturating_add(delta.len()) as u64);
    let mut target = Vec::with_capacity(capacity as usize);
    let written = patcher
        .apply(old, Cursor::new(&mut target))
        .map_err(|e| Error::Delta(format!("apply failed: {}", e)))?;
    if written != expected {
        return Err(Error::Delta(format!(
            "delta produced {} bytes, header declares {}",
            written, expected
        )));
    }
    Ok(target)
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    fs::read(path).map_err(Error::fs(path))
}

fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(Error::fs(parent))?;
    }
    fs::write(path, data).map_err(Error::fs(path))
}

/// Write the delta from `old_path` to `new_path` into `out_path`
///
/// # Returns
/// Size of the delta in bytes
pub fn create_patch_file(old_path: &Path, new_path: &Path, out_path: &Path) -> Result<u64> {
    let old = read_input(old_path)?;
    let new = read_input(new_path)?;
    let patch = diff(&old, &new)?;
    write_output(out_path, &patch)?;
    Ok(patch.len() as u64)
}

/// Apply the delta at `patch_path` to `target_path`, writing `out_path`
///
/// # Returns
/// Size of the reconstructed file in bytes
pub fn apply_patch_file(patch_path: &Path, target_path: &Path, out_path: &Path) -> Result<u64> {
    let patch = read_input(patch_path)?;
    let old = read_input(target_path)?;
    let new = apply(&old, &patch)?;
    write_output(out_path, &new)?;
    Ok(new.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_small_edit() {
        let old = b"Carbonara texture with a creamy sauce and pancetta".repeat(8);
        let mut new = old.clone();
        new[10..18].copy_from_slice(b"Spaghett");
        new.extend_from_slice(b" and extra tomato");

        let delta = diff(&old, &new).unwrap();
        assert_eq!(apply(&old, &delta).unwrap(), new);
    }

    #[test]
    fn test_apply_garbage_delta() {
        let err = apply(b"old bytes", b"definitely not a delta").unwrap_err();
        assert!(matches!(err, Error::Delta(_)));
    }

    #[test]
    fn test_apply_oversized_header() {
        let mut delta = b"BSDIFF40".to_vec();
        delta.extend_from_slice(&0u64.to_le_bytes());
        delta.extend_from_slice(&0u64.to_le_bytes());
        delta.extend_from_slice(&0x7fff_ffff_ffff_fff0u64.to_le_bytes());

        let err = apply(b"old", &delta).unwrap_err();
        assert!(matches!(err, Error::Delta(_)));
    }

    #[test]
    fn test_patch_files() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.bin");
        let new = dir.path().join("new.bin");
        let patch = dir.path().join("out").join("patch.bin");
        let rebuilt = dir.path().join("rebuilt.bin");
        fs::write(&old, vec![7u8; 300]).unwrap();
        fs::write(&new, [vec![7u8; 200], vec![9u8; 150]].concat()).unwrap();

        create_patch_file(&old, &new, &patch).unwrap();
        let size = apply_patch_file(&patch, &old, &rebuilt).unwrap();

        assert_eq!(size, 350);
        assert_eq!(fs::read(&rebuilt).unwrap(), fs::read(&new).unwrap());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = create_patch_file(
            &dir.path().join("nope"),
            &dir.path().join("nope2"),
            &dir.path().join("out"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
    }
}
