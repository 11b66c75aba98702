//! Primitive edit steps
//!
//! Every rule is a sequence of these primitives applied to a workspace tree.
//! Each returns a [`StepOutcome`]: `Skipped` covers the benign cases (optional
//! source asset absent, target already gone) so callers only see `Err` for
//! real failures and can decide per step whether those abort the rule.

use crate::delta;
use crate::document::{read_document, remove_field, set_field, write_document, FieldPath};
use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Result of a primitive step that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    Skipped(String),
}

impl StepOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        StepOutcome::Skipped(reason.into())
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied)
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Applied => write!(f, "applied"),
            StepOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(Error::fs(parent))?;
    }
    Ok(())
}

/// Copy `source` over `dest`, creating parent directories
///
/// A missing `source` is skipped.
pub fn overwrite(source: &Path, dest: &Path) -> Result<StepOutcome> {
    if !source.is_file() {
        return Ok(StepOutcome::skipped(format!(
            "source asset {} absent",
            source.display()
        )));
    }
    ensure_parent(dest)?;
    fs::copy(source, dest).map_err(Error::fs(dest))?;
    Ok(StepOutcome::Applied)
}

/// Recursively remove `target`
///
/// An absent target is skipped. If the recursive removal fails, entries are
/// removed one by one and only a surviving `target` is reported.
pub fn delete_subtree(target: &Path) -> Result<StepOutcome> {
    let metadata = match fs::symlink_metadata(target) {
        Ok(m) => m,
        Err(_) => return Ok(StepOutcome::skipped("target already absent")),
    };

    if !metadata.is_dir() {
        fs::remove_file(target).map_err(Error::fs(target))?;
        return Ok(StepOutcome::Applied);
    }

    if let Err(first) = fs::remove_dir_all(target) {
        debug!(path = %target.display(), error = %first, "recursive delete failed, removing entries one by one");
        for entry in WalkDir::new(target).contents_first(true).into_iter().flatten() {
            let path = entry.path();
            let _ = if entry.file_type().is_dir() {
                fs::remove_dir(path)
            } else {
                fs::remove_file(path)
            };
        }
        if fs::symlink_metadata(target).is_ok() {
            return Err(Error::Filesystem {
                path: target.to_path_buf(),
                source: first,
            });
        }
    }
    Ok(StepOutcome::Applied)
}

/// Apply the delta at `delta_path` to `target`, writing `output`, then drop `target`
///
/// A missing `target` is skipped; a missing delta is an error.
pub fn binary_patch(target: &Path, delta_path: &Path, output: &Path) -> Result<StepOutcome> {
    if !target.is_file() {
        return Ok(StepOutcome::skipped(format!(
            "patch target {} absent",
            target.display()
        )));
    }
    let written = delta::apply_patch_file(delta_path, target, output)?;
    debug!(output = %output.display(), bytes = written, "binary patch applied");

    if target != output && target.exists() {
        let _ = fs::remove_file(target);
    }
    Ok(StepOutcome::Applied)
}

/// Set `field` in the JSON document at `document` and write it back
pub fn set_document_field(document: &Path, field: &FieldPath, value: Value) -> Result<StepOutcome> {
    let mut doc = read_document(document)?;
    set_field(&mut doc, field, value, document)?;
    write_document(&doc, document)?;
    Ok(StepOutcome::Applied)
}

/// Remove `field` from the JSON document at `document`
///
/// An absent document or field is skipped.
pub fn remove_document_field(document: &Path, field: &FieldPath) -> Result<StepOutcome> {
    if !document.is_file() {
        return Ok(StepOutcome::skipped("document absent"));
    }
    let mut doc = read_document(document)?;
    if !remove_field(&mut doc, field) {
        return Ok(StepOutcome::skipped(format!("field `{}` absent", field)));
    }
    write_document(&doc, document)?;
    Ok(StepOutcome::Applied)
}

/// Recursively copy a directory tree
fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(Error::fs(&target))?;
        } else {
            ensure_parent(&target)?;
            fs::copy(entry.path(), &target).map_err(Error::fs(&target))?;
        }
    }
    Ok(())
}

/// Move `source` to `dest`, falling back to copy-then-delete
fn move_path(source: &Path, dest: &Path) -> Result<()> {
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }
    if source.is_dir() {
        copy_tree(source, dest)?;
        let _ = fs::remove_dir_all(source);
    } else {
        fs::copy(source, dest).map_err(Error::fs(dest))?;
        let _ = fs::remove_file(source);
    }
    Ok(())
}

fn remove_any(path: &Path) {
    let _ = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
}

/// Move every entry of `source` into `dest`; source entries win on conflicts
fn merge_into(source: &Path, dest: &Path) -> Result<()> {
    let entries = fs::read_dir(source).map_err(Error::fs(source))?;
    for entry in entries {
        let entry = entry.map_err(Error::fs(source))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());

        let outcome = if from.is_dir() && to.is_dir() {
            merge_into(&from, &to).map(|_| {
                let _ = fs::remove_dir_all(&from);
            })
        } else {
            if to.exists() {
                remove_any(&to);
            }
            move_path(&from, &to)
        };

        if let Err(e) = outcome {
            warn!(from = %from.display(), to = %to.display(), error = %e, "failed to move entry");
        }
    }
    Ok(())
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Merge directory `source` into `dest` and remove `source`
///
/// If `dest` does not exist this is a rename. Otherwise entries are moved
/// across recursively: directories merge, anything else replaces the
/// destination entry.
pub fn merge_directory(source: &Path, dest: &Path) -> Result<StepOutcome> {
    if !source.is_dir() {
        return Ok(StepOutcome::skipped("source directory absent"));
    }

    // On case-insensitive filesystems `instances` and `Instances` are the same
    // directory; only the name needs fixing.
    if same_directory(source, dest) {
        let mut staging = PathBuf::from(source.as_os_str());
        staging.set_extension("merge-tmp");
        fs::rename(source, &staging).map_err(Error::fs(source))?;
        fs::rename(&staging, dest).map_err(Error::fs(dest))?;
        return Ok(StepOutcome::Applied);
    }

    if !dest.exists() {
        ensure_parent(dest)?;
        move_path(source, dest)?;
        return Ok(StepOutcome::Applied);
    }

    if !dest.is_dir() {
        remove_any(dest);
        move_path(source, dest)?;
        return Ok(StepOutcome::Applied);
    }

    merge_into(source, dest)?;
    if source.exists() {
        let _ = fs::remove_dir_all(source);
    }
    Ok(StepOutcome::Applied)
}

/// Counts reported by [`strip_field`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StripSummary {
    /// JSON files visited
    pub scanned: usize,
    /// Files rewritten without the field
    pub modified: usize,
    /// Files that failed to parse or write and were left alone
    pub failed: usize,
}

fn strip_one(path: &Path, field: &FieldPath) -> Result<bool> {
    let mut doc = read_document(path)?;
    if !doc.is_object() || !remove_field(&mut doc, field) {
        return Ok(false);
    }
    write_document(&doc, path)?;
    Ok(true)
}

/// Remove `field` from every `*.json` object document under `dir`
///
/// Files that fail to parse or write are logged and skipped; the walk itself
/// never fails on their account.
pub fn strip_field(dir: &Path, field: &FieldPath) -> Result<StripSummary> {
    let mut summary = StripSummary::default();
    if !dir.is_dir() {
        return Ok(summary);
    }

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let is_json = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if !entry.file_type().is_file() || !is_json {
            continue;
        }

        summary.scanned += 1;
        match strip_one(entry.path(), field) {
            Ok(true) => summary.modified += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "leaving document untouched");
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overwrite_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("SlotToken.json");
        fs::write(&src, b"{}").unwrap();
        let dest = dir.path().join("ws/Server/Item/Items/Ingredient/SlotToken.json");

        assert_eq!(overwrite(&src, &dest).unwrap(), StepOutcome::Applied);
        assert_eq!(fs::read(&dest).unwrap(), b"{}");
    }

    #[test]
    fn test_overwrite_missing_source_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = overwrite(&dir.path().join("nope.json"), &dir.path().join("out.json")).unwrap();
        assert!(!outcome.is_applied());
        assert!(!dir.path().join("out.json").exists());
    }

    #[test]
    fn test_delete_subtree_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let npcs = dir.path().join("Server/Drops/NPCs");
        fs::create_dir_all(npcs.join("Deep")).unwrap();
        fs::write(npcs.join("Deep/a.json"), b"{}").unwrap();

        assert_eq!(delete_subtree(&npcs).unwrap(), StepOutcome::Applied);
        assert!(!npcs.exists());
        assert!(matches!(delete_subtree(&npcs).unwrap(), StepOutcome::Skipped(_)));
        assert!(dir.path().join("Server/Drops").is_dir());
    }

    #[test]
    fn test_delete_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.png");
        fs::write(&file, b"png").unwrap();
        assert!(delete_subtree(&file).unwrap().is_applied());
        assert!(!file.exists());
    }

    #[test]
    fn test_binary_patch_replaces_asset() {
        let dir = tempfile::tempdir().unwrap();
        let old = b"carbonara pixels ".repeat(20);
        let new = b"spaghetti pixels ".repeat(21);
        let target = dir.path().join("Food/Carbonara.png");
        let output = dir.path().join("Food/Spaghetti.png");
        let delta_path = dir.path().join("CarbonaraToSpaghetti.patch");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, &old).unwrap();
        fs::write(&delta_path, delta::diff(&old, &new).unwrap()).unwrap();

        assert!(binary_patch(&target, &delta_path, &output).unwrap().is_applied());
        assert!(!target.exists());
        assert_eq!(fs::read(&output).unwrap(), new);
    }

    #[test]
    fn test_binary_patch_missing_target_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = binary_patch(
            &dir.path().join("absent.png"),
            &dir.path().join("d.patch"),
            &dir.path().join("out.png"),
        )
        .unwrap();
        assert!(!outcome.is_applied());
    }

    #[test]
    fn test_document_field_edits() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("WalterWhite_Merchant.json");
        fs::write(&doc, r#"{"invulnerable": false, "Name": "Walter"}"#).unwrap();

        assert!(remove_document_field(&doc, &"invulnerable".into()).unwrap().is_applied());
        assert!(!remove_document_field(&doc, &"Invulnerable".into()).unwrap().is_applied());
        assert!(set_document_field(&doc, &"Invulnerable".into(), json!(true)).unwrap().is_applied());

        let value = read_document(&doc).unwrap();
        assert_eq!(value, json!({"Name": "Walter", "Invulnerable": true}));
    }

    #[test]
    fn test_set_field_on_missing_document_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = set_document_field(&dir.path().join("manifest.json"), &"IncludesAssetPack".into(), json!(true))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_merge_directory_rename() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Server/instances");
        let dst = dir.path().join("Server/Instances2");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.json"), b"a").unwrap();

        assert!(merge_directory(&src, &dst).unwrap().is_applied());
        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("a.json")).unwrap(), b"a");
    }

    #[test]
    fn test_merge_directory_union_source_wins() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("lower");
        let dst = dir.path().join("Upper");
        fs::create_dir_all(src.join("Zone1")).unwrap();
        fs::create_dir_all(dst.join("Zone1")).unwrap();
        fs::write(src.join("shared.json"), b"from source").unwrap();
        fs::write(dst.join("shared.json"), b"from dest").unwrap();
        fs::write(src.join("Zone1/new.json"), b"new").unwrap();
        fs::write(dst.join("Zone1/old.json"), b"old").unwrap();
        fs::write(dst.join("dest_only.json"), b"keep").unwrap();
        // file in source replaces a directory in dest
        fs::write(src.join("Conflict"), b"file").unwrap();
        fs::create_dir_all(dst.join("Conflict")).unwrap();

        assert!(merge_directory(&src, &dst).unwrap().is_applied());

        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("shared.json")).unwrap(), b"from source");
        assert_eq!(fs::read(dst.join("Zone1/new.json")).unwrap(), b"new");
        assert_eq!(fs::read(dst.join("Zone1/old.json")).unwrap(), b"old");
        assert_eq!(fs::read(dst.join("dest_only.json")).unwrap(), b"keep");
        assert_eq!(fs::read(dst.join("Conflict")).unwrap(), b"file");
    }

    #[test]
    fn test_merge_missing_source_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = merge_directory(&dir.path().join("a"), &dir.path().join("b")).unwrap();
        assert!(!outcome.is_applied());
    }

    #[test]
    fn test_strip_field_skips_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let items = dir.path().join("Server/Item/Items");
        fs::create_dir_all(items.join("Dinos")).unwrap();
        fs::write(items.join("Raptor.json"), r#"{"Recipe": {"Input": []}, "Id": "raptor"}"#).unwrap();
        fs::write(items.join("Dinos/Rex.JSON"), r#"{"Id": "rex", "Recipe": 1}"#).unwrap();
        fs::write(items.join("Broken.json"), "{ \"Recipe\": ").unwrap();
        fs::write(items.join("notes.txt"), "Recipe").unwrap();

        let summary = strip_field(&items, &"Recipe".into()).unwrap();

        assert_eq!(summary, StripSummary { scanned: 3, modified: 2, failed: 1 });
        assert_eq!(read_document(&items.join("Raptor.json")).unwrap(), json!({"Id": "raptor"}));
        assert_eq!(read_document(&items.join("Dinos/Rex.JSON")).unwrap(), json!({"Id": "rex"}));
        assert_eq!(fs::read_to_string(items.join("Broken.json")).unwrap(), "{ \"Recipe\": ");
    }
}
