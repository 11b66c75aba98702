//! Archive workspace
//!
//! A workspace is a filtered, extracted copy of one mod archive living in a
//! temporary directory. Rules mutate the tree on disk and [`Workspace::close`]
//! packs it back into `<dir>/patched/<stem>-<marker>.<ext>`.
//!
//! The scratch archive and the temporary directory are owned by the
//! [`Workspace`] value and removed when it is dropped, whether or not
//! repackaging succeeded.

use crate::error::{Error, Result};
use crate::filter::{normalize_member_path, FilterSpec};
use crate::utils::{collect_files, relative_member_name};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Name of the output directory created next to the input archives
pub const PATCHED_DIR: &str = "patched";

/// `<archive>.tmp`, the scratch path used while rewriting `archive`
pub fn scratch_path(archive: &Path) -> PathBuf {
    let mut name = OsString::from(archive.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Output location for a patched copy of `original`
///
/// `mods/Teto_Plush_v2.zip` with marker `trw` becomes
/// `mods/patched/Teto_Plush_v2-trw.zip`.
pub fn patched_output_path(original: &Path, marker: &str) -> PathBuf {
    let dir = original.parent().unwrap_or_else(|| Path::new(""));
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match original.extension() {
        Some(ext) => format!("{}-{}.{}", stem, marker, ext.to_string_lossy()),
        None => format!("{}-{}", stem, marker),
    };
    dir.join(PATCHED_DIR).join(name)
}

/// Open `path` as a zip container, mapping every failure to `ArchiveRead`
pub(crate) fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path).map_err(|e| Error::ArchiveRead {
        path: path.to_path_buf(),
        source: zip::result::ZipError::Io(e),
    })?;
    ZipArchive::new(BufReader::new(file)).map_err(|source| Error::ArchiveRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Options for freshly written members: deflated, fixed timestamp
pub(crate) fn fresh_member_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
}

/// Write the members of `source` admitted by `filter` into a new archive at `dest`
///
/// Members are copied raw, so their compression method and metadata survive.
/// Names are normalized on the way through; when two members normalize to
/// the same name the later one wins.
///
/// # Returns
/// Number of members copied
pub fn write_filtered_archive(source: &Path, dest: &Path, filter: &FilterSpec) -> Result<usize> {
    let mut archive = open_archive(source)?;

    let mut last_index: HashMap<String, usize> = HashMap::new();
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        if filter.admits(entry.name()) {
            last_index.insert(normalize_member_path(entry.name()), i);
        }
    }

    let out = File::create(dest).map_err(Error::fs(dest))?;
    let mut writer = ZipWriter::new(BufWriter::new(out));
    let mut copied = 0;

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let name = normalize_member_path(entry.name());
        if last_index.get(&name) != Some(&i) {
            continue;
        }
        if name == entry.name() {
            writer.raw_copy_file(entry)?;
        } else {
            writer.raw_copy_file_rename(entry, name)?;
        }
        copied += 1;
    }

    writer.finish()?.flush().map_err(Error::fs(dest))?;
    Ok(copied)
}

/// Give the owner read and write access to everything under `root`
///
/// Extraction restores the unix modes stored in the archive, which can leave
/// members read-only or unreadable for the steps that follow.
fn make_owner_writable(root: &Path) -> Result<()> {
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_symlink() {
            continue;
        }
        let path = entry.path();
        let mut permissions = entry.metadata()?.permissions();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let owner = if entry.file_type().is_dir() { 0o700 } else { 0o600 };
            let mode = permissions.mode();
            if mode & owner == owner {
                continue;
            }
            permissions.set_mode(mode | owner);
        }
        #[cfg(not(unix))]
        {
            if !permissions.readonly() {
                continue;
            }
            permissions.set_readonly(false);
        }
        fs::set_permissions(path, permissions).map_err(Error::fs(path))?;
    }
    Ok(())
}

/// Pack every regular file under `root` into a new deflated archive at `output`
///
/// Files are visited in sorted order and written with a fixed timestamp, so
/// the same tree always produces the same bytes. An existing `output` is
/// replaced.
///
/// # Returns
/// Number of members written
pub fn repackage_dir(root: &Path, output: &Path) -> Result<usize> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(Error::fs(parent))?;
    }

    let files = collect_files(root)?;
    let out = File::create(output).map_err(Error::fs(output))?;
    let mut writer = ZipWriter::new(BufWriter::new(out));
    let options = fresh_member_options();
    let mut written = 0;

    for path in &files {
        let Some(name) = relative_member_name(root, path) else {
            continue;
        };
        let data = fs::read(path).map_err(Error::fs(path))?;
        writer.start_file(name, options)?;
        writer.write_all(&data).map_err(Error::fs(output))?;
        written += 1;
    }

    writer.finish()?.flush().map_err(Error::fs(output))?;
    Ok(written)
}

/// Filtered, extracted copy of an archive used as a mutation staging area
#[derive(Debug)]
pub struct Workspace {
    source: PathBuf,
    scratch_archive: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    /// Materialize the members of `archive` admitted by `filter`
    ///
    /// The filtered members are first written to `<archive>.tmp`, then that
    /// scratch archive is extracted into a fresh temporary directory.
    ///
    /// # Errors
    /// `ArchiveRead` if `archive` is not a readable zip container.
    pub fn open<P: AsRef<Path>>(archive: P, filter: &FilterSpec) -> Result<Self> {
        let source = archive.as_ref().to_path_buf();
        let scratch_archive = scratch_path(&source);

        // From here on Drop owns the cleanup of whatever got created.
        let mut workspace = Workspace {
            source,
            scratch_archive,
            dir: None,
        };

        let copied = write_filtered_archive(&workspace.source, &workspace.scratch_archive, filter)?;

        let dir = tempfile::Builder::new()
            .prefix("modpatch-")
            .tempdir()
            .map_err(Error::fs(&std::env::temp_dir()))?;
        open_archive(&workspace.scratch_archive)?.extract(dir.path())?;
        make_owner_writable(dir.path())?;
        debug!(
            archive = %workspace.source.display(),
            members = copied,
            root = %dir.path().display(),
            "workspace opened"
        );
        workspace.dir = Some(dir);

        Ok(workspace)
    }

    /// Root of the extracted tree
    pub fn root(&self) -> &Path {
        self.dir
            .as_ref()
            .map(TempDir::path)
            .unwrap_or_else(|| Path::new(""))
    }

    /// Path of the intermediate filtered archive
    pub fn scratch_archive(&self) -> &Path {
        &self.scratch_archive
    }

    /// The input archive this workspace was built from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Repackage the tree into the patched output location and clean up
    ///
    /// # Returns
    /// Path of the written archive
    pub fn close(self, marker: &str) -> Result<PathBuf> {
        let output = patched_output_path(&self.source, marker);
        let written = repackage_dir(self.root(), &output)?;
        debug!(output = %output.display(), members = written, "workspace repackaged");
        Ok(output)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.scratch_archive.exists() {
            let _ = fs::remove_file(&self.scratch_archive);
        }
        if let Some(dir) = self.dir.take() {
            let _ = dir.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patched_output_path() {
        assert_eq!(
            patched_output_path(Path::new("mods/Teto_Plush_v2.zip"), "trw"),
            Path::new("mods").join("patched").join("Teto_Plush_v2-trw.zip")
        );
        assert_eq!(
            patched_output_path(Path::new("melodies-1.2.jar"), "trw"),
            Path::new("patched").join("melodies-1.2-trw.jar")
        );
        assert_eq!(
            patched_output_path(Path::new("mods/README"), "x"),
            Path::new("mods").join("patched").join("README-x")
        );
    }

    #[test]
    fn test_scratch_path() {
        assert_eq!(
            scratch_path(Path::new("mods/a.zip")),
            Path::new("mods/a.zip.tmp")
        );
    }

    #[test]
    fn test_open_rejects_non_archive() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.zip");
        fs::write(&bogus, b"this is not a zip file").unwrap();

        let err = Workspace::open(&bogus, &FilterSpec::passthrough()).unwrap_err();
        assert!(matches!(err, Error::ArchiveRead { .. }));
        assert!(!scratch_path(&bogus).exists());
    }
}
