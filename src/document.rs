//! JSON document store
//!
//! Read-modify-write helpers for the JSON fragments packed inside mod
//! archives. Writes go through a temporary sibling file that is renamed over
//! the target, so a reader sees either the old or the new document, never a
//! truncated one.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Load and parse a JSON document
pub fn read_document(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(Error::fs(path))?;
    serde_json::from_str(&text).map_err(|source| Error::MalformedDocument {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize `document` and atomically replace `path` with it
///
/// Output is pretty printed with two-space indentation and a trailing
/// newline. Missing parent directories are created.
pub fn write_document(document: &Value, path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(Error::fs(parent))?;

    let mut text = serde_json::to_string_pretty(document).map_err(|source| {
        Error::MalformedDocument {
            path: path.to_path_buf(),
            source,
        }
    })?;
    text.push('\n');

    let mut temp = NamedTempFile::new_in(parent).map_err(Error::fs(parent))?;
    temp.write_all(text.as_bytes()).map_err(Error::fs(temp.path()))?;
    temp.as_file().sync_all().map_err(Error::fs(path))?;
    temp.persist(path).map_err(|e| Error::Filesystem {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Dotted path to a (possibly nested) object field, e.g. `StatModifiers.Health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn parse(dotted: &str) -> Self {
        Self(
            dotted
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    fn split_leaf(&self) -> Option<(&[String], &String)> {
        self.0.split_last().map(|(leaf, parents)| (parents, leaf))
    }
}

impl From<&str> for FieldPath {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for FieldPath {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(value: FieldPath) -> Self {
        value.0.join(".")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Walk to the object holding the leaf of `field`
fn parent_object_mut<'a>(
    document: &'a mut Value,
    parents: &[String],
) -> Option<&'a mut Map<String, Value>> {
    let mut current = document;
    for key in parents {
        current = current.as_object_mut()?.get_mut(key)?;
    }
    current.as_object_mut()
}

/// Set `field` to `value`
///
/// Every parent must already exist and be an object; the leaf is inserted or
/// replaced. `path` only labels the error.
pub fn set_field(document: &mut Value, field: &FieldPath, value: Value, path: &Path) -> Result<()> {
    let missing = || Error::MissingField {
        path: path.to_path_buf(),
        field: field.to_string(),
    };
    let (parents, leaf) = field.split_leaf().ok_or_else(missing)?;
    let object = parent_object_mut(document, parents).ok_or_else(missing)?;
    object.insert(leaf.clone(), value);
    Ok(())
}

/// Remove `field`, returning whether anything was removed
pub fn remove_field(document: &mut Value, field: &FieldPath) -> bool {
    let Some((parents, leaf)) = field.split_leaf() else {
        return false;
    };
    parent_object_mut(document, parents)
        .and_then(|object| object.remove(leaf))
        .is_some()
}
