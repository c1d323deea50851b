//! Utility functions

use crate::error::{BindgenError, BindgenIoError, Result};
use serde::de::DeserializeOwned;
use std::{
    fs,
    path::{Component, Path, PathBuf},
};
use walkdir::WalkDir;

/// Extension of forge artifact files
pub const JSON_EXTENSION: &str = "json";

/// Reads the json file and deserialize it into the provided type.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    // See: https://github.com/serde-rs/json/issues/160
    let s = fs::read_to_string(path).map_err(|err| BindgenError::io(err, path))?;
    serde_json::from_str(&s).map_err(Into::into)
}

/// Creates the parent directory of the `file` and all its ancestors if it does not exist.
///
/// See [`fs::create_dir_all()`].
pub fn create_parent_dir_all(file: &Path) -> Result<(), BindgenIoError> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            BindgenIoError::new(
                err,
                format!(
                    "Failed to create artifact parent folder \"{}\" for \"{}\"",
                    parent.display(),
                    file.display()
                ),
            )
        })?;
    }
    Ok(())
}

/// Writes `contents` to `path`, truncating any existing file.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), BindgenIoError> {
    fs::write(path, contents).map_err(|err| BindgenIoError::new(err, path))
}

/// Returns all `*.json` files under `root` in a deterministic order.
///
/// Entries of every directory are visited sorted by file name, so the order only depends on the
/// names in the tree, never on how the filesystem happens to enumerate them. Unreadable entries
/// abort the walk.
pub fn json_files_sorted(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(root).to_path_buf();
            match err.into_io_error() {
                Some(io) => BindgenError::io(io, path),
                None => BindgenError::msg(format!("filesystem loop at {}", path.display())),
            }
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().map_or(false, |ext| ext == JSON_EXTENSION)
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Returns `path` as an absolute path, relative paths are resolved against the current directory.
///
/// `.` and `..` components are removed lexically, symlinks are not resolved.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_err(|err| BindgenError::io(err, path))?.join(path)
    };
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}
