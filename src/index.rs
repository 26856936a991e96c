//! Single-level directory snapshots.
//!
//! Both sides of a sync are compared by basename, so a snapshot maps each
//! regular file's absolute path to its basename. Snapshots are built fresh
//! on every call and never cached.
//!
//! Every regular file is listed, dot-named ones included. Callers that must
//! ignore in-flight writes filter on
//! [`TEMP_PREFIX`](crate::executor::TEMP_PREFIX) themselves.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Absolute path → basename.
pub type DirectorySnapshot = BTreeMap<PathBuf, String>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// List the regular files directly inside `dir`. Never descends.
pub fn scan(dir: &Path) -> Result<DirectorySnapshot, IndexError> {
    if !dir.is_dir() {
        return Err(IndexError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut snapshot = DirectorySnapshot::new();
    for entry in WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Removed between readdir and stat: not part of the snapshot
                if e.io_error().map(|io| io.kind()) == Some(io::ErrorKind::NotFound) {
                    debug!(error = %e, "skipping vanished entry");
                    continue;
                }
                return Err(IndexError::Io(e.into()));
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        snapshot.insert(entry.into_path(), name);
    }
    Ok(snapshot)
}

/// Union of several snapshots' basenames.
pub fn basenames<'a>(snapshots: impl IntoIterator<Item = &'a DirectorySnapshot>) -> Vec<&'a str> {
    let mut names: Vec<&str> = snapshots
        .into_iter()
        .flat_map(|s| s.values().map(String::as_str))
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}
