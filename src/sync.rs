//! Reconciliation of the thumbnail directory against source directories.
//!
//! | Operation | Effect |
//! |---|---|
//! | [`SyncEngine::synchronize`] | delete thumbnails whose source basename is gone |
//! | [`SyncEngine::list_unused`] | list sources that have no thumbnail (dry run) |
//! | [`SyncEngine::clean_all`] | delete every thumbnail |
//!
//! Matching is by basename only: the thumbnail directory is flat and its
//! names carry the source basename (see [`naming`](crate::naming)), not the
//! source directory. Several thumbnails decoding to the same basename are
//! not treated as duplicates.
//!
//! Individual delete failures are logged and skipped; the operation carries
//! on with the remaining files.

use crate::executor::TEMP_PREFIX;
use crate::index::{self, IndexError};
use crate::naming::NameCodec;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Sync operations over one thumbnail directory.
pub struct SyncEngine<'a> {
    thumbnail_dir: &'a Path,
    codec: &'a dyn NameCodec,
}

impl<'a> SyncEngine<'a> {
    pub fn new(thumbnail_dir: &'a Path, codec: &'a dyn NameCodec) -> Self {
        Self {
            thumbnail_dir,
            codec,
        }
    }

    /// Basenames present in any of `source_dirs`.
    fn source_names(&self, source_dirs: &[PathBuf]) -> Result<HashSet<String>, IndexError> {
        let snapshots = source_dirs
            .iter()
            .map(|dir| index::scan(dir))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(index::basenames(&snapshots)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// Delete every thumbnail whose original basename no longer exists in
    /// any of `source_dirs`. Returns the deleted paths.
    pub fn synchronize(&self, source_dirs: &[PathBuf]) -> Result<Vec<PathBuf>, IndexError> {
        let thumbs = index::scan(self.thumbnail_dir)?;
        let sources = self.source_names(source_dirs)?;

        let mut deleted = Vec::new();
        for (path, name) in thumbs {
            if name.starts_with(TEMP_PREFIX) {
                debug!(path = %path.display(), "in-flight write, leaving in place");
                continue;
            }
            let Some(original) = self.codec.original_name(&name) else {
                debug!(path = %path.display(), "not a thumbnail name, leaving in place");
                continue;
            };
            if sources.contains(&original) {
                continue;
            }
            if remove(&path) {
                deleted.push(path);
            }
        }

        info!(
            deleted = deleted.len(),
            dir = %self.thumbnail_dir.display(),
            "synchronized thumbnails"
        );
        Ok(deleted)
    }

    /// Source files that have no thumbnail at all.
    pub fn list_unused(&self, source_dirs: &[PathBuf]) -> Result<Vec<PathBuf>, IndexError> {
        let used: HashSet<String> = index::scan(self.thumbnail_dir)?
            .values()
            .filter_map(|name| self.codec.original_name(name))
            .collect();

        let mut unused = Vec::new();
        for dir in source_dirs {
            unused.extend(
                index::scan(dir)?
                    .into_iter()
                    .filter(|(_, name)| !used.contains(name))
                    .map(|(path, _)| path),
            );
        }
        Ok(unused)
    }

    /// Delete every regular file in the thumbnail directory, dot-named and
    /// leftover temporary files included.
    pub fn clean_all(&self) -> Result<Vec<PathBuf>, IndexError> {
        let deleted: Vec<PathBuf> = index::scan(self.thumbnail_dir)?
            .into_keys()
            .filter(|path| remove(path))
            .collect();

        info!(
            deleted = deleted.len(),
            dir = %self.thumbnail_dir.display(),
            "cleaned thumbnails"
        );
        Ok(deleted)
    }
}

/// Remove one file. Returns whether it was deleted by this call.
fn remove(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "deleted thumbnail");
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "thumbnail already gone");
            false
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to delete thumbnail");
            false
        }
    }
}
