//! Resolved-path cache.
//!
//! Resolving a request touches the filesystem several times (source stat,
//! destination stat, root canonicalization). With `cache = true` the final
//! URL of a request is remembered so repeated renders of the same page skip
//! all of that.
//!
//! ## Cache keys
//!
//! Keys are SHA-256 over every request parameter *after* template and
//! default-flag substitution, so changing a template or the default flags
//! never serves a stale URL.
//!
//! ## Invalidation
//!
//! Each entry records the files it depends on (the source image and the
//! generated thumbnail) with their modification times. An entry whose
//! dependency changed or disappeared is dropped on lookup. `clean` and
//! `sync` clear the whole cache.

use crate::imaging::{Quality, ResizeFlags};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Key-value store for resolved URLs.
pub trait MetadataCache: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;

    /// Store `value`, valid while every file in `dependencies` is unchanged.
    fn save(&self, key: &str, value: &str, dependencies: &[PathBuf]);

    /// Drop every entry.
    fn clear(&self);
}

/// SHA-256 cache key for a resolved request, as a hex string.
pub fn cache_key(
    relative_path: &str,
    file_name: &str,
    width: Option<u32>,
    height: Option<u32>,
    flags: ResizeFlags,
    quality: Option<Quality>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"src_path\0");
    hasher.update(relative_path.as_bytes());
    hasher.update(b"\0");
    hasher.update(file_name.as_bytes());
    hasher.update(b"\0");
    for value in [width, height, quality.map(Quality::value)] {
        match value {
            Some(v) => {
                hasher.update(b"\x01");
                hasher.update(v.to_le_bytes());
            }
            None => hasher.update(b"\x00"),
        }
    }
    hasher.update(flags.bits().to_le_bytes());
    format!("{:x}", hasher.finalize())
}

fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).ok()?.modified().ok()
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    dependencies: Vec<(PathBuf, SystemTime)>,
}

impl Entry {
    fn is_fresh(&self) -> bool {
        self.dependencies
            .iter()
            .all(|(path, recorded)| mtime(path) == Some(*recorded))
    }
}

/// In-process cache with file-dependency invalidation.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl MetadataCache for MemoryCache {
    fn load(&self, key: &str) -> Option<String> {
        let fresh = self
            .entries
            .read()
            .get(key)
            .map(|entry| (entry.is_fresh(), entry.value.clone()));

        match fresh {
            Some((true, value)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Some((false, _)) => {
                self.entries.write().remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn save(&self, key: &str, value: &str, dependencies: &[PathBuf]) {
        let mut recorded = Vec::with_capacity(dependencies.len());
        for path in dependencies {
            // A dependency that is already gone can never validate
            let Some(modified) = mtime(path) else {
                return;
            };
            recorded.push((path.clone(), modified));
        }
        self.entries.write().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                dependencies: recorded,
            },
        );
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Hit/miss counters of a [`MemoryCache`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cached, {} resolved ({} total)",
            self.hits,
            self.misses,
            self.hits + self.misses
        )
    }
}
