//! The thumbnail engine: one value per process (or per tenant).
//!
//! [`ThumbnailEngine`] owns everything a request needs: the static
//! [`Config`], the mutable [`RuntimeSettings`], the image backend, the
//! naming codec, the per-destination write locks and the resolved-path
//! cache. It is `Sync`; share it behind an `Arc` and call it from any
//! thread.
//!
//! | Concern | Where |
//! |---|---|
//! | `src_path`, `is_src_path_exists` | [`resolver`](crate::resolver) |
//! | resize-or-reuse | [`executor`](crate::executor) |
//! | `synchronize_thumbnail`, `unused_files`, `clean_thumbnail` | here, via [`sync`](crate::sync) |
//! | `warm` | here, rayon pool sized by `processing.max_processes` |
//!
//! Runtime settings are read once per request; a setter called while a
//! request is in flight takes effect for the next one.

use crate::cache::{MemoryCache, MetadataCache};
use crate::config::{self, Config, ConfigError};
use crate::executor::{Fallbacks, ResizeExecutor};
use crate::imaging::{ImageBackend, Quality, ResizeFlags, UnknownResizeFlag, format_for_path};
use crate::index::{self, IndexError};
use crate::naming::{LegacyCodec, NameCodec};
use crate::resolver::ResolvedSrc;
use crate::sync::SyncEngine;
use parking_lot::RwLock;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    UnknownResizeFlag(#[from] UnknownResizeFlag),
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),
    #[error("Thumbnail directory does not exist: {0}")]
    OutputDirectoryMissing(PathBuf),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Settings an administrator may change while the engine is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Flags used when a request names none.
    pub default_flags: ResizeFlags,
    /// Absolute no-image placeholder.
    pub no_image: Option<PathBuf>,
    /// Absolute wait-image placeholder.
    pub wait_image: Option<PathBuf>,
    pub lazy_load: bool,
    /// Serve repeated requests from the resolved-path cache.
    pub cache: bool,
}

impl RuntimeSettings {
    /// Initial settings taken from the config file.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            default_flags: config.default_resize_flags()?,
            no_image: config.no_image_path(),
            wait_image: config.wait_image_path(),
            lazy_load: config.lazy_load,
            cache: config.cache,
        })
    }

    pub(crate) fn fallbacks(&self) -> Fallbacks {
        Fallbacks {
            no_image: self.no_image.clone(),
            wait_image: self.wait_image.clone(),
            lazy_load: self.lazy_load,
        }
    }
}

/// One warmed source file.
#[derive(Debug)]
pub struct WarmResult {
    pub file_name: String,
    pub result: Result<ResolvedSrc, ThumbnailError>,
}

pub struct ThumbnailEngine<B: ImageBackend> {
    pub(crate) config: Config,
    pub(crate) settings: RwLock<RuntimeSettings>,
    pub(crate) backend: B,
    pub(crate) codec: Box<dyn NameCodec>,
    pub(crate) executor: ResizeExecutor,
    pub(crate) cache: MemoryCache,
}

impl<B: ImageBackend> ThumbnailEngine<B> {
    /// Build an engine from a validated config. Paths in `config` should
    /// already be absolute (see [`config::load_config`]).
    pub fn new(config: Config, backend: B) -> Result<Self, ThumbnailError> {
        config.validate()?;
        let settings = RuntimeSettings::from_config(&config)?;
        let executor = ResizeExecutor::new(&config.thumbnail_dir, config.track_modification_time)
            .with_max_side(config::effective_max_side(&config.processing));
        Ok(Self {
            config,
            settings: RwLock::new(settings),
            backend,
            codec: Box::new(LegacyCodec),
            executor,
            cache: MemoryCache::new(),
        })
    }

    /// Replace the naming scheme.
    pub fn with_codec(mut self, codec: impl NameCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cache(&self) -> &MemoryCache {
        &self.cache
    }

    // =========================================================================
    // Runtime settings
    // =========================================================================

    /// Snapshot of the current runtime settings.
    pub fn settings(&self) -> RuntimeSettings {
        self.settings.read().clone()
    }

    /// Set the default flags from flag names.
    pub fn set_default_flags<S: AsRef<str>>(&self, names: &[S]) -> Result<(), ThumbnailError> {
        let flags = ResizeFlags::from_names(names)?;
        self.settings.write().default_flags = flags;
        Ok(())
    }

    /// Set the no-image placeholder, relative to the source root.
    pub fn set_no_image(&self, path: Option<&Path>) {
        self.settings.write().no_image = path.map(|p| self.config.source_root.join(p));
    }

    /// Set the wait-image placeholder, relative to the source root.
    pub fn set_wait_image(&self, path: Option<&Path>) {
        self.settings.write().wait_image = path.map(|p| self.config.source_root.join(p));
    }

    pub fn set_lazy_load(&self, lazy_load: bool) {
        self.settings.write().lazy_load = lazy_load;
    }

    /// Enable or disable the resolved-path cache. Disabling drops its entries.
    pub fn set_cache(&self, enabled: bool) {
        self.settings.write().cache = enabled;
        if !enabled {
            self.cache.clear();
        }
    }

    // =========================================================================
    // Administrative operations
    // =========================================================================

    fn sync_engine(&self) -> SyncEngine<'_> {
        SyncEngine::new(&self.config.thumbnail_dir, self.codec.as_ref())
    }

    /// Source directories given relative to the source root become absolute.
    fn source_dirs(&self, dirs: &[PathBuf]) -> Vec<PathBuf> {
        dirs.iter()
            .map(|d| self.config.source_root.join(d))
            .collect()
    }

    /// Delete every cached thumbnail. Returns the deleted paths.
    pub fn clean_thumbnail(&self) -> Result<Vec<PathBuf>, ThumbnailError> {
        let deleted = self.sync_engine().clean_all()?;
        self.cache.clear();
        Ok(deleted)
    }

    /// Delete thumbnails whose source no longer exists in any of `dirs`
    /// (relative to the source root). Returns the deleted paths.
    pub fn synchronize_thumbnail(&self, dirs: &[PathBuf]) -> Result<Vec<PathBuf>, ThumbnailError> {
        let deleted = self.sync_engine().synchronize(&self.source_dirs(dirs))?;
        if !deleted.is_empty() {
            self.cache.clear();
        }
        Ok(deleted)
    }

    /// Source files in `dirs` (relative to the source root) without any thumbnail.
    pub fn unused_files(&self, dirs: &[PathBuf]) -> Result<Vec<PathBuf>, ThumbnailError> {
        Ok(self.sync_engine().list_unused(&self.source_dirs(dirs))?)
    }

    /// Pre-generate thumbnails for every image in `path` in parallel.
    ///
    /// `path` is a source directory relative to the source root, or a
    /// template name; a template's own `path` is the directory scanned.
    /// Runs on a dedicated rayon pool sized by `processing.max_processes`.
    /// Files without a supported image extension are skipped. One result is
    /// returned per file, in file-name order.
    pub fn warm<S: AsRef<str> + Sync>(
        &self,
        path: &str,
        width: Option<u32>,
        height: Option<u32>,
        flags: &[S],
        quality: Option<Quality>,
    ) -> Result<Vec<WarmResult>, ThumbnailError> {
        let scan_path = self
            .config
            .templates
            .get(path)
            .map_or(path, |template| template.path.as_str());
        let dir = self.config.source_root.join(scan_path);
        let names: Vec<String> = index::scan(&dir)?
            .into_iter()
            .filter(|(file, _)| format_for_path(file).is_some())
            .map(|(_, name)| name)
            .collect();

        let threads = config::effective_threads(&self.config.processing);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| ThumbnailError::Configuration(format!("thread pool: {}", e)))?;

        let results: Vec<WarmResult> = pool.install(|| {
            names
                .into_par_iter()
                .map(|file_name| {
                    let result = self.src_path(path, &file_name, width, height, flags, quality);
                    WarmResult { file_name, result }
                })
                .collect()
        });

        info!(
            dir = %dir.display(),
            files = results.len(),
            failed = results.iter().filter(|r| r.result.is_err()).count(),
            threads,
            "warmed thumbnails"
        );
        Ok(results)
    }
}
