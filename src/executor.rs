//! Resize-or-reuse execution for a single thumbnail request.
//!
//! ```text
//! source missing ──────────────────────────────► NoImage
//! no width/height ─────────────────────────────► PassThrough(source)
//! destination exists ──────────────────────────► Cached
//! lock(destination) → exists now? ─────────────► Cached
//!                   → identify fails ──────────► NoImage
//!                   → render to .tmp, rename ──► Generated | Placeholder | Deferred
//! ```
//!
//! Decode and encode failures never surface as errors; they degrade to the
//! no-image placeholder and are logged. Only requests that can never succeed
//! (`STRETCH`/`EXACT` without both dimensions) and I/O failures on the
//! thumbnail directory itself are errors.
//!
//! ## Concurrency
//!
//! Writers of the same destination are serialized by [`KeyedLocks`], and the
//! destination is re-checked once the lock is held so a concurrent writer's
//! result is reused. Output goes to a temporary file named with
//! [`TEMP_PREFIX`] in the thumbnail directory and is renamed into place, so
//! a reader either sees no file or a complete one. Cache hits take no lock.

use crate::engine::ThumbnailError;
use crate::imaging::{
    DEFAULT_MAX_SIDE, ImageBackend, Quality, RenderParams, ResizeFlags, ResizeParams,
    calculate_size, check_bounds, format_for_path, validate_resize,
};
use crate::naming::{EncodeParams, NameCodec};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

/// Name prefix of in-flight output files. Sync never treats these as
/// thumbnails; clean removes them like any other file.
pub const TEMP_PREFIX: &str = ".thumbcache-tmp-";

/// One thumbnail request, fully resolved (templates already applied).
#[derive(Debug, Clone)]
pub struct ThumbnailRequest<'a> {
    /// Absolute directory holding the source image.
    pub source_dir: &'a Path,
    /// Source directory relative to the source root, as given by the caller.
    pub relative_path: &'a str,
    pub file_name: &'a str,
    pub params: ResizeParams,
    pub quality: Option<Quality>,
}

/// Placeholder policy, snapshotted from the runtime settings per request.
#[derive(Debug, Clone, Default)]
pub struct Fallbacks {
    pub no_image: Option<PathBuf>,
    pub wait_image: Option<PathBuf>,
    pub lazy_load: bool,
}

/// Outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    /// No dimensions requested: the source itself.
    PassThrough(PathBuf),
    /// The destination already existed.
    Cached(PathBuf),
    /// The destination was written by this call.
    Generated(PathBuf),
    /// Source missing, unsupported or corrupt. Carries the no-image
    /// placeholder when one is configured.
    NoImage(Option<PathBuf>),
    /// Generated by this call, but a wait image is configured.
    Placeholder {
        placeholder: PathBuf,
        generated: PathBuf,
    },
    /// As `Placeholder`, in lazy-load mode: the caller should emit the
    /// placeholder and stop rendering.
    Deferred {
        placeholder: PathBuf,
        generated: PathBuf,
    },
}

/// Flat discriminant of [`Thumbnail`], for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailKind {
    PassThrough,
    Cached,
    Generated,
    NoImage,
    Placeholder,
    Deferred,
}

impl Thumbnail {
    /// The path a caller should embed. `None` only for `NoImage` without a
    /// configured placeholder.
    pub fn display_path(&self) -> Option<&Path> {
        match self {
            Thumbnail::PassThrough(p) | Thumbnail::Cached(p) | Thumbnail::Generated(p) => {
                Some(p.as_path())
            }
            Thumbnail::NoImage(p) => p.as_deref(),
            Thumbnail::Placeholder { placeholder, .. } | Thumbnail::Deferred { placeholder, .. } => {
                Some(placeholder.as_path())
            }
        }
    }

    pub fn kind(&self) -> ThumbnailKind {
        match self {
            Thumbnail::PassThrough(_) => ThumbnailKind::PassThrough,
            Thumbnail::Cached(_) => ThumbnailKind::Cached,
            Thumbnail::Generated(_) => ThumbnailKind::Generated,
            Thumbnail::NoImage(_) => ThumbnailKind::NoImage,
            Thumbnail::Placeholder { .. } => ThumbnailKind::Placeholder,
            Thumbnail::Deferred { .. } => ThumbnailKind::Deferred,
        }
    }
}

/// Per-key mutexes. An entry lives only while some thread holds or waits
/// for it.
#[derive(Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let slot = self.slots.lock().entry(key.to_string()).or_default().clone();

        let result = {
            let _guard = slot.lock();
            f()
        };

        let mut slots = self.slots.lock();
        // One reference in the map, one here: nobody else is waiting
        if Arc::strong_count(&slot) == 2 {
            slots.remove(key);
        }
        result
    }

    /// Number of keys currently locked or waited on.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Modification time of `path` in whole seconds since the epoch.
pub fn modified_secs(path: &Path) -> Option<u64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    modified.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

/// Produces thumbnails into one flat directory.
pub struct ResizeExecutor {
    thumbnail_dir: PathBuf,
    track_modification_time: bool,
    max_side: u32,
    locks: KeyedLocks,
}

impl ResizeExecutor {
    pub fn new(thumbnail_dir: impl Into<PathBuf>, track_modification_time: bool) -> Self {
        Self {
            thumbnail_dir: thumbnail_dir.into(),
            track_modification_time,
            max_side: DEFAULT_MAX_SIDE,
            locks: KeyedLocks::new(),
        }
    }

    /// Longest output side this executor will render.
    pub fn with_max_side(mut self, max_side: u32) -> Self {
        self.max_side = max_side;
        self
    }

    pub fn thumbnail_dir(&self) -> &Path {
        &self.thumbnail_dir
    }

    pub fn locks(&self) -> &KeyedLocks {
        &self.locks
    }

    /// Destination path for a request, or `None` when the source name cannot
    /// be encoded (no extension).
    pub fn destination(
        &self,
        codec: &dyn NameCodec,
        request: &ThumbnailRequest<'_>,
        source: &Path,
    ) -> Option<PathBuf> {
        let modified = if self.track_modification_time {
            modified_secs(source)
        } else {
            None
        };
        let encoded = codec.encode(&EncodeParams {
            relative_path: request.relative_path,
            width: request.params.width,
            height: request.params.height,
            flags: request.params.flags,
            quality: request.quality,
            modified,
        });
        let name = codec.file_name(request.file_name, &encoded)?;
        Some(self.thumbnail_dir.join(name))
    }

    /// Resolve one request to a [`Thumbnail`], generating it if needed.
    pub fn execute(
        &self,
        backend: &impl ImageBackend,
        codec: &dyn NameCodec,
        request: &ThumbnailRequest<'_>,
        fallbacks: &Fallbacks,
    ) -> Result<Thumbnail, ThumbnailError> {
        let source = request.source_dir.join(request.file_name);
        let no_image = || Thumbnail::NoImage(fallbacks.no_image.clone());

        if !source.is_file() {
            debug!(source = %source.display(), "source image missing");
            return Ok(no_image());
        }
        if !request.params.has_dimensions() {
            return Ok(Thumbnail::PassThrough(source));
        }
        validate_resize(&request.params)
            .map_err(|e| ThumbnailError::InvalidDimensions(e.to_string()))?;

        let Some(format) = format_for_path(&source) else {
            warn!(source = %source.display(), "unsupported image format, using no-image placeholder");
            return Ok(no_image());
        };
        let Some(dest) = self.destination(codec, request, &source) else {
            warn!(source = %source.display(), "source name has no extension, using no-image placeholder");
            return Ok(no_image());
        };

        if dest.is_file() {
            debug!(dest = %dest.display(), "thumbnail cache hit");
            return Ok(Thumbnail::Cached(dest));
        }

        let key = dest.to_string_lossy().to_string();
        self.locks.with_lock(&key, || {
            if dest.is_file() {
                debug!(dest = %dest.display(), "thumbnail written by a concurrent request");
                return Ok(Thumbnail::Cached(dest.clone()));
            }
            if !self.generate(backend, &source, &dest, format, request)? {
                return Ok(no_image());
            }
            Ok(match &fallbacks.wait_image {
                Some(wait) if fallbacks.lazy_load => Thumbnail::Deferred {
                    placeholder: wait.clone(),
                    generated: dest.clone(),
                },
                Some(wait) => Thumbnail::Placeholder {
                    placeholder: wait.clone(),
                    generated: dest.clone(),
                },
                None => Thumbnail::Generated(dest.clone()),
            })
        })
    }

    /// Render `source` into `dest` through a temporary file.
    ///
    /// Returns `Ok(false)` when the image could not be decoded or encoded.
    fn generate(
        &self,
        backend: &impl ImageBackend,
        source: &Path,
        dest: &Path,
        format: image::ImageFormat,
        request: &ThumbnailRequest<'_>,
    ) -> Result<bool, ThumbnailError> {
        let dims = match backend.identify(source) {
            Ok(dims) => dims,
            Err(e) => {
                warn!(source = %source.display(), error = %e, "image could not be decoded, using no-image placeholder");
                return Ok(false);
            }
        };

        let params = &request.params;
        let size = calculate_size((dims.width, dims.height), params)
            .and_then(|size| check_bounds(size, self.max_side).map(|()| size))
            .map_err(|e| ThumbnailError::InvalidDimensions(e.to_string()))?;
        let crop = match (params.flags.contains(ResizeFlags::EXACT), params.width, params.height) {
            (true, Some(w), Some(h)) => Some((w, h)),
            _ => None,
        };

        let suffix = dest
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&self.thumbnail_dir)?
            .into_temp_path();

        let render = RenderParams {
            source: source.to_path_buf(),
            output: temp.to_path_buf(),
            format,
            resize: Some(size),
            crop,
            quality: request.quality,
        };
        if let Err(e) = backend.render(&render) {
            warn!(source = %source.display(), error = %e, "thumbnail could not be rendered, using no-image placeholder");
            return Ok(false);
        }

        temp.persist(dest).map_err(|e| ThumbnailError::Io(e.error))?;
        info!(
            source = %source.display(),
            dest = %dest.display(),
            width = size.0,
            height = size.1,
            "generated thumbnail"
        );
        Ok(true)
    }
}
