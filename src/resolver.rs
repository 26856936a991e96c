//! Request resolution: from a template call to an embeddable URL.
//!
//! ```text
//! src_path("gallery", "dawn.jpg", …)
//!   1. template "gallery" found → its path/size/flags/quality replace the request's
//!   2. resolved-path cache hit → return it
//!   3. thumbnail directory present (or created)
//!   4. ResizeExecutor → Thumbnail
//!   5. remember the URL (Cached / Generated / PassThrough only)
//!   6. strip the canonical source root, join with "/"
//!   7. public URL rewrite: drop leading `strip` segment, prepend `base`
//! ```
//!
//! A `NoImage` result without a configured placeholder resolves to the empty
//! string, which renders as an empty `src` attribute.

use crate::cache::{MetadataCache, cache_key};
use crate::config::PublicUrlConfig;
use crate::engine::{ThumbnailEngine, ThumbnailError};
use crate::executor::{Thumbnail, ThumbnailKind, ThumbnailRequest};
use crate::imaging::{ImageBackend, Quality, ResizeFlags, ResizeParams};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// What a template call embeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSrc {
    /// URL relative to the document root, or absolute after the public URL
    /// rewrite. Empty when there is nothing to show.
    pub url: String,
    pub kind: ThumbnailKind,
}

impl ResolvedSrc {
    /// In lazy-load mode the caller emits the placeholder and stops rendering.
    pub fn is_deferred(&self) -> bool {
        self.kind == ThumbnailKind::Deferred
    }
}

/// A request after template substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Effective {
    path: String,
    width: Option<u32>,
    height: Option<u32>,
    flag_names: Vec<String>,
    quality: Option<Quality>,
}

/// `root`-relative form of `path`, joined with `/`.
///
/// `root` must be canonical. `path` need not exist; its parent must.
pub fn relative_url(root: &Path, path: &Path) -> Result<String, ThumbnailError> {
    let canonical = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            let parent = path.parent().unwrap_or(path).canonicalize()?;
            match path.file_name() {
                Some(name) => parent.join(name),
                None => parent,
            }
        }
    };
    let relative = canonical.strip_prefix(root).map_err(|_| {
        ThumbnailError::Configuration(format!(
            "{} is outside the source root {}",
            canonical.display(),
            root.display()
        ))
    })?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}

/// Apply the public URL rewrite to a root-relative URL.
pub fn public_url(rule: &PublicUrlConfig, relative: &str) -> String {
    let mut url = relative;
    if let Some(strip) = rule.strip.as_deref().map(|s| s.trim_matches('/')) {
        if !strip.is_empty() {
            if url == strip {
                url = "";
            } else if let Some(rest) = url.strip_prefix(strip).and_then(|r| r.strip_prefix('/')) {
                url = rest;
            }
        }
    }
    match rule.base.as_deref() {
        Some(base) if !base.is_empty() => {
            format!("{}/{}", base.trim_end_matches('/'), url)
        }
        _ => url.to_string(),
    }
}

impl<B: ImageBackend> ThumbnailEngine<B> {
    fn effective<S: AsRef<str>>(
        &self,
        path: &str,
        width: Option<u32>,
        height: Option<u32>,
        flags: &[S],
        quality: Option<Quality>,
    ) -> Effective {
        match self.config.templates.get(path) {
            Some(template) => Effective {
                path: template.path.clone(),
                width: template.width,
                height: template.height,
                flag_names: template.flags.clone(),
                quality: template.quality(),
            },
            None => Effective {
                path: path.to_string(),
                width,
                height,
                flag_names: flags.iter().map(|f| f.as_ref().to_string()).collect(),
                quality,
            },
        }
    }

    fn ensure_thumbnail_dir(&self) -> Result<(), ThumbnailError> {
        let dir = &self.config.thumbnail_dir;
        if dir.is_dir() {
            return Ok(());
        }
        if self.config.create_thumbnail_dir {
            std::fs::create_dir_all(dir)?;
            debug!(dir = %dir.display(), "created thumbnail directory");
            return Ok(());
        }
        Err(ThumbnailError::OutputDirectoryMissing(dir.clone()))
    }

    fn to_url(&self, path: Option<&Path>) -> Result<String, ThumbnailError> {
        let Some(path) = path else {
            return Ok(String::new());
        };
        let root = self.config.source_root.canonicalize().map_err(|e| {
            ThumbnailError::Configuration(format!(
                "source root {} is not accessible: {}",
                self.config.source_root.display(),
                e
            ))
        })?;
        let relative = relative_url(&root, path)?;
        Ok(public_url(&self.config.public_url, &relative))
    }

    /// Resolve a thumbnail request to the URL a template should embed.
    ///
    /// `path` is a source directory relative to the source root, or the name
    /// of a configured template. An empty `flags` list means the runtime
    /// default flags. `width`/`height` of `0` count as unset; with neither
    /// set the source itself is returned.
    pub fn src_path<S: AsRef<str>>(
        &self,
        path: &str,
        file: &str,
        width: Option<u32>,
        height: Option<u32>,
        flags: &[S],
        quality: Option<Quality>,
    ) -> Result<ResolvedSrc, ThumbnailError> {
        let settings = self.settings();
        let request = self.effective(path, width, height, flags, quality);
        let flags = if request.flag_names.is_empty() {
            settings.default_flags
        } else {
            ResizeFlags::from_names(&request.flag_names)?
        };
        let params = ResizeParams::new(request.width, request.height, flags);

        let key = settings.cache.then(|| {
            cache_key(
                &request.path,
                file,
                params.width,
                params.height,
                params.flags,
                request.quality,
            )
        });
        if let Some(url) = key.as_deref().and_then(|k| self.cache.load(k)) {
            debug!(path = %request.path, file, "resolved path cache hit");
            return Ok(ResolvedSrc {
                url,
                kind: ThumbnailKind::Cached,
            });
        }

        self.ensure_thumbnail_dir()?;

        let source_dir: PathBuf = self.config.source_root.join(&request.path);
        let thumbnail = self.executor.execute(
            &self.backend,
            self.codec.as_ref(),
            &ThumbnailRequest {
                source_dir: &source_dir,
                relative_path: &request.path,
                file_name: file,
                params,
                quality: request.quality,
            },
            &settings.fallbacks(),
        )?;

        let url = self.to_url(thumbnail.display_path())?;

        if let Some(key) = key {
            let dependencies = match &thumbnail {
                Thumbnail::Cached(dest) | Thumbnail::Generated(dest) => {
                    Some(vec![source_dir.join(file), dest.clone()])
                }
                Thumbnail::PassThrough(source) => Some(vec![source.clone()]),
                _ => None,
            };
            match dependencies {
                Some(deps) => self.cache.save(&key, &url, &deps),
                None => debug!(file, kind = ?thumbnail.kind(), "placeholder result not cached"),
            }
        }

        Ok(ResolvedSrc {
            url,
            kind: thumbnail.kind(),
        })
    }

    /// Whether `file` (or `path` itself when `file` is `None`) is an
    /// existing regular file under the source root.
    pub fn is_src_path_exists(&self, path: &str, file: Option<&str>) -> bool {
        let dir = self.config.source_root.join(path);
        match file {
            Some(file) => dir.join(file).is_file(),
            None => dir.is_file(),
        }
    }
}
