//! Engine configuration module.
//!
//! Handles loading and validating `thumbcache.toml`. Every key is optional;
//! stock defaults fill the gaps and unknown keys are rejected.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source_root = "www"               # Document root; URLs are relative to it
//! thumbnail_dir = "www/thumbnail"   # Flat cache directory, inside source_root
//! # no_image = "images/no-image.png"  # Placeholder for missing/corrupt images
//! # wait_image = "images/wait.gif"    # Placeholder while a thumbnail is generated
//! lazy_load = false                 # Defer rendering when the wait image is used
//! default_flags = ["SHRINK_ONLY"]   # Used when a request names no flags
//! cache = false                     # Cache resolved paths in memory
//! create_thumbnail_dir = false      # Create thumbnail_dir instead of failing
//! track_modification_time = true    # Encode source mtime into cache names
//!
//! [public_url]
//! # base = "https://cdn.example.com/"
//! # strip = "www"
//!
//! [templates.gallery]               # Named request preset
//! path = "images/gallery/"
//! width = 300
//! height = 200
//! flags = ["FIT"]
//! quality = 80
//!
//! [processing]
//! max_processes = 4                 # Max parallel workers for `warm`
//! max_side = 10000                  # Longest thumbnail side ever rendered
//! ```
//!
//! Relative paths are resolved against the directory holding the config
//! file. `no_image` and `wait_image` are relative to `source_root`.

use crate::imaging::{DEFAULT_MAX_SIDE, Quality, ResizeFlags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Engine configuration loaded from `thumbcache.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Document root. Resolved URLs are relative to it.
    pub source_root: PathBuf,
    /// Flat directory holding every cached thumbnail.
    pub thumbnail_dir: PathBuf,
    /// Placeholder for missing or undecodable sources, relative to `source_root`.
    pub no_image: Option<PathBuf>,
    /// Placeholder returned while a thumbnail is freshly generated.
    pub wait_image: Option<PathBuf>,
    /// In lazy-load mode a fresh thumbnail defers the rest of the render.
    pub lazy_load: bool,
    /// Flag names used when a request names none.
    pub default_flags: Vec<String>,
    /// Cache resolved paths in memory.
    pub cache: bool,
    /// Create `thumbnail_dir` on first use instead of failing.
    pub create_thumbnail_dir: bool,
    /// Encode the source modification time into cache names.
    pub track_modification_time: bool,
    /// Rewrite of resolved paths into public URLs.
    pub public_url: PublicUrlConfig,
    /// Named request presets.
    pub templates: BTreeMap<String, TemplateConfig>,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("www"),
            thumbnail_dir: PathBuf::from("www/thumbnail"),
            no_image: None,
            wait_image: None,
            lazy_load: false,
            default_flags: vec!["SHRINK_ONLY".to_string()],
            cache: false,
            create_thumbnail_dir: false,
            track_modification_time: true,
            public_url: PublicUrlConfig::default(),
            templates: BTreeMap::new(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ResizeFlags::from_names(&self.default_flags)
            .map_err(|e| ConfigError::Validation(format!("default_flags: {}", e)))?;

        if self.processing.max_side == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_side must be at least 1".into(),
            ));
        }

        if self.lazy_load && self.wait_image.is_none() {
            return Err(ConfigError::Validation(
                "lazy_load requires wait_image".into(),
            ));
        }

        for (name, template) in &self.templates {
            if let Some(q) = template.quality {
                if !(1..=100).contains(&q) {
                    return Err(ConfigError::Validation(format!(
                        "templates.{}.quality must be 1-100",
                        name
                    )));
                }
            }
            ResizeFlags::from_names(&template.flags)
                .map_err(|e| ConfigError::Validation(format!("templates.{}.flags: {}", name, e)))?;
            if Path::new(&template.path).is_absolute() {
                return Err(ConfigError::Validation(format!(
                    "templates.{}.path must be relative to source_root",
                    name
                )));
            }
        }
        Ok(())
    }

    /// The OR of `default_flags`.
    pub fn default_resize_flags(&self) -> Result<ResizeFlags, ConfigError> {
        ResizeFlags::from_names(&self.default_flags)
            .map_err(|e| ConfigError::Validation(format!("default_flags: {}", e)))
    }

    /// Absolute no-image placeholder, if configured.
    pub fn no_image_path(&self) -> Option<PathBuf> {
        self.no_image.as_ref().map(|p| self.source_root.join(p))
    }

    /// Absolute wait-image placeholder, if configured.
    pub fn wait_image_path(&self) -> Option<PathBuf> {
        self.wait_image.as_ref().map(|p| self.source_root.join(p))
    }

    /// Make `source_root` and `thumbnail_dir` absolute against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.source_root.is_relative() {
            self.source_root = base.join(&self.source_root);
        }
        if self.thumbnail_dir.is_relative() {
            self.thumbnail_dir = base.join(&self.thumbnail_dir);
        }
    }
}

/// Rewrite applied to a resolved relative path before it is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublicUrlConfig {
    /// Prefix prepended to every resolved path (e.g. a CDN origin).
    pub base: Option<String>,
    /// Leading path segment removed before `base` is applied.
    pub strip: Option<String>,
}

/// A named request preset. Its values replace the request's entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    /// Source directory, relative to `source_root`.
    pub path: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Flag names. Empty means the runtime default flags.
    pub flags: Vec<String>,
    pub quality: Option<u32>,
}

impl TemplateConfig {
    pub fn quality(&self) -> Option<Quality> {
        self.quality.map(Quality::new)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// Longest side, in pixels, of any rendered thumbnail. Requests whose
    /// computed output is larger fail with an invalid-dimensions error.
    /// Defaults to 10000.
    pub max_side: Option<u32>,
}

/// The output side limit, [`DEFAULT_MAX_SIDE`] unless configured.
pub fn effective_max_side(config: &ProcessingConfig) -> u32 {
    config.max_side.unwrap_or(DEFAULT_MAX_SIDE)
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading and validation
// =============================================================================

/// Parse and validate config text. Paths are left as written.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file.
///
/// A missing file yields the stock defaults. Relative paths are resolved
/// against the file's directory.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let mut config = if path.exists() {
        parse_config(&fs::read_to_string(path)?)?
    } else {
        Config::default()
    };
    let base = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    config.resolve_paths(&base);
    Ok(config)
}

/// Returns a fully-commented stock `thumbcache.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# thumbcache configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Relative paths are resolved against the directory of this file.
# Unknown keys will cause an error.

# Document root. Resolved thumbnail URLs are relative to it.
source_root = "www"

# Flat directory that holds every cached thumbnail. Must live inside
# source_root so thumbnails can be addressed by URL.
thumbnail_dir = "www/thumbnail"

# Placeholder returned for missing, unsupported or corrupt images,
# relative to source_root. Without it such requests resolve to "".
# no_image = "images/no-image.png"

# Placeholder returned while a thumbnail is being generated.
# wait_image = "images/wait.gif"

# With a wait image, stop rendering after emitting the placeholder.
lazy_load = false

# Resize flags used when a request names none. Known flags:
# FIT (alias NONE), SHRINK_ONLY, STRETCH, FILL, EXACT, FIT_WIDTH, FIT_HEIGHT
default_flags = ["SHRINK_ONLY"]

# Keep resolved paths in memory; entries expire when the source changes.
cache = false

# Create thumbnail_dir on first use instead of failing.
create_thumbnail_dir = false

# Encode the source modification time into thumbnail names, so an edited
# source gets a fresh thumbnail.
track_modification_time = true

# ---------------------------------------------------------------------------
# Public URLs
# ---------------------------------------------------------------------------
[public_url]
# Prefix prepended to every resolved path.
# base = "https://cdn.example.com/"

# Leading path segment removed first.
# strip = "www"

# ---------------------------------------------------------------------------
# Templates: named request presets. A request whose path equals a template
# name takes all values from the template.
# ---------------------------------------------------------------------------
# [templates.gallery]
# path = "images/gallery/"
# width = 300
# height = 200
# flags = ["FIT"]
# quality = 80

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for `thumbcache warm`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# Longest side, in pixels, of any rendered thumbnail. Larger results are
# refused instead of allocating huge buffers.
# max_side = 10000
"##
}
