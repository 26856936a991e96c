//! # thumbcache
//!
//! On-demand image thumbnails, cached on disk under deterministic names
//! that can be traced back to their source.
//!
//! A templating layer asks "what is the URL of `images/dawn.jpg` at 200px
//! wide?". The engine answers with a path inside one flat thumbnail
//! directory, generating the file on the first request and reusing it on
//! every later one. Because each name encodes the source basename, stale
//! thumbnails can be found and deleted later without any manifest.
//!
//! ```text
//! src_path("images/", "dawn.jpg", 200, -, [], -)
//!   → thumbnail/dawn_pimagesSw200hf1q<mt>.jpg
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Cache filename derivation and original-name recovery |
//! | [`index`] | Single-level directory snapshots |
//! | [`imaging`] | Resize flags, size math, `ImageBackend` trait and the `image`-crate backend |
//! | [`executor`] | Resize-or-reuse decision, fallbacks, per-destination write locks |
//! | [`sync`] | Delete orphaned thumbnails, list unused sources, clean everything |
//! | [`resolver`] | Templates, root stripping, public URL rewrite, resolved-path cache |
//! | [`cache`] | In-memory resolved-path cache with file-dependency invalidation |
//! | [`engine`] | [`ThumbnailEngine`]: config, runtime settings and admin operations |
//! | [`config`] | `thumbcache.toml` loading, validation and the stock file |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Names Instead of a Manifest
//!
//! Thumbnail names are `<stem>_<encoded request>.<ext>`. The encoded block
//! never contains `_`, so cutting at the last underscore recovers the source
//! basename. Sync compares those basenames with the source directories and
//! deletes the rest. Nothing else has to be stored, and the thumbnail
//! directory can be wiped at any time.
//!
//! ## Modification Time in the Name
//!
//! With `track_modification_time` the source mtime is part of the name, so
//! editing an image yields a new thumbnail name and the old file is simply
//! never asked for again. A later `clean` reclaims it.
//!
//! ## Safe Under Concurrency
//!
//! Writers of the same thumbnail are serialized and every file is written
//! to a hidden temporary name, then renamed into place. Readers never see a
//! partial image and an image is never encoded twice by one engine.

pub mod cache;
pub mod config;
pub mod engine;
pub mod executor;
pub mod imaging;
pub mod index;
pub mod naming;
pub mod output;
pub mod resolver;
pub mod sync;

pub use engine::{RuntimeSettings, ThumbnailEngine, ThumbnailError, WarmResult};
pub use executor::{Thumbnail, ThumbnailKind};
pub use resolver::ResolvedSrc;

#[cfg(test)]
pub(crate) mod test_helpers;
