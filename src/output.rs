//! CLI output formatting for every `thumbcache` command.
//!
//! # Output Format
//!
//! ## src
//!
//! ```text
//! generated → thumbnail/dawn_pimagesSw200hf1q.jpg
//! ```
//!
//! ## sync / clean / unused
//!
//! ```text
//! Deleted 2 thumbnails
//!     gone_pimagesSw200hf1q.jpg
//!     gone_pimagesSw400hf1q.jpg
//! ```
//!
//! ## warm
//!
//! ```text
//! 001 dawn.jpg → thumbnail/dawn_pimagesSw200hf1q.jpg (generated)
//! 002 dusk.jpg → thumbnail/dusk_pimagesSw200hf1q.jpg (cached)
//! 003 broken.jpg → images/no-image.png (no_image)
//!
//! Warmed 3 images: 1 generated, 1 cached, 1 fallback, 0 failed
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::engine::WarmResult;
use crate::executor::ThumbnailKind;
use crate::resolver::ResolvedSrc;
use std::path::{Path, PathBuf};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Snake-case name of a result kind, as in the JSON output.
pub fn kind_label(kind: ThumbnailKind) -> &'static str {
    match kind {
        ThumbnailKind::PassThrough => "pass_through",
        ThumbnailKind::Cached => "cached",
        ThumbnailKind::Generated => "generated",
        ThumbnailKind::NoImage => "no_image",
        ThumbnailKind::Placeholder => "placeholder",
        ThumbnailKind::Deferred => "deferred",
    }
}

fn display_url(url: &str) -> &str {
    if url.is_empty() { "(none)" } else { url }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// Path shown relative to `base` when it lives below it.
fn short_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

// ============================================================================
// src
// ============================================================================

pub fn format_resolved(resolved: &ResolvedSrc) -> Vec<String> {
    let mut lines = vec![format!(
        "{} → {}",
        kind_label(resolved.kind),
        display_url(&resolved.url)
    )];
    if resolved.is_deferred() {
        lines.push(format!(
            "{}lazy load: stop rendering after the placeholder",
            indent(1)
        ));
    }
    lines
}

pub fn print_resolved(resolved: &ResolvedSrc) {
    for line in format_resolved(resolved) {
        println!("{}", line);
    }
}

// ============================================================================
// sync / clean / unused
// ============================================================================

/// A header such as `Deleted 2 thumbnails` followed by one indented line per path.
pub fn format_path_list(verb: &str, noun: &str, paths: &[PathBuf], base: &Path) -> Vec<String> {
    let mut lines = vec![format!("{} {}", verb, plural(paths.len(), noun))];
    lines.extend(
        paths
            .iter()
            .map(|p| format!("{}{}", indent(1), short_path(p, base))),
    );
    lines
}

pub fn print_path_list(verb: &str, noun: &str, paths: &[PathBuf], base: &Path) {
    for line in format_path_list(verb, noun, paths, base) {
        println!("{}", line);
    }
}

// ============================================================================
// warm
// ============================================================================

pub fn format_warm_output(results: &[WarmResult]) -> Vec<String> {
    let mut lines = Vec::new();
    let (mut generated, mut cached, mut fallback, mut failed) = (0, 0, 0, 0);

    for (i, warm) in results.iter().enumerate() {
        let pos = format_index(i + 1);
        match &warm.result {
            Ok(resolved) => {
                match resolved.kind {
                    ThumbnailKind::Generated
                    | ThumbnailKind::Placeholder
                    | ThumbnailKind::Deferred => generated += 1,
                    ThumbnailKind::Cached | ThumbnailKind::PassThrough => cached += 1,
                    ThumbnailKind::NoImage => fallback += 1,
                }
                lines.push(format!(
                    "{} {} → {} ({})",
                    pos,
                    warm.file_name,
                    display_url(&resolved.url),
                    kind_label(resolved.kind)
                ));
            }
            Err(e) => {
                failed += 1;
                lines.push(format!("{} {}: error: {}", pos, warm.file_name, e));
            }
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Warmed {}: {} generated, {} cached, {} fallback, {} failed",
        plural(results.len(), "image"),
        generated,
        cached,
        fallback,
        failed
    ));
    lines
}

pub fn print_warm_output(results: &[WarmResult]) {
    for line in format_warm_output(results) {
        println!("{}", line);
    }
}
