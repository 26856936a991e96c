//! Cache filename derivation and original-name recovery.
//!
//! Every thumbnail lives in one flat directory under a name that encodes the
//! request that produced it:
//!
//! ```text
//! dawn.jpg  +  images/gallery/ 300x200 SHRINK_ONLY q80 mt1700000000
//!   → dawn_pimagesSgallerySw300h200f1q80mt1700000000.jpg
//! ```
//!
//! ## Encoded block
//!
//! | Part | Content |
//! |---|---|
//! | `p` | relative directory, with `%`→`P`, `/`→`S`, `\`→`S`, `_`→`U` |
//! | `w`, `h` | requested width / height, empty when unset |
//! | `f` | resize flag bits |
//! | `q` | quality, empty when unset |
//! | `mt` | source modification time in seconds, only when tracked |
//!
//! The block never contains `_`, so the original basename is recovered by
//! cutting at the last `_` and re-attaching the extension. Sync relies on
//! that to find thumbnails whose source disappeared.
//!
//! A name whose last `.` comes before its last `_` (`a.b_c`) cannot have
//! been produced here, since every cache name ends in `.<ext>` after the
//! block. Such names decode to `None`, and sync leaves them in place rather
//! than deleting them as orphans.

use crate::imaging::{Quality, ResizeFlags};

/// Everything that distinguishes one thumbnail of a source from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams<'a> {
    pub relative_path: &'a str,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub flags: ResizeFlags,
    pub quality: Option<Quality>,
    /// Source modification time (seconds since the epoch).
    pub modified: Option<u64>,
}

/// A scheme for naming cache entries.
///
/// Implementations must keep `original_name(file_name(name, params)) == name`
/// for every source basename that has an extension.
pub trait NameCodec: Send + Sync {
    /// Encode the request into the variable part of a cache name.
    fn encode(&self, params: &EncodeParams<'_>) -> String;

    /// Build the cache basename for `source_file_name`. `None` when the
    /// source has no extension.
    fn file_name(&self, source_file_name: &str, encoded: &str) -> Option<String>;

    /// Recover the source basename from a cache basename. `None` for names
    /// this codec did not produce.
    fn original_name(&self, cache_file_name: &str) -> Option<String>;
}

/// The `<stem>_<encoded>.<ext>` scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyCodec;

impl NameCodec for LegacyCodec {
    fn encode(&self, params: &EncodeParams<'_>) -> String {
        encode_params(params)
    }

    fn file_name(&self, source_file_name: &str, encoded: &str) -> Option<String> {
        cache_file_name(source_file_name, encoded)
    }

    fn original_name(&self, cache_file_name: &str) -> Option<String> {
        decode_original_name(cache_file_name)
    }
}

fn encode_path(path: &str) -> String {
    path.chars()
        .map(|c| match c {
            '%' => 'P',
            '/' | '\\' => 'S',
            '_' => 'U',
            other => other,
        })
        .collect()
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Render the encoded parameter block.
///
/// ```
/// # use thumbcache::naming::{EncodeParams, encode_params};
/// # use thumbcache::imaging::{Quality, ResizeFlags};
/// let encoded = encode_params(&EncodeParams {
///     relative_path: "images/",
///     width: Some(200),
///     height: None,
///     flags: ResizeFlags::SHRINK_ONLY,
///     quality: Some(Quality::new(80)),
///     modified: None,
/// });
/// assert_eq!(encoded, "pimagesSw200hf1q80");
/// ```
pub fn encode_params(params: &EncodeParams<'_>) -> String {
    let mut encoded = format!(
        "p{}w{}h{}f{}q{}",
        encode_path(params.relative_path),
        opt(params.width),
        opt(params.height),
        params.flags.bits(),
        opt(params.quality),
    );
    if let Some(mt) = params.modified {
        encoded.push_str(&format!("mt{}", mt));
    }
    encoded
}

/// `<stem>_<encoded>.<ext>`, or `None` when the source has no extension.
pub fn cache_file_name(source_file_name: &str, encoded: &str) -> Option<String> {
    let dot = source_file_name.rfind('.')?;
    let (stem, ext) = source_file_name.split_at(dot);
    if ext.len() <= 1 {
        return None;
    }
    Some(format!("{}_{}{}", stem, encoded, ext))
}

/// Substring before the last `_` plus the substring from the last `.` on.
pub fn decode_original_name(cache_file_name: &str) -> Option<String> {
    let underscore = cache_file_name.rfind('_')?;
    let dot = cache_file_name.rfind('.')?;
    if dot < underscore {
        return None;
    }
    Some(format!(
        "{}{}",
        &cache_file_name[..underscore],
        &cache_file_name[dot..]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(path: &str) -> EncodeParams<'_> {
        EncodeParams {
            relative_path: path,
            width: Some(300),
            height: Some(200),
            flags: ResizeFlags::SHRINK_ONLY,
            quality: Some(Quality::new(80)),
            modified: None,
        }
    }

    // =========================================================================
    // encode_params
    // =========================================================================

    #[test]
    fn encodes_all_parts_in_order() {
        assert_eq!(
            encode_params(&params("images/gallery/")),
            "pimagesSgallerySw300h200f1q80"
        );
    }

    #[test]
    fn unset_numbers_render_empty() {
        let p = EncodeParams {
            width: Some(200),
            height: None,
            quality: None,
            flags: ResizeFlags::empty(),
            ..params("img/")
        };
        assert_eq!(encode_params(&p), "pimgSw200hf0q");
    }

    #[test]
    fn modification_time_appended_when_tracked() {
        let p = EncodeParams {
            modified: Some(1_700_000_000),
            ..params("img/")
        };
        assert!(encode_params(&p).ends_with("q80mt1700000000"));
    }

    #[test]
    fn path_substitutions() {
        let encoded = encode_params(&params("50%/my_dir\\sub/"));
        assert!(encoded.starts_with("p50PSmyUdirSsubSw"));
        assert!(!encoded.contains('_'));
    }

    #[test]
    fn distinct_params_give_distinct_blocks() {
        let a = encode_params(&params("img/"));
        let b = encode_params(&EncodeParams {
            flags: ResizeFlags::FILL,
            ..params("img/")
        });
        assert_ne!(a, b);
    }

    // =========================================================================
    // cache_file_name / decode_original_name
    // =========================================================================

    #[test]
    fn cache_name_wraps_stem_and_extension() {
        assert_eq!(
            cache_file_name("dawn.jpg", "pimgSw300h200f1q80").as_deref(),
            Some("dawn_pimgSw300h200f1q80.jpg")
        );
    }

    #[test]
    fn cache_name_requires_extension() {
        assert_eq!(cache_file_name("README", "p"), None);
        assert_eq!(cache_file_name("trailing.", "p"), None);
    }

    #[test]
    fn decode_recovers_original() {
        assert_eq!(
            decode_original_name("dawn_pimgSw300h200f1q80.jpg").as_deref(),
            Some("dawn.jpg")
        );
    }

    #[test]
    fn decode_rejects_foreign_names() {
        assert_eq!(decode_original_name("thumbs.db"), None);
        assert_eq!(decode_original_name("no_extension"), None);
        assert_eq!(decode_original_name(""), None);
        // Extension before the last underscore: never a cache name
        assert_eq!(decode_original_name("a.b_c"), None);
        assert_eq!(decode_original_name("notes.txt_backup"), None);
    }

    #[test]
    fn round_trip_with_awkward_basenames() {
        let codec = LegacyCodec;
        for name in ["a.jpg", "my_photo.JPEG", "v1.2_final.png", "x.y.z.gif"] {
            for path in ["", "images/", "under_score/dir/", "50%/"] {
                let encoded = codec.encode(&EncodeParams {
                    modified: Some(42),
                    ..params(path)
                });
                let cache = codec.file_name(name, &encoded).unwrap();
                assert_eq!(
                    codec.original_name(&cache).as_deref(),
                    Some(name),
                    "round trip failed for {name} in {path}"
                );
            }
        }
    }
}
