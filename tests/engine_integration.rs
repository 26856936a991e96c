//! End-to-end tests against the real `image`-crate backend.
//!
//! Each test builds a small site in a temp dir:
//!
//! ```text
//! www/
//! ├── thumbcache.toml
//! ├── images/   dawn.jpg 640x480, dusk.jpg 480x640, broken.jpg (garbage)
//! └── thumbnail/
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use thumbcache::config::{self, Config};
use thumbcache::imaging::{Quality, RustBackend};
use thumbcache::{ThumbnailEngine, ThumbnailKind};

const NO_FLAGS: &[&str] = &[];

fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    });
    img.save(path).unwrap();
}

struct Site {
    tmp: TempDir,
}

impl Site {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let site = Self { tmp };
        std::fs::create_dir_all(site.images()).unwrap();
        std::fs::create_dir_all(site.thumbs()).unwrap();
        write_jpeg(&site.images().join("dawn.jpg"), 640, 480);
        write_jpeg(&site.images().join("dusk.jpg"), 480, 640);
        std::fs::write(site.images().join("broken.jpg"), b"not a jpeg").unwrap();
        site
    }

    fn root(&self) -> PathBuf {
        self.tmp.path().join("www")
    }

    fn images(&self) -> PathBuf {
        self.root().join("images")
    }

    fn thumbs(&self) -> PathBuf {
        self.root().join("thumbnail")
    }

    fn thumb_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.thumbs())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    /// Engine built from a config file, like the CLI does.
    fn engine(&self, toml: &str) -> ThumbnailEngine<RustBackend> {
        let path = self.root().join("thumbcache.toml");
        std::fs::write(&path, toml).unwrap();
        let config = config::load_config(&path).unwrap();
        ThumbnailEngine::new(config, RustBackend::new()).unwrap()
    }
}

const BASE_TOML: &str = r#"
source_root = "."
thumbnail_dir = "thumbnail"
track_modification_time = false
"#;

fn dimensions(path: &Path) -> (u32, u32) {
    image::image_dimensions(path).unwrap()
}

// =============================================================================
// Generation
// =============================================================================

#[test]
fn generates_real_thumbnail_with_expected_size() {
    let site = Site::new();
    let engine = site.engine(BASE_TOML);

    let resolved = engine
        .src_path("images/", "dawn.jpg", Some(200), Some(200), NO_FLAGS, None)
        .unwrap();

    assert_eq!(resolved.kind, ThumbnailKind::Generated);
    assert_eq!(resolved.url, "thumbnail/dawn_pimagesSw200h200f1q.jpg");
    assert_eq!(
        dimensions(&site.thumbs().join("dawn_pimagesSw200h200f1q.jpg")),
        (200, 150)
    );
}

#[test]
fn exact_mode_crops_to_requested_box() {
    let site = Site::new();
    let engine = site.engine(BASE_TOML);

    let resolved = engine
        .src_path(
            "images/",
            "dusk.jpg",
            Some(100),
            Some(100),
            &["EXACT"],
            Some(Quality::new(70)),
        )
        .unwrap();

    assert_eq!(resolved.url, "thumbnail/dusk_pimagesSw100h100f8q70.jpg");
    assert_eq!(
        dimensions(&site.thumbs().join("dusk_pimagesSw100h100f8q70.jpg")),
        (100, 100)
    );
}

#[test]
fn second_request_reuses_file() {
    let site = Site::new();
    let engine = site.engine(BASE_TOML);
    let first = engine
        .src_path("images/", "dawn.jpg", Some(120), None, NO_FLAGS, None)
        .unwrap();
    let thumb = site.thumbs().join("dawn_pimagesSw120hf1q.jpg");
    let written = std::fs::metadata(&thumb).unwrap().modified().unwrap();

    let second = engine
        .src_path("images/", "dawn.jpg", Some(120), None, NO_FLAGS, None)
        .unwrap();

    assert_eq!(second.url, first.url);
    assert_eq!(second.kind, ThumbnailKind::Cached);
    assert_eq!(std::fs::metadata(&thumb).unwrap().modified().unwrap(), written);
    assert_eq!(site.thumb_names().len(), 1);
}

#[test]
fn no_dimensions_passes_source_through() {
    let site = Site::new();
    let engine = site.engine(BASE_TOML);
    let resolved = engine
        .src_path("images/", "dawn.jpg", None, None, NO_FLAGS, None)
        .unwrap();
    assert_eq!(resolved.kind, ThumbnailKind::PassThrough);
    assert_eq!(resolved.url, "images/dawn.jpg");
    assert!(site.thumb_names().is_empty());
}

#[test]
fn modification_time_is_part_of_the_name() {
    let site = Site::new();
    let engine = site.engine(
        r#"
source_root = "."
thumbnail_dir = "thumbnail"
"#,
    );
    let secs = std::fs::metadata(site.images().join("dawn.jpg"))
        .unwrap()
        .modified()
        .unwrap()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let resolved = engine
        .src_path("images/", "dawn.jpg", Some(50), None, NO_FLAGS, None)
        .unwrap();
    assert_eq!(
        resolved.url,
        format!("thumbnail/dawn_pimagesSw50hf1qmt{}.jpg", secs)
    );
}

// =============================================================================
// Fallbacks
// =============================================================================

#[test]
fn undecodable_source_falls_back_without_writing() {
    let site = Site::new();
    let engine = site.engine(&format!("{}no_image = \"images/dawn.jpg\"\n", BASE_TOML));

    let resolved = engine
        .src_path("images/", "broken.jpg", Some(64), None, NO_FLAGS, None)
        .unwrap();

    assert_eq!(resolved.kind, ThumbnailKind::NoImage);
    assert_eq!(resolved.url, "images/dawn.jpg");
    assert!(site.thumb_names().is_empty());
}

#[test]
fn missing_source_without_placeholder_is_empty_url() {
    let site = Site::new();
    let engine = site.engine(BASE_TOML);
    let resolved = engine
        .src_path("images/", "ghost.jpg", Some(64), None, NO_FLAGS, None)
        .unwrap();
    assert_eq!(resolved.kind, ThumbnailKind::NoImage);
    assert_eq!(resolved.url, "");
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn concurrent_requests_produce_one_complete_file() {
    let site = Site::new();
    let engine = Arc::new(site.engine(BASE_TOML));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine
                    .src_path("images/", "dawn.jpg", Some(160), None, NO_FLAGS, None)
                    .unwrap()
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let generated = results
        .iter()
        .filter(|r| r.kind == ThumbnailKind::Generated)
        .count();
    assert_eq!(generated, 1);
    assert!(results.iter().all(|r| r.url == results[0].url));
    // No temp files left behind, and the one file decodes
    assert_eq!(site.thumb_names(), vec!["dawn_pimagesSw160hf1q.jpg"]);
    assert_eq!(
        dimensions(&site.thumbs().join("dawn_pimagesSw160hf1q.jpg")),
        (160, 120)
    );
}

#[test]
fn warm_generates_in_parallel() {
    let site = Site::new();
    let engine = site.engine(&format!("{}\n[processing]\nmax_processes = 2\n", BASE_TOML));

    let results = engine
        .warm("images/", Some(80), Some(80), NO_FLAGS, None)
        .unwrap();

    assert_eq!(results.len(), 3);
    let names: Vec<&str> = results.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, vec!["broken.jpg", "dawn.jpg", "dusk.jpg"]);
    assert_eq!(
        site.thumb_names(),
        vec!["dawn_pimagesSw80h80f1q.jpg", "dusk_pimagesSw80h80f1q.jpg"]
    );
}

// =============================================================================
// Maintenance
// =============================================================================

#[test]
fn sync_deletes_thumbnails_of_removed_sources() {
    let site = Site::new();
    let engine = site.engine(BASE_TOML);
    for file in ["dawn.jpg", "dusk.jpg"] {
        engine
            .src_path("images/", file, Some(40), None, NO_FLAGS, None)
            .unwrap();
    }
    std::fs::remove_file(site.images().join("dusk.jpg")).unwrap();

    let deleted = engine
        .synchronize_thumbnail(&[PathBuf::from("images")])
        .unwrap();

    assert_eq!(deleted, vec![site.thumbs().join("dusk_pimagesSw40hf1q.jpg")]);
    assert_eq!(site.thumb_names(), vec!["dawn_pimagesSw40hf1q.jpg"]);

    // A second pass has nothing left to do
    assert!(
        engine
            .synchronize_thumbnail(&[PathBuf::from("images")])
            .unwrap()
            .is_empty()
    );
}

#[test]
fn dot_named_source_is_synced_and_cleaned() {
    let site = Site::new();
    let engine = site.engine(BASE_TOML);
    write_jpeg(&site.images().join(".logo.jpg"), 64, 64);

    let resolved = engine
        .src_path("images/", ".logo.jpg", Some(20), None, NO_FLAGS, None)
        .unwrap();
    assert_eq!(resolved.url, "thumbnail/.logo_pimagesSw20hf1q.jpg");

    // Source still present: kept
    let images = [PathBuf::from("images")];
    assert!(engine.synchronize_thumbnail(&images).unwrap().is_empty());

    std::fs::remove_file(site.images().join(".logo.jpg")).unwrap();
    assert_eq!(
        engine.synchronize_thumbnail(&images).unwrap(),
        vec![site.thumbs().join(".logo_pimagesSw20hf1q.jpg")]
    );

    write_jpeg(&site.images().join(".logo.jpg"), 64, 64);
    engine
        .src_path("images/", ".logo.jpg", Some(30), None, NO_FLAGS, None)
        .unwrap();
    assert_eq!(engine.clean_thumbnail().unwrap().len(), 1);
    assert!(site.thumb_names().is_empty());
}

#[test]
fn warm_by_template_name() {
    let site = Site::new();
    let engine = site.engine(&format!(
        "{}\n[templates.gallery]\npath = \"images/\"\nwidth = 32\n",
        BASE_TOML
    ));

    let results = engine.warm("gallery", None, None, NO_FLAGS, None).unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(
        site.thumb_names(),
        vec!["dawn_pimagesSw32hf1q.jpg", "dusk_pimagesSw32hf1q.jpg"]
    );
}

#[test]
fn clean_reports_every_deleted_file() {
    let site = Site::new();
    let engine = site.engine(BASE_TOML);
    for width in [20, 30, 40] {
        engine
            .src_path("images/", "dawn.jpg", Some(width), None, NO_FLAGS, None)
            .unwrap();
    }

    let deleted = engine.clean_thumbnail().unwrap();
    assert_eq!(deleted.len(), 3);
    assert!(site.thumb_names().is_empty());
}

#[test]
fn default_config_round_trips_through_engine() {
    let site = Site::new();
    let mut config: Config = config::parse_config(config::stock_config_toml()).unwrap();
    config.source_root = site.root();
    config.thumbnail_dir = site.thumbs();
    let engine = ThumbnailEngine::new(config, RustBackend::new()).unwrap();
    assert!(engine.is_src_path_exists("images/", Some("dawn.jpg")));
}
