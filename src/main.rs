use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use thumbcache::imaging::{Quality, RustBackend};
use thumbcache::{ThumbnailEngine, config, output};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "thumbcache")]
#[command(about = "On-demand image thumbnails with a self-cleaning disk cache")]
#[command(long_about = "\
On-demand image thumbnails with a self-cleaning disk cache

Thumbnails are written to one flat directory under names that encode the
request, e.g.

  images/dawn.jpg at 200px wide  →  thumbnail/dawn_pimagesSw200hf1q.jpg

so a thumbnail is generated once and reused until its source changes or
disappears. 'sync' removes thumbnails whose source is gone; 'clean' removes
them all.

Run 'thumbcache gen-config' to generate a documented thumbcache.toml.")]
#[command(version)]
struct Cli {
    /// Configuration file (relative paths inside it resolve against its directory)
    #[arg(short, long, default_value = "thumbcache.toml", global = true)]
    config: PathBuf,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Size and mode of a thumbnail request.
#[derive(Args, Clone)]
struct ResizeArgs {
    /// Target width in pixels (0 = unset)
    #[arg(long)]
    width: Option<u32>,

    /// Target height in pixels (0 = unset)
    #[arg(long)]
    height: Option<u32>,

    /// Resize flag, repeatable (FIT, SHRINK_ONLY, STRETCH, FILL, EXACT, FIT_WIDTH, FIT_HEIGHT)
    #[arg(long = "flag")]
    flags: Vec<String>,

    /// Encoding quality 1-100
    #[arg(long)]
    quality: Option<u32>,
}

impl ResizeArgs {
    fn quality(&self) -> Option<Quality> {
        self.quality.map(Quality::new)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Resolve (and generate if needed) the URL of one thumbnail
    Src {
        /// Source directory relative to source_root, or a template name
        path: String,
        /// Source file name
        file: String,
        #[command(flatten)]
        resize: ResizeArgs,
    },
    /// Check that a source image exists
    Exists {
        /// Directory relative to source_root (or a file path when FILE is omitted)
        path: String,
        file: Option<String>,
    },
    /// Delete thumbnails whose source image no longer exists
    Sync {
        /// Source directories relative to source_root
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
    },
    /// List source images that have no thumbnail
    Unused {
        /// Source directories relative to source_root
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
    },
    /// Delete every thumbnail
    Clean,
    /// Pre-generate thumbnails for every image in a directory
    Warm {
        /// Source directory relative to source_root, or a template name
        path: String,
        #[command(flatten)]
        resize: ResizeArgs,
    },
    /// Print a stock thumbcache.toml with all options documented
    GenConfig,
}

/// Log to stderr so stdout stays parseable. `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    let thumbnail_dir = config.thumbnail_dir.clone();
    let source_root = config.source_root.clone();
    let engine = ThumbnailEngine::new(config, RustBackend::new())?;

    match cli.command {
        Command::Src { path, file, resize } => {
            let resolved = engine.src_path(
                &path,
                &file,
                resize.width,
                resize.height,
                &resize.flags,
                resize.quality(),
            )?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else {
                output::print_resolved(&resolved);
            }
        }
        Command::Exists { path, file } => {
            let exists = engine.is_src_path_exists(&path, file.as_deref());
            if cli.json {
                println!("{}", serde_json::json!({ "exists": exists }));
            } else {
                println!("{}", exists);
            }
            if !exists {
                std::process::exit(1);
            }
        }
        Command::Sync { dirs } => {
            let deleted = engine.synchronize_thumbnail(&dirs)?;
            report_paths(cli.json, "Deleted", "thumbnail", &deleted, &thumbnail_dir)?;
        }
        Command::Unused { dirs } => {
            let unused = engine.unused_files(&dirs)?;
            report_paths(cli.json, "Found", "unused image", &unused, &source_root)?;
        }
        Command::Clean => {
            let deleted = engine.clean_thumbnail()?;
            report_paths(cli.json, "Deleted", "thumbnail", &deleted, &thumbnail_dir)?;
        }
        Command::Warm { path, resize } => {
            let results = engine.warm(
                &path,
                resize.width,
                resize.height,
                &resize.flags,
                resize.quality(),
            )?;
            if cli.json {
                let json: Vec<serde_json::Value> = results
                    .iter()
                    .map(|r| match &r.result {
                        Ok(resolved) => serde_json::json!({
                            "file": r.file_name,
                            "url": resolved.url,
                            "kind": resolved.kind,
                        }),
                        Err(e) => serde_json::json!({
                            "file": r.file_name,
                            "error": e.to_string(),
                        }),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else {
                output::print_warm_output(&results);
            }
        }
        // Printed before the config is loaded
        Command::GenConfig => {}
    }

    Ok(())
}

fn report_paths(
    json: bool,
    verb: &str,
    noun: &str,
    paths: &[PathBuf],
    base: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(paths)?);
    } else {
        output::print_path_list(verb, noun, paths, base);
    }
    Ok(())
}
