use std::path::{Path, PathBuf};
use std::time::Instant;

use ar_overlay::{init_thread_pool, FrameOutcome, SessionBuilder, SessionConfig};
use clap::{Parser, ValueEnum};
use image::imageops::{self, FilterType};
use image::RgbImage;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    Still,
    Live,
    Strict,
}

/// Overlay an AR image wherever the query image appears in each target
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Reference image to look for
    query: PathBuf,

    /// Image drawn over the located query
    ar: PathBuf,

    /// Target photos or frames, processed independently
    #[arg(required = true)]
    targets: Vec<PathBuf>,

    /// Directory for the `<stem>_ar.png` outputs
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    #[arg(long, value_enum, default_value = "still")]
    preset: Preset,

    /// JSON or TOML session config; overrides --preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Good matches must exceed this count
    #[arg(long)]
    min_match_count: Option<usize>,

    /// Resize every target to this width first, keeping aspect ratio
    #[arg(long)]
    resize_width: Option<u32>,

    #[arg(long)]
    threads: Option<usize>,
}

fn load_config(cli: &Cli) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    #[cfg(feature = "serde")]
    if let Some(path) = &cli.config {
        return SessionConfig::load(path);
    }
    #[cfg(not(feature = "serde"))]
    if cli.config.is_some() {
        return Err("--config requires the `serde` feature".into());
    }
    Ok(match cli.preset {
        Preset::Still => SessionConfig::still_image(),
        Preset::Live => SessionConfig::live_video(),
        Preset::Strict => SessionConfig::strict(),
    })
}

fn resize_to_width(img: RgbImage, width: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    if w == 0 || w == width {
        return img;
    }
    let height = ((h as u64 * width as u64) / w as u64).max(1) as u32;
    imageops::resize(&img, width, height, FilterType::Triangle)
}

fn output_path(dir: &Path, target: &Path) -> PathBuf {
    let stem = target.file_stem().and_then(|s| s.to_str()).unwrap_or("frame");
    dir.join(format!("{}_ar.png", stem))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut builder = SessionBuilder::from_config(load_config(&cli)?);
    if let Some(n) = cli.min_match_count {
        builder = builder.min_match_count(n);
    }
    if let Some(n) = cli.threads {
        builder = builder.threads(n);
    }
    init_thread_pool(builder.config().core.n_threads)?;
    println!("{}", builder.summary());

    let query = image::open(&cli.query)?.to_rgb8();
    let ar = image::open(&cli.ar)?.to_rgb8();

    let t0 = Instant::now();
    let session = builder.build(&query, ar)?;
    println!(
        "Query model: {} features in {:.2?}",
        session.query_model().features.len(),
        t0.elapsed()
    );

    std::fs::create_dir_all(&cli.output_dir)?;
    let mut overlaid = 0;
    for target in &cli.targets {
        let mut frame = image::open(target)?.to_rgb8();
        if let Some(width) = cli.resize_width {
            frame = resize_to_width(frame, width);
        }

        let t0 = Instant::now();
        let result = session.process(&frame);
        let elapsed = t0.elapsed();

        match &result.outcome {
            FrameOutcome::Overlaid { good_matches, inliers, .. } => {
                overlaid += 1;
                println!(
                    "{}: overlaid ({} good matches, {} inliers) in {:.2?}",
                    target.display(),
                    good_matches,
                    inliers,
                    elapsed
                );
            }
            FrameOutcome::NotFound(reason) => {
                println!("{}: not found ({}) in {:.2?}", target.display(), reason, elapsed);
            }
        }

        let out = output_path(&cli.output_dir, target);
        result.frame.save(&out)?;
        println!("Saved {}", out.display());
    }

    println!("Overlaid {}/{} targets", overlaid, cli.targets.len());
    Ok(())
}
