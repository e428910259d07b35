use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use toonreel::{
    AlignmentTransform, AssembleRequest, Assembler, AssetLibrary, Progress,
    RenderConfig, SceneRenderer, SceneRequest, load_raster, locate_markers, parse_line,
};

#[derive(Parser, Debug)]
#[command(name = "toonreel", version)]
struct Cli {
    /// JSON render configuration; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one script line to `<out>/scene_<index>.mp4` (requires `ffmpeg` on PATH).
    Scene(SceneArgs),
    /// Concatenate segments into a final cartoon (requires `ffmpeg` and `ffprobe`).
    Assemble(AssembleArgs),
    /// Print the alignment markers and derived transform of a motion frame.
    Markers(MarkersArgs),
    /// Render a single composited frame of a line as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct LineArgs {
    /// Asset library root (`character/direction/action/`, `character/mouths/`).
    #[arg(long)]
    assets: PathBuf,

    /// Script line, e.g. `Bob[angry|left]: hello there`.
    #[arg(long)]
    line: String,

    /// Dialogue audio for the line.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Scene length in seconds (overrides the line and the audio length).
    #[arg(long)]
    duration: Option<f64>,
}

#[derive(Parser, Debug)]
struct SceneArgs {
    #[command(flatten)]
    line: LineArgs,

    /// Scene index used in the output file name.
    #[arg(long)]
    index: usize,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct AssembleArgs {
    /// Output directory.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value = "cartoon")]
    prefix: String,

    /// Opening clip to prepend.
    #[arg(long)]
    opening: Option<PathBuf>,

    /// Background music mixed under the dialogue.
    #[arg(long)]
    background: Option<PathBuf>,

    /// Segment files in playback order.
    #[arg(required = true)]
    segments: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
struct MarkersArgs {
    /// Motion frame image.
    image: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    line: LineArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    png: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    match cli.cmd {
        Command::Scene(args) => cmd_scene(cfg, args),
        Command::Assemble(args) => cmd_assemble(cfg, args),
        Command::Markers(args) => cmd_markers(&cfg, args),
        Command::Frame(args) => cmd_frame(cfg, args),
    }
}

fn cmd_scene(cfg: RenderConfig, args: SceneArgs) -> anyhow::Result<()> {
    let line = parse_line(&args.line.line)?;
    let renderer = SceneRenderer::new(cfg, AssetLibrary::open(&args.line.assets)?, &args.out)?;
    let segment = renderer.render(
        &SceneRequest {
            index: args.index,
            line: &line,
            audio: args.line.audio.as_deref(),
            duration_secs: args.line.duration,
        },
        &mut log_progress,
    )?;
    println!("{}", segment.path.display());
    Ok(())
}

fn cmd_assemble(cfg: RenderConfig, args: AssembleArgs) -> anyhow::Result<()> {
    let assembler = Assembler::new(cfg)?;
    let cartoon = assembler.assemble(
        &AssembleRequest {
            segments: args.segments,
            opening: args.opening,
            background: args.background,
            output_dir: args.out,
            prefix: args.prefix,
        },
        &mut log_progress,
    )?;
    println!("{}", cartoon.path.display());
    Ok(())
}

fn cmd_markers(cfg: &RenderConfig, args: MarkersArgs) -> anyhow::Result<()> {
    let raster = load_raster(&args.image)?;
    let markers = locate_markers(&raster.image, &cfg.markers, &raster.label)?;
    let transform = AlignmentTransform::derive(&markers, cfg.reference_distance, &raster.label)?;
    println!(
        "left=({}, {}) right=({}, {})",
        markers.left.x, markers.left.y, markers.right.x, markers.right.y
    );
    println!("{}", serde_json::to_string_pretty(&transform)?);
    Ok(())
}

fn cmd_frame(cfg: RenderConfig, args: FrameArgs) -> anyhow::Result<()> {
    let line = parse_line(&args.line.line)?;
    let renderer = SceneRenderer::new(
        cfg,
        AssetLibrary::open(&args.line.assets)?,
        std::env::temp_dir(),
    )?;
    let prepared = renderer.prepare(&SceneRequest {
        index: 0,
        line: &line,
        audio: args.line.audio.as_deref(),
        duration_secs: args.line.duration,
    })?;

    let k = usize::try_from(args.frame).context("frame index out of range")?;
    let (Some(&motion), Some(&mouth)) = (prepared.schedule.get(k), prepared.mouths.get(k)) else {
        anyhow::bail!(
            "frame {} is outside the scene ({} frames)",
            args.frame,
            prepared.total_frames()
        );
    };
    let mut worker = prepared.compositor.worker();
    let frame = prepared.compositor.compose(&mut worker, motion, mouth)?;

    write_png(&args.png, &frame.to_straight_image()?)?;
    eprintln!("wrote {}", args.png.display());
    Ok(())
}

fn write_png(path: &Path, img: &image::RgbaImage) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))
}

fn log_progress(p: Progress) {
    match p {
        Progress::FrameComposited { done, total } if done == total || done % 48 == 0 => {
            tracing::info!(done, total, "compositing");
        }
        Progress::FrameComposited { .. } => {}
        Progress::SegmentWritten { index, path } => {
            tracing::info!(index, path = %path.display(), "segment written");
        }
        Progress::BatchWritten { batch, total } => tracing::info!(batch, total, "batch written"),
        Progress::CartoonWritten { path } => {
            tracing::info!(path = %path.display(), "cartoon written");
        }
    }
}
