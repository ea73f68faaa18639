use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "framecut", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a source file's duration, tracks and orientation as JSON.
    Probe(ProbeArgs),
    /// List the available filter names.
    Filters,
    /// Render a single output frame as a PNG.
    Frame(FrameArgs),
    /// Export an edit to MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Media file to inspect.
    path: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input edit JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output-timeline position in seconds.
    #[arg(long, default_value_t = 0.0)]
    at: f64,

    /// Output frame rate used to snap `--at` to a frame. Defaults to the source rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input edit JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long, conflicts_with = "out_dir")]
    out: Option<PathBuf>,

    /// Directory receiving an auto-named output.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Overwrite output if it already exists instead of picking a suffixed name.
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Output frame rate. Defaults to the source rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Frames processed per batch.
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Disable audio mixing for this render.
    #[arg(long, default_value_t = false)]
    no_audio: bool,

    /// Cancel the export if it runs longer than this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("framecut=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Probe(args) => cmd_probe(args),
        Command::Filters => {
            for name in framecut::FILTER_NAMES {
                println!("{name}");
            }
            Ok(())
        }
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn base_dir(in_path: &Path) -> &Path {
    in_path.parent().unwrap_or_else(|| Path::new("."))
}

fn load_session(in_path: &Path) -> anyhow::Result<framecut::EditSession> {
    let edit = framecut::EditFile::from_path(in_path)?;
    let session = edit
        .into_session(base_dir(in_path))
        .with_context(|| format!("apply edits from '{}'", in_path.display()))?;
    Ok(session)
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let session = framecut::EditSession::open(&args.path)?;
    let report = serde_json::json!({
        "asset": session.asset().as_ref(),
        "duration_secs": session.asset().duration.as_secs_f64(),
        "orientation": session.orientation(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let session = load_session(&args.in_path)?;
    let plan = session.plan()?;
    let fps = match args.fps {
        Some(n) => framecut::Fps::new(n, 1)?,
        None => session.asset().nominal_fps.unwrap_or_default(),
    };
    let at = framecut::RationalTime::from_secs_f64(args.at, i64::from(fps.num.max(1)))?;
    let frame = framecut::render_preview_frame(&plan, &framecut::FfmpegDecoder, at, fps)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let session = load_session(&args.in_path)?;
    let plan = session.plan()?;

    let mut opts = framecut::ExportOpts::default()
        .with_env_overrides()
        .with_source_fps(session.asset());
    opts.overwrite = args.overwrite;
    opts.enable_audio = !args.no_audio;
    if let Some(fps) = args.fps {
        opts.fps = framecut::Fps::new(fps, 1)?;
    }
    if let Some(threads) = args.threads {
        opts.threads = Some(threads);
    }
    if let Some(chunk) = args.chunk_size {
        opts.chunk_size = chunk;
    }

    let coordinator = framecut::ExportCoordinator::new();
    let task = match (args.out, args.out_dir) {
        (Some(out), _) => coordinator.export(&plan, out, opts)?,
        (None, Some(dir)) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create output dir '{}'", dir.display()))?;
            coordinator.export_to_dir(&plan, &dir, opts)?
        }
        (None, None) => anyhow::bail!("one of --out or --out-dir is required"),
    };

    let result = match args.timeout_secs {
        Some(secs) => task.wait_timeout(Duration::from_secs(secs))?,
        None => task.wait(),
    };
    match result {
        framecut::ExportResult::Completed { output } => {
            eprintln!("wrote {}", output.display());
            Ok(())
        }
        framecut::ExportResult::Failed { kind, message } => {
            anyhow::bail!("export failed ({kind:?}): {message}")
        }
        framecut::ExportResult::Cancelled => anyhow::bail!("export cancelled"),
    }
}
