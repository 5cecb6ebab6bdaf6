use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use seqcache::{
    DecoderRegistry, FileSequence, FrameIndex, FrameRange, PixelCache, Reader, ReaderOpts,
    SequenceSource,
};

#[derive(Parser, Debug)]
#[command(name = "seqcache", version)]
struct Cli {
    /// Reader options JSON.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log decode and cache activity to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the sequence's frame range and the header of one frame as JSON.
    Probe(ProbeArgs),
    /// Write the preview of the first frame as a PNG.
    Preview(PreviewArgs),
    /// Write one full frame as a PNG.
    Frame(FrameArgs),
}

#[derive(Args, Debug)]
struct SequenceArgs {
    /// Sequence pattern, e.g. `shots/plate.####.png` or `plate.%04d.png`.
    #[arg(long)]
    pattern: String,

    /// First frame of an explicit range (requires `--last`).
    #[arg(long, requires = "last", conflicts_with = "scan")]
    first: Option<u64>,

    /// Last frame of an explicit range (requires `--first`).
    #[arg(long, requires = "first", conflicts_with = "scan")]
    last: Option<u64>,

    /// Discover frames by listing the pattern's directory (default without a range).
    #[arg(long)]
    scan: bool,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    #[command(flatten)]
    seq: SequenceArgs,

    /// Frame whose header is decoded (defaults to the first frame).
    #[arg(long)]
    frame: Option<u64>,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    seq: SequenceArgs,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Override the preview width bound.
    #[arg(long)]
    max_width: Option<u32>,

    /// Override the preview height bound.
    #[arg(long)]
    max_height: Option<u32>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    seq: SequenceArgs,

    /// Frame to render; missing frames resolve to the nearest one.
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Override render worker threads.
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let opts = match &cli.config {
        Some(path) => ReaderOpts::from_path(path)?,
        None => ReaderOpts::default(),
    };
    match cli.cmd {
        Command::Probe(args) => cmd_probe(args, opts),
        Command::Preview(args) => cmd_preview(args, opts),
        Command::Frame(args) => cmd_frame(args, opts),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn open_sequence(args: &SequenceArgs) -> anyhow::Result<Arc<dyn SequenceSource>> {
    let seq = match (args.scan, args.first, args.last) {
        (false, Some(first), Some(last)) => {
            let range = FrameRange::new(FrameIndex(first), FrameIndex(last))?;
            FileSequence::from_range(&args.pattern, range)?
        }
        _ => FileSequence::scan(&args.pattern)?,
    };
    if seq.frame_count() == 0 {
        anyhow::bail!("no frames found for pattern '{}'", args.pattern);
    }
    Ok(Arc::new(seq))
}

fn open_reader(args: &SequenceArgs, opts: ReaderOpts) -> anyhow::Result<Reader> {
    let seq = open_sequence(args)?;
    let pixels = Arc::new(PixelCache::new(opts.pixel_cache_bytes()));
    let registry = DecoderRegistry::with_builtin_decoders_in(pixels);
    Ok(Reader::new(seq, registry, opts)?)
}

fn cmd_probe(args: ProbeArgs, opts: ReaderOpts) -> anyhow::Result<()> {
    let reader = open_reader(&args.seq, opts)?;
    let time = match args.frame {
        Some(f) => FrameIndex(f),
        None => reader
            .first_frame()
            .context("sequence has no frames")?,
    };
    let key = reader.resolve(time)?;
    let descriptor = reader.descriptor(time)?;

    let report = serde_json::json!({
        "pattern": args.seq.pattern,
        "frame_range": reader.sequence().frame_range(),
        "frame_count": reader.sequence().frame_count(),
        "frame": reader.nearest_frame(time),
        "key": key.as_str(),
        "data_window": descriptor.data_window(),
        "channels": descriptor.channels(),
        "cache": reader.cache_stats(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_preview(args: PreviewArgs, mut opts: ReaderOpts) -> anyhow::Result<()> {
    if let Some(w) = args.max_width {
        opts.preview_max_width = w;
    }
    if let Some(h) = args.max_height {
        opts.preview_max_height = h;
    }
    let reader = Arc::new(open_reader(&args.seq, opts)?);

    let sink: Arc<dyn seqcache::PreviewSink> = Arc::new(|img: &seqcache::PreviewImage| {
        tracing::debug!(width = img.width(), height = img.height(), "preview ready");
    });
    let outcome = reader.show_file_preview(sink)?.join();
    if let seqcache::PreviewOutcome::Failed(e) = outcome {
        return Err(e.into());
    }
    let img = reader
        .preview()
        .context("preview task finished without an image")?;

    write_png(&args.out, &img)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_frame(args: FrameArgs, mut opts: ReaderOpts) -> anyhow::Result<()> {
    if args.threads.is_some() {
        opts.render_threads = args.threads;
    }
    let reader = open_reader(&args.seq, opts)?;
    let frame = reader.render_frame(FrameIndex(args.frame))?;
    let img = frame.to_display_rgba8();

    write_png(&args.out, &img)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn write_png(out: &Path, img: &image::RgbaImage) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    img.save_with_format(out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", out.display()))
}
