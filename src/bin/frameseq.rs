use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "frameseq", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print canvas size, loop count and the frame table.
    Info(InfoArgs),
    /// Print every chunk with its offset and length.
    Chunks(InfoArgs),
    /// Composite each frame once and write it as a PNG.
    Dump(DumpArgs),
    /// Play the animation on a real player and log events.
    Play(PlayArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input animation (APNG, WebP or GIF).
    input: PathBuf,

    /// Emit JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Skip chunk checksum verification.
    #[arg(long)]
    no_crc: bool,
}

#[derive(Parser, Debug)]
struct DumpArgs {
    /// Input animation.
    input: PathBuf,

    /// Output directory; files are named `frame_0000.png`, ...
    #[arg(long)]
    out: PathBuf,

    /// Power-of-two downscale factor.
    #[arg(long, default_value_t = 1)]
    sample: u32,

    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<usize>,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Input animation.
    input: PathBuf,

    /// Wall-clock seconds to play before stopping.
    #[arg(long, default_value_t = 3.0)]
    seconds: f64,

    /// Loop-limit override (0 = forever).
    #[arg(long)]
    loops: Option<u32>,

    /// Target size as `WIDTHxHEIGHT`; picks a downscale factor.
    #[arg(long)]
    size: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Chunks(args) => cmd_chunks(args),
        Command::Dump(args) => cmd_dump(args),
        Command::Play(args) => cmd_play(args),
    }
}

fn open_reader(
    path: &Path,
) -> anyhow::Result<frameseq::BinaryReader<Box<dyn frameseq::SeekableStream>>> {
    use frameseq::ByteSource as _;

    let stream = frameseq::FileSource::new(path)
        .open()
        .with_context(|| format!("open '{}'", path.display()))?;
    Ok(frameseq::BinaryReader::new(
        stream,
        frameseq::ByteOrder::BigEndian,
    )?)
}

fn parse(path: &Path, verify_crc: bool) -> anyhow::Result<frameseq::ParsedContainer> {
    let mut reader = open_reader(path)?;
    let parsed = frameseq::parse_container(&mut reader, frameseq::ParseOpts { verify_crc })
        .with_context(|| format!("parse '{}'", path.display()))?;
    Ok(parsed)
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let info = parse(&args.input, !args.no_crc)?.info;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("format:     {}", info.format.name());
    println!("animated:   {}", info.animated);
    println!(
        "canvas:     {}x{}",
        info.viewport.width, info.viewport.height
    );
    println!("loop_count: {}", info.loop_count);
    println!("has_alpha:  {}", info.has_alpha);
    if let Some(bg) = info.background {
        println!("background: #{:02x}{:02x}{:02x}{:02x}", bg.r, bg.g, bg.b, bg.a);
    }
    println!(
        "frames:     {} ({} ms per loop)",
        info.frame_count(),
        info.total_duration_ms()
    );
    for f in &info.frames {
        println!(
            "  #{:<4} {:>5},{:<5} {:>5}x{:<5} {:>6} ms  dispose={:?} blend={:?}",
            f.index, f.x, f.y, f.width, f.height, f.duration_ms, f.disposal, f.blend
        );
    }
    Ok(())
}

fn cmd_chunks(args: InfoArgs) -> anyhow::Result<()> {
    let headers = parse(&args.input, !args.no_crc)?.chunks.headers();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&headers)?);
        return Ok(());
    }
    println!("{:>10}  {:<6} {:>10}", "offset", "tag", "length");
    for h in &headers {
        println!("{:>10}  {:<6} {:>10}", h.offset, h.tag.to_string(), h.length);
    }
    Ok(())
}

fn cmd_dump(args: DumpArgs) -> anyhow::Result<()> {
    if !args.sample.is_power_of_two() {
        anyhow::bail!("--sample must be a power of two, got {}", args.sample);
    }
    let mut reader = open_reader(&args.input)?;
    let info = frameseq::parse_animation(&mut reader, frameseq::ParseOpts::default())
        .with_context(|| format!("parse '{}'", args.input.display()))?;
    let count = args.frames.unwrap_or(usize::MAX).min(info.frame_count());

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;

    let pool = frameseq::BufferPool::default();
    let mut raster = frameseq::ImageRasterDecoder::new();
    let mut compositor = frameseq::Compositor::new(Arc::new(info), args.sample);
    for index in 0..count {
        let started = Instant::now();
        let frame = match compositor.render(index, &mut reader, &mut raster, &pool) {
            Ok(frame) => frame,
            Err(err) if !err.is_fatal() => {
                tracing::warn!(frame = index, %err, "frame skipped");
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        let path = args.out.join(format!("frame_{index:04}.png"));
        image::save_buffer_with_format(
            &path,
            &frame.to_straight_rgba(),
            frame.width(),
            frame.height(),
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        tracing::debug!(
            frame = index,
            cost_us = started.elapsed().as_micros() as u64,
            "frame written"
        );
    }
    eprintln!("wrote {count} frames to {}", args.out.display());
    Ok(())
}

fn parse_size(s: &str) -> anyhow::Result<(u32, u32)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .with_context(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    Ok((
        w.trim().parse().context("width")?,
        h.trim().parse().context("height")?,
    ))
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let run_for = Duration::try_from_secs_f64(args.seconds)
        .with_context(|| format!("--seconds {} is not a usable duration", args.seconds))?;
    let player = frameseq::Player::with_options(
        Arc::new(frameseq::FileSource::new(&args.input)),
        Box::new(frameseq::ImageRasterDecoder::new()),
        frameseq::PlayerOpts {
            loop_limit: args.loops,
            ..frameseq::PlayerOpts::default()
        },
    )?;

    let viewport = player.viewport();
    if viewport.is_empty() {
        anyhow::bail!("'{}' is not a playable animation", args.input.display());
    }
    if let Some(size) = &args.size {
        let (w, h) = parse_size(size)?;
        player.set_desired_size(w, h);
    }

    let (listener, events) = frameseq::ChannelListener::new(false);
    player.add_listener(Arc::new(listener));
    player.start();

    let deadline = Instant::now()
        .checked_add(run_for)
        .context("--seconds is too large")?;
    let mut rendered = 0usize;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            player.stop();
            break;
        }
        match events.recv_timeout(left) {
            Ok(frameseq::PlaybackEvent::Started) => tracing::info!(
                width = viewport.width,
                height = viewport.height,
                frames = player.frame_count(),
                "started"
            ),
            Ok(frameseq::PlaybackEvent::Rendered { index, .. }) => {
                rendered += 1;
                tracing::debug!(frame = index, "rendered");
            }
            Ok(frameseq::PlaybackEvent::Ended) => break,
            Err(_) => {}
        }
    }
    eprintln!(
        "rendered {rendered} frames at sample {} ({} bytes held)",
        player.sample_size(),
        player.memory_footprint()
    );
    Ok(())
}
