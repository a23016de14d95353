use anyhow::{bail, Context};
use clap::{ArgAction, Args, Parser, Subcommand};
use indicatif::ProgressBar;
use log::LevelFilter;
use psgpack::{Clock, DisassembleOptions, Disassembler};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Parser, Debug)]
#[command(version, about = "Compress, decompress and inspect SMS PSG music data")]
struct Arguments {
    /// Log more details, repeat for even more
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compress a PSG file. Input that is already compressed gets expanded first
    Compress {
        #[command(flatten)]
        io: IoArgs,

        /// Decompress the result again and make sure it matches the input
        #[arg(long)]
        verify: bool,
    },

    /// Expand every back-reference in a compressed PSG file
    Decompress {
        #[command(flatten)]
        io: IoArgs,
    },

    /// Print a readable listing of the commands in a PSG file
    Debug {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        args: DebugArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct IoArgs {
    /// The PSG file to read, or "-" for standard input
    #[arg(default_value = "-")]
    input: PathBuf,

    /// The file to write, or "-" for standard output
    #[arg(default_value = "-")]
    output: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct DebugArgs {
    /// Print the offset of every command
    #[arg(short = 'a', long)]
    offsets: bool,

    /// Print the raw bytes of every command
    #[arg(short, long)]
    bytes: bool,

    /// Print a marker for every frame instead of a single wait line
    #[arg(short, long)]
    frames: bool,

    /// Enable offsets, bytes and frame markers
    #[arg(long)]
    all: bool,

    /// Compute tone frequencies with the PAL clock
    #[arg(long)]
    pal: bool,

    /// A TOML file with default listing options. Flags are applied on top
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();

    let level = match (args.quiet, args.verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    colog::default_builder().filter_level(level).init();

    match &args.command {
        Commands::Compress { io, verify } => compress(io, *verify),
        Commands::Decompress { io } => decompress(io),
        Commands::Debug { io, args } => debug(io, args),
    }
}

fn compress(io: &IoArgs, verify: bool) -> anyhow::Result<()> {
    let src = read_input(&io.input)?;

    let expanded = psgpack::decompress(&src).with_context(|| "Failed to expand input")?;
    if expanded.len() != src.len() {
        log::info!(
            "Input was already compressed, expanded {} to {} bytes",
            src.len(),
            expanded.len()
        );
    }
    log::info!(
        "Loaded {} bytes with CRC: {:#010x}",
        expanded.len(),
        crc32fast::hash(&expanded)
    );

    // the spinner would garble the per-pass log lines
    let progress = if log::log_enabled!(log::Level::Debug) {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    progress.set_message("Compressing...");
    progress.enable_steady_tick(Duration::from_millis(100));

    let compressed = psgpack::compress(&expanded);

    progress.finish_and_clear();

    let ratio = if expanded.is_empty() {
        100.0
    } else {
        compressed.len() as f64 * 100.0 / expanded.len() as f64
    };
    log::info!(
        "Compressed {} to {} bytes ({:.1}%)",
        expanded.len(),
        compressed.len(),
        ratio
    );

    if verify {
        let roundtrip = psgpack::decompress(&compressed)
            .with_context(|| "Failed to decompress the compressed output")?;

        let expected = crc32fast::hash(&expanded);
        let found = crc32fast::hash(&roundtrip);
        if expected != found || roundtrip.len() != expanded.len() {
            bail!("Verification failed: expected CRC {expected:#010x}, got {found:#010x}");
        }

        log::info!("Verified output with CRC: {:#010x}", found);
    }

    write_output(&io.output, &compressed)
}

fn decompress(io: &IoArgs) -> anyhow::Result<()> {
    let src = read_input(&io.input)?;

    let expanded = psgpack::decompress(&src).with_context(|| "Failed to decompress input")?;
    log::info!(
        "Decompressed {} to {} bytes with CRC: {:#010x}",
        src.len(),
        expanded.len(),
        crc32fast::hash(&expanded)
    );

    write_output(&io.output, &expanded)
}

fn debug(io: &IoArgs, args: &DebugArgs) -> anyhow::Result<()> {
    let mut options = match &args.config {
        Some(path) => {
            let config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            DisassembleOptions::parse(&config)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => DisassembleOptions::default(),
    };

    options.show_offset |= args.offsets || args.all;
    options.show_bytes |= args.bytes || args.all;
    options.show_frame_markers |= args.frames || args.all;
    if args.pal {
        options.clock = Clock::Pal;
    }

    let src = read_input(&io.input)?;

    let mut dst = open_output(&io.output)?;
    Disassembler::new(&src, options)
        .write_to(&mut dst)
        .with_context(|| "Failed to disassemble input")?;
    dst.flush().with_context(|| "Failed to write output")?;

    Ok(())
}

fn is_stdio(path: &Path) -> bool {
    path == Path::new("-")
}

/// Input is always read completely, so it may be the same file as the output.
fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if is_stdio(path) {
        let mut data = Vec::new();
        io::stdin()
            .read_to_end(&mut data)
            .with_context(|| "Failed to read from standard input")?;
        Ok(data)
    } else {
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

fn open_output(path: &Path) -> anyhow::Result<Box<dyn Write>> {
    if is_stdio(path) {
        Ok(Box::new(io::stdout().lock()))
    } else {
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

fn write_output(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let mut dst = open_output(path)?;
    dst.write_all(data)
        .and_then(|_| dst.flush())
        .with_context(|| "Failed to write output")
}
