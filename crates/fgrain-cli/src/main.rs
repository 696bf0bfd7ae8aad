//! fgrain - film-grain synthesis for float image sequences
//!
//! Reads PFM frames or numbered PFM sequences, renders stochastic film grain
//! through the frame server and writes the result as PFM.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod pfm;
mod sequence;

/// Filter used when neither `-v` nor `RUST_LOG` is given.
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Parser)]
#[command(name = "fgrain")]
#[command(author, version, about = "Film-grain synthesis for float image sequences")]
#[command(long_about = "
Renders physically based film grain (Boolean model of random discs,
Monte Carlo coverage) onto 32-bit float PFM frames.

Examples:
  fgrain add plate.pfm -o grain.pfm                    # Single frame, defaults
  fgrain add shot.####.pfm -o out.####.pfm --start 1 --end 48
  fgrain add in.%04d.pfm -o out.%04d.pfm --radius-mean 0.12 --sigma 0.6
  fgrain add plate.pfm -o grain.pfm --config grain.yaml --seed 7
  fgrain blank -o gray.pfm --width 64 --height 64 --value 0.5
  fgrain backends
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Add film grain to a frame or numbered sequence
    #[command(visible_alias = "a")]
    Add(AddArgs),

    /// Write constant-valued test frames
    Blank(BlankArgs),

    /// List compute backends
    Backends,
}

/// Arguments for the `add` command.
#[derive(Args)]
struct AddArgs {
    /// Input PFM file or sequence pattern (#### or %04d)
    input: String,

    /// Output PFM file or sequence pattern
    #[arg(short, long)]
    output: String,

    /// First frame number of a sequence (default: first file found)
    #[arg(long)]
    start: Option<i32>,

    /// Last frame number of a sequence (default: last file found)
    #[arg(long)]
    end: Option<i32>,

    /// Monte Carlo trials per pixel [default: 800]
    #[arg(short = 'n', long = "iterations")]
    iterations: Option<i64>,

    /// Mean grain radius in pixels [default: 0.1]
    #[arg(long)]
    radius_mean: Option<f64>,

    /// Grain radius standard deviation [default: 0.0]
    #[arg(long)]
    radius_std: Option<f64>,

    /// Gaussian filter sigma in pixels [default: 0.8]
    #[arg(short, long)]
    sigma: Option<f64>,

    /// Random seed [default: 114514]
    #[arg(long, allow_negative_numbers = true)]
    seed: Option<i64>,

    /// Vary the grain pattern with each file's frame number
    #[arg(long)]
    per_frame_seed: bool,

    /// Clamp output to [0, 1] instead of preserving out-of-range values
    #[arg(long)]
    clamp: bool,

    /// YAML grain configuration; command-line values take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Compute backend: auto, cpu, scalar
    #[arg(short, long, default_value = "auto")]
    backend: String,
}

/// Arguments for the `blank` command.
#[derive(Args)]
struct BlankArgs {
    /// Output PFM file or sequence pattern
    #[arg(short, long)]
    output: String,

    /// Frame width
    #[arg(long)]
    width: u32,

    /// Frame height
    #[arg(long)]
    height: u32,

    /// Sample value
    #[arg(long, default_value = "0.5", allow_negative_numbers = true)]
    value: f32,

    /// Write three-channel (RGB) frames
    #[arg(long)]
    rgb: bool,

    /// Number of frames (sequence patterns only)
    #[arg(long, default_value = "1")]
    frames: usize,

    /// First frame number (sequence patterns only)
    #[arg(long, default_value = "1")]
    start: i32,
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let filter = tracing_subscriber::EnvFilter::try_new(&filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Add(args) => commands::add::run(args, cli.verbose),
        Commands::Blank(args) => commands::blank::run(args, cli.verbose),
        Commands::Backends => commands::backends::run(),
    }
}
