//! Command-line interface for blackscan.
//!
//! Parses arguments, wires a Ctrl-C handler to the orchestrator's cancel
//! token, renders batch events to the terminal, and writes requested CSV or
//! JSON exports once the batch finishes.

mod export;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use blackscan_core::{
    check_dependency, collect_video_files, CoreResult, DetectionMode, DetectionSettings,
    QueueRunner, ToolPaths,
};

use crate::report::ConsoleReporter;

#[derive(Parser, Debug)]
#[command(
    name = "blackscan",
    version,
    about = "Finds near-black frames in video files using ffmpeg"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scans video files or directories for black frames
    Scan(ScanArgs),
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Video files or directories to scan (directories are searched recursively)
    #[arg(required = true, value_name = "PATH")]
    inputs: Vec<PathBuf>,

    /// Detection preset
    #[arg(long, value_enum, default_value_t = ModeArg::Standard)]
    mode: ModeArg,

    /// Override the pixel-difference threshold (0-50)
    #[arg(long, value_name = "N")]
    threshold: Option<u8>,

    /// Override the percentage of black pixels required (90.0-100.0)
    #[arg(long, value_name = "PCT")]
    amount: Option<f64>,

    /// Minimum consecutive-frame run length for a reported range
    #[arg(long, value_name = "FRAMES", default_value_t = 1)]
    min_run: usize,

    /// Report individual frames only, skip range grouping
    #[arg(long)]
    no_ranges: bool,

    /// Path to the ffmpeg binary
    #[arg(long, value_name = "PATH", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Path to the ffprobe binary
    #[arg(long, value_name = "PATH", default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// Write per-frame results to a CSV file
    #[arg(long, value_name = "FILE")]
    frames_csv: Option<PathBuf>,

    /// Write per-frame results to a JSON file
    #[arg(long, value_name = "FILE")]
    frames_json: Option<PathBuf>,

    /// Write range results to a CSV file
    #[arg(long, value_name = "FILE")]
    ranges_csv: Option<PathBuf>,

    /// Write range results to a JSON file
    #[arg(long, value_name = "FILE")]
    ranges_json: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ModeArg {
    /// Near-black detection (threshold 32, 98%)
    Standard,
    /// Exact black only (threshold 0, 100%)
    Strict,
}

impl From<ModeArg> for DetectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Standard => DetectionMode::Standard,
            ModeArg::Strict => DetectionMode::Strict,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Scan(args) => run_scan(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", console::style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Runs one scan batch. Per-file failures are reported through events and
/// outcomes, not as errors; only setup problems are fatal.
fn run_scan(args: ScanArgs) -> CoreResult<()> {
    let settings = build_settings(&args)?;
    let tools = ToolPaths {
        ffmpeg: args.ffmpeg.clone(),
        ffprobe: args.ffprobe.clone(),
    };
    check_dependency(&tools.ffmpeg)?;
    check_dependency(&tools.ffprobe)?;

    let files = collect_video_files(&args.inputs)?;

    let mut runner = QueueRunner::new(tools, settings);
    let token = runner.cancel_token();
    if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
        log::warn!("Could not install Ctrl-C handler: {e}");
    }

    let reporter = ConsoleReporter::new();
    runner.run(&files, &reporter);

    let outcomes = runner.outcomes();
    if let Some(path) = &args.frames_csv {
        export::write_frames_csv(path, outcomes)?;
        println!("Wrote frame CSV: {}", path.display());
    }
    if let Some(path) = &args.frames_json {
        export::write_frames_json(path, outcomes)?;
        println!("Wrote frame JSON: {}", path.display());
    }
    if let Some(path) = &args.ranges_csv {
        export::write_ranges_csv(path, outcomes)?;
        println!("Wrote range CSV: {}", path.display());
    }
    if let Some(path) = &args.ranges_json {
        export::write_ranges_json(path, outcomes)?;
        println!("Wrote range JSON: {}", path.display());
    }

    Ok(())
}

/// Resolves the preset mode, then applies individual overrides on top.
fn build_settings(args: &ScanArgs) -> CoreResult<DetectionSettings> {
    let mut settings = DetectionSettings::from_mode(args.mode.into());
    if let Some(threshold) = args.threshold {
        settings.threshold = threshold;
    }
    if let Some(amount) = args.amount {
        settings.amount = amount;
    }
    settings.min_run_frames = args.min_run;
    settings.build_ranges = !args.no_ranges;
    settings.validate()?;
    Ok(settings)
}
