//! streamcanny-bench: CLI tool for running the streaming edge detector on
//! image files and printing diagnostics.
//!
//! Decodes an image, streams it through the edge pipeline one or more
//! times back to back, and reports per-frame edge counts and timings.
//! Useful for:
//!
//! - Comparing the reference and fixed-point gradient estimators
//! - Tuning the low/high thresholds and the weak marker
//! - Checking that the threaded runner keeps up with the sequential one
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin streamcanny-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use log::info;
use streamcanny_pipeline::diagnostics::Clock;
use streamcanny_pipeline::frame::{FrameSink, decode_rgba, frame_to_stream};
use streamcanny_pipeline::{AngleStrategy, EdgeConfig, EdgePipeline, FrameDimensions, Pixel};

/// Streaming Canny edge detection bench.
///
/// Streams an image through the edge pipeline and prints per-frame
/// counts and timings.
#[derive(Parser)]
#[command(name = "streamcanny-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Write the last output frame as a PNG.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Gradient magnitude/angle estimator.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_STRATEGY)]
    angle_strategy: Strategy,

    /// Low threshold: suppressed magnitudes at or above this are weak.
    #[arg(long, default_value_t = EdgeConfig::DEFAULT_LOW_THRESHOLD)]
    low: u8,

    /// High threshold: suppressed magnitudes at or above this are strong.
    #[arg(long, default_value_t = EdgeConfig::DEFAULT_HIGH_THRESHOLD)]
    high: u8,

    /// Marker intensity for weak pixels between threshold and hysteresis.
    #[arg(long, default_value_t = EdgeConfig::DEFAULT_WEAK_VALUE)]
    weak: u8,

    /// Number of times the image is streamed back to back.
    ///
    /// Only the last frame is written with `--output`.
    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    frames: usize,

    /// Run every stage on its own thread.
    ///
    /// Prints a throughput summary; per-frame diagnostics and `--json`
    /// are unavailable in this mode.
    #[arg(long, conflicts_with = "json")]
    threaded: bool,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Full edge config as a JSON string.
    ///
    /// When provided, `--angle-strategy`, `--low`, `--high` and `--weak`
    /// are ignored. The JSON must be a valid `EdgeConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Gradient estimator selection.
#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// Floating-point `hypot` and `atan2`.
    Reference,
    /// Shift-and-add CORDIC.
    FixedPoint,
}

/// Maps an [`AngleStrategy`] to the local CLI [`Strategy`] enum.
const fn strategy_from_pipeline(s: AngleStrategy) -> Strategy {
    match s {
        AngleStrategy::Reference => Strategy::Reference,
        AngleStrategy::FixedPoint => Strategy::FixedPoint,
    }
}

/// The CLI default strategy, derived from
/// [`EdgeConfig::DEFAULT_ANGLE_STRATEGY`] so the two cannot diverge.
const CLI_DEFAULT_STRATEGY: Strategy = strategy_from_pipeline(EdgeConfig::DEFAULT_ANGLE_STRATEGY);

/// Build an [`EdgeConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<EdgeConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(EdgeConfig {
        angle_strategy: match cli.angle_strategy {
            Strategy::Reference => AngleStrategy::Reference,
            Strategy::FixedPoint => AngleStrategy::FixedPoint,
        },
        low_threshold: cli.low,
        high_threshold: cli.high,
        weak_value: cli.weak,
    })
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;

    let image_bytes = std::fs::read(&cli.image_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?;
    let image = decode_rgba(&image_bytes).map_err(|e| format!("Decode error: {e}"))?;
    let dims = FrameDimensions::new(image.width(), image.height());

    eprintln!(
        "Image: {} ({} bytes, {}x{})",
        cli.image_path.display(),
        image_bytes.len(),
        dims.width,
        dims.height,
    );
    eprintln!("Config: {config:#?}");
    eprintln!(
        "Frames: {}{}",
        cli.frames,
        if cli.threaded { " (threaded)" } else { "" }
    );
    eprintln!();

    let mut pipeline =
        EdgePipeline::new(dims, config).map_err(|e| format!("Pipeline error: {e}"))?;
    let stream = (0..cli.frames).flat_map(|_| frame_to_stream(&image));

    let output = if cli.threaded {
        let start = Instant::now();
        let output = pipeline
            .run_threaded(stream)
            .map_err(|e| format!("Pipeline error: {e}"))?;
        print_threaded_summary(&output, dims, start.elapsed());
        output
    } else {
        let (output, diagnostics) = pipeline
            .run_with_diagnostics(stream, &StdClock)
            .map_err(|e| format!("Pipeline error: {e}"))?;
        if cli.json {
            let json = serde_json::to_string_pretty(&diagnostics)
                .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
            println!("{json}");
        } else {
            println!("{}", diagnostics.report());
        }
        output
    };

    if let Some(ref path) = cli.output {
        let mut sink = FrameSink::new(dims).skip_frames(cli.frames - 1);
        sink.extend(output);
        if sink.missing_end_of_row() > 0 {
            eprintln!(
                "Warning: {} rows lacked end-of-row",
                sink.missing_end_of_row()
            );
        }
        let frame = sink
            .finish()
            .map_err(|e| format!("Output error: {e}"))?
            .pop()
            .ok_or_else(|| "Output error: no complete frame".to_string())?;
        frame
            .save(path)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        info!("wrote {}x{} edge frame", frame.width(), frame.height());
        eprintln!("Edges written to {}", path.display());
    }

    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print throughput for a threaded run, which collects no per-frame counts.
#[allow(clippy::cast_precision_loss)]
fn print_threaded_summary(output: &[Pixel], dims: FrameDimensions, elapsed: Duration) {
    let edges = output
        .iter()
        .filter(|p| p.intensity() == streamcanny_pipeline::STRONG)
        .count();
    let ms = elapsed.as_secs_f64() * 1000.0;
    let per_pixel = if output.is_empty() {
        0.0
    } else {
        elapsed.as_secs_f64() * 1e9 / output.len() as f64
    };
    println!("Threaded Run Summary\n{}", "=".repeat(60));
    println!(
        "Frame: {}x{}  |  Pixels: {}  |  Edge pixels: {edges}",
        dims.width,
        dims.height,
        output.len(),
    );
    println!("Duration: {ms:.3}ms ({per_pixel:.1}ns per pixel)");
}
