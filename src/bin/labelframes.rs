use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use labelframes::{
    CaptureFailurePolicy, DatasetId, DirectoryCommitter, ExtractionConfig, ExtractionRequest,
    ExtractionSession, FfmpegLogLevel, FfmpegSource, FrameScale, ImageEncoding, Interval,
    OverlapPolicy, ProgressCallback, ProgressInfo, VideoSource, validate_request,
};
use serde_json::{Value, json};

const CLI_AFTER_HELP: &str = "Examples:\n  labelframes analyze clip.mp4 --interval 0..5=walk --interval 4..8=run\n  labelframes analyze --duration 60 --intervals-file labels.json --json\n  labelframes extract clip.mp4 --fps 2 --interval 0:10..0:25=cat --dataset pets --out datasets --progress\n  labelframes completions zsh > _labelframes";

#[derive(Debug, Parser)]
#[command(
    name = "labelframes",
    version,
    about = "Extract labeled still frames from video intervals",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output (RUST_LOG overrides).
    #[arg(long, global = true)]
    verbose: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Parser, Clone, Default)]
struct IntervalArgs {
    /// Labeled interval as START..END=LABEL (seconds or [hh:]mm:ss[.f]). Repeatable.
    #[arg(long = "interval", value_name = "START..END=LABEL")]
    intervals: Vec<String>,

    /// JSON file with an array of {"start", "end", "label"} objects ("class" is accepted for "label").
    #[arg(long)]
    intervals_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Report overlaps, coverage gaps, and the sample estimate.
    #[command(
        about = "Analyze labeled intervals",
        after_help = "Examples:\n  labelframes analyze clip.mp4 --interval 2..4=cat\n  labelframes analyze --duration 10 --interval 2..4=cat --fps 2 --json"
    )]
    Analyze {
        /// Input video; its duration is used for gap computation.
        input: Option<PathBuf>,

        #[command(flatten)]
        intervals: IntervalArgs,

        /// Video duration, instead of reading it from an input file.
        #[arg(long)]
        duration: Option<String>,

        /// Sampling rate used for the estimate.
        #[arg(long, default_value_t = 1.0)]
        fps: f64,

        /// Output the analysis as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Sample frames from each interval and file them into a dataset.
    #[command(
        about = "Extract labeled frames into a dataset",
        after_help = "Examples:\n  labelframes extract clip.mp4 --fps 2 --interval 0..5=walk --dataset gait --out datasets\n  labelframes extract clip.mp4 --fps 1 --intervals-file labels.json --dataset gait --out datasets --format png --scale full"
    )]
    Extract {
        /// Input video path.
        input: PathBuf,

        #[command(flatten)]
        intervals: IntervalArgs,

        /// Samples per second of interval time.
        #[arg(long)]
        fps: f64,

        /// Dataset name; frames go to OUT/DATASET/LABEL/.
        #[arg(long)]
        dataset: String,

        /// Storage root directory.
        #[arg(long)]
        out: PathBuf,

        /// Downscaling: half, full, an integer divisor, or max:N.
        #[arg(long, default_value = "half")]
        scale: String,

        /// Output image format: jpg | png.
        #[arg(long, default_value = "jpg")]
        format: String,

        /// JPEG quality (1-100).
        #[arg(long, default_value_t = labelframes::DEFAULT_JPEG_QUALITY)]
        quality: u8,

        /// Seconds to wait for each seek to settle.
        #[arg(long, default_value = "10")]
        seek_timeout: String,

        /// Skip samples that fail to capture instead of aborting the run.
        #[arg(long)]
        skip_failures: bool,

        /// Treat overlapping intervals as an error.
        #[arg(long)]
        reject_overlaps: bool,

        /// Treat zero-length intervals as an error.
        #[arg(long)]
        reject_zero_length: bool,

        /// Show a progress bar.
        #[arg(long)]
        progress: bool,

        /// Print the commit receipt as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn parse_timecode(value: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(format!("time value must be a non-negative number: {trimmed}").into());
        }
        return Duration::try_from_secs_f64(seconds)
            .map_err(|error| format!("time value out of range: {trimmed} ({error})").into());
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(format!("invalid time format: {trimmed}").into());
    }

    let (hours, minutes, seconds_str) = if parts.len() == 3 {
        (parts[0].parse::<u64>()?, parts[1].parse::<u64>()?, parts[2])
    } else {
        (0_u64, parts[0].parse::<u64>()?, parts[1])
    };

    let seconds = seconds_str.parse::<f64>()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("invalid seconds in time value: {trimmed}").into());
    }
    let total_seconds = (hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds;
    Duration::try_from_secs_f64(total_seconds)
        .map_err(|error| format!("time value out of range: {trimmed} ({error})").into())
}

/// Parse `START..END=LABEL`.
fn parse_interval(value: &str) -> Result<Interval, Box<dyn std::error::Error>> {
    let (range, label) = value
        .split_once('=')
        .ok_or_else(|| format!("interval must look like START..END=LABEL: {value}"))?;
    let (start, end) = range
        .split_once("..")
        .ok_or_else(|| format!("interval range must look like START..END: {range}"))?;

    Ok(Interval::new(
        parse_timecode(start)?.as_secs_f64(),
        parse_timecode(end)?.as_secs_f64(),
        label.trim(),
    ))
}

fn json_time(entry: &Value, key: &str, index: usize) -> Result<f64, Box<dyn std::error::Error>> {
    match entry.get(key) {
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| format!("entry {index}: {key} is not a number").into()),
        Some(Value::String(text)) => Ok(parse_timecode(text)?.as_secs_f64()),
        _ => Err(format!("entry {index}: missing {key}").into()),
    }
}

/// Parse an interval file: a JSON array of `{start, end, label | class}`.
fn parse_interval_file(contents: &str) -> Result<Vec<Interval>, Box<dyn std::error::Error>> {
    let document: Value = serde_json::from_str(contents)?;
    let entries = document
        .as_array()
        .ok_or("interval file must contain a JSON array")?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| -> Result<Interval, Box<dyn std::error::Error>> {
            let label = entry
                .get("label")
                .or_else(|| entry.get("class"))
                .and_then(Value::as_str)
                .ok_or_else(|| format!("entry {index}: missing label"))?;
            Ok(Interval::new(
                json_time(entry, "start", index)?,
                json_time(entry, "end", index)?,
                label,
            ))
        })
        .collect()
}

fn collect_intervals(args: &IntervalArgs) -> Result<Vec<Interval>, Box<dyn std::error::Error>> {
    let mut intervals = Vec::new();
    if let Some(path) = &args.intervals_file {
        let contents = fs::read_to_string(path)
            .map_err(|error| format!("failed to read {}: {error}", path.display()))?;
        intervals.extend(parse_interval_file(&contents)?);
    }
    for value in &args.intervals {
        intervals.push(parse_interval(value)?);
    }
    Ok(intervals)
}

fn parse_scale(value: &str) -> Option<FrameScale> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "half" => Some(FrameScale::Half),
        "full" | "original" | "1" => Some(FrameScale::Original),
        _ => {
            if let Some(limit) = value.strip_prefix("max:") {
                limit.parse().ok().map(FrameScale::MaxDimension)
            } else {
                value
                    .parse::<u32>()
                    .ok()
                    .filter(|divisor| *divisor > 0)
                    .map(FrameScale::Divisor)
            }
        }
    }
}

fn parse_encoding(value: &str, quality: u8) -> Option<ImageEncoding> {
    match value.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some(ImageEncoding::Jpeg { quality }),
        "png" => Some(ImageEncoding::Png),
        _ => None,
    }
}

fn init_logging(global: &GlobalOptions) {
    let default_level = if global.verbose { "debug" } else { "warn" };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(default_level));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(global);
    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level
            .parse()
            .map_err(|_| format!("unsupported --log-level: {level}"))?;
        labelframes::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

fn warn(message: impl AsRef<str>) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.as_ref().yellow());
}

/// Drives an indicatif bar from session progress updates.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_length(info.total.max(info.processed));
        self.bar.set_position(info.processed);
        match (&info.current_label, info.current_timestamp) {
            (Some(label), Some(timestamp)) => {
                self.bar.set_message(format!("{label} @ {timestamp:.2}s"));
            }
            _ => self.bar.set_message(format!("{:.0}%", info.percentage)),
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Analyze {
            input,
            intervals,
            duration,
            fps,
            json,
        } => {
            let intervals = collect_intervals(&intervals)?;
            let duration = match (duration, input) {
                (Some(duration), _) => Some(parse_timecode(&duration)?.as_secs_f64()),
                (None, Some(path)) => Some(FfmpegSource::open(&path)?.metadata().duration_seconds()),
                (None, None) => return Err("provide an input video or --duration".into()),
            };

            let report = validate_request(&intervals, fps, duration, &ExtractionConfig::new());

            if json {
                let payload = json!({
                    "intervals": intervals.len(),
                    "fps": fps,
                    "duration_seconds": duration,
                    "estimated_samples": report.estimated_total,
                    "overlaps": report.overlaps.pairs().iter().map(|(i, j)| json!([i, j])).collect::<Vec<_>>(),
                    "gaps": report.gaps.iter().map(|gap| json!({
                        "start": gap.start,
                        "end": gap.end,
                    })).collect::<Vec<_>>(),
                    "warnings": report.warnings,
                    "errors": report.errors,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Intervals: {}", intervals.len());
                println!("Estimated samples: {} at {} fps", report.estimated_total, fps);
                if report.overlaps.is_empty() {
                    println!("Overlaps: none");
                } else {
                    println!("Overlaps:");
                    for message in report.overlaps.messages() {
                        println!("  {}", message.yellow());
                    }
                }
                if report.gaps.is_empty() {
                    println!("Gaps: none");
                } else {
                    println!("Gaps:");
                    for gap in &report.gaps {
                        println!("  {gap}");
                    }
                }
                for error in &report.errors {
                    eprintln!("{} {}", "error:".red().bold(), error);
                }
            }

            if !report.is_valid() {
                return Err(format!("{} invalid interval(s)", report.errors.len()).into());
            }
        }
        Commands::Extract {
            input,
            intervals,
            fps,
            dataset,
            out,
            scale,
            format,
            quality,
            seek_timeout,
            skip_failures,
            reject_overlaps,
            reject_zero_length,
            progress,
            json,
        } => {
            let dataset = DatasetId::new(dataset)?;
            let intervals = collect_intervals(&intervals)?;
            if intervals.is_empty() {
                warn("no intervals given; nothing will be extracted");
            }

            let scale = parse_scale(&scale).ok_or(format!("unsupported --scale: {scale}"))?;
            let encoding =
                parse_encoding(&format, quality).ok_or(format!("unsupported --format: {format}"))?;

            let mut config = ExtractionConfig::new()
                .with_scale(scale)
                .with_encoding(encoding)
                .with_seek_timeout(parse_timecode(&seek_timeout)?)
                .with_reject_zero_length(reject_zero_length);
            if skip_failures {
                config = config.with_capture_failure_policy(CaptureFailurePolicy::Skip);
            }
            if reject_overlaps {
                config = config.with_overlap_policy(OverlapPolicy::Reject);
            }

            let bar = if progress {
                let progress = Arc::new(BarProgress::new()?);
                config = config.with_progress(progress.clone());
                Some(progress)
            } else {
                None
            };

            let request = ExtractionRequest::new(fps, intervals);
            let mut session = ExtractionSession::open(&input, request, config)?;

            let report = session.validate()?;
            for warning in &report.warnings {
                warn(warning);
            }

            let result = session.run();
            if let Some(progress) = &bar {
                progress.bar.finish_and_clear();
            }
            let completed = result?;

            for skipped in completed.skipped() {
                warn(format!(
                    "skipped {} @ {:.2}s: {}",
                    skipped.label, skipped.timestamp, skipped.reason
                ));
            }

            let mut committer = DirectoryCommitter::new(&out);
            let receipt = completed.commit(&mut committer, &dataset)?;

            if json {
                let payload = json!({
                    "dataset": receipt.dataset.as_str(),
                    "frames": receipt.frames,
                    "manifest": receipt.manifest.as_ref().map(|path| path.display().to_string()),
                    "files": receipt.files.iter().map(|path| path.display().to_string()).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!(
                    "{} {} frame(s) to {}",
                    "committed".green().bold(),
                    receipt.frames,
                    committer.dataset_directory(&dataset).display()
                );
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "labelframes", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
