use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use impulse_detector::error::{log_analysis_error, log_graph_error, log_input_error};
use impulse_detector::{
    detect, graph, init_logging, read_wav, render_graph, save_graph, AppConfig, DetectionReport,
    EnvelopeBuilder,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "impulse_cli",
    about = "Detect short loud impulses (e.g. infant cries) in WAV recordings"
)]
struct Cli {
    /// Log debug events to stderr
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyse a WAV file and print the detection report as JSON
    Analyse(AnalyseArgs),
    /// Print the default configuration as JSON
    Defaults,
}

#[derive(Args, Debug, Clone)]
struct AnalyseArgs {
    #[arg(long)]
    input: PathBuf,
    /// JSON configuration file (see `defaults`)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override detection.global_loud_amplitude, in raw sample units
    #[arg(long)]
    loud_amplitude: Option<f64>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// Print one diagnostic line per local maximum instead of JSON
    #[arg(long)]
    text: bool,
    #[command(flatten)]
    graph: GraphArgs,
}

#[derive(Args, Debug, Clone)]
struct GraphArgs {
    /// Draw samples, envelopes and maxima into this image (PNG)
    #[arg(long)]
    graph: Option<PathBuf>,
    /// Graph width in pixels
    #[arg(long, default_value_t = graph::DEFAULT_WIDTH)]
    graph_width: u32,
    /// Graph height in pixels
    #[arg(long, default_value_t = graph::DEFAULT_HEIGHT)]
    graph_height: u32,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyse(args) => run_analyse(args),
        Commands::Defaults => run_defaults(),
    }
}

fn milliseconds(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1e3
}

fn run_analyse(args: AnalyseArgs) -> Result<ExitCode> {
    let input = args.input.as_path();
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_file_strict(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if args.loud_amplitude.is_some() {
        config.detection.global_loud_amplitude = args.loud_amplitude;
    }

    let buffer = read_wav(input)
        .inspect_err(|err| log_input_error(err, "analyse"))
        .with_context(|| format!("reading {}", input.display()))?;

    let started = Instant::now();
    let builder = EnvelopeBuilder::from_config(buffer.sample_duration, &config.detection)
        .inspect_err(|err| log_analysis_error(err, "analyse"))
        .with_context(|| format!("configuring analysis of {}", input.display()))?;
    let configured = Instant::now();
    let envelope = builder
        .build(buffer.samples)
        .inspect_err(|err| log_analysis_error(err, "analyse"))
        .with_context(|| format!("preprocessing {}", input.display()))?;
    let preprocessed = Instant::now();
    let report = detect(&envelope)
        .inspect_err(|err| log_analysis_error(err, "analyse"))
        .with_context(|| format!("analysing {}", input.display()))?;
    let analysed = Instant::now();
    tracing::info!(
        "[Analyse] Analysing time {:.3} ms setting + {:.3} ms preprocessing + {:.3} ms analysis",
        milliseconds(configured - started),
        milliseconds(preprocessed - configured),
        milliseconds(analysed - preprocessed)
    );

    if let Some(path) = &args.graph.graph {
        render_graph(
            &envelope,
            &report.local_maxima,
            args.graph.graph_width,
            args.graph.graph_height,
        )
        .and_then(|image| save_graph(&image, path))
        .inspect_err(|err| log_graph_error(err, "analyse"))
        .with_context(|| format!("drawing graph {}", path.display()))?;
        tracing::info!(path = %path.display(), "[Analyse] Graph saved");
    }

    let rendered = if args.text {
        render_text(&report)
    } else {
        let payload = AnalyseReportPayload {
            input: input.display().to_string(),
            sample_rate: buffer.sample_rate,
            channels: buffer.channels,
            report: &report,
        };
        serde_json::to_string_pretty(&payload)?
    };

    if let Some(path) = &args.output {
        fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{rendered}");
    }

    Ok(ExitCode::from(0))
}

fn run_defaults() -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(&AppConfig::default())?);
    Ok(ExitCode::from(0))
}

fn render_text(report: &DetectionReport) -> String {
    let mut lines: Vec<String> = report
        .local_maxima
        .iter()
        .map(|info| info.to_string())
        .collect();
    lines.push(format!(
        "{} good maxima of {} local maxima; longest series {}, {} in series",
        report.good_maxima.len(),
        report.local_maxima.len(),
        report.series.max_sequential,
        report.series.total_sequential
    ));
    lines.join("\n")
}

#[derive(Serialize)]
struct AnalyseReportPayload<'a> {
    input: String,
    sample_rate: u32,
    channels: u16,
    #[serde(flatten)]
    report: &'a DetectionReport,
}
