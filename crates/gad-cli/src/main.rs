// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use gad_cli::{InputSummary, load_config, load_predictions, load_signal, load_truth};
use gad_core::{
    AnalysisConfig, AnalysisContext, AnalysisRunResult, ConfidenceTier, GadError, InfluenceEntry,
    MethodId, MethodWeights, RelationshipEdge,
};
use gad_eval::{DetectionMetrics, evaluate};
use gad_fusion::Analyzer;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Multi-method anomaly detection for glucose time series.
#[derive(Parser)]
#[command(name = "gad", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full ensemble over one CSV signal.
    Analyze(AnalyzeArgs),
    /// Pool detector agreement over several signals and calibrate weights.
    Relationships(RelationshipsArgs),
    /// Score ensemble output against labelled anomaly indices.
    Eval(EvalArgs),
    /// Print the default configuration as JSON.
    Config(ConfigArgs),
}

#[derive(Args)]
struct EngineArgs {
    /// JSON configuration; omitted fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run only these detectors (comma separated).
    #[arg(long, value_delimiter = ',')]
    methods: Option<Vec<MethodId>>,

    /// Disable these detectors (comma separated).
    #[arg(long, value_delimiter = ',')]
    disable: Vec<MethodId>,
}

impl EngineArgs {
    fn build_config(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(methods) = &self.methods {
            config = config.with_methods(methods);
        }
        for method in &self.disable {
            config = config.without(*method);
        }
        Ok(config)
    }
}

#[derive(Args)]
struct AnalyzeArgs {
    /// CSV with a `value` column or `timestamp,value` (epoch seconds).
    #[arg(long)]
    input: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,

    /// Offset from UTC used to derive the local hour of day.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    utc_offset_minutes: i32,

    /// Only report anomalies at or above this tier.
    #[arg(long, default_value = "low")]
    min_tier: ConfidenceTier,

    /// Write JSON here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct RelationshipsArgs {
    /// One or more CSV signals.
    #[arg(long, num_args = 1.., required = true)]
    input: Vec<PathBuf>,

    #[command(flatten)]
    engine: EngineArgs,

    /// Also write the configuration with calibrated weights to this file.
    #[arg(long)]
    emit_config: Option<PathBuf>,

    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct EvalArgs {
    /// Labelled anomaly indices (JSON array or one index per line).
    #[arg(long)]
    truth: PathBuf,

    /// CSV signal to analyze before scoring.
    #[arg(long, conflicts_with = "predictions", required_unless_present = "predictions")]
    input: Option<PathBuf>,

    /// Saved `analyze` output to score instead of running the ensemble.
    #[arg(long)]
    predictions: Option<PathBuf>,

    #[command(flatten)]
    engine: EngineArgs,

    /// Maximum index distance for a detection to match a label.
    #[arg(long, default_value_t = 0)]
    tolerance: usize,

    /// Lowest tier counted as a detection.
    #[arg(long, default_value = "medium")]
    min_tier: ConfidenceTier,

    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct AnalyzeOutput {
    command: &'static str,
    input: InputSummary,
    min_tier: ConfidenceTier,
    result: AnalysisRunResult,
}

#[derive(Serialize)]
struct RelationshipsOutput {
    command: &'static str,
    inputs: Vec<InputSummary>,
    edges: Vec<RelationshipEdge>,
    influence: Vec<InfluenceEntry>,
    calibrated_weights: MethodWeights,
}

#[derive(Serialize)]
struct EvalOutput {
    command: &'static str,
    source: String,
    metrics: DetectionMetrics,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: &'static str,
    message: String,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli.command) {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Relationships(args) => handle_relationships(args),
        Command::Eval(args) => handle_eval(args),
        Command::Config(args) => {
            write_json_output(&AnalysisConfig::default(), args.output.as_deref())
        }
    }
}

fn handle_analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = args.engine.build_config()?;
    let loaded = load_signal(&args.input)?;
    let context = AnalysisContext::default().with_utc_offset_minutes(args.utc_offset_minutes);

    let mut result = Analyzer::new(config)?
        .run(&loaded.signal, Some(&context))
        .with_context(|| format!("analysis of '{}' failed", loaded.path.display()))?;
    result
        .fused_anomalies
        .retain(|anomaly| anomaly.confidence_tier >= args.min_tier);
    info!(
        input = %loaded.path.display(),
        anomalies = result.fused_anomalies.len(),
        "analysis written"
    );

    write_json_output(
        &AnalyzeOutput {
            command: "analyze",
            input: loaded.summary(),
            min_tier: args.min_tier,
            result,
        },
        args.output.as_deref(),
    )
}

fn handle_relationships(args: RelationshipsArgs) -> anyhow::Result<()> {
    let analyzer = Analyzer::new(args.engine.build_config()?)?;

    let mut inputs = Vec::with_capacity(args.input.len());
    let mut runs = Vec::with_capacity(args.input.len());
    for path in &args.input {
        let loaded = load_signal(path)?;
        let (sets, _) = analyzer
            .detect(&loaded.signal)
            .with_context(|| format!("detectors failed on '{}'", path.display()))?;
        inputs.push(loaded.summary());
        runs.push(sets);
    }

    let report = analyzer.relationships().analyze_runs(&runs);
    let calibrated_weights = analyzer
        .relationships()
        .calibrate_weights(&report.edges, &analyzer.config().weights);
    info!(
        signals = runs.len(),
        conflicts = report.conflicts().count(),
        "relationship report pooled"
    );

    if let Some(path) = args.emit_config.as_deref() {
        let calibrated = AnalysisConfig {
            weights: calibrated_weights.clone(),
            ..analyzer.config().clone()
        };
        write_json_output(&calibrated, Some(path))?;
    }

    write_json_output(
        &RelationshipsOutput {
            command: "relationships",
            inputs,
            edges: report.edges,
            influence: report.influence,
            calibrated_weights,
        },
        args.output.as_deref(),
    )
}

fn handle_eval(args: EvalArgs) -> anyhow::Result<()> {
    let truth = load_truth(&args.truth)?;
    let (source, result) = match (&args.predictions, &args.input) {
        (Some(path), _) => (path.display().to_string(), load_predictions(path)?),
        (None, Some(path)) => {
            let config = args.engine.build_config()?;
            let loaded = load_signal(path)?;
            let result = Analyzer::new(config)?.run(&loaded.signal, None)?;
            (path.display().to_string(), result)
        }
        (None, None) => {
            return Err(GadError::invalid_config("eval needs --input or --predictions").into());
        }
    };

    let metrics = evaluate(&result, &truth, args.tolerance, args.min_tier)?;
    write_json_output(
        &EvalOutput {
            command: "eval",
            source,
            metrics,
        },
        args.output.as_deref(),
    )
}

fn write_json_output<T: Serialize>(payload: &T, output_path: Option<&Path>) -> anyhow::Result<()> {
    let encoded =
        serde_json::to_string_pretty(payload).context("failed to serialize JSON output")?;

    if let Some(path) = output_path {
        fs::write(path, format!("{encoded}\n"))
            .with_context(|| format!("failed to write '{}'", path.display()))
    } else {
        println!("{encoded}");
        Ok(())
    }
}

fn error_code(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(gad) = cause.downcast_ref::<GadError>() {
            return match gad {
                GadError::MalformedSignal(_) => "malformed_signal",
                GadError::InvalidConfig(_) => "invalid_config",
                GadError::NumericalIssue(_) => "numerical_issue",
            };
        }
        if cause.is::<std::io::Error>() {
            return "io_error";
        }
        if cause.is::<serde_json::Error>() {
            return "json_error";
        }
    }
    "error"
}

fn emit_structured_error(err: &anyhow::Error) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: error_code(err),
            message: format!("{err:#}"),
        },
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!(
            "{{\"error\":{{\"code\":\"{}\",\"message\":\"{}\"}}}}",
            error_code(err),
            err
        ),
    }
}
