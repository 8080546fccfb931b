//! Monsoon CLI - ward-level flood risk and preparedness reporting

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output
// - Per-ward failures warn and continue; a missing model aborts

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use monsoon_core::config;
use monsoon_core::engine::{BatchOutcome, ScoringContext};
use monsoon_core::observation::RainfallObservation;
use monsoon_core::predictor::{LogisticModel, Predictor};
use monsoon_core::report;
use monsoon_core::schema::FeatureSchema;
use monsoon_core::tables::WardTables;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "monsoon")]
#[command(about = "Ward-level flood risk scoring and monsoon preparedness assessment")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score all wards with the composite risk index
    Score {
        /// Directory holding wards.json, historical.json, civic.json
        data_dir: PathBuf,

        /// Observed rainfall over the last hour (mm)
        #[arg(long, default_value_t = 0.0)]
        rain_1h: f64,

        /// Observed rainfall over the last 3 hours (mm)
        #[arg(long, default_value_t = 0.0)]
        rain_3h: f64,

        /// Observed rainfall over the last 6 hours (mm)
        #[arg(long, default_value_t = 0.0)]
        rain_6h: f64,

        /// Observed rainfall over the last 24 hours (mm)
        #[arg(long, default_value_t = 0.0)]
        rain_24h: f64,

        /// Forecast rainfall for the next 3 hours (mm)
        #[arg(long, default_value_t = 0.0)]
        rain_forecast_3h: f64,

        /// Scoring timestamp, RFC 3339 (default: now)
        #[arg(long)]
        timestamp: Option<String>,

        /// Path to the model artifact (default: <data-dir>/model.json)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Show only the top N wards
        #[arg(long)]
        top: Option<usize>,

        /// Path to config file (default: auto-discover in data dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write output to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Append the zone priority table (text format only)
        #[arg(long)]
        zones: bool,
    },
    /// Assess monsoon preparedness (needs no model and no rainfall)
    Preparedness {
        /// Directory holding wards.json, historical.json, civic.json
        data_dir: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover in data dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write output to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Append the zone priority table (text format only)
        #[arg(long)]
        zones: bool,
    },
    /// Validate a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running any scoring
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            data_dir,
            rain_1h,
            rain_3h,
            rain_6h,
            rain_24h,
            rain_forecast_3h,
            timestamp,
            model,
            format,
            top,
            config,
            output,
            zones,
        } => {
            let rainfall = RainfallObservation {
                rain_1h,
                rain_3h,
                rain_6h,
                rain_24h,
                rain_forecast_3h,
            };
            run_score(ScoreArgs {
                data_dir,
                rainfall,
                timestamp,
                model,
                format,
                top,
                config,
                output,
                zones,
            })
        }
        Commands::Preparedness {
            data_dir,
            format,
            config,
            output,
            zones,
        } => run_preparedness(&data_dir, format, config.as_deref(), output.as_deref(), zones),
        Commands::Config { action } => match action {
            ConfigAction::Validate { config } => run_config_validate(config.as_deref()),
        },
    }
}

struct ScoreArgs {
    data_dir: PathBuf,
    rainfall: RainfallObservation,
    timestamp: Option<String>,
    model: Option<PathBuf>,
    format: OutputFormat,
    top: Option<usize>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    zones: bool,
}

fn run_score(args: ScoreArgs) -> anyhow::Result<()> {
    let timestamp = parse_timestamp(args.timestamp.as_deref())?;
    let context = build_context(&args.data_dir, args.config.as_deref(), Some(model_path(&args)))?;

    let outcome = monsoon_core::score_wards(&context, &args.rainfall, timestamp)
        .context("batch scoring failed")?;
    warn_failures(&outcome);

    let records: Vec<_> = match args.top {
        Some(top) => outcome.records.into_iter().take(top).collect(),
        None => outcome.records,
    };

    let mut rendered = match args.format {
        OutputFormat::Text => report::render_text(&records),
        OutputFormat::Json => report::render_json(&records),
        OutputFormat::Csv => to_csv(&records)?,
    };
    if args.zones && matches!(args.format, OutputFormat::Text) {
        let summaries = context.risk_zone_summaries(&records);
        rendered.push('\n');
        rendered.push_str(&report::render_zone_text(&summaries));
    }

    emit(&rendered, args.output.as_deref())
}

fn run_preparedness(
    data_dir: &Path,
    format: OutputFormat,
    config: Option<&Path>,
    output: Option<&Path>,
    zones: bool,
) -> anyhow::Result<()> {
    let context = build_context(data_dir, config, None)?;

    let outcome = monsoon_core::assess_wards(&context);
    warn_failures(&outcome);

    let mut rendered = match format {
        OutputFormat::Text => report::render_preparedness_text(&outcome.records),
        OutputFormat::Json => report::render_json(&outcome.records),
        OutputFormat::Csv => to_csv(&outcome.records)?,
    };
    if zones && matches!(format, OutputFormat::Text) {
        let summaries = context.preparedness_zone_summaries(&outcome.records);
        rendered.push('\n');
        rendered.push_str(&report::render_zone_text(&summaries));
    }

    emit(&rendered, output)
}

fn run_config_validate(config_path: Option<&Path>) -> anyhow::Result<()> {
    let current_dir = std::env::current_dir().context("cannot resolve current directory")?;
    let resolved = config::load_and_resolve(&current_dir, config_path)
        .context("configuration is invalid")?;
    match &resolved.config_path {
        Some(path) => println!("config ok: {}", path.display()),
        None => println!("config ok: built-in defaults"),
    }
    Ok(())
}

fn model_path(args: &ScoreArgs) -> PathBuf {
    args.model
        .clone()
        .unwrap_or_else(|| args.data_dir.join("model.json"))
}

fn build_context(
    data_dir: &Path,
    config_path: Option<&Path>,
    model_path: Option<PathBuf>,
) -> anyhow::Result<ScoringContext> {
    let resolved = config::load_and_resolve(data_dir, config_path)
        .context("failed to load configuration")?;

    let tables = WardTables::load_dir(data_dir)
        .with_context(|| format!("failed to load ward tables from {}", data_dir.display()))?;

    let predictor: Option<Arc<dyn Predictor>> = match model_path {
        Some(path) => {
            let model = LogisticModel::load(&path)
                .with_context(|| format!("failed to load model from {}", path.display()))?;
            Some(Arc::new(model))
        }
        None => None,
    };

    ScoringContext::new(tables, FeatureSchema::model_v1(), predictor, resolved)
        .context("failed to build scoring context")
}

fn parse_timestamp(timestamp: Option<&str>) -> anyhow::Result<Option<DateTime<Utc>>> {
    match timestamp {
        Some(raw) => {
            let parsed = DateTime::parse_from_rfc3339(raw)
                .with_context(|| format!("invalid RFC 3339 timestamp: {raw}"))?;
            Ok(Some(parsed.with_timezone(&Utc)))
        }
        None => Ok(None),
    }
}

fn warn_failures<T>(outcome: &BatchOutcome<T>) {
    for failure in &outcome.failures {
        eprintln!("warning: skipping ward {}: {}", failure.ward_id, failure.error);
    }
    if !outcome.failures.is_empty() {
        eprintln!("Skipped {} ward(s) due to scoring errors", outcome.failures.len());
    }
}

fn to_csv<T: Serialize>(records: &[T]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record).context("failed to encode CSV record")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush CSV output: {e}"))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

fn emit(rendered: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{rendered}");
            Ok(())
        }
    }
}
