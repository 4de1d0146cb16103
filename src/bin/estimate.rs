//! Floor price estimator CLI
//!
//! Scores single requests or CSV batches against an exported ONNX model.
//!
//! # Usage
//! ```sh
//! MODEL_PATH=model cargo run --bin estimate -- predict --inventory-id inv1 \
//!     --request-type banner --ex-floor-price 0.5 --state-code CA --country-code US \
//!     --city-code SF --device-os android --device-os-version 10 --hour-of-day 14
//! ```
//!
//! # Environment Variables
//! - `MODEL_PATH` - Model file or version directory (default: model)
//! - `MODEL_INPUT_NODE` - Input node for backends that take serialized examples.
//!   The ONNX backend ignores it and feeds one input per feature instead.
//! - `MODEL_OUTPUT_NODE` - Output node holding the score (default: Squeeze:0)
//! - `PREDICTION_TIMEOUT_MS` - Budget for a single prediction (default: 50)
//! - `METRICS_ENABLED` - Record prediction metrics (default: true)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use floor_estimator::application::ml::batch::{read_requests, score_rows, write_estimates};
use floor_estimator::application::ml::{FloorPriceEstimator, predict_within};
use floor_estimator::config::Config;
use floor_estimator::domain::ml::feature_record::FloorPriceRequest;
use floor_estimator::domain::ports::{ModelSignature, ScoringBackend};
use floor_estimator::infrastructure::model_locator;
use floor_estimator::infrastructure::observability::PredictionMetrics;
use floor_estimator::infrastructure::{OnnxScoringBackend, StubBackend};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Floor price estimator", long_about = None)]
struct Cli {
    /// TOML configuration file (replaces environment configuration)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Score every request with this constant instead of loading a model
    #[arg(long, global = true, allow_negative_numbers = true)]
    stub_score: Option<f32>,

    /// Print Prometheus metrics to stderr on exit
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the floor price of a single request
    Predict {
        #[arg(long)]
        inventory_id: String,
        #[arg(long)]
        request_type: String,
        #[arg(long, allow_negative_numbers = true)]
        ex_floor_price: f32,
        #[arg(long)]
        state_code: String,
        #[arg(long)]
        country_code: String,
        #[arg(long)]
        city_code: String,
        #[arg(long)]
        device_os: String,
        #[arg(long)]
        device_os_version: String,
        #[arg(long)]
        hour_of_day: String,
    },
    /// Estimate floor prices for every row of a CSV file
    Batch {
        /// CSV with one column per feature
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the effective configuration and resolved model path
    Inspect,
}

#[derive(Serialize)]
struct EstimateOutput {
    floor_price: Option<f32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Logs go to stderr, stdout carries results
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::from_env()?,
    };

    if let Commands::Inspect = cli.command {
        return inspect(&config);
    }

    let metrics = if config.observability.metrics_enabled {
        Some(PredictionMetrics::new(&config.observability.metrics_prefix)?)
    } else {
        None
    };

    let signature = config.model.signature();
    let timeout = config.model.timeout();

    if let Some(score) = cli.stub_score {
        info!("Using stub backend with constant score {}", score);
        let estimator = build_estimator(StubBackend::constant(score), signature, metrics.clone());
        execute(estimator, cli.command, timeout).await?;
    } else {
        let model_path = model_locator::resolve_from_cwd(&config.model.model_path)?;
        let backend = OnnxScoringBackend::load(&model_path, config.model.intra_threads)
            .context("Failed to initialise scoring backend")?;
        let estimator = build_estimator(backend, signature, metrics.clone());
        execute(estimator, cli.command, timeout).await?;
    }

    if cli.metrics {
        if let Some(metrics) = &metrics {
            eprintln!("{}", metrics.render());
        }
    }

    Ok(())
}

fn build_estimator<B: ScoringBackend>(
    backend: B,
    signature: ModelSignature,
    metrics: Option<PredictionMetrics>,
) -> Arc<FloorPriceEstimator<B>> {
    if !B::BINDS_INPUT_NODE && signature.input_node != ModelSignature::DEFAULT_INPUT_NODE {
        warn!(
            backend = backend.name(),
            input_node = %signature.input_node,
            "Configured input node is ignored, features are fed to their own inputs"
        );
    }

    let estimator = FloorPriceEstimator::new(Arc::new(backend), signature);
    Arc::new(match metrics {
        Some(m) => estimator.with_metrics(m),
        None => estimator,
    })
}

async fn execute<B: ScoringBackend + 'static>(
    estimator: Arc<FloorPriceEstimator<B>>,
    command: Commands,
    timeout: Duration,
) -> Result<()> {
    match command {
        Commands::Predict {
            inventory_id,
            request_type,
            ex_floor_price,
            state_code,
            country_code,
            city_code,
            device_os,
            device_os_version,
            hour_of_day,
        } => {
            let request = FloorPriceRequest::new(
                inventory_id,
                request_type,
                ex_floor_price,
                state_code,
                country_code,
                city_code,
                device_os,
                device_os_version,
                hour_of_day,
            );
            let floor_price = predict_within(estimator, request, timeout).await?;
            println!("{}", serde_json::to_string(&EstimateOutput { floor_price })?);
        }
        Commands::Batch { input, output } => {
            let file = File::open(&input)
                .context(format!("Failed to open input CSV: {}", input.display()))?;

            // Rayon workers block, keep them off the async runtime
            tokio::task::spawn_blocking(move || -> Result<()> {
                let rows = read_requests(BufReader::new(file))?;
                let estimates = score_rows(&estimator, &rows);

                let writer: Box<dyn Write> = match &output {
                    Some(path) => Box::new(
                        File::create(path)
                            .context(format!("Failed to create output CSV: {}", path.display()))?,
                    ),
                    None => Box::new(io::stdout()),
                };
                write_estimates(writer, &estimates)
            })
            .await??;
        }
        Commands::Inspect => {}
    }
    Ok(())
}

fn inspect(config: &Config) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    match model_locator::resolve_from_cwd(&config.model.model_path) {
        Ok(path) => println!("Resolved model: {}", path.display()),
        Err(e) => println!("Resolved model: unavailable ({:#})", e),
    }
    Ok(())
}
