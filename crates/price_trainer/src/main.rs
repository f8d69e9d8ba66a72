//! FIPE price estimator CLI
//!
//! Trains (or reuses) the deterministic price model and answers queries.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fipe_price_core::{CarQuery, ModelStore};
use fipe_price_trainer::{ensure_artifact, EstimatorConfig, LogFormat, PriceEstimator};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "fipe-price")]
#[command(author = "FIPE Price Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic used-car price estimator over FIPE data", long_about = None)]
struct Args {
    /// Configuration file (defaults to fipe-price.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train the model, or reuse the stored artifact if it is current
    Train {
        /// Retrain even if a current artifact exists
        #[arg(long)]
        force: bool,
    },

    /// Estimate the price of a car
    Predict {
        #[arg(long)]
        year_of_reference: i64,
        #[arg(long)]
        brand: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        fuel: String,
        #[arg(long)]
        gear: String,
        #[arg(long)]
        engine_size: f64,
        #[arg(long)]
        year_model: i64,
    },

    /// Print the selectable brands, fuels, gears and ranges as JSON
    Choices,

    /// Print the models of a brand as JSON
    Models {
        #[arg(long)]
        brand: String,
    },

    /// Print the stored artifact's hash and metadata as JSON
    Inspect,
}

#[derive(Serialize)]
struct Inspection<'a> {
    path: String,
    artifact_hash: String,
    feature_count: usize,
    tree_depth: usize,
    leaves: usize,
    columns: &'a [String],
    metadata: &'a fipe_price_core::ArtifactMetadata,
}

fn init_logging(config: &EstimatorConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };

    match config.log_format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().compact().with_target(false))
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config =
        EstimatorConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config, args.verbose);

    info!("FIPE price estimator v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Train { force } => {
            let dataset = config
                .dataset_loader()?
                .load(&config.dataset_path)
                .context("Failed to load dataset")?;
            let store = ModelStore::new(&config.artifact_path);
            let (artifact, source) =
                ensure_artifact(&dataset, &store, &config.training_params(), force)
                    .context("Failed to obtain model artifact")?;

            let hash = artifact.hash_hex()?;
            println!("source: {source:?}");
            println!("artifact: {}", store.path().display());
            println!("hash: {hash}");
            for (name, value) in &artifact.metadata.metrics {
                println!("{name}: {}", fipe_price_core::fixed::to_f64(*value));
            }
        }
        Command::Predict {
            year_of_reference,
            brand,
            model,
            fuel,
            gear,
            engine_size,
            year_model,
        } => {
            let estimator =
                PriceEstimator::initialize(&config).context("Failed to initialize estimator")?;
            let query = CarQuery {
                year_of_reference,
                brand,
                model,
                fuel,
                gear,
                engine_size,
                year_model,
            };
            let price = estimator.predict(&query).context("No prediction")?;
            println!("R$ {price:.2}");
        }
        Command::Choices => {
            let dataset = config
                .dataset_loader()?
                .load(&config.dataset_path)
                .context("Failed to load dataset")?;
            print_json(&dataset.choice_lists())?;
        }
        Command::Models { brand } => {
            let dataset = config
                .dataset_loader()?
                .load(&config.dataset_path)
                .context("Failed to load dataset")?;
            print_json(&dataset.models_for_brand(&brand))?;
        }
        Command::Inspect => {
            let store = ModelStore::new(&config.artifact_path);
            let artifact = store.load().context("Failed to load model artifact")?;
            print_json(&Inspection {
                path: store.path().display().to_string(),
                artifact_hash: artifact.hash_hex()?,
                feature_count: artifact.regressor.feature_count,
                tree_depth: artifact.regressor.tree.depth(),
                leaves: artifact.regressor.tree.leaf_count(),
                columns: artifact.encoder.schema.columns(),
                metadata: &artifact.metadata,
            })?;
        }
    }

    Ok(())
}
