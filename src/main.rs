use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crossmodal_analytics::{
    config::{Config, LogFormat},
    convert::{ConversionOptions, CrossModalConverter, TableType, VectorMethod},
    error::AppError,
    model::{DataFormat, DataPayload},
    orchestrate::{AnalysisRequest, CrossModalOrchestrator},
    provider::{CapabilityProvider, HttpCapabilityProvider},
    select::AnalysisMode,
    validate::{CrossModalValidator, ValidationLevel},
    workflow::WorkflowOptimizationLevel,
};

/// Cross-modal analysis over graph, table, and vector data.
#[derive(Parser)]
#[command(name = "crossmodal", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a payload between formats and report the preservation score
    Convert {
        /// Path to a JSON payload file
        input: PathBuf,
        /// Source format (graph, table, vector)
        #[arg(long)]
        from: DataFormat,
        /// Target format (graph, table, vector)
        #[arg(long)]
        to: DataFormat,
        /// Table view for graph-to-table (nodes, edges)
        #[arg(long, default_value_t = TableType::Edges)]
        table_type: TableType,
        /// Vectorization method for graph-to-vector (graph_features, embedding)
        #[arg(long, default_value = "graph_features")]
        vector_method: VectorMethod,
        /// Cosine threshold for synthesized edges in vector-to-graph
        #[arg(long)]
        similarity_threshold: Option<f64>,
    },
    /// Run round-trip integrity validation over a format sequence
    Validate {
        /// Path to a JSON payload file
        input: PathBuf,
        /// Comma-separated format sequence, e.g. graph,table,graph
        #[arg(long)]
        sequence: String,
        /// Validation level (basic, standard, comprehensive)
        #[arg(long, default_value_t = ValidationLevel::Standard)]
        level: ValidationLevel,
    },
    /// Orchestrate a full analysis for a research question
    Analyze {
        /// Path to a JSON payload file
        input: PathBuf,
        /// Declared payload format (graph, table, vector)
        #[arg(long)]
        format: DataFormat,
        /// Research question driving mode selection
        #[arg(long)]
        question: String,
        /// Preferred analysis mode, bypassing heuristic selection
        #[arg(long)]
        mode: Option<AnalysisMode>,
        /// Validation level (basic, standard, comprehensive)
        #[arg(long, default_value_t = ValidationLevel::Standard)]
        validation_level: ValidationLevel,
        /// Workflow optimization level (basic, standard, aggressive)
        #[arg(long, default_value_t = WorkflowOptimizationLevel::Standard)]
        optimization_level: WorkflowOptimizationLevel,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "crossmodal-analytics starting"
    );

    let provider = build_provider(&config);

    match cli.command {
        Command::Convert {
            input,
            from,
            to,
            table_type,
            vector_method,
            similarity_threshold,
        } => {
            let data = load_payload(&input)?;
            let mut converter = CrossModalConverter::new().with_thresholds(config.thresholds);
            if let Some(provider) = provider {
                converter = converter.with_provider(provider);
            }

            let mut options = ConversionOptions::infer(&data, to)
                .with_table_type(table_type)
                .with_vector_method(vector_method);
            if let Some(threshold) = similarity_threshold {
                options = options.with_similarity_threshold(threshold);
            }

            let result = converter.convert_data(&data, from, to, &options).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Validate {
            input,
            sequence,
            level,
        } => {
            let data = load_payload(&input)?;
            let formats = parse_sequence(&sequence)?;

            let mut converter = CrossModalConverter::new().with_thresholds(config.thresholds);
            if let Some(provider) = provider {
                converter = converter.with_provider(provider);
            }
            let validator = CrossModalValidator::new(converter);

            let report = validator
                .validate_round_trip_integrity(&data, &formats, level)
                .await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Analyze {
            input,
            format,
            question,
            mode,
            validation_level,
            optimization_level,
        } => {
            let data = load_payload(&input)?;
            let orchestrator = CrossModalOrchestrator::from_config(&config, provider);

            let mut request = AnalysisRequest::new(question, data, format)
                .with_validation_level(validation_level)
                .with_optimization_level(optimization_level);
            if let Some(mode) = mode {
                request = request.with_preferred_modes(vec![mode]);
            }

            let result = orchestrator.orchestrate_analysis(request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

/// Build the HTTP capability provider when an API key is configured.
///
/// Without a key the engine still works; embedding conversions fall back to
/// structural features and mode selection stays heuristic.
fn build_provider(config: &Config) -> Option<Arc<dyn CapabilityProvider>> {
    if config.provider.api_key.is_none() {
        warn!("No API key configured; running with structural fallbacks only");
        return None;
    }

    match HttpCapabilityProvider::new(&config.provider, config.request.clone()) {
        Ok(provider) => {
            info!(base_url = %provider.base_url(), "Capability provider initialized");
            Some(Arc::new(provider))
        }
        Err(e) => {
            warn!(error = %e, "Failed to initialize capability provider; continuing without");
            None
        }
    }
}

/// Read and deserialize a payload file.
fn load_payload(path: &PathBuf) -> Result<DataPayload, AppError> {
    let raw = std::fs::read_to_string(path).map_err(|e| AppError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;
    serde_json::from_str(&raw).map_err(|e| AppError::Config {
        message: format!("Failed to parse {}: {}", path.display(), e),
    })
}

/// Parse a comma-separated format sequence.
fn parse_sequence(raw: &str) -> Result<Vec<DataFormat>, AppError> {
    raw.split(',')
        .map(|s| {
            s.trim().parse().map_err(|e: String| AppError::Config {
                message: format!("Invalid format sequence: {}", e),
            })
        })
        .collect()
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
