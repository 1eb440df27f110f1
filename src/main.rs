use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use complaint_priority::config::{PipelineConfig, DEFAULT_CONFIG_PATH};
use complaint_priority::data::download::download_data;
use complaint_priority::embedder::{HashedProjectionEncoder, SentenceEncoder};
use complaint_priority::features::cardinality::analyze_tabular_values;
use complaint_priority::features::run_feature_fusion;
use complaint_priority::observability::{logging, metrics};
use complaint_priority::pipeline::gold::run_gold_build;
use complaint_priority::pipeline::ingest::run_ingestion;
use complaint_priority::pipeline::StageSummary;

#[derive(Parser)]
#[command(name = "complaint_priority")]
#[command(about = "Consumer complaint pipeline: ingestion, labeling, feature fusion")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the pipeline configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the raw dataset into the bronze layer
    Download,
    /// Run chunked bronze -> silver ingestion
    Ingest,
    /// Build the labeled gold layer from silver
    BuildGold,
    /// Fit encoders and fuse the multimodal feature matrix
    BuildFeatures {
        /// Sentence encoder to use: hashed, minilm
        #[arg(long, default_value = "hashed")]
        encoder: String,
    },
    /// Report unique-value counts for the tabular columns
    AnalyzeCardinality,
    /// Run ingest, build-gold and build-features sequentially
    FullPipeline {
        /// Sentence encoder to use: hashed, minilm
        #[arg(long, default_value = "hashed")]
        encoder: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();

    logging::init_logging();
    metrics::init();

    let config = PipelineConfig::load(&cli.config)?;

    match cli.command {
        Commands::Download => {
            download_data(&config)?;
            println!("✅ Raw dataset available in the bronze layer");
        }
        Commands::Ingest => {
            let summary = run_ingestion(&config)?;
            report(&summary);
        }
        Commands::BuildGold => {
            let summary = run_gold_build(&config)?;
            report(&summary);
        }
        Commands::BuildFeatures { encoder } => {
            let sentence_encoder = build_sentence_encoder(&encoder, &config)?;
            let summary = run_feature_fusion(&config, sentence_encoder.as_ref())?;
            report(&summary);
        }
        Commands::AnalyzeCardinality => {
            analyze_tabular_values(&config)?;
        }
        Commands::FullPipeline { encoder } => {
            let sentence_encoder = build_sentence_encoder(&encoder, &config)?;
            info!("🔄 Running full pipeline: ingest -> build-gold -> build-features");
            let summary = run_ingestion(&config)?;
            report(&summary);
            let summary = run_gold_build(&config)?;
            report(&summary);
            let summary = run_feature_fusion(&config, sentence_encoder.as_ref())?;
            report(&summary);
        }
    }

    metrics::log_snapshot();
    Ok(())
}

fn report(summary: &StageSummary) {
    println!("✅ {}", summary.message);
}

fn build_sentence_encoder(
    name: &str,
    config: &PipelineConfig,
) -> anyhow::Result<Box<dyn SentenceEncoder>> {
    match name {
        "hashed" => Ok(Box::new(HashedProjectionEncoder::new(
            config.features.embedding_dim,
            config.features.encoder_seed,
        ))),
        "minilm" => {
            #[cfg(feature = "local-embeddings")]
            {
                Ok(Box::new(
                    complaint_priority::embedder::minilm::MiniLmEncoder::new()?,
                ))
            }
            #[cfg(not(feature = "local-embeddings"))]
            {
                anyhow::bail!(
                    "the 'minilm' encoder requires building with --features local-embeddings"
                )
            }
        }
        other => anyhow::bail!("unknown sentence encoder '{}'", other),
    }
}
