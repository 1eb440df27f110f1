use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::error::{PipelineError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config/params.toml";

/// Process-wide immutable configuration, loaded once per stage run and
/// threaded as an explicit parameter into every component.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub data_source: DataSourceConfig,
    pub data_paths: DataPathsConfig,
    pub features: FeatureConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceConfig {
    pub download_url: String,
    #[serde(default = "default_ingest_chunk_size")]
    pub chunk_size: usize,
    /// Bounded sampling mode: stop once this many valid rows are written.
    #[serde(default)]
    pub target_rows: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPathsConfig {
    pub raw_data_dir: PathBuf,
    pub raw_data_filename: String,
    pub silver_data_dir: PathBuf,
    pub silver_data_filename: String,
    pub gold_data_dir: PathBuf,
    pub gold_data_filename: String,
    pub feature_matrix_filename: String,
    pub artifacts_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureConfig {
    /// Much smaller than the ingestion chunk size: the embedding step is
    /// computationally heavy per row.
    #[serde(default = "default_feature_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
    #[serde(default = "default_encoder_seed")]
    pub encoder_seed: u64,
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
}

fn default_ingest_chunk_size() -> usize {
    50_000
}

fn default_feature_chunk_size() -> usize {
    100
}

fn default_embedding_dim() -> usize {
    384
}

fn default_encoder_seed() -> u64 {
    42
}

fn default_smoothing() -> f64 {
    1.0
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: PipelineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.data_source.chunk_size == 0 {
            return Err(PipelineError::Config(
                "data_source.chunk_size must be greater than zero".into(),
            ));
        }
        if self.features.chunk_size == 0 {
            return Err(PipelineError::Config(
                "features.chunk_size must be greater than zero".into(),
            ));
        }
        if self.features.embedding_dim == 0 {
            return Err(PipelineError::Config(
                "features.embedding_dim must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn raw_data_path(&self) -> PathBuf {
        self.data_paths
            .raw_data_dir
            .join(&self.data_paths.raw_data_filename)
    }

    pub fn silver_data_path(&self) -> PathBuf {
        self.data_paths
            .silver_data_dir
            .join(&self.data_paths.silver_data_filename)
    }

    pub fn gold_data_path(&self) -> PathBuf {
        self.data_paths
            .gold_data_dir
            .join(&self.data_paths.gold_data_filename)
    }

    pub fn feature_matrix_path(&self) -> PathBuf {
        self.data_paths
            .gold_data_dir
            .join(&self.data_paths.feature_matrix_filename)
    }

    pub fn target_encoder_path(&self) -> PathBuf {
        self.data_paths.artifacts_dir.join("target_encoder.json")
    }

    pub fn onehot_encoder_path(&self) -> PathBuf {
        self.data_paths.artifacts_dir.join("onehot_encoder.json")
    }
}
