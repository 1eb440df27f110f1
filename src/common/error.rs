use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet operation failed: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("raw source is missing required column '{0}'")]
    MissingColumn(String),

    #[error("cannot establish output schema: raw source has no readable header row")]
    EmptySource,

    #[error("chunk {chunk_index} column layout {found:?} does not match established schema {expected:?}")]
    SchemaMismatch {
        chunk_index: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("feature transform failed for chunk {chunk_index} (rows {row_start}..{row_end}): {message}")]
    Transform {
        chunk_index: usize,
        row_start: usize,
        row_end: usize,
        message: String,
    },

    #[error("unseen category '{value}' in column '{column}'")]
    UnseenCategory { column: String, value: String },

    #[error("feature matrix error: {0}")]
    Matrix(String),

    #[error("embedding failed: {0}")]
    Embedding(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
