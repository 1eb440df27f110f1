//! fastembed-backed MiniLM sentence encoder.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::SentenceEncoder;
use crate::common::error::{PipelineError, Result};

/// all-MiniLM-L6-v2 output width.
pub const MINILM_DIMENSION: usize = 384;

pub struct MiniLmEncoder {
    model: TextEmbedding,
}

impl MiniLmEncoder {
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(true),
        )
        .map_err(|e| PipelineError::Embedding(e.to_string()))?;
        Ok(Self { model })
    }
}

impl SentenceEncoder for MiniLmEncoder {
    fn dimension(&self) -> usize {
        MINILM_DIMENSION
    }

    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| PipelineError::Embedding(e.to_string()))?;
        if embeddings.len() != texts.len() {
            return Err(PipelineError::Embedding(format!(
                "model returned {} embeddings for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }
        Ok(embeddings)
    }
}
