//! Multimodal feature fusion: encoded categoricals + narrative embeddings.
//!
//! Two-phase, stateful process. Phase one loads the validated dataset once
//! and fits the categorical encoders against a temporary escalation label.
//! Phase two re-iterates the dataset in small chunks, fusing
//! `[target-encoded | one-hot | embedding]` blocks into a preallocated
//! memory-mapped matrix whose row order exactly matches the dataset.

pub mod cardinality;
pub mod encoders;
pub mod matrix;

use std::time::Instant;

use tracing::{debug, info};
use uuid::Uuid;

use crate::common::create_directories;
use crate::common::error::{PipelineError, Result};
use crate::config::PipelineConfig;
use crate::embedder::SentenceEncoder;
use crate::observability::metrics;
use crate::pipeline::gold::escalation_label;
use crate::pipeline::parquet_in::read_silver;
use crate::pipeline::StageSummary;
use crate::schema::ValidatedComplaint;

use encoders::{OneHotEncoder, TargetEncoder};
use matrix::FeatureMatrix;

/// High-cardinality columns, target-encoded one scalar each.
pub const TARGET_ENCODED_COLUMNS: [&str; 3] = ["company", "issue", "sub_product"];

/// Low/medium-cardinality columns, expanded one-hot.
pub const ONE_HOT_COLUMNS: [&str; 2] = ["product", "state"];

fn target_row(record: &ValidatedComplaint) -> Vec<Option<String>> {
    vec![
        Some(record.company.clone()),
        Some(record.issue.clone()),
        record.sub_product.clone(),
    ]
}

fn onehot_row(record: &ValidatedComplaint) -> Vec<Option<String>> {
    vec![Some(record.product.clone()), record.state.clone()]
}

/// The single transform path shared by the fusion loop and inference-time
/// replay: both fitted encoders plus the sentence encoder.
pub struct FeatureTransformer<'a> {
    pub target_encoder: TargetEncoder,
    pub onehot_encoder: OneHotEncoder,
    pub sentence_encoder: &'a dyn SentenceEncoder,
}

impl FeatureTransformer<'_> {
    /// Total fused width: target columns + expanded one-hot levels +
    /// embedding dimension, in that fixed segment order.
    pub fn feature_dim(&self) -> usize {
        self.target_encoder.output_dim()
            + self.onehot_encoder.output_dim()
            + self.sentence_encoder.dimension()
    }

    /// Transform a batch of records into fused feature rows, in input order.
    pub fn transform_batch(&self, records: &[&ValidatedComplaint]) -> Result<Vec<Vec<f32>>> {
        let narratives: Vec<&str> = records.iter().map(|r| r.narrative.as_str()).collect();
        let embed_start = Instant::now();
        let embeddings = self.sentence_encoder.encode_batch(&narratives)?;
        metrics::features::embed_duration(embed_start.elapsed().as_secs_f64());
        if embeddings.len() != records.len() {
            return Err(PipelineError::Embedding(format!(
                "encoder returned {} vectors for {} rows",
                embeddings.len(),
                records.len()
            )));
        }

        let mut block = Vec::with_capacity(records.len());
        for (record, embedding) in records.iter().zip(embeddings) {
            let target = self.target_encoder.transform_row(&target_row(record))?;
            let onehot = self.onehot_encoder.transform_row(&onehot_row(record));
            let mut fused =
                Vec::with_capacity(target.len() + onehot.len() + embedding.len());
            fused.extend(target.iter().map(|v| *v as f32));
            fused.extend(onehot.iter().map(|v| *v as f32));
            fused.extend(embedding);
            block.push(fused);
        }
        Ok(block)
    }
}

/// Fit encoders over the full validated dataset and fuse the feature
/// matrix in chunks.
pub fn run_feature_fusion(
    config: &PipelineConfig,
    sentence_encoder: &dyn SentenceEncoder,
) -> Result<StageSummary> {
    let run_id = Uuid::new_v4();
    let silver_path = config.silver_data_path();
    info!(%run_id, silver = %silver_path.display(), "Fitting tabular encoders");

    let records = read_silver(&silver_path)?;
    let num_rows = records.len();

    // Temporary label, used only to fit the target encoder; the persisted
    // dataset label is derived by the gold stage.
    let labels: Vec<i32> = records
        .iter()
        .map(|r| escalation_label(r.consumer_disputed.as_deref(), &r.timely_response))
        .collect();

    let target_columns: Vec<String> = TARGET_ENCODED_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .collect();
    let target_values = column_major(&records, TARGET_ENCODED_COLUMNS.len(), target_row);
    let target_encoder = TargetEncoder::fit(
        &target_columns,
        &target_values,
        &labels,
        config.features.smoothing,
    );

    let onehot_columns: Vec<String> = ONE_HOT_COLUMNS.iter().map(|c| c.to_string()).collect();
    let onehot_values = column_major(&records, ONE_HOT_COLUMNS.len(), onehot_row);
    let onehot_encoder = OneHotEncoder::fit(&onehot_columns, &onehot_values);

    let transformer = FeatureTransformer {
        target_encoder,
        onehot_encoder,
        sentence_encoder,
    };
    let total_feature_dim = transformer.feature_dim();

    create_directories(&[&config.data_paths.gold_data_dir, &config.data_paths.artifacts_dir])?;
    let matrix_path = config.feature_matrix_path();
    let mut matrix = FeatureMatrix::create(&matrix_path, num_rows, total_feature_dim)?;

    let chunk_size = config.features.chunk_size;
    info!(
        num_rows,
        total_feature_dim, chunk_size, "Starting chunked feature processing"
    );

    for (chunk_index, chunk) in records.chunks(chunk_size).enumerate() {
        let row_start = chunk_index * chunk_size;
        let row_end = row_start + chunk.len();
        let refs: Vec<&ValidatedComplaint> = chunk.iter().collect();
        // Any encoder or embedding failure here is fatal for the run:
        // skipping rows would leave gaps in the preallocated matrix.
        let block = transformer
            .transform_batch(&refs)
            .map_err(|e| PipelineError::Transform {
                chunk_index,
                row_start,
                row_end,
                message: e.to_string(),
            })?;
        matrix.write_rows(row_start, &block)?;
        metrics::features::chunk_processed();
        metrics::features::rows_fused(chunk.len() as u64);
        debug!(
            chunk = chunk_index + 1,
            row_start, row_end, "Feature chunk fused"
        );
    }

    matrix.flush()?;
    transformer
        .target_encoder
        .save(&config.target_encoder_path())?;
    transformer
        .onehot_encoder
        .save(&config.onehot_encoder_path())?;

    info!(
        "Feature matrix saved to disk. Shape: ({}, {})",
        num_rows, total_feature_dim
    );
    Ok(StageSummary::success(
        num_rows,
        num_rows,
        format!(
            "feature matrix ({} x {}) written to {}",
            num_rows,
            total_feature_dim,
            matrix_path.display()
        ),
    ))
}

fn column_major(
    records: &[ValidatedComplaint],
    width: usize,
    extract: fn(&ValidatedComplaint) -> Vec<Option<String>>,
) -> Vec<Vec<Option<String>>> {
    let mut columns = vec![Vec::with_capacity(records.len()); width];
    for record in records {
        for (c, value) in extract(record).into_iter().enumerate() {
            columns[c].push(value);
        }
    }
    columns
}
