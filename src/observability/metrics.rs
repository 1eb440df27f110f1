//! Simple metrics module for the complaint pipeline
//!
//! Provides a straightforward API for recording metrics using standard
//! Prometheus naming conventions. The batch stages increment counters as
//! they go; at the end of a run the rendered recorder output is logged.

use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Enum representing all metric names used in the system
/// This eliminates magic strings and provides compile-time safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Ingestion metrics
    IngestRowsRead,
    IngestRowsValidated,
    IngestRowsDroppedMissingNarrative,
    IngestRowsDroppedInvalid,
    IngestChunksProcessed,
    IngestRowsWritten,

    // Gold layer metrics
    GoldRowsLabeled,
    GoldPositiveLabels,

    // Feature fusion metrics
    FeaturesChunksProcessed,
    FeaturesRowsFused,
    FeaturesEmbedDuration,

    // Download metrics
    DownloadBytes,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::IngestRowsRead => "cp_ingest_rows_read_total",
            MetricName::IngestRowsValidated => "cp_ingest_rows_validated_total",
            MetricName::IngestRowsDroppedMissingNarrative => {
                "cp_ingest_rows_dropped_missing_narrative_total"
            }
            MetricName::IngestRowsDroppedInvalid => "cp_ingest_rows_dropped_invalid_total",
            MetricName::IngestChunksProcessed => "cp_ingest_chunks_processed_total",
            MetricName::IngestRowsWritten => "cp_ingest_rows_written_total",
            MetricName::GoldRowsLabeled => "cp_gold_rows_labeled_total",
            MetricName::GoldPositiveLabels => "cp_gold_positive_labels_total",
            MetricName::FeaturesChunksProcessed => "cp_features_chunks_processed_total",
            MetricName::FeaturesRowsFused => "cp_features_rows_fused_total",
            MetricName::FeaturesEmbedDuration => "cp_features_embed_duration_seconds",
            MetricName::DownloadBytes => "cp_download_bytes",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<Arc<metrics_exporter_prometheus::PrometheusHandle>> =
    OnceLock::new();

/// Install the Prometheus recorder once per process.
pub fn init() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    match builder.install_recorder() {
        Ok(handle) => {
            METRICS_HANDLE.set(Arc::new(handle)).ok();
            info!("Metrics recorder installed");
        }
        Err(e) => {
            debug!("Metrics recorder install failed (possibly already installed): {}", e);
        }
    }
}

/// Log the rendered metrics snapshot; called at the end of a stage run.
pub fn log_snapshot() {
    if let Some(handle) = METRICS_HANDLE.get() {
        debug!(metrics = %handle.render(), "Metrics snapshot");
    }
}

// ============================================================================
// Ingestion Metrics
// ============================================================================

pub mod ingest {
    use super::MetricName;

    pub fn rows_read(count: u64) {
        ::metrics::counter!(MetricName::IngestRowsRead.as_str()).increment(count);
    }

    pub fn rows_validated(count: u64) {
        ::metrics::counter!(MetricName::IngestRowsValidated.as_str()).increment(count);
    }

    pub fn rows_dropped_missing_narrative(count: u64) {
        ::metrics::counter!(MetricName::IngestRowsDroppedMissingNarrative.as_str())
            .increment(count);
    }

    pub fn rows_dropped_invalid(count: u64) {
        ::metrics::counter!(MetricName::IngestRowsDroppedInvalid.as_str()).increment(count);
    }

    pub fn chunk_processed() {
        ::metrics::counter!(MetricName::IngestChunksProcessed.as_str()).increment(1);
    }

    pub fn rows_written(count: u64) {
        ::metrics::counter!(MetricName::IngestRowsWritten.as_str()).increment(count);
    }
}

// ============================================================================
// Gold Layer Metrics
// ============================================================================

pub mod gold {
    use super::MetricName;

    pub fn rows_labeled(count: u64) {
        ::metrics::counter!(MetricName::GoldRowsLabeled.as_str()).increment(count);
    }

    pub fn positive_labels(count: u64) {
        ::metrics::counter!(MetricName::GoldPositiveLabels.as_str()).increment(count);
    }
}

// ============================================================================
// Feature Fusion Metrics
// ============================================================================

pub mod features {
    use super::MetricName;

    pub fn chunk_processed() {
        ::metrics::counter!(MetricName::FeaturesChunksProcessed.as_str()).increment(1);
    }

    pub fn rows_fused(count: u64) {
        ::metrics::counter!(MetricName::FeaturesRowsFused.as_str()).increment(count);
    }

    pub fn embed_duration(secs: f64) {
        ::metrics::histogram!(MetricName::FeaturesEmbedDuration.as_str()).record(secs);
    }
}

// ============================================================================
// Download Metrics
// ============================================================================

pub mod download {
    use super::MetricName;

    pub fn bytes(count: u64) {
        ::metrics::counter!(MetricName::DownloadBytes.as_str()).increment(count);
    }
}
