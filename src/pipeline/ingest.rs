//! Chunked bronze → silver ingestion engine.
//!
//! Streams the raw source in bounded-size chunks, validates every row, and
//! appends the survivors of each chunk to a single growing parquet file.
//! The whole raw source is never resident in memory; chunks are processed
//! strictly in source order so the silver row order matches the raw order
//! of the rows that passed validation.

use std::path::Path;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::common::create_directories;
use crate::common::error::{PipelineError, Result};
use crate::config::PipelineConfig;
use crate::observability::metrics;
use crate::pipeline::chunked_reader::{ChunkedCsvReader, RawChunk};
use crate::pipeline::parquet_out::SilverWriter;
use crate::pipeline::StageSummary;
use crate::schema::{validate, RowRejection};

#[derive(Debug, Default)]
struct IngestCounters {
    rows_read: usize,
    rows_dropped_missing_narrative: usize,
    rows_dropped_invalid: usize,
    chunks_processed: usize,
}

/// Run the bronze → silver ingestion pipeline against the configured paths.
pub fn run_ingestion(config: &PipelineConfig) -> Result<StageSummary> {
    let run_id = Uuid::new_v4();
    info!(%run_id, "Starting bronze to silver data ingestion pipeline with chunking");

    let raw_path = config.raw_data_path();
    let silver_path = config.silver_data_path();
    create_directories(&[&config.data_paths.silver_data_dir])?;

    let chunk_size = config.data_source.chunk_size;
    info!(chunk_size, source = %raw_path.display(), "Reading data in chunks");
    let reader = ChunkedCsvReader::open(&raw_path, chunk_size)?;

    ingest_from_chunks(reader, &silver_path, config.data_source.target_rows)
}

/// Ingest from any ordered chunk source. The silver writer is created
/// up front (the output schema is fixed) and finalized on every exit path:
/// on success it is closed; on failure before any durable row the partial
/// file is deleted, otherwise it is closed and left in place for
/// inspection, to be overwritten by a re-run.
pub fn ingest_from_chunks<I>(
    chunks: I,
    silver_path: &Path,
    target_rows: Option<usize>,
) -> Result<StageSummary>
where
    I: IntoIterator<Item = Result<RawChunk>>,
{
    let mut writer = SilverWriter::create(silver_path)?;
    let outcome = process_chunks(chunks, &mut writer, target_rows);
    let rows_written = writer.rows_written();

    match outcome {
        Ok(counters) => {
            writer.finish()?;
            metrics::ingest::rows_written(rows_written as u64);
            info!(
                total_rows_written = rows_written,
                rows_read = counters.rows_read,
                chunks = counters.chunks_processed,
                dropped_missing_narrative = counters.rows_dropped_missing_narrative,
                dropped_invalid = counters.rows_dropped_invalid,
                "Ingestion complete. Total validated rows saved to silver layer: {}",
                rows_written
            );
            Ok(StageSummary::with_drops(
                counters.rows_read,
                rows_written,
                counters.rows_dropped_missing_narrative,
                counters.rows_dropped_invalid,
                format!(
                    "{} validated rows written to {}",
                    rows_written,
                    silver_path.display()
                ),
            ))
        }
        Err(e) => {
            error!(error = %e, "Data ingestion pipeline failed");
            if rows_written == 0 {
                match writer.abort() {
                    Ok(()) => warn!(
                        path = %silver_path.display(),
                        "Cleaned up failed partial file"
                    ),
                    Err(cleanup) => warn!(
                        error = %cleanup,
                        path = %silver_path.display(),
                        "Failed to clean up partial file"
                    ),
                }
            } else {
                // Some rows are already durable; finalize the footer so the
                // partial file stays readable and let a re-run overwrite it.
                if let Err(close_err) = writer.finish() {
                    warn!(error = %close_err, "Failed to finalize partial silver file");
                }
                warn!(
                    rows_written,
                    path = %silver_path.display(),
                    "Partial silver file left in place"
                );
            }
            Err(e)
        }
    }
}

fn process_chunks<I>(
    chunks: I,
    writer: &mut SilverWriter,
    target_rows: Option<usize>,
) -> Result<IngestCounters>
where
    I: IntoIterator<Item = Result<RawChunk>>,
{
    let mut counters = IngestCounters::default();
    let mut established_columns: Option<Vec<String>> = None;
    let mut remaining = target_rows;

    for chunk in chunks {
        let chunk = chunk?;
        info!(chunk = chunk.index + 1, "Processing chunk...");

        // The output schema is fixed by the first chunk's column layout;
        // any later divergence is a fatal inconsistency, not a reindex.
        match &established_columns {
            Some(expected) => {
                if *expected != chunk.columns {
                    return Err(PipelineError::SchemaMismatch {
                        chunk_index: chunk.index,
                        expected: expected.clone(),
                        found: chunk.columns.clone(),
                    });
                }
            }
            None => established_columns = Some(chunk.columns.clone()),
        }

        let rows_in_chunk = chunk.rows.len();
        counters.rows_read += rows_in_chunk;
        metrics::ingest::rows_read(rows_in_chunk as u64);

        let mut validated = Vec::with_capacity(rows_in_chunk);
        let mut missing_narrative = 0usize;
        let mut invalid = 0usize;
        for raw in &chunk.rows {
            match validate(raw) {
                Ok(record) => validated.push(record),
                Err(RowRejection::MissingNarrative) => missing_narrative += 1,
                Err(RowRejection::Invalid(_reason)) => invalid += 1,
            }
        }

        if missing_narrative > 0 {
            warn!(
                "Dropped {} rows due to missing narrative in chunk",
                missing_narrative
            );
        }
        if invalid > 0 {
            warn!("Dropped {} rows due to validation errors in chunk", invalid);
        }

        counters.rows_dropped_missing_narrative += missing_narrative;
        counters.rows_dropped_invalid += invalid;
        metrics::ingest::rows_dropped_missing_narrative(missing_narrative as u64);
        metrics::ingest::rows_dropped_invalid(invalid as u64);

        // Bounded sampling: truncate the final chunk to exactly fill the
        // remaining quota of valid rows.
        let mut quota_filled = false;
        if let Some(left) = remaining {
            if validated.len() >= left {
                validated.truncate(left);
                quota_filled = true;
            }
            remaining = Some(left - validated.len());
        }

        metrics::ingest::rows_validated(validated.len() as u64);
        writer.append_chunk(&validated)?;

        counters.chunks_processed += 1;
        metrics::ingest::chunk_processed();
        info!(
            chunk = chunk.index + 1,
            rows_read = rows_in_chunk,
            rows_validated = validated.len(),
            dropped_missing_narrative = missing_narrative,
            dropped_invalid = invalid,
            total_rows_written = writer.rows_written(),
            "Chunk processed"
        );

        if quota_filled {
            info!(
                target_rows = target_rows.unwrap_or_default(),
                "Reached target row count, stopping before end of source"
            );
            break;
        }
    }

    Ok(counters)
}
