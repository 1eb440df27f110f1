pub mod chunked_reader;
pub mod gold;
pub mod ingest;
pub mod parquet_in;
pub mod parquet_out;

/// Result of executing a pipeline stage
#[derive(Debug, Clone)]
pub struct StageSummary {
    pub success: bool,
    pub rows_read: usize,
    pub rows_written: usize,
    pub rows_dropped_missing_narrative: usize,
    pub rows_dropped_invalid: usize,
    pub message: String,
}

impl StageSummary {
    pub fn success(rows_read: usize, rows_written: usize, message: String) -> Self {
        Self {
            success: true,
            rows_read,
            rows_written,
            rows_dropped_missing_narrative: 0,
            rows_dropped_invalid: 0,
            message,
        }
    }

    pub fn with_drops(
        rows_read: usize,
        rows_written: usize,
        missing_narrative: usize,
        invalid: usize,
        message: String,
    ) -> Self {
        Self {
            success: true,
            rows_read,
            rows_written,
            rows_dropped_missing_narrative: missing_narrative,
            rows_dropped_invalid: invalid,
            message,
        }
    }
}
