//! Streaming chunk reader over the raw complaints file.
//!
//! Reads the bronze CSV strictly forward in bounded-size chunks so the
//! whole source is never resident in memory. Gzip-compressed archives are
//! decoded on the fly.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::debug;

use crate::common::error::{PipelineError, Result};
use crate::schema::{RawComplaint, COLUMN_ALIASES};

/// A bounded-size contiguous slice of raw rows, carrying the column layout
/// it was read under so downstream appends can verify schema consistency.
#[derive(Debug, Clone)]
pub struct RawChunk {
    pub index: usize,
    pub columns: Vec<String>,
    pub rows: Vec<RawComplaint>,
}

/// Index of each mapped column within the CSV header, resolved once.
#[derive(Debug)]
struct ColumnIndices {
    complaint_id: usize,
    date_received: usize,
    product: usize,
    sub_product: usize,
    issue: usize,
    narrative: usize,
    company_response: usize,
    timely_response: usize,
    consumer_disputed: usize,
    company: usize,
    state: usize,
    submitted_via: usize,
}

pub struct ChunkedCsvReader {
    reader: csv::Reader<Box<dyn Read>>,
    indices: ColumnIndices,
    columns: Vec<String>,
    chunk_size: usize,
    next_index: usize,
    done: bool,
}

impl std::fmt::Debug for ChunkedCsvReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedCsvReader")
            .field("indices", &self.indices)
            .field("columns", &self.columns)
            .field("chunk_size", &self.chunk_size)
            .field("next_index", &self.next_index)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl ChunkedCsvReader {
    /// Open the raw source and resolve the header against the alias table.
    /// Every mapped raw column must be present.
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        let input: Box<dyn Read> = if path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false)
        {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input);

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(PipelineError::EmptySource);
        }

        let position_of = |raw_name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim() == raw_name)
                .ok_or_else(|| PipelineError::MissingColumn(raw_name.to_string()))
        };

        let indices = ColumnIndices {
            complaint_id: position_of("Complaint ID")?,
            date_received: position_of("Date received")?,
            product: position_of("Product")?,
            sub_product: position_of("Sub-product")?,
            issue: position_of("Issue")?,
            narrative: position_of("Consumer complaint narrative")?,
            company_response: position_of("Company response to consumer")?,
            timely_response: position_of("Timely response?")?,
            consumer_disputed: position_of("Consumer disputed?")?,
            company: position_of("Company")?,
            state: position_of("State")?,
            submitted_via: position_of("Submitted via")?,
        };

        // Column layout in canonical alias-table order; every chunk carries
        // it so appends can be checked against the established schema.
        let columns: Vec<String> = COLUMN_ALIASES
            .iter()
            .map(|(raw, _)| raw.to_string())
            .collect();

        debug!(
            path = %path.display(),
            chunk_size,
            "Opened raw source for chunked reading"
        );

        Ok(Self {
            reader,
            indices,
            columns,
            chunk_size,
            next_index: 0,
            done: false,
        })
    }

    /// The resolved raw column layout, in alias-table order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn record_to_raw(&self, record: &csv::StringRecord) -> RawComplaint {
        let get = |idx: usize| -> Option<String> {
            record
                .get(idx)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        RawComplaint {
            complaint_id: get(self.indices.complaint_id),
            date_received: get(self.indices.date_received),
            product: get(self.indices.product),
            sub_product: get(self.indices.sub_product),
            issue: get(self.indices.issue),
            consumer_complaint_narrative: get(self.indices.narrative),
            company_response_to_consumer: get(self.indices.company_response),
            timely_response: get(self.indices.timely_response),
            consumer_disputed: get(self.indices.consumer_disputed),
            company: get(self.indices.company),
            state: get(self.indices.state),
            submitted_via: get(self.indices.submitted_via),
        }
    }
}

impl Iterator for ChunkedCsvReader {
    type Item = Result<RawChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut rows = Vec::with_capacity(self.chunk_size);
        let mut record = csv::StringRecord::new();
        while rows.len() < self.chunk_size {
            match self.reader.read_record(&mut record) {
                Ok(true) => rows.push(self.record_to_raw(&record)),
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
        if rows.is_empty() {
            return None;
        }
        let chunk = RawChunk {
            index: self.next_index,
            columns: self.columns.clone(),
            rows,
        };
        self.next_index += 1;
        Some(Ok(chunk))
    }
}
