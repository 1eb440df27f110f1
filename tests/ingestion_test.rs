use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::tempdir;

use complaint_priority::pipeline::chunked_reader::{ChunkedCsvReader, RawChunk};
use complaint_priority::pipeline::ingest::ingest_from_chunks;
use complaint_priority::pipeline::parquet_in::read_silver;
use complaint_priority::schema::{RawComplaint, COLUMN_ALIASES};
use complaint_priority::PipelineError;

const RAW_HEADER: [&str; 12] = [
    "Complaint ID",
    "Date received",
    "Product",
    "Sub-product",
    "Issue",
    "Consumer complaint narrative",
    "Company response to consumer",
    "Timely response?",
    "Consumer disputed?",
    "Company",
    "State",
    "Submitted via",
];

const NARRATIVE: &str =
    "I was charged twice for the same transaction and the bank refused to help me resolve it.";

fn valid_row(id: i64) -> Vec<String> {
    vec![
        id.to_string(),
        "2023-05-01".to_string(),
        "Credit card".to_string(),
        "General-purpose credit card".to_string(),
        "Billing disputes".to_string(),
        NARRATIVE.to_string(),
        "Closed with explanation".to_string(),
        "Yes".to_string(),
        "No".to_string(),
        "EXAMPLE BANK".to_string(),
        "CA".to_string(),
        "Web".to_string(),
    ]
}

fn write_csv(path: &Path, rows: &[Vec<String>]) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer.write_record(RAW_HEADER).unwrap();
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.flush().unwrap();
}

fn write_gzipped_csv(path: &Path, rows: &[Vec<String>]) {
    let file = File::create(path).unwrap();
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = csv::Writer::from_writer(encoder);
    writer.write_record(RAW_HEADER).unwrap();
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.flush().unwrap();
    writer.into_inner().unwrap().finish().unwrap();
}

fn canonical_columns() -> Vec<String> {
    COLUMN_ALIASES.iter().map(|(raw, _)| raw.to_string()).collect()
}

fn valid_raw_complaint(id: i64) -> RawComplaint {
    RawComplaint {
        complaint_id: Some(id.to_string()),
        date_received: Some("2023-05-01".into()),
        product: Some("Credit card".into()),
        sub_product: Some("General-purpose credit card".into()),
        issue: Some("Billing disputes".into()),
        consumer_complaint_narrative: Some(NARRATIVE.into()),
        company_response_to_consumer: Some("Closed with explanation".into()),
        timely_response: Some("Yes".into()),
        consumer_disputed: Some("No".into()),
        company: Some("EXAMPLE BANK".into()),
        state: Some("CA".into()),
        submitted_via: Some("Web".into()),
    }
}

fn silver_path(dir: &Path) -> PathBuf {
    dir.join("silver").join("complaints_validated.parquet")
}

#[test]
fn test_row_order_preserved_across_chunk_boundaries() {
    let dir = tempdir().unwrap();
    let raw_path = dir.path().join("complaints.csv");

    // 10 valid rows with a couple of rejects sprinkled in, split across
    // more than three chunk boundaries (chunk size 3).
    let mut rows = Vec::new();
    for id in 1..=10 {
        rows.push(valid_row(id));
        if id % 4 == 0 {
            let mut bad = valid_row(1000 + id);
            bad[7] = "Maybe".to_string();
            rows.push(bad);
        }
    }
    write_csv(&raw_path, &rows);

    let out = silver_path(dir.path());
    let reader = ChunkedCsvReader::open(&raw_path, 3).unwrap();
    let summary = ingest_from_chunks(reader, &out, None).unwrap();

    assert_eq!(summary.rows_written, 10);
    assert_eq!(summary.rows_dropped_invalid, 2);

    let records = read_silver(&out).unwrap();
    let ids: Vec<i64> = records.iter().map(|r| r.complaint_id).collect();
    assert_eq!(ids, (1..=10).collect::<Vec<i64>>());
}

#[test]
fn test_gzip_source_is_streamed() {
    let dir = tempdir().unwrap();
    let raw_path = dir.path().join("complaints.csv.gz");
    let rows: Vec<Vec<String>> = (1..=7).map(valid_row).collect();
    write_gzipped_csv(&raw_path, &rows);

    let out = silver_path(dir.path());
    let reader = ChunkedCsvReader::open(&raw_path, 2).unwrap();
    let summary = ingest_from_chunks(reader, &out, None).unwrap();
    assert_eq!(summary.rows_written, 7);
    assert_eq!(read_silver(&out).unwrap().len(), 7);
}

#[test]
fn test_drop_reasons_are_counted_separately() {
    let dir = tempdir().unwrap();
    let raw_path = dir.path().join("complaints.csv");

    let mut rows = vec![valid_row(1)];
    // Missing narrative
    let mut no_narrative = valid_row(2);
    no_narrative[5] = String::new();
    rows.push(no_narrative);
    // Bad enum value
    let mut bad_timely = valid_row(3);
    bad_timely[7] = "Sometimes".to_string();
    rows.push(bad_timely);
    // Short narrative
    let mut short_narrative = valid_row(4);
    short_narrative[5] = "too short".to_string();
    rows.push(short_narrative);
    rows.push(valid_row(5));
    write_csv(&raw_path, &rows);

    let out = silver_path(dir.path());
    let reader = ChunkedCsvReader::open(&raw_path, 100).unwrap();
    let summary = ingest_from_chunks(reader, &out, None).unwrap();

    assert_eq!(summary.rows_read, 5);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.rows_dropped_missing_narrative, 1);
    assert_eq!(summary.rows_dropped_invalid, 2);
}

#[test]
fn test_divergent_chunk_columns_are_fatal() {
    let dir = tempdir().unwrap();
    let out = silver_path(dir.path());

    let first = RawChunk {
        index: 0,
        columns: canonical_columns(),
        rows: vec![valid_raw_complaint(1)],
    };
    let mut divergent_columns = canonical_columns();
    divergent_columns.pop();
    divergent_columns.push("Tags".to_string());
    let second = RawChunk {
        index: 1,
        columns: divergent_columns,
        rows: vec![valid_raw_complaint(2)],
    };

    let err = ingest_from_chunks(vec![Ok(first), Ok(second)], &out, None).unwrap_err();
    assert!(matches!(err, PipelineError::SchemaMismatch { chunk_index: 1, .. }));
}

#[test]
fn test_bounded_sampling_stops_at_target() {
    let dir = tempdir().unwrap();
    let raw_path = dir.path().join("complaints.csv");
    let rows: Vec<Vec<String>> = (1..=300).map(valid_row).collect();
    write_csv(&raw_path, &rows);

    let out = silver_path(dir.path());
    let reader = ChunkedCsvReader::open(&raw_path, 32).unwrap();
    let summary = ingest_from_chunks(reader, &out, Some(100)).unwrap();

    assert_eq!(summary.rows_written, 100);
    let records = read_silver(&out).unwrap();
    assert_eq!(records.len(), 100);
    let ids: Vec<i64> = records.iter().map(|r| r.complaint_id).collect();
    assert_eq!(ids, (1..=100).collect::<Vec<i64>>());
}

#[test]
fn test_failure_before_any_row_removes_output_file() {
    let dir = tempdir().unwrap();
    let out = silver_path(dir.path());

    let chunks: Vec<complaint_priority::Result<RawChunk>> =
        vec![Err(PipelineError::Config("forced failure".into()))];
    let err = ingest_from_chunks(chunks, &out, None).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
    assert!(!out.exists(), "partial file should have been cleaned up");
}

#[test]
fn test_failure_after_written_chunk_keeps_partial_file() {
    let dir = tempdir().unwrap();
    let out = silver_path(dir.path());

    let first = RawChunk {
        index: 0,
        columns: canonical_columns(),
        rows: vec![valid_raw_complaint(1), valid_raw_complaint(2)],
    };
    let chunks: Vec<complaint_priority::Result<RawChunk>> = vec![
        Ok(first),
        Err(PipelineError::Config("forced failure".into())),
    ];
    let err = ingest_from_chunks(chunks, &out, None).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));

    // The partial file stays in place and is readable.
    let records = read_silver(&out).unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_header_only_source_produces_empty_silver_file() {
    let dir = tempdir().unwrap();
    let raw_path = dir.path().join("complaints.csv");
    write_csv(&raw_path, &[]);

    let out = silver_path(dir.path());
    let reader = ChunkedCsvReader::open(&raw_path, 10).unwrap();
    let summary = ingest_from_chunks(reader, &out, None).unwrap();
    assert_eq!(summary.rows_written, 0);
    assert!(out.exists());
    assert_eq!(read_silver(&out).unwrap().len(), 0);
}

#[test]
fn test_empty_chunk_is_writer_noop() {
    let dir = tempdir().unwrap();
    let out = silver_path(dir.path());

    // A chunk whose rows all fail validation must not error the writer.
    let mut rejected = valid_raw_complaint(1);
    rejected.consumer_complaint_narrative = None;
    let only_invalid = RawChunk {
        index: 0,
        columns: canonical_columns(),
        rows: vec![rejected],
    };
    let second = RawChunk {
        index: 1,
        columns: canonical_columns(),
        rows: vec![valid_raw_complaint(2)],
    };

    let summary =
        ingest_from_chunks(vec![Ok(only_invalid), Ok(second)], &out, None).unwrap();
    assert_eq!(summary.rows_written, 1);
    assert_eq!(summary.rows_dropped_missing_narrative, 1);
}

#[test]
fn test_missing_required_column_is_fatal() {
    let dir = tempdir().unwrap();
    let raw_path = dir.path().join("complaints.csv");
    let mut file = File::create(&raw_path).unwrap();
    writeln!(file, "Complaint ID,Date received,Product").unwrap();
    writeln!(file, "1,2023-05-01,Credit card").unwrap();

    let err = ChunkedCsvReader::open(&raw_path, 10).unwrap_err();
    assert!(matches!(err, PipelineError::MissingColumn(_)));
}

#[test]
fn test_source_without_header_is_fatal() {
    let dir = tempdir().unwrap();
    let raw_path = dir.path().join("empty.csv");
    File::create(&raw_path).unwrap();

    let err = ChunkedCsvReader::open(&raw_path, 10).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::EmptySource | PipelineError::MissingColumn(_)
    ));
}
