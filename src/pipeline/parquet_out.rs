//! Columnar output for the silver and gold layers.
//!
//! The silver file grows one row group per validated chunk through
//! [`SilverWriter`]; the gold file is rewritten wholesale each run.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parquet::basic::{Compression, ConvertedType, LogicalType, Repetition, Type as PhysicalType};
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::{SerializedFileWriter, SerializedRowGroupWriter};
use parquet::schema::types::{Type, TypePtr};
use tracing::{debug, info};

use crate::common::error::Result;
use crate::schema::{GoldComplaint, ValidatedComplaint};

/// Row group size for the wholesale gold rewrite.
const GOLD_ROW_GROUP_SIZE: usize = 50_000;

fn utf8_field(name: &str, repetition: Repetition) -> TypePtr {
    Arc::new(
        Type::primitive_type_builder(name, PhysicalType::BYTE_ARRAY)
            .with_logical_type(Some(LogicalType::String))
            .with_repetition(repetition)
            .build()
            .unwrap(),
    )
}

fn int64_field(name: &str) -> TypePtr {
    Arc::new(
        Type::primitive_type_builder(name, PhysicalType::INT64)
            .with_repetition(Repetition::REQUIRED)
            .build()
            .unwrap(),
    )
}

fn timestamp_field(name: &str) -> TypePtr {
    Arc::new(
        Type::primitive_type_builder(name, PhysicalType::INT64)
            .with_converted_type(ConvertedType::TIMESTAMP_MILLIS)
            .with_repetition(Repetition::REQUIRED)
            .build()
            .unwrap(),
    )
}

fn int32_field(name: &str) -> TypePtr {
    Arc::new(
        Type::primitive_type_builder(name, PhysicalType::INT32)
            .with_repetition(Repetition::REQUIRED)
            .build()
            .unwrap(),
    )
}

fn validated_fields() -> Vec<TypePtr> {
    vec![
        int64_field("complaint_id"),
        timestamp_field("date_received"),
        utf8_field("product", Repetition::REQUIRED),
        utf8_field("sub_product", Repetition::OPTIONAL),
        utf8_field("issue", Repetition::REQUIRED),
        utf8_field("narrative", Repetition::REQUIRED),
        utf8_field("company_response", Repetition::REQUIRED),
        utf8_field("timely_response", Repetition::REQUIRED),
        utf8_field("consumer_disputed", Repetition::OPTIONAL),
        utf8_field("company", Repetition::REQUIRED),
        utf8_field("state", Repetition::OPTIONAL),
        utf8_field("submitted_via", Repetition::REQUIRED),
    ]
}

/// The fixed silver-layer schema.
pub fn silver_schema() -> TypePtr {
    Arc::new(
        Type::group_type_builder("silver")
            .with_fields(validated_fields())
            .build()
            .unwrap(),
    )
}

/// Silver schema plus the derived label column.
pub fn gold_schema() -> TypePtr {
    let mut fields = validated_fields();
    fields.push(int32_field("escalation_risk"));
    Arc::new(
        Type::group_type_builder("gold")
            .with_fields(fields)
            .build()
            .unwrap(),
    )
}

fn writer_properties() -> Arc<WriterProperties> {
    Arc::new(
        WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build(),
    )
}

fn write_required_i64(
    col: &mut ColumnWriter<'_>,
    values: &[i64],
) -> Result<()> {
    match col {
        ColumnWriter::Int64ColumnWriter(cw) => {
            cw.write_batch(values, None, None)?;
        }
        _ => unreachable!("Unexpected column type - schema mismatch"),
    }
    Ok(())
}

fn write_required_i32(
    col: &mut ColumnWriter<'_>,
    values: &[i32],
) -> Result<()> {
    match col {
        ColumnWriter::Int32ColumnWriter(cw) => {
            cw.write_batch(values, None, None)?;
        }
        _ => unreachable!("Unexpected column type - schema mismatch"),
    }
    Ok(())
}

fn write_required_strings<'a>(
    col: &mut ColumnWriter<'_>,
    values: impl Iterator<Item = &'a str>,
) -> Result<()> {
    let data: Vec<ByteArray> = values.map(ByteArray::from).collect();
    match col {
        ColumnWriter::ByteArrayColumnWriter(cw) => {
            cw.write_batch(&data, None, None)?;
        }
        _ => unreachable!("Unexpected column type - schema mismatch"),
    }
    Ok(())
}

fn write_optional_strings<'a>(
    col: &mut ColumnWriter<'_>,
    values: impl Iterator<Item = Option<&'a str>>,
) -> Result<()> {
    let mut data = Vec::new();
    let mut def_levels = Vec::new();
    for value in values {
        match value {
            Some(s) => {
                data.push(ByteArray::from(s));
                def_levels.push(1i16);
            }
            None => def_levels.push(0i16),
        }
    }
    match col {
        ColumnWriter::ByteArrayColumnWriter(cw) => {
            cw.write_batch(&data, Some(&def_levels), None)?;
        }
        _ => unreachable!("Unexpected column type - schema mismatch"),
    }
    Ok(())
}

fn write_validated_columns<W: std::io::Write + Send>(
    rg: &mut SerializedRowGroupWriter<'_, W>,
    records: &[&ValidatedComplaint],
    labels: Option<&[i32]>,
) -> Result<()> {
    let mut col_index = 0;
    while let Some(mut col) = rg.next_column()? {
        let writer = col.untyped();
        match col_index {
            0 => {
                let ids: Vec<i64> = records.iter().map(|r| r.complaint_id).collect();
                write_required_i64(writer, &ids)?;
            }
            1 => {
                let ts: Vec<i64> = records
                    .iter()
                    .map(|r| r.date_received.and_utc().timestamp_millis())
                    .collect();
                write_required_i64(writer, &ts)?;
            }
            2 => write_required_strings(writer, records.iter().map(|r| r.product.as_str()))?,
            3 => write_optional_strings(writer, records.iter().map(|r| r.sub_product.as_deref()))?,
            4 => write_required_strings(writer, records.iter().map(|r| r.issue.as_str()))?,
            5 => write_required_strings(writer, records.iter().map(|r| r.narrative.as_str()))?,
            6 => {
                write_required_strings(writer, records.iter().map(|r| r.company_response.as_str()))?
            }
            7 => {
                write_required_strings(writer, records.iter().map(|r| r.timely_response.as_str()))?
            }
            8 => write_optional_strings(
                writer,
                records.iter().map(|r| r.consumer_disputed.as_deref()),
            )?,
            9 => write_required_strings(writer, records.iter().map(|r| r.company.as_str()))?,
            10 => write_optional_strings(writer, records.iter().map(|r| r.state.as_deref()))?,
            11 => write_required_strings(writer, records.iter().map(|r| r.submitted_via.as_str()))?,
            12 => {
                let labels = labels.expect("label column only exists in the gold schema");
                write_required_i32(writer, labels)?;
            }
            _ => unreachable!("Unexpected column index - schema mismatch"),
        }
        col.close()?;
        col_index += 1;
    }
    Ok(())
}

/// Incremental writer for the silver layer. Created once per ingestion run,
/// appends one row group per non-empty chunk, and must be finalized through
/// [`SilverWriter::finish`] or [`SilverWriter::abort`] on every exit path.
pub struct SilverWriter {
    writer: SerializedFileWriter<File>,
    path: PathBuf,
    rows_written: usize,
}

impl SilverWriter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let writer = SerializedFileWriter::new(file, silver_schema(), writer_properties())?;
        info!(path = %path.display(), "Initialized silver parquet writer");
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows_written: 0,
        })
    }

    /// Append one validated chunk as a row group. An empty chunk is a no-op.
    pub fn append_chunk(&mut self, records: &[ValidatedComplaint]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let refs: Vec<&ValidatedComplaint> = records.iter().collect();
        let mut rg = self.writer.next_row_group()?;
        write_validated_columns(&mut rg, &refs, None)?;
        rg.close()?;
        self.rows_written += records.len();
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the writer, finalizing the file structure. Must be called
    /// exactly once on the success path.
    pub fn finish(self) -> Result<usize> {
        let rows = self.rows_written;
        self.writer.close()?;
        debug!(rows, "Closed silver parquet writer, file is finalized");
        Ok(rows)
    }

    /// Close best-effort and delete the partial file. Used when a run fails
    /// before any row was durably written.
    pub fn abort(self) -> Result<()> {
        let path = self.path.clone();
        let _ = self.writer.close();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// Full rewrite of the gold layer; replaces any prior gold file.
pub fn write_gold(path: &Path, records: &[GoldComplaint]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = SerializedFileWriter::new(file, gold_schema(), writer_properties())?;
    for batch in records.chunks(GOLD_ROW_GROUP_SIZE) {
        let validated: Vec<&ValidatedComplaint> = batch.iter().map(|g| &g.record).collect();
        let labels: Vec<i32> = batch.iter().map(|g| g.escalation_risk).collect();
        let mut rg = writer.next_row_group()?;
        write_validated_columns(&mut rg, &validated, Some(&labels))?;
        rg.close()?;
    }
    writer.close()?;
    debug!(rows = records.len(), path = %path.display(), "Gold parquet file written");
    Ok(())
}
