//! Row-based readers for the silver and gold layers.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use parquet::errors::ParquetError;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Field, Row};

use crate::common::error::Result;
use crate::schema::{GoldComplaint, ValidatedComplaint};

/// Load the whole silver dataset in file order.
pub fn read_silver(path: &Path) -> Result<Vec<ValidatedComplaint>> {
    let file = File::open(path)?;
    let reader = SerializedFileReader::new(file)?;
    let num_rows = reader.metadata().file_metadata().num_rows() as usize;
    let mut records = Vec::with_capacity(num_rows);
    for row in reader.get_row_iter(None)? {
        let row = row?;
        records.push(validated_from_row(&row)?);
    }
    Ok(records)
}

/// Load the whole gold dataset in file order.
pub fn read_gold(path: &Path) -> Result<Vec<GoldComplaint>> {
    let file = File::open(path)?;
    let reader = SerializedFileReader::new(file)?;
    let num_rows = reader.metadata().file_metadata().num_rows() as usize;
    let mut records = Vec::with_capacity(num_rows);
    for row in reader.get_row_iter(None)? {
        let row = row?;
        let record = validated_from_row(&row)?;
        let escalation_risk = req_i32(&field_map(&row), "escalation_risk")?;
        records.push(GoldComplaint {
            record,
            escalation_risk,
        });
    }
    Ok(records)
}

fn field_map(row: &Row) -> HashMap<&str, &Field> {
    row.get_column_iter()
        .map(|(name, field)| (name.as_str(), field))
        .collect()
}

fn validated_from_row(row: &Row) -> Result<ValidatedComplaint> {
    let map = field_map(row);
    Ok(ValidatedComplaint {
        complaint_id: req_i64(&map, "complaint_id")?,
        date_received: req_timestamp(&map, "date_received")?,
        product: req_str(&map, "product")?,
        sub_product: opt_str(&map, "sub_product")?,
        issue: req_str(&map, "issue")?,
        narrative: req_str(&map, "narrative")?,
        company_response: req_str(&map, "company_response")?,
        timely_response: req_str(&map, "timely_response")?,
        consumer_disputed: opt_str(&map, "consumer_disputed")?,
        company: req_str(&map, "company")?,
        state: opt_str(&map, "state")?,
        submitted_via: req_str(&map, "submitted_via")?,
    })
}

fn missing(name: &str) -> ParquetError {
    ParquetError::General(format!("column '{}' missing from row", name))
}

fn mismatch(name: &str, field: &Field) -> ParquetError {
    ParquetError::General(format!("column '{}' has unexpected type: {:?}", name, field))
}

fn req_str(map: &HashMap<&str, &Field>, name: &str) -> Result<String> {
    match map.get(name) {
        Some(Field::Str(s)) => Ok(s.clone()),
        Some(other) => Err(mismatch(name, other).into()),
        None => Err(missing(name).into()),
    }
}

fn opt_str(map: &HashMap<&str, &Field>, name: &str) -> Result<Option<String>> {
    match map.get(name) {
        Some(Field::Str(s)) => Ok(Some(s.clone())),
        Some(Field::Null) => Ok(None),
        Some(other) => Err(mismatch(name, other).into()),
        None => Err(missing(name).into()),
    }
}

fn req_i64(map: &HashMap<&str, &Field>, name: &str) -> Result<i64> {
    match map.get(name) {
        Some(Field::Long(v)) => Ok(*v),
        Some(other) => Err(mismatch(name, other).into()),
        None => Err(missing(name).into()),
    }
}

fn req_i32(map: &HashMap<&str, &Field>, name: &str) -> Result<i32> {
    match map.get(name) {
        Some(Field::Int(v)) => Ok(*v),
        Some(other) => Err(mismatch(name, other).into()),
        None => Err(missing(name).into()),
    }
}

fn req_timestamp(map: &HashMap<&str, &Field>, name: &str) -> Result<NaiveDateTime> {
    let millis = match map.get(name) {
        Some(Field::TimestampMillis(ms)) => *ms,
        Some(Field::Long(v)) => *v,
        Some(other) => return Err(mismatch(name, other).into()),
        None => return Err(missing(name).into()),
    };
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| {
            ParquetError::General(format!("column '{}' holds out-of-range timestamp", name)).into()
        })
}
