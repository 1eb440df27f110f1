//! Fitted categorical encoders and their persisted state.
//!
//! Both encoders are fit exactly once over the full validated dataset and
//! persisted as JSON artifacts. The state uses ordered maps and sorted
//! category lists so a reloaded encoder reproduces the exact same transform
//! (including the one-hot column order) as the fitting run.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::error::{PipelineError, Result};

/// Sentinel category for absent values, so optional columns round-trip
/// deterministically through the artifacts.
pub const MISSING_CATEGORY: &str = "<missing>";

fn category_key(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(str::to_string)
        .unwrap_or_else(|| MISSING_CATEGORY.to_string())
}

/// Replaces each category with the smoothed mean of the binary label over
/// the fitting data: `(sum + smoothing * prior) / (count + smoothing)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEncoder {
    columns: Vec<String>,
    prior: f64,
    smoothing: f64,
    mappings: Vec<BTreeMap<String, f64>>,
}

impl TargetEncoder {
    /// Fit over column-major values; `column_values[c]` is aligned with
    /// `labels` row for row.
    pub fn fit(
        columns: &[String],
        column_values: &[Vec<Option<String>>],
        labels: &[i32],
        smoothing: f64,
    ) -> Self {
        assert_eq!(columns.len(), column_values.len());
        let n = labels.len();
        let prior = if n == 0 {
            0.0
        } else {
            labels.iter().map(|l| *l as f64).sum::<f64>() / n as f64
        };

        let mut mappings = Vec::with_capacity(columns.len());
        for values in column_values {
            assert_eq!(values.len(), n);
            let mut sums: BTreeMap<String, (f64, f64)> = BTreeMap::new();
            for (value, label) in values.iter().zip(labels) {
                let entry = sums.entry(category_key(value)).or_insert((0.0, 0.0));
                entry.0 += *label as f64;
                entry.1 += 1.0;
            }
            let mapping: BTreeMap<String, f64> = sums
                .into_iter()
                .map(|(category, (sum, count))| {
                    (category, (sum + smoothing * prior) / (count + smoothing))
                })
                .collect();
            mappings.push(mapping);
        }

        Self {
            columns: columns.to_vec(),
            prior,
            smoothing,
            mappings,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// One scalar per encoded column.
    pub fn output_dim(&self) -> usize {
        self.columns.len()
    }

    /// Transform one row of the encoded columns, in fitting order. An
    /// unseen category is an error: the fit was supposed to guarantee
    /// coverage, and substituting a value here would silently skew rows.
    pub fn transform_row(&self, row: &[Option<String>]) -> Result<Vec<f64>> {
        assert_eq!(row.len(), self.columns.len());
        let mut out = Vec::with_capacity(row.len());
        for ((value, mapping), column) in row.iter().zip(&self.mappings).zip(&self.columns) {
            let key = category_key(value);
            match mapping.get(&key) {
                Some(encoded) => out.push(*encoded),
                None => {
                    return Err(PipelineError::UnseenCategory {
                        column: column.clone(),
                        value: key,
                    })
                }
            }
        }
        Ok(out)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        info!(path = %path.display(), "Target encoder saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Expands each column into one binary feature per category level observed
/// at fit time, in sorted order. Unknown categories at transform time are
/// ignored (all-zero block).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    pub fn fit(columns: &[String], column_values: &[Vec<Option<String>>]) -> Self {
        assert_eq!(columns.len(), column_values.len());
        let categories = column_values
            .iter()
            .map(|values| {
                let set: BTreeSet<String> = values.iter().map(category_key).collect();
                set.into_iter().collect::<Vec<String>>()
            })
            .collect();
        Self {
            columns: columns.to_vec(),
            categories,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Total expanded category-level count across all columns.
    pub fn output_dim(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn transform_row(&self, row: &[Option<String>]) -> Vec<f64> {
        assert_eq!(row.len(), self.columns.len());
        let mut out = vec![0.0; self.output_dim()];
        let mut offset = 0;
        for (value, levels) in row.iter().zip(&self.categories) {
            let key = category_key(value);
            if let Ok(idx) = levels.binary_search(&key) {
                out[offset + idx] = 1.0;
            }
            offset += levels.len();
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        info!(path = %path.display(), "One-hot encoder saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
