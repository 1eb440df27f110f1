//! Silver → gold: escalation-risk labeling and narrative normalization.
//!
//! A pure, single-pass, whole-dataset transform. The gold file is fully
//! rewritten each run, never appended.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;
use uuid::Uuid;

use crate::common::create_directories;
use crate::common::error::Result;
use crate::config::PipelineConfig;
use crate::observability::metrics;
use crate::pipeline::parquet_in::read_silver;
use crate::pipeline::parquet_out::write_gold;
use crate::pipeline::StageSummary;
use crate::schema::GoldComplaint;

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// escalation_risk = 1 if the consumer disputed the response or the company
/// missed the response SLA; both inputs are already-validated enum values.
pub fn escalation_label(consumer_disputed: Option<&str>, timely_response: &str) -> i32 {
    if consumer_disputed == Some("Yes") || timely_response == "No" {
        1
    } else {
        0
    }
}

/// Lowercase the narrative, collapse internal whitespace runs (including
/// newlines and tabs) to single spaces, and trim. Idempotent.
pub fn normalize_narrative(s: &str) -> String {
    let lowered = s.to_lowercase();
    WHITESPACE_RUNS.replace_all(&lowered, " ").trim().to_string()
}

/// Build the gold layer from the silver dataset.
pub fn run_gold_build(config: &PipelineConfig) -> Result<StageSummary> {
    let run_id = Uuid::new_v4();
    let silver_path = config.silver_data_path();
    let gold_path = config.gold_data_path();

    info!(%run_id, silver = %silver_path.display(), "Loading silver data");
    let records = read_silver(&silver_path)?;
    let rows_read = records.len();

    info!("Applying labeling rules to create target variable `escalation_risk`...");
    let mut positives = 0usize;
    let gold: Vec<GoldComplaint> = records
        .into_iter()
        .map(|mut record| {
            let escalation_risk =
                escalation_label(record.consumer_disputed.as_deref(), &record.timely_response);
            if escalation_risk == 1 {
                positives += 1;
            }
            record.narrative = normalize_narrative(&record.narrative);
            GoldComplaint {
                record,
                escalation_risk,
            }
        })
        .collect();

    if rows_read > 0 {
        let positive_pct = 100.0 * positives as f64 / rows_read as f64;
        info!(
            positives,
            negatives = rows_read - positives,
            positive_pct = format!("{:.2}", positive_pct),
            "Label distribution"
        );
    }
    metrics::gold::rows_labeled(rows_read as u64);
    metrics::gold::positive_labels(positives as u64);

    create_directories(&[&config.data_paths.gold_data_dir])?;
    info!(gold = %gold_path.display(), "Saving gold dataset");
    write_gold(&gold_path, &gold)?;

    info!(
        "Gold layer built successfully with {} labeled records",
        gold.len()
    );
    Ok(StageSummary::success(
        rows_read,
        gold.len(),
        format!("{} labeled rows written to {}", gold.len(), gold_path.display()),
    ))
}
