//! Cardinality report over the tabular columns of the silver dataset.
//!
//! Used to pick encoding strategies: high-cardinality columns get target
//! encoding, low/medium ones get one-hot expansion.

use std::collections::BTreeSet;

use tracing::info;

use crate::common::error::Result;
use crate::config::PipelineConfig;
use crate::features::encoders::MISSING_CATEGORY;
use crate::pipeline::parquet_in::read_silver;
use crate::schema::ValidatedComplaint;

const TABULAR_COLS: [&str; 8] = [
    "product",
    "sub_product",
    "issue",
    "company",
    "state",
    "submitted_via",
    "timely_response",
    "consumer_disputed",
];

fn column_value(record: &ValidatedComplaint, column: &str) -> String {
    let value = match column {
        "product" => Some(record.product.clone()),
        "sub_product" => record.sub_product.clone(),
        "issue" => Some(record.issue.clone()),
        "company" => Some(record.company.clone()),
        "state" => record.state.clone(),
        "submitted_via" => Some(record.submitted_via.clone()),
        "timely_response" => Some(record.timely_response.clone()),
        "consumer_disputed" => record.consumer_disputed.clone(),
        _ => unreachable!("unknown tabular column"),
    };
    value.unwrap_or_else(|| MISSING_CATEGORY.to_string())
}

/// Print unique-value counts and samples for every tabular column.
pub fn analyze_tabular_values(config: &PipelineConfig) -> Result<()> {
    let silver_path = config.silver_data_path();
    info!(silver = %silver_path.display(), "Analyzing column cardinality");

    let records = read_silver(&silver_path)?;

    println!("\n{}", "=".repeat(60));
    println!("{:<20} | {:<15} | {}", "COLUMN", "UNIQUE COUNT", "SAMPLE VALUES");
    println!("{}", "-".repeat(60));

    for column in TABULAR_COLS {
        let uniques: BTreeSet<String> = records
            .iter()
            .map(|record| column_value(record, column))
            .collect();
        let sample: Vec<&String> = uniques.iter().take(3).collect();
        println!(
            "{:<20} | {:<15} | {:?}...",
            column,
            uniques.len(),
            sample
        );
    }

    println!("{}\n", "=".repeat(60));
    Ok(())
}
