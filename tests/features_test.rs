use std::path::Path;

use chrono::NaiveDate;
use tempfile::tempdir;

use complaint_priority::config::{
    DataPathsConfig, DataSourceConfig, FeatureConfig, PipelineConfig,
};
use complaint_priority::embedder::HashedProjectionEncoder;
use complaint_priority::features::encoders::{OneHotEncoder, TargetEncoder};
use complaint_priority::features::matrix::read_matrix;
use complaint_priority::features::{run_feature_fusion, FeatureTransformer};
use complaint_priority::pipeline::parquet_out::SilverWriter;
use complaint_priority::schema::ValidatedComplaint;

const PRODUCTS: [&str; 3] = ["Credit card", "Mortgage", "Student loan"];
const ISSUES: [&str; 4] = [
    "Billing disputes",
    "Loan servicing",
    "Incorrect information",
    "Communication tactics",
];
const COMPANIES: [&str; 5] = ["ACME BANK", "GLOBEX", "INITECH", "UMBRELLA", "WONKA FINANCIAL"];
const STATES: [&str; 4] = ["CA", "WA", "NY", "TX"];

fn make_record(i: usize) -> ValidatedComplaint {
    ValidatedComplaint {
        complaint_id: i as i64 + 1,
        date_received: NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        product: PRODUCTS[i % PRODUCTS.len()].to_string(),
        sub_product: if i % 7 == 0 {
            None
        } else {
            Some(format!("Sub-product {}", i % 5))
        },
        issue: ISSUES[i % ISSUES.len()].to_string(),
        narrative: format!(
            "complaint number {} about repeated billing errors and unresponsive support staff",
            i
        ),
        company_response: "Closed with explanation".to_string(),
        timely_response: if i % 3 == 0 { "No" } else { "Yes" }.to_string(),
        consumer_disputed: match i % 3 {
            0 => Some("Yes".to_string()),
            1 => Some("No".to_string()),
            _ => None,
        },
        company: COMPANIES[i % COMPANIES.len()].to_string(),
        state: if i % 11 == 0 {
            None
        } else {
            Some(STATES[i % STATES.len()].to_string())
        },
        submitted_via: "Web".to_string(),
    }
}

fn write_silver(path: &Path, records: &[ValidatedComplaint]) {
    let mut writer = SilverWriter::create(path).unwrap();
    for chunk in records.chunks(100) {
        writer.append_chunk(chunk).unwrap();
    }
    writer.finish().unwrap();
}

fn test_config(root: &Path) -> PipelineConfig {
    PipelineConfig {
        data_source: DataSourceConfig {
            download_url: "https://example.com/complaints.csv.gz".to_string(),
            chunk_size: 1000,
            target_rows: None,
        },
        data_paths: DataPathsConfig {
            raw_data_dir: root.join("bronze"),
            raw_data_filename: "complaints.csv.gz".to_string(),
            silver_data_dir: root.join("silver"),
            silver_data_filename: "complaints_validated.parquet".to_string(),
            gold_data_dir: root.join("gold"),
            gold_data_filename: "complaints_labeled.parquet".to_string(),
            feature_matrix_filename: "feature_matrix.dat".to_string(),
            artifacts_dir: root.join("artifacts"),
        },
        features: FeatureConfig {
            chunk_size: 64,
            embedding_dim: 16,
            encoder_seed: 42,
            smoothing: 1.0,
        },
    }
}

#[test]
fn test_fused_matrix_rows_align_with_dataset_rows() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let records: Vec<ValidatedComplaint> = (0..250).map(make_record).collect();
    write_silver(&config.silver_data_path(), &records);

    let encoder = HashedProjectionEncoder::new(
        config.features.embedding_dim,
        config.features.encoder_seed,
    );
    let summary = run_feature_fusion(&config, &encoder).unwrap();
    assert_eq!(summary.rows_written, 250);

    // Reconstruct the transform from the persisted artifacts alone.
    let transformer = FeatureTransformer {
        target_encoder: TargetEncoder::load(&config.target_encoder_path()).unwrap(),
        onehot_encoder: OneHotEncoder::load(&config.onehot_encoder_path()).unwrap(),
        sentence_encoder: &encoder,
    };
    let dim = transformer.feature_dim();

    let matrix = read_matrix(&config.feature_matrix_path(), dim).unwrap();
    assert_eq!(matrix.len(), 250);

    // Row 130 of the matrix equals row 130 transformed in isolation.
    let isolated = transformer.transform_batch(&[&records[130]]).unwrap();
    assert_eq!(matrix[130], isolated[0]);

    // Spot-check the first and last rows too.
    let first = transformer.transform_batch(&[&records[0]]).unwrap();
    assert_eq!(matrix[0], first[0]);
    let last = transformer.transform_batch(&[&records[249]]).unwrap();
    assert_eq!(matrix[249], last[0]);
}

#[test]
fn test_feature_dim_recomputable_from_artifacts() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let records: Vec<ValidatedComplaint> = (0..120).map(make_record).collect();
    write_silver(&config.silver_data_path(), &records);

    let encoder = HashedProjectionEncoder::new(
        config.features.embedding_dim,
        config.features.encoder_seed,
    );
    run_feature_fusion(&config, &encoder).unwrap();

    let te = TargetEncoder::load(&config.target_encoder_path()).unwrap();
    let ohe = OneHotEncoder::load(&config.onehot_encoder_path()).unwrap();
    let dim = te.output_dim() + ohe.output_dim() + config.features.embedding_dim;
    assert_eq!(te.output_dim(), 3);

    let file_len = std::fs::metadata(config.feature_matrix_path()).unwrap().len();
    assert_eq!(file_len, (120 * dim * 4) as u64);
}

#[test]
fn test_persisted_encoders_replay_identical_transforms() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let records: Vec<ValidatedComplaint> = (0..80).map(make_record).collect();
    write_silver(&config.silver_data_path(), &records);

    let encoder = HashedProjectionEncoder::new(
        config.features.embedding_dim,
        config.features.encoder_seed,
    );
    run_feature_fusion(&config, &encoder).unwrap();

    let te_a = TargetEncoder::load(&config.target_encoder_path()).unwrap();
    let te_b = TargetEncoder::load(&config.target_encoder_path()).unwrap();
    assert_eq!(te_a, te_b);

    let ohe_a = OneHotEncoder::load(&config.onehot_encoder_path()).unwrap();
    let ohe_b = OneHotEncoder::load(&config.onehot_encoder_path()).unwrap();
    assert_eq!(ohe_a, ohe_b);

    let transformer_a = FeatureTransformer {
        target_encoder: te_a,
        onehot_encoder: ohe_a,
        sentence_encoder: &encoder,
    };
    let transformer_b = FeatureTransformer {
        target_encoder: te_b,
        onehot_encoder: ohe_b,
        sentence_encoder: &encoder,
    };
    let rows: Vec<&ValidatedComplaint> = records.iter().take(10).collect();
    assert_eq!(
        transformer_a.transform_batch(&rows).unwrap(),
        transformer_b.transform_batch(&rows).unwrap()
    );
}
