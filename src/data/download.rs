//! Raw dataset download into the bronze layer.

use std::fs::File;
use std::io::{Read, Write};

use sha2::{Digest, Sha256};
use tracing::info;

use crate::common::create_directories;
use crate::common::error::Result;
use crate::config::PipelineConfig;
use crate::observability::metrics;

const COPY_BUFFER_BYTES: usize = 64 * 1024;

/// Fetch the raw archive to disk, skipping the download when the file is
/// already present. Streams to disk and logs the payload checksum.
pub fn download_data(config: &PipelineConfig) -> Result<()> {
    info!("Starting data download process...");

    let output_path = config.raw_data_path();
    create_directories(&[&config.data_paths.raw_data_dir])?;

    if output_path.exists() {
        info!(
            path = %output_path.display(),
            "File already exists, skipping download"
        );
        return Ok(());
    }

    let url = &config.data_source.download_url;
    info!(url, "Attempting to download data");

    let mut response = reqwest::blocking::get(url)?.error_for_status()?;

    let mut file = File::create(&output_path)?;
    let mut hasher = Sha256::new();
    let mut total_bytes = 0u64;
    let mut buffer = [0u8; COPY_BUFFER_BYTES];
    loop {
        let read = response.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        file.write_all(&buffer[..read])?;
        total_bytes += read as u64;
    }
    file.flush()?;
    metrics::download::bytes(total_bytes);

    let sha_hex = hex::encode(hasher.finalize());
    info!(
        path = %output_path.display(),
        size_bytes = total_bytes,
        sha256 = %sha_hex,
        "Successfully downloaded and saved raw data"
    );
    Ok(())
}
