pub mod error;

use std::fs;
use std::path::Path;
use tracing::info;

use error::Result;

/// Create every directory in the list, logging each one.
pub fn create_directories<P: AsRef<Path>>(paths: &[P]) -> Result<()> {
    for path in paths {
        fs::create_dir_all(path.as_ref())?;
        info!(path = %path.as_ref().display(), "Created directory");
    }
    Ok(())
}
