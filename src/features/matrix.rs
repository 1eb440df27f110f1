//! Preallocated out-of-core feature matrix.
//!
//! A flat little-endian `f32` file interpreted as a row-major 2-D array.
//! The file is sized once up front from the row count and the total
//! feature dimension, written by explicit row-range slices, and flushed
//! exactly once at the end of the run.

use std::fs::OpenOptions;
use std::mem::size_of;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use tracing::debug;

use crate::common::error::{PipelineError, Result};

pub struct FeatureMatrix {
    // None only for a zero-row dataset, where there is nothing to map.
    mmap: Option<MmapMut>,
    path: PathBuf,
    rows: usize,
    dim: usize,
}

impl FeatureMatrix {
    /// Create (or truncate) the backing file sized `(rows, dim)` and map it.
    pub fn create(path: &Path, rows: usize, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(PipelineError::Matrix(
                "feature dimension must be greater than zero".into(),
            ));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let total_bytes = (rows * dim * size_of::<f32>()) as u64;
        file.set_len(total_bytes)?;
        let mmap = if total_bytes == 0 {
            None
        } else {
            Some(unsafe { MmapMut::map_mut(&file)? })
        };
        debug!(
            path = %path.display(),
            rows,
            dim,
            bytes = total_bytes,
            "Preallocated feature matrix"
        );
        Ok(Self {
            mmap,
            path: path.to_path_buf(),
            rows,
            dim,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Write a block of rows starting at `start_row`. The block must fit
    /// the preallocated shape exactly; a short or misaligned write would
    /// break the row-alignment invariant.
    pub fn write_rows(&mut self, start_row: usize, block: &[Vec<f32>]) -> Result<()> {
        if start_row + block.len() > self.rows {
            return Err(PipelineError::Matrix(format!(
                "row range {}..{} exceeds matrix rows {}",
                start_row,
                start_row + block.len(),
                self.rows
            )));
        }
        let mmap = match self.mmap.as_mut() {
            Some(m) => m,
            None => return Ok(()),
        };
        let dim = self.dim;
        for (offset, row) in block.iter().enumerate() {
            if row.len() != dim {
                return Err(PipelineError::Matrix(format!(
                    "row {} has {} features, expected {}",
                    start_row + offset,
                    row.len(),
                    dim
                )));
            }
            let byte_start = (start_row + offset) * dim * size_of::<f32>();
            for (i, value) in row.iter().enumerate() {
                let at = byte_start + i * size_of::<f32>();
                mmap[at..at + size_of::<f32>()].copy_from_slice(&value.to_le_bytes());
            }
        }
        Ok(())
    }

    /// Flush the mapped pages to durable storage and release the mapping.
    pub fn flush(self) -> Result<()> {
        if let Some(mmap) = &self.mmap {
            mmap.flush()?;
        }
        debug!(path = %self.path.display(), "Feature matrix flushed");
        Ok(())
    }
}

/// Read a matrix file back as rows, given the feature dimension recomputed
/// from the persisted encoder artifacts plus the embedding dimension.
pub fn read_matrix(path: &Path, dim: usize) -> Result<Vec<Vec<f32>>> {
    let bytes = std::fs::read(path)?;
    let row_bytes = dim * size_of::<f32>();
    if dim == 0 || row_bytes == 0 || bytes.len() % row_bytes != 0 {
        return Err(PipelineError::Matrix(format!(
            "file of {} bytes is not a whole number of {}-wide f32 rows",
            bytes.len(),
            dim
        )));
    }
    let mut rows = Vec::with_capacity(bytes.len() / row_bytes);
    for chunk in bytes.chunks_exact(row_bytes) {
        let row: Vec<f32> = chunk
            .chunks_exact(size_of::<f32>())
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read_back_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.dat");
        let mut matrix = FeatureMatrix::create(&path, 3, 2).unwrap();
        matrix
            .write_rows(0, &[vec![1.0, 2.0], vec![3.0, 4.0]])
            .unwrap();
        matrix.write_rows(2, &[vec![5.0, 6.0]]).unwrap();
        matrix.flush().unwrap();

        let rows = read_matrix(&path, 2).unwrap();
        assert_eq!(
            rows,
            vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]
        );
    }

    #[test]
    fn test_out_of_range_write_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.dat");
        let mut matrix = FeatureMatrix::create(&path, 1, 2).unwrap();
        let err = matrix
            .write_rows(1, &[vec![1.0, 2.0]])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Matrix(_)));
    }

    #[test]
    fn test_wrong_width_row_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.dat");
        let mut matrix = FeatureMatrix::create(&path, 1, 3).unwrap();
        let err = matrix.write_rows(0, &[vec![1.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::Matrix(_)));
    }

    #[test]
    fn test_zero_row_matrix_is_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.dat");
        let matrix = FeatureMatrix::create(&path, 0, 4).unwrap();
        matrix.flush().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }
}
