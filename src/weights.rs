//! Weight Files
//!
//! Trained weights live on disk as one text file per scalar:
//!
//! ```text
//! <dir>/<prefix>_weight_<index>.txt     (index starts at 1)
//! ```
//!
//! so a 2×2 key matrix is `key_weight_1.txt` .. `key_weight_4.txt`, in
//! row-major order. Each file holds a single floating-point number, with
//! surrounding whitespace ignored.
//!
//! Loading is all-or-nothing: a missing or unparsable file fails the whole
//! load and the error names the offending path.

use crate::error::{QuillError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Path of weight number `index` (1-based) for `prefix` under `dir`
pub fn weight_path(dir: &Path, prefix: &str, index: usize) -> PathBuf {
    dir.join(format!("{prefix}_weight_{index}.txt"))
}

/// Read `count` weights for `prefix` from `dir`
///
/// # Errors
///
/// [`QuillError::WeightFile`] if a file cannot be read,
/// [`QuillError::ParseWeight`] if it does not hold a number.
pub fn read_weights(dir: &Path, prefix: &str, count: usize) -> Result<Vec<f32>> {
    (1..=count)
        .map(|index| {
            let path = weight_path(dir, prefix, index);
            let content = fs::read_to_string(&path).map_err(|source| QuillError::WeightFile {
                path: path.clone(),
                source,
            })?;
            content
                .trim()
                .parse::<f32>()
                .map_err(|_| QuillError::ParseWeight {
                    path,
                    content: content.trim().to_string(),
                })
        })
        .collect()
}

/// Write `values` as weights for `prefix` under `dir`, creating `dir` if needed
pub fn write_weights(dir: &Path, prefix: &str, values: &[f32]) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| QuillError::io(dir, e))?;
    for (i, value) in values.iter().enumerate() {
        let path = weight_path(dir, prefix, i + 1);
        fs::write(&path, format!("{value}\n"))
            .map_err(|source| QuillError::WeightFile { path, source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_path_convention() {
        let path = weight_path(Path::new("weights"), "key", 3);
        assert_eq!(path, Path::new("weights").join("key_weight_3.txt"));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let values = [0.25, -1.5, 3.0e-4, 42.0];
        write_weights(dir.path(), "query", &values).unwrap();
        assert!(dir.path().join("query_weight_1.txt").exists());
        assert!(dir.path().join("query_weight_4.txt").exists());
        assert_eq!(read_weights(dir.path(), "query", 4).unwrap(), values);
    }

    #[test]
    fn test_read_tolerates_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("w_weight_1.txt"), "  0.5 \n").unwrap();
        assert_eq!(read_weights(dir.path(), "w", 1).unwrap(), vec![0.5]);
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        write_weights(dir.path(), "value", &[1.0]).unwrap();
        let err = read_weights(dir.path(), "value", 2).unwrap_err();
        match err {
            QuillError::WeightFile { path, .. } => {
                assert!(path.ends_with("value_weight_2.txt"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unparsable_value() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("key_weight_1.txt"), "not a number").unwrap();
        let err = read_weights(dir.path(), "key", 1).unwrap_err();
        assert!(matches!(err, QuillError::ParseWeight { ref content, .. } if content == "not a number"));
    }

    #[test]
    fn test_zero_count_reads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_weights(dir.path(), "none", 0).unwrap().is_empty());
    }
}
