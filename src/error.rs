//! Error types
//!
//! Every fallible operation in the crate returns [`Result`]. Numeric routines
//! (softmax, layer norm, scaling) never fail: degenerate input produces a defined
//! output instead. Errors are reserved for three situations:
//!
//! - **Allocation**: a buffer could not be reserved (feed-forward weights,
//!   embedding vectors). The owning component reports it and nothing partially
//!   built is handed out.
//! - **I/O**: a weight file, text file, config file or log file could not be
//!   read or written. The path is always part of the error.
//! - **Contract**: shapes that do not line up, or a configuration that cannot
//!   describe a valid pipeline.

use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the pipeline
#[derive(Debug, Error)]
pub enum QuillError {
    /// A buffer could not be reserved
    #[error("allocation failed for {what} ({requested} elements)")]
    Allocation {
        /// What was being allocated
        what: &'static str,
        /// Number of elements requested
        requested: usize,
        /// Underlying reservation error
        #[source]
        source: TryReserveError,
    },

    /// A weight file is missing or unreadable
    #[error("cannot read weight file {}", path.display())]
    WeightFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A weight file does not contain a floating-point value
    #[error("weight file {} does not hold a number: {content:?}", path.display())]
    ParseWeight { path: PathBuf, content: String },

    /// Any other file operation failed
    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two buffers that must agree in size do not
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The configuration cannot describe a working pipeline
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A JSON document could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, QuillError>;

impl QuillError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allocate a zero-filled vector, reporting failure instead of aborting
pub(crate) fn try_zeroed(len: usize, what: &'static str) -> Result<Vec<f32>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|source| QuillError::Allocation {
            what,
            requested: len,
            source,
        })?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_zeroed_small() {
        let buffer = try_zeroed(8, "test buffer").unwrap();
        assert_eq!(buffer, vec![0.0; 8]);
    }

    #[test]
    fn test_try_zeroed_reports_huge_request() {
        let err = try_zeroed(usize::MAX, "huge buffer").unwrap_err();
        match err {
            QuillError::Allocation { what, requested, .. } => {
                assert_eq!(what, "huge buffer");
                assert_eq!(requested, usize::MAX);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_messages_carry_paths() {
        let err = QuillError::ParseWeight {
            path: PathBuf::from("w/key_weight_1.txt"),
            content: "abc".to_string(),
        };
        assert!(err.to_string().contains("w/key_weight_1.txt"));
    }
}
