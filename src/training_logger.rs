//! Training Logger
//!
//! Records one CSV row per logged step so a run can be plotted or compared
//! afterwards.
//!
//! ## Example
//!
//! ```rust,no_run
//! use quill::TrainingLogger;
//!
//! let mut logger = TrainingLogger::new("training_log.csv")?;
//! logger.log(1, 0.01, 2.5)?;
//! # Ok::<(), quill::QuillError>(())
//! ```
//!
//! ## CSV Format
//!
//! - `step`: Step (epoch) number
//! - `elapsed_seconds`: Time since the logger was created
//! - `learning_rate`: Learning rate used for the step
//! - `loss`: Mean loss over the step

use crate::error::{QuillError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Header line of every log file
pub const CSV_HEADER: &str = "step,elapsed_seconds,learning_rate,loss";

/// CSV logger for training metrics
pub struct TrainingLogger {
    path: PathBuf,
    writer: BufWriter<File>,
    start_time: Instant,
}

impl TrainingLogger {
    /// Create the log file (truncating any existing one) and write the header
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| QuillError::io(&path, e))?;
        let mut logger = Self {
            writer: BufWriter::new(file),
            path,
            start_time: Instant::now(),
        };
        logger.write_line(CSV_HEADER)?;
        Ok(logger)
    }

    /// Append one row and flush it to disk
    pub fn log(&mut self, step: usize, learning_rate: f32, loss: f32) -> Result<()> {
        let elapsed = self.start_time.elapsed().as_secs_f32();
        let line = format!("{step},{elapsed:.2},{learning_rate:.6},{loss:.6}");
        self.write_line(&line)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        // Flush every row so a crashed run keeps its history
        writeln!(self.writer, "{line}")
            .and_then(|_| self.writer.flush())
            .map_err(|e| QuillError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut logger = TrainingLogger::new(&path).unwrap();
        logger.log(1, 0.01, 2.5).unwrap();
        logger.log(2, 0.01, 1.25).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("1,"));
        assert!(lines[1].ends_with(",0.010000,2.500000"));
        assert!(lines[2].ends_with(",1.250000"));
    }

    #[test]
    fn test_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = TrainingLogger::new(dir.path().join("missing").join("log.csv"))
            .err()
            .unwrap();
        assert!(matches!(err, QuillError::Io { .. }));
    }
}
