//! Pipeline Configuration
//!
//! Two configuration structs drive a run:
//!
//! - [`Config`]: the architecture (embedding width, hidden width, sequence
//!   limit, vocabulary table size, embedding policy)
//! - [`TrainingConfig`]: the optimisation loop (learning rate, epochs,
//!   clipping thresholds)
//!
//! Both come with presets. `Config::demo()` is the 2-dimensional illustrative
//! configuration; it runs the same code as the wider presets.
//!
//! Configurations serialise to JSON so a run can be reproduced from a file:
//!
//! ```rust,no_run
//! use quill::Config;
//!
//! let config = Config::small();
//! config.save("quill.json")?;
//! let loaded = Config::load("quill.json")?;
//! assert_eq!(loaded.embedding_dim, 64);
//! # Ok::<(), quill::QuillError>(())
//! ```

use crate::error::{QuillError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How a new token's embedding vector is generated
///
/// Two policies exist. `SinCosScaled` ties every component to the token id
/// through `sin(id)` (even components) or `cos(id)` (odd components), each
/// multiplied by its own random scale. `Uniform` draws every component
/// independently.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmbeddingInit {
    /// `component_j = s_j * sin(id)` or `s_j * cos(id)`, with `s_j ~ U[low, high]`
    SinCosScaled { low: f32, high: f32 },
    /// `component_j ~ U[low, high]`
    Uniform { low: f32, high: f32 },
}

impl EmbeddingInit {
    /// Scale range `[-50, 50]`
    pub fn sin_cos() -> Self {
        Self::SinCosScaled {
            low: -50.0,
            high: 50.0,
        }
    }

    /// Value range `[-0.5, 0.5]`
    pub fn uniform() -> Self {
        Self::Uniform {
            low: -0.5,
            high: 0.5,
        }
    }

    /// The `(low, high)` sampling range
    pub fn range(&self) -> (f32, f32) {
        match *self {
            Self::SinCosScaled { low, high } | Self::Uniform { low, high } => (low, high),
        }
    }
}

/// Architecture configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Width of token embeddings, attention matrices and the model output
    pub embedding_dim: usize,
    /// Hidden width of the feed-forward network
    pub hidden_dim: usize,
    /// Longest sentence (in tokens) the pipeline accepts; longer ones are truncated
    pub max_seq_len: usize,
    /// Number of buckets in the vocabulary hash table
    pub table_size: usize,
    /// Embedding generation policy
    pub embedding_init: EmbeddingInit,
    /// Added to the variance in layer normalisation
    pub layer_norm_eps: f32,
    /// Seed for every random draw in the run
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embedding_dim: 512,
            hidden_dim: 2048,
            max_seq_len: 128,
            table_size: 100_000,
            embedding_init: EmbeddingInit::uniform(),
            layer_norm_eps: 1e-6,
            seed: 42,
        }
    }
}

impl Config {
    /// The 2-dimensional illustrative configuration
    ///
    /// Embeddings are two components (`s1·sin(id)`, `s2·cos(id)`) and the
    /// attention matrices are 2×2.
    pub fn demo() -> Self {
        Self {
            embedding_dim: 2,
            hidden_dim: 2,
            max_seq_len: 16,
            table_size: 5000,
            embedding_init: EmbeddingInit::sin_cos(),
            layer_norm_eps: 1e-6,
            seed: 42,
        }
    }

    /// A small configuration that trains in seconds
    pub fn small() -> Self {
        Self {
            embedding_dim: 64,
            hidden_dim: 256,
            max_seq_len: 64,
            table_size: 5000,
            embedding_init: EmbeddingInit::uniform(),
            layer_norm_eps: 1e-6,
            seed: 42,
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "demo" => Some(Self::demo()),
            "small" => Some(Self::small()),
            "full" | "default" => Some(Self::default()),
            _ => None,
        }
    }

    /// Check that the configuration describes a working pipeline
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0 {
            return Err(QuillError::InvalidConfig(
                "embedding_dim must be positive".to_string(),
            ));
        }
        if self.hidden_dim == 0 {
            return Err(QuillError::InvalidConfig(
                "hidden_dim must be positive".to_string(),
            ));
        }
        if self.max_seq_len < 2 {
            return Err(QuillError::InvalidConfig(
                "max_seq_len must allow at least two tokens".to_string(),
            ));
        }
        if self.table_size == 0 {
            return Err(QuillError::InvalidConfig(
                "table_size must be positive".to_string(),
            ));
        }
        if !(self.layer_norm_eps > 0.0) {
            return Err(QuillError::InvalidConfig(
                "layer_norm_eps must be positive".to_string(),
            ));
        }
        let (low, high) = self.embedding_init.range();
        if !(low.is_finite() && high.is_finite() && low <= high) {
            return Err(QuillError::InvalidConfig(format!(
                "embedding range [{low}, {high}] is not a finite interval"
            )));
        }
        Ok(())
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| QuillError::io(path, e))
    }

    /// Read and validate a configuration written by [`Config::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| QuillError::io(path, e))?;
        let config: Config = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Training loop configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Step size for every weight update
    pub learning_rate: f32,
    /// Passes over the sentence list
    pub epochs: usize,
    /// Bound on feed-forward and output-head gradients
    pub clip_threshold: f32,
    /// Bound on the attention update scalar
    pub attention_clip_threshold: f32,
    /// Print a summary every N epochs
    pub print_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            epochs: 10,
            clip_threshold: 1.0,
            attention_clip_threshold: 100.0,
            print_every: 1,
        }
    }
}

impl TrainingConfig {
    /// A few quick epochs for testing changes
    pub fn tiny() -> Self {
        Self {
            epochs: 3,
            ..Self::default()
        }
    }

    /// Longer run with a smaller step
    pub fn small() -> Self {
        Self {
            learning_rate: 0.005,
            epochs: 50,
            print_every: 5,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for config in [Config::demo(), Config::small(), Config::default()] {
            config.validate().unwrap();
        }
        assert_eq!(Config::demo().embedding_dim, 2);
        assert_eq!(Config::preset("small"), Some(Config::small()));
        assert!(Config::preset("huge").is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::demo();
        config.embedding_dim = 0;
        assert!(matches!(
            config.validate(),
            Err(QuillError::InvalidConfig(_))
        ));

        let mut config = Config::demo();
        config.embedding_init = EmbeddingInit::Uniform {
            low: 1.0,
            high: -1.0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config::demo();
        config.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"kind\": \"sin_cos_scaled\""));

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = Config::load("/nonexistent/quill.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/quill.json"));
    }
}
