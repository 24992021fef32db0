//! Self-Attention
//!
//! Each position builds its output as a weighted mix of every position's value
//! vector, weighted by how well its query matches their keys.
//!
//! ## Scaled Dot-Product Attention
//!
//! ```text
//! Q, K, V = X @ W_q, X @ W_k, X @ W_v
//! scores  = (Q @ Kᵀ) / √d
//! weights = softmax(scores)          (row-wise)
//! output  = weights @ V
//! ```
//!
//! Dividing by √d keeps the dot products from growing with the embedding width,
//! which would otherwise saturate the softmax.
//!
//! The same code serves the 2×2 demonstration configuration and full-width
//! embeddings; only `dim` changes. There is a single head and no causal mask:
//! every position attends to every position.
//!
//! ## Updates
//!
//! Training does not backpropagate through the softmax. See
//! [`SelfAttention::update_weights`] for the rule that is applied instead.

use crate::backprop::ScalarBroadcastRule;
use crate::error::{QuillError, Result};
use crate::tensor::Tensor;
use crate::weights::{read_weights, write_weights};
use rand::Rng;
use std::path::Path;

/// Weight-file prefixes for the three projection matrices
pub const QUERY_PREFIX: &str = "query";
pub const KEY_PREFIX: &str = "key";
pub const VALUE_PREFIX: &str = "value";

/// Single-head self-attention with square projection matrices
#[derive(Clone, Debug, PartialEq)]
pub struct SelfAttention {
    pub w_query: Tensor,
    pub w_key: Tensor,
    pub w_value: Tensor,
    pub dim: usize,
}

impl SelfAttention {
    /// Create an attention block with weights drawn uniformly from [-0.5, 0.5]
    pub fn new<R: Rng>(dim: usize, rng: &mut R) -> Self {
        let mut init = || {
            let data = (0..dim * dim)
                .map(|_| rng.random_range(-0.5f32..=0.5))
                .collect();
            Tensor::new(data, dim, dim)
        };
        let w_query = init();
        let w_key = init();
        let w_value = init();
        Self {
            w_query,
            w_key,
            w_value,
            dim,
        }
    }

    /// Build from existing matrices
    ///
    /// # Errors
    ///
    /// [`QuillError::ShapeMismatch`] unless all three are `dim × dim`
    pub fn from_weights(w_query: Tensor, w_key: Tensor, w_value: Tensor) -> Result<Self> {
        let dim = w_query.rows;
        for (context, m) in [
            ("attention query matrix", &w_query),
            ("attention key matrix", &w_key),
            ("attention value matrix", &w_value),
        ] {
            if m.rows != dim || m.cols != dim {
                return Err(QuillError::ShapeMismatch {
                    context,
                    expected: dim * dim,
                    actual: m.rows * m.cols,
                });
            }
        }
        Ok(Self {
            w_query,
            w_key,
            w_value,
            dim,
        })
    }

    /// Load `query`, `key` and `value` weight files from `dir`
    pub fn load(dir: &Path, dim: usize) -> Result<Self> {
        let count = dim * dim;
        let w_query = Tensor::new(read_weights(dir, QUERY_PREFIX, count)?, dim, dim);
        let w_key = Tensor::new(read_weights(dir, KEY_PREFIX, count)?, dim, dim);
        let w_value = Tensor::new(read_weights(dir, VALUE_PREFIX, count)?, dim, dim);
        Ok(Self {
            w_query,
            w_key,
            w_value,
            dim,
        })
    }

    /// Write the three matrices as weight files under `dir`
    pub fn save(&self, dir: &Path) -> Result<()> {
        write_weights(dir, QUERY_PREFIX, &self.w_query.data)?;
        write_weights(dir, KEY_PREFIX, &self.w_key.data)?;
        write_weights(dir, VALUE_PREFIX, &self.w_value.data)
    }

    fn check_input(&self, x: &Tensor) {
        assert_eq!(
            x.cols, self.dim,
            "Attention input has {} columns, expected {}",
            x.cols, self.dim
        );
    }

    /// Attention weights `softmax(Q @ Kᵀ / √d)`, shape `[seq, seq]`
    ///
    /// Each row is a probability distribution over positions.
    pub fn attention_weights(&self, x: &Tensor) -> Tensor {
        self.check_input(x);
        let q = x.matmul(&self.w_query);
        let k = x.matmul(&self.w_key);
        let scale = (self.dim as f32).sqrt();
        q.matmul(&k.transpose()).mul_scalar(1.0 / scale).softmax_rows()
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `x` - Input `[seq_len, dim]`
    ///
    /// # Returns
    ///
    /// Contextualised rows `[seq_len, dim]`
    pub fn forward(&self, x: &Tensor) -> Tensor {
        let weights = self.attention_weights(x);
        let v = x.matmul(&self.w_value);
        weights.matmul(&v)
    }

    /// Apply the scalar-broadcast update
    ///
    /// ```text
    /// g = clip(loss · learning_rate, ±clip_threshold)
    /// W_k -= g;  W_q -= g;  W_v -= g       (every element, same g)
    /// ```
    ///
    /// This is not a per-element gradient: every weight moves by the same
    /// amount. It is the rule the pipeline trains with.
    ///
    /// # Returns
    ///
    /// The scalar that was subtracted
    pub fn update_weights(&mut self, loss: f32, learning_rate: f32, clip_threshold: f32) -> f32 {
        let gradient =
            ScalarBroadcastRule::new(clip_threshold).attention_gradient(loss, learning_rate);
        for m in [&mut self.w_key, &mut self.w_query, &mut self.w_value] {
            m.data.iter_mut().for_each(|w| *w -= gradient);
        }
        gradient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn constant(dim: usize, value: f32) -> Tensor {
        Tensor::new(vec![value; dim * dim], dim, dim)
    }

    #[test]
    fn test_init_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let attn = SelfAttention::new(16, &mut rng);
        for m in [&attn.w_query, &attn.w_key, &attn.w_value] {
            assert_eq!((m.rows, m.cols), (16, 16));
            assert!(m.data.iter().all(|w| (-0.5..=0.5).contains(w)));
        }
        assert_ne!(attn.w_query, attn.w_key);
    }

    #[test]
    fn test_weights_rows_are_distributions() {
        let mut rng = StdRng::seed_from_u64(5);
        let attn = SelfAttention::new(8, &mut rng);
        let x = Tensor::new((0..5 * 8).map(|i| (i as f32 * 0.1).sin()).collect(), 5, 8);
        let w = attn.attention_weights(&x);
        assert_eq!((w.rows, w.cols), (5, 5));
        for i in 0..5 {
            let sum: f32 = w.row(i).iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
            assert!(w.row(i).iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn test_two_by_two_constant_weights() {
        let attn = SelfAttention::from_weights(constant(2, 0.5), constant(2, 0.5), constant(2, 0.5))
            .unwrap();
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2);
        let out = attn.forward(&x);
        // V = x @ 0.5 → rows [1.5, 1.5] and [3.5, 3.5]
        let w = attn.attention_weights(&x);
        let expected0 = w.row(0)[0] * 1.5 + w.row(0)[1] * 3.5;
        assert!((out.row(0)[0] - expected0).abs() < 1e-5);
        assert!(out.data.iter().any(|v| v.abs() > 1e-6));
    }

    #[test]
    fn test_output_shape_matches_input() {
        let mut rng = StdRng::seed_from_u64(2);
        let attn = SelfAttention::new(4, &mut rng);
        let out = attn.forward(&Tensor::zeros(7, 4));
        assert_eq!((out.rows, out.cols), (7, 4));
    }

    #[test]
    fn test_update_subtracts_clipped_scalar_everywhere() {
        let mut attn =
            SelfAttention::from_weights(constant(2, 1.0), constant(2, 2.0), constant(2, 3.0))
                .unwrap();
        let g = attn.update_weights(0.5, 0.1, 100.0);
        assert!((g - 0.05).abs() < 1e-7);
        assert!(attn.w_query.data.iter().all(|w| (w - 0.95).abs() < 1e-6));
        assert!(attn.w_key.data.iter().all(|w| (w - 1.95).abs() < 1e-6));
        assert!(attn.w_value.data.iter().all(|w| (w - 2.95).abs() < 1e-6));

        let g = attn.update_weights(1e6, 1.0, 100.0);
        assert_eq!(g, 100.0);
        assert!(attn.w_query.data.iter().all(|w| (w + 99.05).abs() < 1e-3));
    }

    #[test]
    fn test_from_weights_rejects_non_square() {
        let bad = Tensor::zeros(2, 3);
        let err = SelfAttention::from_weights(constant(2, 0.0), bad, constant(2, 0.0)).unwrap_err();
        assert!(matches!(err, QuillError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let attn = SelfAttention::new(2, &mut rng);
        attn.save(dir.path()).unwrap();
        assert!(dir.path().join("key_weight_4.txt").exists());
        let loaded = SelfAttention::load(dir.path(), 2).unwrap();
        assert!(loaded.w_query.max_abs_diff(&attn.w_query) < 1e-6);
        assert!(loaded.w_key.max_abs_diff(&attn.w_key) < 1e-6);
        assert!(loaded.w_value.max_abs_diff(&attn.w_value) < 1e-6);
    }
}
