//! Feed-Forward Network
//!
//! Two fully connected layers with a ReLU between them, applied to each
//! sequence position independently.
//!
//! ## Architecture
//!
//! ```text
//! x → (x @ W1 + b1) → ReLU → (h @ W2 + b2) → y
//! ```
//!
//! - `W1`: [input_size, hidden_size]
//! - `W2`: [hidden_size, output_size]
//!
//! Weights start as small uniform values in [-0.1, 0.1); biases start at zero.
//!
//! ## Output Head
//!
//! [`OutputHead`] turns the last position's normalised vector into the
//! prediction that the loss is computed against. It has two weight arrays:
//!
//! ```text
//! h_i   = semi_final[i] · x[i]                  (one weight per feature)
//! out_k = Σ_i final[k·n + i] · h_i              (one slice of n per node)
//! ```
//!
//! These are the weights that the last-layer and hidden-layer update rules in
//! [`crate::backprop`] act on.

use super::activation::relu_in_place;
use crate::error::{QuillError, Result};
use crate::tensor::Tensor;
use crate::weights::{read_weights, write_weights};
use rand::Rng;
use std::path::Path;

/// Scale applied to the uniform [-1, 1) initial weights
pub const INIT_SCALE: f32 = 0.1;

/// Weight-file prefixes
pub const WEIGHTS1_PREFIX: &str = "ff1";
pub const WEIGHTS2_PREFIX: &str = "ff2";
pub const BIAS1_PREFIX: &str = "ff_bias1";
pub const BIAS2_PREFIX: &str = "ff_bias2";
pub const SEMI_FINAL_PREFIX: &str = "semi_final";
pub const FINAL_PREFIX: &str = "final";

fn fill_uniform<R: Rng>(values: &mut [f32], rng: &mut R) {
    for v in values.iter_mut() {
        *v = rng.random_range(-1.0f32..1.0) * INIT_SCALE;
    }
}

/// Two-layer feed-forward network
#[derive(Clone, Debug, PartialEq)]
pub struct FeedForward {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    /// [input_size, hidden_size]
    pub weights1: Tensor,
    /// [hidden_size, output_size]
    pub weights2: Tensor,
    pub bias1: Vec<f32>,
    pub bias2: Vec<f32>,
}

impl FeedForward {
    /// Create a network with random weights and zero biases
    ///
    /// # Errors
    ///
    /// [`QuillError::Allocation`] if any buffer cannot be reserved. Buffers
    /// already allocated are dropped before returning.
    pub fn new<R: Rng>(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let mut weights1 = Tensor::try_zeros(input_size, hidden_size, "feed-forward weights1")?;
        let mut weights2 = Tensor::try_zeros(hidden_size, output_size, "feed-forward weights2")?;
        let bias1 = Tensor::try_zeros(1, hidden_size, "feed-forward bias1")?.data;
        let bias2 = Tensor::try_zeros(1, output_size, "feed-forward bias2")?.data;

        fill_uniform(&mut weights1.data, rng);
        fill_uniform(&mut weights2.data, rng);

        Ok(Self {
            input_size,
            hidden_size,
            output_size,
            weights1,
            weights2,
            bias1,
            bias2,
        })
    }

    /// Forward pass for one vector
    ///
    /// # Errors
    ///
    /// [`QuillError::ShapeMismatch`] if `input.len() != input_size`
    pub fn forward(&self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.input_size {
            return Err(QuillError::ShapeMismatch {
                context: "feed-forward input",
                expected: self.input_size,
                actual: input.len(),
            });
        }
        let x = Tensor::from_row(input.to_vec());
        Ok(self.forward_rows(&x).data)
    }

    /// Forward pass over every row of `x` ([seq_len, input_size])
    ///
    /// # Panics
    ///
    /// Panics if `x.cols != input_size`
    pub fn forward_rows(&self, x: &Tensor) -> Tensor {
        let mut hidden = x.matmul(&self.weights1).add_row(&self.bias1);
        relu_in_place(&mut hidden.data);
        hidden.matmul(&self.weights2).add_row(&self.bias2)
    }

    /// Load weights and biases from `dir`
    pub fn load(
        dir: &Path,
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
    ) -> Result<Self> {
        let weights1 = Tensor::new(
            read_weights(dir, WEIGHTS1_PREFIX, input_size * hidden_size)?,
            input_size,
            hidden_size,
        );
        let weights2 = Tensor::new(
            read_weights(dir, WEIGHTS2_PREFIX, hidden_size * output_size)?,
            hidden_size,
            output_size,
        );
        Ok(Self {
            input_size,
            hidden_size,
            output_size,
            weights1,
            weights2,
            bias1: read_weights(dir, BIAS1_PREFIX, hidden_size)?,
            bias2: read_weights(dir, BIAS2_PREFIX, output_size)?,
        })
    }

    /// Write weights and biases under `dir`
    pub fn save(&self, dir: &Path) -> Result<()> {
        write_weights(dir, WEIGHTS1_PREFIX, &self.weights1.data)?;
        write_weights(dir, WEIGHTS2_PREFIX, &self.weights2.data)?;
        write_weights(dir, BIAS1_PREFIX, &self.bias1)?;
        write_weights(dir, BIAS2_PREFIX, &self.bias2)
    }
}

/// Semi-final and final layer producing the training prediction
#[derive(Clone, Debug, PartialEq)]
pub struct OutputHead {
    /// One weight per input feature (len n)
    pub semi_final: Vec<f32>,
    /// `nodes` contiguous slices of n weights
    pub final_layer: Vec<f32>,
    pub nodes: usize,
}

impl OutputHead {
    /// Create a head over `n` features with `nodes` outputs
    ///
    /// # Errors
    ///
    /// [`QuillError::Allocation`] if the weights cannot be reserved
    pub fn new<R: Rng>(n: usize, nodes: usize, rng: &mut R) -> Result<Self> {
        let mut semi_final = Tensor::try_zeros(1, n, "semi-final weights")?.data;
        let mut final_layer = Tensor::try_zeros(nodes, n, "final layer weights")?.data;
        fill_uniform(&mut semi_final, rng);
        fill_uniform(&mut final_layer, rng);
        Ok(Self {
            semi_final,
            final_layer,
            nodes,
        })
    }

    /// Number of input features
    pub fn width(&self) -> usize {
        self.semi_final.len()
    }

    /// Map `x` (len n) to `nodes` outputs
    ///
    /// # Errors
    ///
    /// [`QuillError::ShapeMismatch`] if `x.len()` differs from the head width
    pub fn forward(&self, x: &[f32]) -> Result<Vec<f32>> {
        let n = self.width();
        if x.len() != n {
            return Err(QuillError::ShapeMismatch {
                context: "output head input",
                expected: n,
                actual: x.len(),
            });
        }
        let hidden: Vec<f32> = self.semi_final.iter().zip(x).map(|(s, v)| s * v).collect();
        if n == 0 {
            return Ok(vec![0.0; self.nodes]);
        }
        Ok(self
            .final_layer
            .chunks(n)
            .map(|node| node.iter().zip(&hidden).map(|(w, h)| w * h).sum())
            .collect())
    }

    /// Load from `dir`
    pub fn load(dir: &Path, n: usize, nodes: usize) -> Result<Self> {
        Ok(Self {
            semi_final: read_weights(dir, SEMI_FINAL_PREFIX, n)?,
            final_layer: read_weights(dir, FINAL_PREFIX, n * nodes)?,
            nodes,
        })
    }

    /// Write under `dir`
    pub fn save(&self, dir: &Path) -> Result<()> {
        write_weights(dir, SEMI_FINAL_PREFIX, &self.semi_final)?;
        write_weights(dir, FINAL_PREFIX, &self.final_layer)
    }
}
