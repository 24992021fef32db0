//! Loss and Weight Updates
//!
//! This module holds the loss function and the update rule the pipeline trains
//! with.
//!
//! ## Loss
//!
//! Mean squared error between the model output and the target vector:
//!
//! ```text
//! mse = Σ (output_i - target_i)² / N
//! ```
//!
//! ## The Scalar-Broadcast Rule
//!
//! Updates are **not** chain-rule derivatives. The scalar loss is multiplied by
//! a fixed factor per weight, clipped, and applied as plain gradient descent:
//!
//! ```text
//! last layer:    g = clip(semi_final[i] · loss)    final[k·n + i] -= lr · g
//! hidden layer:  g = clip(loss · w_i)              w_i            -= lr · g
//! attention:     g = clip(loss · lr)               every element  -= g
//! ```
//!
//! where `k` runs over the output nodes, each owning a contiguous slice of `n`
//! weights of the final layer. It is a deliberate approximation:
//! [`ScalarBroadcastRule`] names it so that it is never mistaken for (or
//! silently replaced by) true backpropagation, which would train differently.
//!
//! ## Gradient Clipping
//!
//! Every gradient is clamped to `[-threshold, threshold]` before use, so one bad
//! loss value cannot blow the weights up:
//!
//! ```text
//! Step 10: loss = 0.8    g = 0.8
//! Step 11: loss = 240.0  g = 1.0   (clipped)
//! Step 12: loss = 0.9    g = 0.9
//! ```

use crate::error::{QuillError, Result};

/// Mean squared error; zero for empty input
///
/// # Panics
///
/// Panics if the slices differ in length
pub fn mse(output: &[f32], target: &[f32]) -> f32 {
    assert_eq!(
        output.len(),
        target.len(),
        "Output and target must have the same length"
    );
    if output.is_empty() {
        return 0.0;
    }
    let sum: f32 = output
        .iter()
        .zip(target)
        .map(|(o, t)| (o - t) * (o - t))
        .sum();
    sum / output.len() as f32
}

/// Clamp `gradient` to `[-threshold, threshold]`
pub fn clip_gradient(gradient: f32, threshold: f32) -> f32 {
    if gradient > threshold {
        threshold
    } else if gradient < -threshold {
        -threshold
    } else {
        gradient
    }
}

/// The simplified update rule used in training
///
/// Carries the clipping threshold; every update clips with it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalarBroadcastRule {
    pub clip_threshold: f32,
}

impl ScalarBroadcastRule {
    pub fn new(clip_threshold: f32) -> Self {
        Self { clip_threshold }
    }

    /// Clip with this rule's threshold
    pub fn clip(&self, gradient: f32) -> f32 {
        clip_gradient(gradient, self.clip_threshold)
    }

    /// Update the final layer of an output head
    ///
    /// `final_weights` holds one contiguous slice of `semi_final.len()` weights
    /// per output node. Weight `i` of every node moves by
    /// `lr · clip(semi_final[i] · loss)`.
    ///
    /// # Errors
    ///
    /// [`QuillError::ShapeMismatch`] if `final_weights` is not a whole number of
    /// node slices (or `semi_final` is empty while `final_weights` is not).
    pub fn update_last_layer(
        &self,
        loss: f32,
        learning_rate: f32,
        final_weights: &mut [f32],
        semi_final: &[f32],
    ) -> Result<()> {
        let n = semi_final.len();
        if n == 0 {
            if final_weights.is_empty() {
                return Ok(());
            }
            return Err(QuillError::ShapeMismatch {
                context: "final layer weights",
                expected: 0,
                actual: final_weights.len(),
            });
        }
        if final_weights.len() % n != 0 {
            return Err(QuillError::ShapeMismatch {
                context: "final layer weights",
                expected: (final_weights.len() / n + 1) * n,
                actual: final_weights.len(),
            });
        }
        for node in final_weights.chunks_mut(n) {
            for (w, &s) in node.iter_mut().zip(semi_final) {
                let gradient = self.clip(s * loss);
                *w -= learning_rate * gradient;
            }
        }
        Ok(())
    }

    /// The scalar every attention weight is decremented by: `clip(loss · lr)`
    pub fn attention_gradient(&self, loss: f32, learning_rate: f32) -> f32 {
        self.clip(loss * learning_rate)
    }

    /// Update a single layer from its own weights
    ///
    /// `w_i -= lr · clip(loss · w_i)`
    pub fn update_hidden_layer(&self, loss: f32, learning_rate: f32, weights: &mut [f32]) {
        for w in weights.iter_mut() {
            let gradient = self.clip(loss * *w);
            *w -= learning_rate * gradient;
        }
    }
}
