//! Activation Functions
//!
//! ## ReLU (Rectified Linear Unit)
//!
//! The feed-forward network uses ReLU between its two linear layers:
//!
//! ```text
//! ReLU(x) = max(0, x)
//! ```
//!
//! Without a non-linearity the two layers would collapse into a single affine
//! map. ReLU is the cheapest non-linearity that avoids that.

use rayon::prelude::*;

/// ReLU on a single value
#[inline]
pub fn relu(x: f32) -> f32 {
    x.max(0.0)
}

/// ReLU applied element-wise to a vector, in place
pub fn relu_in_place(values: &mut [f32]) {
    values.par_iter_mut().for_each(|v| *v = relu(*v));
}
