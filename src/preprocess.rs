//! Embedding Preprocessing
//!
//! Rescaling helpers for embedding data. Embeddings drawn with the sin/cos
//! policy span roughly [-50, 50]; these bring them into a fixed range before
//! they reach attention.
//!
//! Scaled values that land exactly on zero are replaced by 0.01 so that a
//! scaled row is never mistaken for an all-zero padding row.

use crate::tensor::Tensor;
use tracing::warn;

/// Replacement for values that scale to exactly zero
pub const ZERO_REPLACEMENT: f32 = 0.01;

/// Min-max scale `data` into `[new_min, new_max]` in place
///
/// If every value is the same the data is set to `new_min`.
pub fn min_max_scale(data: &mut [f32], new_min: f32, new_max: f32) {
    let Some((old_min, old_max)) = bounds(data.iter().copied()) else {
        return;
    };
    if old_max == old_min {
        data.iter_mut().for_each(|v| *v = new_min);
        return;
    }
    for v in data.iter_mut() {
        let unit = (*v - old_min) / (old_max - old_min);
        *v = new_min + unit * (new_max - new_min);
        if *v == 0.0 {
            *v = ZERO_REPLACEMENT;
        }
    }
}

/// Length of the span from the first to the last non-zero value
///
/// ```
/// use quill::preprocess::meaningful_length;
/// assert_eq!(meaningful_length(&[0.0, 1.0, 0.0, 2.0, 0.0]), 3);
/// assert_eq!(meaningful_length(&[0.0, 0.0]), 0);
/// ```
pub fn meaningful_length(data: &[f32]) -> usize {
    let Some(start) = data.iter().position(|&v| v != 0.0) else {
        return 0;
    };
    let end = data.iter().rposition(|&v| v != 0.0).map_or(start, |e| e + 1);
    end - start
}

/// Scale every element of `matrix` into [-1, 1]
///
/// A matrix whose values are all identical is left untouched.
pub fn scale_to_unit_range(matrix: &mut Tensor) {
    let Some((min, max)) = bounds(matrix.data.iter().copied()) else {
        return;
    };
    if min == max {
        warn!(value = min, "all matrix values are equal, skipping scaling");
        return;
    }
    for v in matrix.data.iter_mut() {
        *v = 2.0 * (*v - min) / (max - min) - 1.0;
        if *v == 0.0 {
            *v = ZERO_REPLACEMENT;
        }
    }
}

fn bounds(values: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
