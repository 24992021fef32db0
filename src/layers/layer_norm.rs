//! Layer Normalization
//!
//! Rescales every row (sequence position) to zero mean and unit variance:
//!
//! ```text
//! 1. mean = sum(x) / N
//! 2. var  = sum((x - mean)²) / N
//! 3. y    = (x - mean) / √(var + ε)
//! ```
//!
//! ε (1e-6 by default) keeps the denominator away from zero. A row whose values
//! are all identical has zero variance and normalises to all zeros.
//!
//! There are no learnable scale (γ) or shift (β) parameters here: the output is
//! the plain normalised row.

use crate::tensor::Tensor;
use rayon::prelude::*;

/// Default ε
pub const DEFAULT_EPS: f32 = 1e-6;

/// Parameter-free per-row layer normalisation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerNorm {
    pub eps: f32,
}

impl Default for LayerNorm {
    fn default() -> Self {
        Self { eps: DEFAULT_EPS }
    }
}

impl LayerNorm {
    pub fn new(eps: f32) -> Self {
        Self { eps }
    }

    /// Normalise every row of `x`
    pub fn forward(&self, x: &Tensor) -> Tensor {
        let cols = x.cols;
        let mut out = x.data.clone();
        if cols == 0 {
            return Tensor::new(out, x.rows, cols);
        }
        out.par_chunks_mut(cols)
            .for_each(|row| normalize_row(row, self.eps));
        Tensor::new(out, x.rows, cols)
    }
}

/// Normalise one row in place
pub fn normalize_row(row: &mut [f32], eps: f32) {
    if row.is_empty() {
        return;
    }
    let first = row[0];
    if row.iter().all(|&x| x == first) {
        row.fill(0.0);
        return;
    }
    let n = row.len() as f32;
    let mean = row.iter().sum::<f32>() / n;
    let variance = row.iter().map(|&x| (x - mean) * (x - mean)).sum::<f32>() / n;
    let std = (variance + eps).sqrt();
    for x in row.iter_mut() {
        *x = (*x - mean) / std;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_have_zero_mean_unit_variance() {
        let x = Tensor::new(
            vec![1.0, 2.0, 3.0, 4.0, 10.0, -10.0, 5.0, 0.0],
            2,
            4,
        );
        let y = LayerNorm::default().forward(&x);
        for i in 0..2 {
            let row = y.row(i);
            let mean = row.iter().sum::<f32>() / 4.0;
            let var = row.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / 4.0;
            assert!(mean.abs() < 1e-5, "mean {mean}");
            assert!((var - 1.0).abs() < 1e-4, "var {var}");
        }
    }

    #[test]
    fn test_constant_row_becomes_zero() {
        let x = Tensor::new(vec![3.0; 5], 1, 5);
        let y = LayerNorm::default().forward(&x);
        assert!(y.data.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_inexact_constant_row_is_exactly_zero() {
        let mut row = [0.1f32; 7];
        normalize_row(&mut row, DEFAULT_EPS);
        assert_eq!(row, [0.0; 7]);

        let y = LayerNorm::default().forward(&Tensor::new(vec![0.3; 6], 2, 3));
        assert!(y.data.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_zero_matrix_is_finite() {
        let y = LayerNorm::new(1e-6).forward(&Tensor::zeros(3, 4));
        assert!(y.data.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_empty_columns() {
        let y = LayerNorm::default().forward(&Tensor::zeros(2, 0));
        assert_eq!((y.rows, y.cols), (2, 0));
    }
}
