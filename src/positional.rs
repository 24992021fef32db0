//! Sinusoidal Positional Encoding
//!
//! Attention treats its input as a set: nothing in `softmax(QKᵀ)V` knows which
//! row came first. Adding a position-dependent vector to each embedding row
//! gives the model that information.
//!
//! ```text
//! PE(pos, i) = sin(pos / 10000^(i / dim))        for even i
//! PE(pos, i) = cos(pos / 10000^((i - 1) / dim))  for odd i
//! ```
//!
//! Each pair of components oscillates at its own frequency, from one cycle per
//! 2π positions (i = 0) down to one cycle per 10000·2π positions. Every value
//! lies in [-1, 1].

use crate::tensor::Tensor;

/// Base of the frequency schedule
pub const POSITIONAL_BASE: f64 = 10_000.0;

/// Encoding vector of length `dim` for sequence position `position`
pub fn positional_encoding(position: usize, dim: usize) -> Vec<f32> {
    let pos = position as f64;
    (0..dim)
        .map(|i| {
            if i % 2 == 0 {
                (pos / POSITIONAL_BASE.powf(i as f64 / dim as f64)).sin() as f32
            } else {
                (pos / POSITIONAL_BASE.powf((i - 1) as f64 / dim as f64)).cos() as f32
            }
        })
        .collect()
}

/// Add the positional encoding of row `i` to row `i`, for every non-padding row
///
/// Rows that are entirely zero are padding and stay zero.
pub fn add_positional_encoding(matrix: &mut Tensor) {
    let dim = matrix.cols;
    for pos in 0..matrix.rows {
        if matrix.is_zero_row(pos) {
            continue;
        }
        let encoding = positional_encoding(pos, dim);
        for (value, pe) in matrix.row_mut(pos).iter_mut().zip(encoding) {
            *value += pe;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_zero() {
        // sin(0) = 0 on even components, cos(0) = 1 on odd components
        assert_eq!(positional_encoding(0, 4), vec![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_first_pair_frequency() {
        let pe = positional_encoding(3, 6);
        assert!((pe[0] - 3.0f32.sin()).abs() < 1e-6);
        assert!((pe[1] - 3.0f32.cos()).abs() < 1e-6);
    }

    #[test]
    fn test_values_in_unit_range() {
        for pos in [0, 1, 7, 63, 500] {
            for dim in [1, 2, 5, 64] {
                let pe = positional_encoding(pos, dim);
                assert_eq!(pe.len(), dim);
                assert!(pe.iter().all(|v| (-1.0..=1.0).contains(v)));
            }
        }
    }

    #[test]
    fn test_padding_rows_untouched() {
        let mut m = Tensor::new(vec![1.0, 1.0, 0.0, 0.0, 2.0, 2.0], 3, 2);
        add_positional_encoding(&mut m);
        assert_eq!(m.row(0), &[1.0, 2.0]);
        assert_eq!(m.row(1), &[0.0, 0.0]);
        let expected = positional_encoding(2, 2);
        assert!((m.row(2)[0] - (2.0 + expected[0])).abs() < 1e-6);
        assert!((m.row(2)[1] - (2.0 + expected[1])).abs() < 1e-6);
    }
}
