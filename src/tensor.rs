//! Matrix Operations
//!
//! A minimal row-major matrix type for the pipeline. Every value flowing through
//! the model is a 2-D matrix: a sequence of rows (one per position) with one
//! column per embedding component. Vectors are 1-row matrices.
//!
//! ## Layout
//!
//! For a `[2, 3]` matrix the flat data is
//! `[r0c0, r0c1, r0c2, r1c0, r1c1, r1c2]`, so row `i` lives at
//! `data[i * cols..(i + 1) * cols]`.
//!
//! ## Example
//!
//! ```rust
//! use quill::Tensor;
//!
//! let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2);
//! let b = Tensor::identity(2);
//! assert_eq!(a.matmul(&b).data, a.data);
//! ```
//!
//! ## Performance
//!
//! Larger products use a cache-blocked multiply parallelised over output row
//! blocks with Rayon. Softmax, row normalisation and element-wise maps run one
//! row (or element) per task. Small matrices (the 2×2 demonstration path) take
//! the sequential route and avoid parallel overhead entirely.

use crate::error::{try_zeroed, Result};
use rayon::prelude::*;

/// Work (`m * n * k`) below which matmul stays sequential
const PARALLEL_MATMUL_THRESHOLD: usize = 1_000;

/// Row-major 2-D matrix of `f32`
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    /// Flat storage, row-major
    pub data: Vec<f32>,
    /// Number of rows (sequence positions)
    pub rows: usize,
    /// Number of columns (features)
    pub cols: usize,
}

impl Tensor {
    /// Create a matrix from flat row-major data
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != rows * cols`
    pub fn new(data: Vec<f32>, rows: usize, cols: usize) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "Data length ({}) doesn't match shape [{}, {}]",
            data.len(),
            rows,
            cols
        );
        Self { data, rows, cols }
    }

    /// Create a zero-filled matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::new(vec![0.0; rows * cols], rows, cols)
    }

    /// Create a zero-filled matrix, reporting allocation failure
    pub fn try_zeros(rows: usize, cols: usize, what: &'static str) -> Result<Self> {
        let len = rows.saturating_mul(cols);
        Ok(Self::new(try_zeroed(len, what)?, rows, cols))
    }

    /// Square identity matrix
    pub fn identity(n: usize) -> Self {
        let mut out = Self::zeros(n, n);
        for i in 0..n {
            out.data[i * n + i] = 1.0;
        }
        out
    }

    /// Build a single-row matrix from a vector
    pub fn from_row(row: Vec<f32>) -> Self {
        let cols = row.len();
        Self::new(row, 1, cols)
    }

    /// Build a matrix from equally sized rows
    ///
    /// # Panics
    ///
    /// Panics if the rows differ in length
    pub fn from_rows(rows: &[Vec<f32>]) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            assert_eq!(row.len(), cols, "All rows must have the same length");
            data.extend_from_slice(row);
        }
        Self::new(data, rows.len(), cols)
    }

    /// Borrow row `i`
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Mutably borrow row `i`
    pub fn row_mut(&mut self, i: usize) -> &mut [f32] {
        let cols = self.cols;
        &mut self.data[i * cols..(i + 1) * cols]
    }

    /// True when every element of row `i` is exactly zero (a padding row)
    pub fn is_zero_row(&self, i: usize) -> bool {
        self.row(i).iter().all(|&x| x == 0.0)
    }

    /// Matrix product `self @ other`
    ///
    /// For `[m, k] @ [k, n]` the result is `[m, n]` with
    /// `C[i,j] = sum_l A[i,l] * B[l,j]`.
    ///
    /// # Panics
    ///
    /// Panics if the inner dimensions differ
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert_eq!(
            self.cols, other.rows,
            "Matrix dimensions incompatible: [{}, {}] @ [{}, {}]",
            self.rows, self.cols, other.rows, other.cols
        );

        let m = self.rows;
        let n = other.cols;
        let k = self.cols;

        if m * n * k >= PARALLEL_MATMUL_THRESHOLD {
            return self.matmul_parallel_blocked(other, m, n, k);
        }

        let mut result = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0;
                for l in 0..k {
                    sum += self.data[i * k + l] * other.data[l * n + j];
                }
                result[i * n + j] = sum;
            }
        }
        Tensor::new(result, m, n)
    }

    /// Accumulate `a_val * b` into `result`; written so LLVM vectorises it
    #[inline(always)]
    fn axpy(a_val: f32, b: &[f32], result: &mut [f32]) {
        for (r, &b_val) in result.iter_mut().zip(b.iter()) {
            *r += a_val * b_val;
        }
    }

    /// Cache-blocked multiply, parallel over blocks of output rows
    fn matmul_parallel_blocked(&self, other: &Tensor, m: usize, n: usize, k: usize) -> Tensor {
        const BLOCK_SIZE: usize = 8;

        let mut result = vec![0.0; m * n];
        if n == 0 {
            return Tensor::new(result, m, n);
        }

        result
            .par_chunks_mut(BLOCK_SIZE * n)
            .enumerate()
            .for_each(|(block_i, result_block)| {
                let i_start = block_i * BLOCK_SIZE;
                let i_end = (i_start + BLOCK_SIZE).min(m);

                for j_start in (0..n).step_by(BLOCK_SIZE) {
                    let j_end = (j_start + BLOCK_SIZE).min(n);
                    for k_start in (0..k).step_by(BLOCK_SIZE) {
                        let k_end = (k_start + BLOCK_SIZE).min(k);
                        for i in i_start..i_end {
                            let row_offset = (i - i_start) * n;
                            for l in k_start..k_end {
                                Self::axpy(
                                    self.data[i * k + l],
                                    &other.data[l * n + j_start..l * n + j_end],
                                    &mut result_block[row_offset + j_start..row_offset + j_end],
                                );
                            }
                        }
                    }
                }
            });

        Tensor::new(result, m, n)
    }

    /// Transpose
    pub fn transpose(&self) -> Tensor {
        let mut result = vec![0.0; self.data.len()];
        for i in 0..self.rows {
            for j in 0..self.cols {
                result[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        Tensor::new(result, self.cols, self.rows)
    }

    /// Row-wise softmax
    ///
    /// Uses the numerically stable form
    ///
    /// ```text
    /// softmax(x)[i] = exp(x[i] - max(x)) / sum_j exp(x[j] - max(x))
    /// ```
    ///
    /// Every output row is a probability distribution. A row whose exponentials
    /// do not sum to a positive finite number (all `-inf`, or NaN input) becomes
    /// uniform instead of dividing by zero. Empty rows stay empty.
    pub fn softmax_rows(&self) -> Tensor {
        let cols = self.cols;
        let mut result = self.data.clone();
        if cols == 0 {
            return Tensor::new(result, self.rows, cols);
        }
        result.par_chunks_mut(cols).for_each(softmax_in_place);
        Tensor::new(result, self.rows, cols)
    }

    /// Element-wise sum of two matrices with the same shape
    pub fn add(&self, other: &Tensor) -> Tensor {
        assert_eq!(
            (self.rows, self.cols),
            (other.rows, other.cols),
            "Shapes must match for addition"
        );
        let result = self
            .data
            .par_iter()
            .zip(&other.data)
            .map(|(a, b)| a + b)
            .collect();
        Tensor::new(result, self.rows, self.cols)
    }

    /// Add `bias` to every row
    pub fn add_row(&self, bias: &[f32]) -> Tensor {
        assert_eq!(bias.len(), self.cols, "Bias length must equal column count");
        let cols = self.cols;
        let result = self
            .data
            .par_iter()
            .enumerate()
            .map(|(i, &x)| x + bias[i % cols])
            .collect();
        Tensor::new(result, self.rows, self.cols)
    }

    /// Multiply every element by a scalar
    pub fn mul_scalar(&self, scalar: f32) -> Tensor {
        self.map(|x| x * scalar)
    }

    /// Apply `f` to every element
    pub fn map<F>(&self, f: F) -> Tensor
    where
        F: Fn(f32) -> f32 + Sync + Send,
    {
        let result = self.data.par_iter().map(|&x| f(x)).collect();
        Tensor::new(result, self.rows, self.cols)
    }

    /// Largest absolute element-wise difference to `other`
    pub fn max_abs_diff(&self, other: &Tensor) -> f32 {
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max)
    }
}

/// Stable softmax over one slice, written back in place
pub fn softmax_in_place(row: &mut [f32]) {
    if row.is_empty() {
        return;
    }
    let max = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let shift = if max.is_finite() { max } else { 0.0 };
    for x in row.iter_mut() {
        *x = (*x - shift).exp();
    }
    let sum: f32 = row.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        for x in row.iter_mut() {
            *x /= sum;
        }
    } else {
        let uniform = 1.0 / row.len() as f32;
        row.iter_mut().for_each(|x| *x = uniform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f32], b: &[f32], tol: f32) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < tol, "{x} vs {y}");
        }
    }

    #[test]
    fn test_add_matrices() {
        let a = Tensor::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]);
        let b = Tensor::from_rows(&[vec![0.5, -2.0], vec![-3.0, 6.0]]);
        let sum = a.add(&b);
        assert_eq!((sum.rows, sum.cols), (2, 2));
        assert_eq!(sum.data, vec![1.5, 0.0, 0.0, 10.0]);
    }

    #[test]
    fn test_from_rows() {
        let m = Tensor::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!((m.rows, m.cols), (2, 3));
        assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(Tensor::from_rows(&[]).data, Vec::<f32>::new());
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_from_rows_ragged() {
        Tensor::from_rows(&[vec![1.0], vec![2.0, 3.0]]);
    }

    #[test]
    #[should_panic(expected = "Shapes must match")]
    fn test_add_shape_mismatch() {
        Tensor::zeros(2, 2).add(&Tensor::zeros(2, 3));
    }

    #[test]
    fn test_matmul_2x2() {
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2);
        let b = Tensor::new(vec![5.0, 6.0, 7.0, 8.0], 2, 2);
        assert_eq!(a.matmul(&b).data, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_identity_small_and_blocked() {
        // 3x3 stays sequential, 20x20 takes the blocked parallel path
        for n in [3, 20] {
            let data: Vec<f32> = (0..n * n).map(|i| (i as f32 * 0.37).sin()).collect();
            let a = Tensor::new(data, n, n);
            let product = a.matmul(&Tensor::identity(n));
            assert!(product.max_abs_diff(&a) < 1e-6);
        }
    }

    #[test]
    fn test_matmul_rectangular_blocked_matches_naive() {
        let a = Tensor::new((0..13 * 17).map(|i| i as f32 * 0.01).collect(), 13, 17);
        let b = Tensor::new((0..17 * 11).map(|i| (i % 7) as f32).collect(), 17, 11);
        let fast = a.matmul(&b);
        let mut naive = vec![0.0; 13 * 11];
        for i in 0..13 {
            for j in 0..11 {
                for l in 0..17 {
                    naive[i * 11 + j] += a.data[i * 17 + l] * b.data[l * 11 + j];
                }
            }
        }
        assert_close(&fast.data, &naive, 1e-3);
    }

    #[test]
    fn test_transpose() {
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3);
        let t = a.transpose();
        assert_eq!((t.rows, t.cols), (3, 2));
        assert_eq!(t.data, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 1000.0, 1000.0, -1000.0], 2, 3);
        let s = x.softmax_rows();
        for i in 0..2 {
            let sum: f32 = s.row(i).iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
            assert!(s.row(i).iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn test_softmax_degenerate_rows() {
        let x = Tensor::new(vec![f32::NEG_INFINITY, f32::NEG_INFINITY], 1, 2);
        assert_eq!(x.softmax_rows().data, vec![0.5, 0.5]);

        let zeros = Tensor::zeros(1, 4);
        assert_close(&zeros.softmax_rows().data, &[0.25; 4], 1e-7);

        let empty = Tensor::zeros(3, 0);
        assert!(empty.softmax_rows().data.is_empty());
    }

    #[test]
    fn test_add_row_and_zero_row() {
        let x = Tensor::new(vec![0.0, 0.0, 1.0, 2.0], 2, 2);
        assert!(x.is_zero_row(0));
        assert!(!x.is_zero_row(1));
        assert_eq!(x.add_row(&[1.0, -1.0]).data, vec![1.0, -1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_try_zeros_overflow_is_error() {
        assert!(Tensor::try_zeros(usize::MAX, 2, "overflow").is_err());
        let ok = Tensor::try_zeros(2, 3, "small").unwrap();
        assert_eq!(ok.data.len(), 6);
    }
}
