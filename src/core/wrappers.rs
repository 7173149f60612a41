//! Wrappers for faer dense matrix types and vector operations.
//!
//! This module implements the core traits for `faer::Mat<f64>` and plain slices so
//! the operators and the kernel can share one product and one inner-product code
//! path. With the `rayon` feature, long dot products and norms are computed in
//! parallel; this never changes the sequential reverse-communication protocol.
//!
//! # References
//! - [faer crate documentation](https://docs.rs/faer)

use crate::core::traits::{InnerProduct, MatVec};
use faer::Mat;

/// Vectors shorter than this are reduced serially even with `rayon` enabled.
#[cfg(feature = "rayon")]
const PAR_THRESHOLD: usize = 4096;

/// Computes `y = A * x` for a square dense matrix.
impl MatVec for Mat<f64> {
    fn dim(&self) -> usize {
        self.nrows()
    }

    fn matvec(&self, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(self.nrows(), y.len(), "Output vector y has incorrect length");
        debug_assert_eq!(self.ncols(), x.len(), "Input vector x has incorrect length");
        y.iter_mut().for_each(|yi| *yi = 0.0);
        // column-major traversal
        for j in 0..self.ncols() {
            let xj = x[j];
            if xj == 0.0 {
                continue;
            }
            for i in 0..self.nrows() {
                y[i] += self[(i, j)] * xj;
            }
        }
    }
}

/// Inner product and norm for slices, with optional Rayon parallelism.
impl InnerProduct<[f64]> for () {
    fn dot(&self, x: &[f64], y: &[f64]) -> f64 {
        debug_assert_eq!(x.len(), y.len(), "Vectors must have the same length");
        #[cfg(feature = "rayon")]
        {
            if x.len() >= PAR_THRESHOLD {
                use rayon::prelude::*;
                return x.par_iter().zip(y.par_iter()).map(|(xi, yi)| xi * yi).sum();
            }
        }
        x.iter().zip(y.iter()).map(|(xi, yi)| xi * yi).sum()
    }

    fn norm(&self, x: &[f64]) -> f64 {
        self.dot(x, x).sqrt()
    }
}

/// dot(x, y) through the crate-wide inner product.
pub fn dot(x: &[f64], y: &[f64]) -> f64 {
    ().dot(x, y)
}

/// y ← y + alpha x.
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn dense_matvec_matches_manual_product() {
        let a = Mat::from_fn(3, 3, |i, j| (i * 3 + j) as f64);
        let x = [1.0, -1.0, 2.0];
        let mut y = [0.0; 3];
        a.matvec(&x, &mut y);
        assert_eq!(y, [3.0, 9.0, 15.0]);
    }

    #[test]
    fn dot_and_norm() {
        let x = [1.0, 2.0, 3.0];
        let y = [4.0, -5.0, 6.0];
        assert_abs_diff_eq!(dot(&x, &y), 12.0, epsilon = 1e-14);
        assert_abs_diff_eq!(<() as InnerProduct<[f64]>>::norm(&(), &x), 14.0f64.sqrt(), epsilon = 1e-14);
    }
}
