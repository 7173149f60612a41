//! Dense and packed storage on top of Faer.
//!
//! Dense operators use `faer::Mat<f64>` directly. This module adds the
//! symmetric packed layout (lower triangle stored column by column, as in
//! LAPACK `'L'` packed storage) and the shifted copies used by the factorizing
//! operators.

use crate::core::traits::MatVec;
use crate::error::EigsError;
use faer::Mat;

/// `A - σI`.
pub fn shifted(a: &Mat<f64>, sigma: f64) -> Mat<f64> {
    Mat::from_fn(a.nrows(), a.ncols(), |i, j| if i == j { a[(i, j)] - sigma } else { a[(i, j)] })
}

/// `A - σB`.
pub fn shifted_pencil(a: &Mat<f64>, b: &Mat<f64>, sigma: f64) -> Mat<f64> {
    Mat::from_fn(a.nrows(), a.ncols(), |i, j| a[(i, j)] - sigma * b[(i, j)])
}

/// Full symmetric matrix from the lower triangle of `a`.
pub fn symmetrize_lower(a: &Mat<f64>) -> Mat<f64> {
    Mat::from_fn(a.nrows(), a.ncols(), |i, j| if i >= j { a[(i, j)] } else { a[(j, i)] })
}

/// y = A x reading only the lower triangle of `a`.
pub fn sym_lower_matvec(a: &Mat<f64>, x: &[f64], y: &mut [f64]) {
    let n = a.nrows();
    y.iter_mut().for_each(|yi| *yi = 0.0);
    for j in 0..n {
        let xj = x[j];
        y[j] += a[(j, j)] * xj;
        for i in (j + 1)..n {
            let aij = a[(i, j)];
            y[i] += aij * xj;
            y[j] += aij * x[i];
        }
    }
}

/// Symmetric matrix in packed lower-triangular storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedSym {
    n: usize,
    data: Vec<f64>,
}

impl PackedSym {
    /// Wrap packed data of length `n (n + 1) / 2`, column `j` holding rows `j..n`.
    pub fn new(n: usize, data: Vec<f64>) -> Result<Self, EigsError> {
        let len = n * (n + 1) / 2;
        if data.len() != len {
            return Err(EigsError::DimensionMismatch { expected: len, found: data.len() });
        }
        Ok(Self { n, data })
    }

    /// Pack the lower triangle of a dense matrix.
    pub fn from_dense(a: &Mat<f64>) -> Self {
        let n = a.nrows();
        let mut data = Vec::with_capacity(n * (n + 1) / 2);
        for j in 0..n {
            for i in j..n {
                data.push(a[(i, j)]);
            }
        }
        Self { n, data }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    fn index(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i >= j { (i, j) } else { (j, i) };
        i + j * (2 * self.n - j - 1) / 2
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[self.index(i, j)]
    }

    /// Unpack into a full dense matrix.
    pub fn to_dense(&self) -> Mat<f64> {
        Mat::from_fn(self.n, self.n, |i, j| self.get(i, j))
    }
}

impl MatVec for PackedSym {
    fn dim(&self) -> usize {
        self.n
    }

    fn matvec(&self, x: &[f64], y: &mut [f64]) {
        let n = self.n;
        y.iter_mut().for_each(|yi| *yi = 0.0);
        let mut k = 0;
        for j in 0..n {
            let xj = x[j];
            y[j] += self.data[k] * xj;
            k += 1;
            for i in (j + 1)..n {
                let aij = self.data[k];
                y[i] += aij * xj;
                y[j] += aij * x[i];
                k += 1;
            }
        }
    }
}
