//! Direct factorizations using Faer: partial-pivoting dense LU and the
//! supernodal/simplicial sparse LU.
//!
//! Every shift operator factors its shifted matrix exactly once and then
//! reuses the cached factors for each solve the eigensolver requests.
//! Construction doubles as the singularity test: a probe solve that is not
//! finite, or whose growth exceeds `1 / eps`, means the shift sits on (or
//! numerically at) an eigenvalue.
//!
//! # References
//! - Faer documentation: https://github.com/sarah-ek/faer-rs
//! - Golub & Van Loan, Matrix Computations

use faer::linalg::solvers::{PartialPivLu, SolveCore};
use faer::sparse::linalg::solvers::Lu;
use faer::sparse::SparseColMat;
use faer::traits::ComplexField;
use faer::{c64, Conj, Mat, MatMut};

/// Field types the shift factorizations run over.
pub trait Scalar: ComplexField + Copy {
    fn from_real(v: f64) -> Self;
    fn magnitude(self) -> f64;
}

impl Scalar for f64 {
    fn from_real(v: f64) -> Self {
        v
    }
    fn magnitude(self) -> f64 {
        self.abs()
    }
}

impl Scalar for c64 {
    fn from_real(v: f64) -> Self {
        c64::new(v, 0.0)
    }
    fn magnitude(self) -> f64 {
        self.norm()
    }
}

fn probe_rhs<T: Scalar>(n: usize) -> Vec<T> {
    (0..n).map(|i| T::from_real((i as f64 + 0.5).sin())).collect()
}

/// True when `y = A⁻¹ probe` shows the factored matrix is singular.
fn probe_fails<T: Scalar>(norm_a: f64, probe: &[T], y: &[T]) -> bool {
    let probe_norm = probe.iter().fold(0.0, |m: f64, v| m.max(v.magnitude()));
    let mut y_norm = 0.0f64;
    for v in y {
        let m = v.magnitude();
        if !m.is_finite() {
            return true;
        }
        y_norm = y_norm.max(m);
    }
    norm_a * y_norm > probe_norm / f64::EPSILON
}

/// Cached partial-pivoting LU factorization of a square dense matrix.
pub struct LuFactor<T: Scalar = f64> {
    n: usize,
    factor: PartialPivLu<T>,
}

impl<T: Scalar> LuFactor<T> {
    /// Factor `a`; returns `None` when `a` is numerically singular.
    pub fn new(a: &Mat<T>) -> Option<Self> {
        let n = a.nrows();
        let lu = LuFactor { n, factor: PartialPivLu::new(a.as_ref()) };

        let norm_a = (0..n)
            .map(|i| (0..a.ncols()).map(|j| a[(i, j)].magnitude()).sum::<f64>())
            .fold(0.0, f64::max);
        let probe = probe_rhs::<T>(n);
        let mut y = vec![T::from_real(0.0); n];
        lu.solve(&probe, &mut y);
        if probe_fails(norm_a, &probe, &y) {
            return None;
        }
        Some(lu)
    }

    /// Solve using the cached LU factorization: x = A⁻¹ b.
    pub fn solve(&self, b: &[T], x: &mut [T]) {
        let n = self.n;
        x.copy_from_slice(b);
        let x_mat = MatMut::from_column_major_slice_mut(x, n, 1);
        self.factor.solve_in_place_with_conj(Conj::No, x_mat);
    }
}

/// Cached sparse LU of a square column-major matrix, `P A Q = L U`.
pub struct SparseLuFactor<T: Scalar = f64> {
    n: usize,
    factor: Lu<usize, T>,
}

impl<T: Scalar> SparseLuFactor<T> {
    /// Factor `a`; returns `None` when the pattern or the values are singular.
    pub fn new(a: &SparseColMat<usize, T>) -> Option<Self> {
        let n = a.nrows();
        let factor = a.sp_lu().ok()?;
        let lu = SparseLuFactor { n, factor };

        let norm_a = (0..a.ncols())
            .map(|j| a.val_of_col(j).iter().map(|v| v.magnitude()).sum::<f64>())
            .fold(0.0, f64::max);
        let probe = probe_rhs::<T>(n);
        let mut y = vec![T::from_real(0.0); n];
        lu.solve(&probe, &mut y);
        if probe_fails(norm_a, &probe, &y) {
            return None;
        }
        Some(lu)
    }

    /// x = A⁻¹ b.
    pub fn solve(&self, b: &[T], x: &mut [T]) {
        let n = self.n;
        x.copy_from_slice(b);
        let x_mat = MatMut::from_column_major_slice_mut(x, n, 1);
        self.factor.solve_in_place_with_conj(Conj::No, x_mat);
    }
}
