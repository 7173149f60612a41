//! Shift-invert operators for a real shift σ.
//!
//! Each variant factors `A - σI` once when it is built and answers every
//! `solve` with two triangular solves against the cached factors. `apply`
//! still multiplies by the unshifted A, which the Cayley transformation and
//! the Rayleigh-quotient recovery both need.

use faer::Mat;

use crate::core::traits::{Capabilities, MatOp, MatOpKind, MatVec};
use crate::error::{check_dims, EigsError};
use crate::matop::prod::require_square;
use crate::matrix::dense::{shifted, sym_lower_matvec, symmetrize_lower};
use crate::matrix::{CsrMatrix, PackedSym};
use crate::solver::{LuFactor, SparseLuFactor};

fn factor_dense(m: &Mat<f64>, sigma: f64) -> Result<LuFactor, EigsError> {
    LuFactor::new(m).ok_or_else(|| EigsError::singular(sigma))
}

fn factor_sparse(full: &CsrMatrix, sigma: f64) -> Result<SparseLuFactor, EigsError> {
    SparseLuFactor::new(&full.shifted(sigma)?).ok_or_else(|| EigsError::singular(sigma))
}

/// Dense general A with `(A - σI)⁻¹`.
pub struct DenseShift {
    a: Mat<f64>,
    sigma: f64,
    lu: LuFactor,
}

impl DenseShift {
    pub fn new(a: Mat<f64>, sigma: f64) -> Result<Self, EigsError> {
        require_square(a.nrows(), a.ncols())?;
        let lu = factor_dense(&shifted(&a, sigma), sigma)?;
        Ok(Self { a, sigma, lu })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl MatOp for DenseShift {
    fn dim(&self) -> usize {
        self.a.nrows()
    }
    fn kind(&self) -> MatOpKind {
        MatOpKind::DenseGeneral
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::SHIFT_INVERT
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.a.matvec(x, y);
        Ok(())
    }
    fn solve(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.lu.solve(x, y);
        Ok(())
    }
}

/// Dense symmetric A (lower triangle) with `(A - σI)⁻¹`.
pub struct SymDenseShift {
    a: Mat<f64>,
    sigma: f64,
    lu: LuFactor,
}

impl SymDenseShift {
    pub fn new(a: Mat<f64>, sigma: f64) -> Result<Self, EigsError> {
        require_square(a.nrows(), a.ncols())?;
        let lu = factor_dense(&shifted(&symmetrize_lower(&a), sigma), sigma)?;
        Ok(Self { a, sigma, lu })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl MatOp for SymDenseShift {
    fn dim(&self) -> usize {
        self.a.nrows()
    }
    fn kind(&self) -> MatOpKind {
        MatOpKind::DenseSymmetric
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::SHIFT_INVERT
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        sym_lower_matvec(&self.a, x, y);
        Ok(())
    }
    fn solve(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.lu.solve(x, y);
        Ok(())
    }
}

/// Packed symmetric A with `(A - σI)⁻¹`.
///
/// The factorization works on an unpacked copy.
pub struct PackedSymShift {
    a: PackedSym,
    sigma: f64,
    lu: LuFactor,
}

impl PackedSymShift {
    pub fn new(a: PackedSym, sigma: f64) -> Result<Self, EigsError> {
        let lu = factor_dense(&shifted(&a.to_dense(), sigma), sigma)?;
        Ok(Self { a, sigma, lu })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl MatOp for PackedSymShift {
    fn dim(&self) -> usize {
        self.a.n()
    }
    fn kind(&self) -> MatOpKind {
        MatOpKind::PackedSymmetric
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::SHIFT_INVERT
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.a.matvec(x, y);
        Ok(())
    }
    fn solve(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.lu.solve(x, y);
        Ok(())
    }
}

/// Sparse general A with a faer sparse LU of `A - σI`.
pub struct SparseShift {
    a: CsrMatrix,
    sigma: f64,
    lu: SparseLuFactor,
}

impl SparseShift {
    pub fn new(a: CsrMatrix, sigma: f64) -> Result<Self, EigsError> {
        require_square(a.nrows(), a.ncols())?;
        let lu = factor_sparse(&a, sigma)?;
        Ok(Self { a, sigma, lu })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl MatOp for SparseShift {
    fn dim(&self) -> usize {
        self.a.nrows()
    }
    fn kind(&self) -> MatOpKind {
        MatOpKind::SparseGeneral
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::SHIFT_INVERT
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.a.spmv(x, y);
        Ok(())
    }
    fn solve(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.lu.solve(x, y);
        Ok(())
    }
}

/// Sparse symmetric A stored as its lower triangle.
pub struct SparseSymShift {
    lower: CsrMatrix,
    sigma: f64,
    lu: SparseLuFactor,
}

impl SparseSymShift {
    pub fn new(lower: CsrMatrix, sigma: f64) -> Result<Self, EigsError> {
        require_square(lower.nrows(), lower.ncols())?;
        let lu = factor_sparse(&lower.expand_symmetric_lower()?, sigma)?;
        Ok(Self { lower, sigma, lu })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl MatOp for SparseSymShift {
    fn dim(&self) -> usize {
        self.lower.nrows()
    }
    fn kind(&self) -> MatOpKind {
        MatOpKind::SparseSymmetric
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::SHIFT_INVERT
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.lower.sym_lower_spmv(x, y);
        Ok(())
    }
    fn solve(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.lu.solve(x, y);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tridiag(n: usize) -> Mat<f64> {
        Mat::from_fn(n, n, |i, j| {
            if i == j {
                4.0
            } else if i.abs_diff(j) == 1 {
                -1.0
            } else {
                0.0
            }
        })
    }

    fn lower_triplets(a: &Mat<f64>) -> Vec<(usize, usize, f64)> {
        let mut t = Vec::new();
        for i in 0..a.nrows() {
            for j in 0..=i {
                if a[(i, j)] != 0.0 {
                    t.push((i, j, a[(i, j)]));
                }
            }
        }
        t
    }

    #[test]
    fn solve_inverts_shifted_matrix() {
        let n = 6;
        let a = tridiag(n);
        let sigma = 0.7;
        let full: Vec<(usize, usize, f64)> = (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .map(|(i, j)| (i, j, a[(i, j)]))
            .filter(|t| t.2 != 0.0)
            .collect();
        let lower = lower_triplets(&a);
        let ops: Vec<Box<dyn MatOp>> = vec![
            Box::new(DenseShift::new(a.clone(), sigma).unwrap()),
            Box::new(SymDenseShift::new(a.clone(), sigma).unwrap()),
            Box::new(PackedSymShift::new(PackedSym::from_dense(&a), sigma).unwrap()),
            Box::new(SparseShift::new(CsrMatrix::from_triplets(n, n, &full).unwrap(), sigma).unwrap()),
            Box::new(SparseSymShift::new(CsrMatrix::from_triplets(n, n, &lower).unwrap(), sigma).unwrap()),
        ];
        let x: Vec<f64> = (0..n).map(|i| 1.0 + i as f64).collect();
        for op in &ops {
            assert!(op.capabilities().contains(Capabilities::SHIFT_INVERT));
            let mut y = vec![0.0; n];
            op.solve(&x, &mut y).unwrap();
            // (A - σI) y should reproduce x
            let mut ay = vec![0.0; n];
            op.apply(&y, &mut ay).unwrap();
            for i in 0..n {
                assert_relative_eq!(ay[i] - sigma * y[i], x[i], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn shift_on_eigenvalue_is_rejected() {
        let a = Mat::from_fn(5, 5, |i, j| if i == j { (i + 1) as f64 } else { 0.0 });
        let err = DenseShift::new(a.clone(), 3.0).err().unwrap();
        assert_eq!(err, EigsError::SingularShift { sigma_re: 3.0, sigma_im: 0.0 });
        assert!(SymDenseShift::new(a.clone(), 3.0).is_err());
        let lower = lower_triplets(&a);
        let csr = CsrMatrix::from_triplets(5, 5, &lower).unwrap();
        assert!(matches!(SparseSymShift::new(csr, 3.0), Err(EigsError::SingularShift { .. })));
    }

    #[test]
    fn solve_checks_lengths() {
        let op = DenseShift::new(tridiag(4), 0.0).unwrap();
        let mut y = [1.0; 3];
        assert!(matches!(op.solve(&[1.0; 4], &mut y), Err(EigsError::DimensionMismatch { .. })));
        assert_eq!(y, [1.0; 3]);
    }

    #[test]
    fn large_diagonal_shift_is_not_singular() {
        let n = 32;
        let d: Vec<f64> = (0..n).map(|i| (i + 1) as f64).collect();
        let a = Mat::from_fn(n, n, |i, j| if i == j { d[i] } else { 0.0 });
        let sigma = 0.5;
        let lower: Vec<(usize, usize, f64)> = (0..n).map(|i| (i, i, d[i])).collect();
        let ops: Vec<Box<dyn MatOp>> = vec![
            Box::new(DenseShift::new(a.clone(), sigma).unwrap()),
            Box::new(SymDenseShift::new(a.clone(), sigma).unwrap()),
            Box::new(PackedSymShift::new(PackedSym::from_dense(&a), sigma).unwrap()),
            Box::new(SparseSymShift::new(CsrMatrix::from_triplets(n, n, &lower).unwrap(), sigma).unwrap()),
        ];
        let x = vec![1.0; n];
        for op in &ops {
            let mut y = vec![0.0; n];
            op.solve(&x, &mut y).unwrap();
            for i in 0..n {
                assert_relative_eq!(y[i], 1.0 / (d[i] - sigma), epsilon = 1e-12);
            }
        }
    }
}
