//! Complex-shift operators for non-symmetric problems.
//!
//! For σ = σr + iσi the complex matrix `A - σI` is factored once in `c64`.
//! `solve` lifts the real right-hand side, solves `(A - σI) z = x` and returns
//! `Re z` or `Im z` depending on the selected [`ComplexPart`].

use faer::{c64, Mat};

use crate::config::options::ComplexPart;
use crate::core::traits::{Capabilities, MatOp, MatOpKind, MatVec};
use crate::error::{check_dims, EigsError};
use crate::matop::prod::require_square;
use crate::matrix::CsrMatrix;
use crate::solver::{LuFactor, SparseLuFactor};

fn singular(sigma_re: f64, sigma_im: f64) -> EigsError {
    EigsError::SingularShift { sigma_re, sigma_im }
}

/// Solve with the complex factor `f` and copy the requested part into `y`.
fn solve_part(part: ComplexPart, x: &[f64], y: &mut [f64], f: impl FnOnce(&[c64], &mut [c64])) {
    let rhs: Vec<c64> = x.iter().map(|&v| c64::new(v, 0.0)).collect();
    let mut z = vec![c64::new(0.0, 0.0); x.len()];
    f(&rhs, &mut z);
    for (yi, zi) in y.iter_mut().zip(&z) {
        *yi = match part {
            ComplexPart::Real => zi.re,
            ComplexPart::Imag => zi.im,
        };
    }
}

/// Dense general A with a complex shift.
pub struct DenseComplexShift {
    a: Mat<f64>,
    sigma: (f64, f64),
    part: ComplexPart,
    lu: LuFactor<c64>,
}

impl DenseComplexShift {
    pub fn new(a: Mat<f64>, sigma_re: f64, sigma_im: f64, part: ComplexPart) -> Result<Self, EigsError> {
        let n = require_square(a.nrows(), a.ncols())?;
        let sigma = c64::new(sigma_re, sigma_im);
        let shifted = Mat::from_fn(n, n, |i, j| {
            let v = c64::new(a[(i, j)], 0.0);
            if i == j { v - sigma } else { v }
        });
        let lu = LuFactor::new(&shifted).ok_or_else(|| singular(sigma_re, sigma_im))?;
        Ok(Self { a, sigma: (sigma_re, sigma_im), part, lu })
    }

    pub fn sigma(&self) -> (f64, f64) {
        self.sigma
    }

    pub fn part(&self) -> ComplexPart {
        self.part
    }
}

impl MatOp for DenseComplexShift {
    fn dim(&self) -> usize {
        self.a.nrows()
    }
    fn kind(&self) -> MatOpKind {
        MatOpKind::ComplexShift
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::SHIFT_INVERT | Capabilities::COMPLEX_SHIFT
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.a.matvec(x, y);
        Ok(())
    }
    fn solve(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        solve_part(self.part, x, y, |b, z| self.lu.solve(b, z));
        Ok(())
    }
}

/// Sparse general A with a complex shift, factored with faer's sparse LU.
pub struct SparseComplexShift {
    a: CsrMatrix,
    sigma: (f64, f64),
    part: ComplexPart,
    lu: SparseLuFactor<c64>,
}

impl SparseComplexShift {
    pub fn new(a: CsrMatrix, sigma_re: f64, sigma_im: f64, part: ComplexPart) -> Result<Self, EigsError> {
        require_square(a.nrows(), a.ncols())?;
        let shifted = a.shifted_complex(c64::new(sigma_re, sigma_im))?;
        let lu = SparseLuFactor::new(&shifted).ok_or_else(|| singular(sigma_re, sigma_im))?;
        Ok(Self { a, sigma: (sigma_re, sigma_im), part, lu })
    }

    pub fn sigma(&self) -> (f64, f64) {
        self.sigma
    }
}

impl MatOp for SparseComplexShift {
    fn dim(&self) -> usize {
        self.a.nrows()
    }
    fn kind(&self) -> MatOpKind {
        MatOpKind::ComplexShift
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::SHIFT_INVERT | Capabilities::COMPLEX_SHIFT
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.a.spmv(x, y);
        Ok(())
    }
    fn solve(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        solve_part(self.part, x, y, |b, z| self.lu.solve(b, z));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    // A = diag(2, 5); (A - σ)⁻¹ is diagonal with entries 1 / (d - σ)
    fn diag() -> Mat<f64> {
        Mat::from_fn(2, 2, |i, j| if i == j { [2.0, 5.0][i] } else { 0.0 })
    }

    #[test]
    fn dense_parts_match_complex_resolvent() {
        let sigma = Complex64::new(1.0, 0.5);
        let x = [1.0, 2.0];
        let re = DenseComplexShift::new(diag(), sigma.re, sigma.im, ComplexPart::Real).unwrap();
        let im = DenseComplexShift::new(diag(), sigma.re, sigma.im, ComplexPart::Imag).unwrap();
        let mut yr = [0.0; 2];
        let mut yi = [0.0; 2];
        re.solve(&x, &mut yr).unwrap();
        im.solve(&x, &mut yi).unwrap();
        for (k, d) in [2.0, 5.0].iter().enumerate() {
            let z = Complex64::new(x[k], 0.0) / (Complex64::new(*d, 0.0) - sigma);
            assert_relative_eq!(yr[k], z.re, epsilon = 1e-12);
            assert_relative_eq!(yi[k], z.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn sparse_agrees_with_dense() {
        let a = Mat::from_fn(3, 3, |i, j| match (i, j) {
            (0, 0) => 1.0,
            (0, 1) => 2.0,
            (1, 1) => 3.0,
            (2, 0) => -1.0,
            (2, 2) => 4.0,
            _ => 0.0,
        });
        let triplets = [(0, 0, 1.0), (0, 1, 2.0), (1, 1, 3.0), (2, 0, -1.0), (2, 2, 4.0)];
        let csr = CsrMatrix::from_triplets(3, 3, &triplets).unwrap();
        for part in [ComplexPart::Real, ComplexPart::Imag] {
            let d = DenseComplexShift::new(a.clone(), 2.0, 0.75, part).unwrap();
            let s = SparseComplexShift::new(csr.clone(), 2.0, 0.75, part).unwrap();
            let x = [0.3, -0.2, 1.0];
            let mut yd = [0.0; 3];
            let mut ys = [0.0; 3];
            d.solve(&x, &mut yd).unwrap();
            s.solve(&x, &mut ys).unwrap();
            for k in 0..3 {
                assert_relative_eq!(yd[k], ys[k], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn real_eigenvalue_with_zero_imaginary_shift_is_singular() {
        let err = DenseComplexShift::new(diag(), 2.0, 0.0, ComplexPart::Real).err().unwrap();
        assert_eq!(err, EigsError::SingularShift { sigma_re: 2.0, sigma_im: 0.0 });
    }

    #[test]
    fn block_diagonal_of_moderate_size() {
        // 2x2 rotation blocks with eigenvalues k ± i, n = 24
        let n = 24;
        let a = Mat::from_fn(n, n, |i, j| {
            let k = (i / 2 + 1) as f64;
            match (i.abs_diff(j), i % 2) {
                (0, _) => k,
                (1, 0) if j == i + 1 => 1.0,
                (1, 1) if j + 1 == i => -1.0,
                _ => 0.0,
            }
        });
        let sigma = Complex64::new(2.5, 0.5);
        let re = DenseComplexShift::new(a.clone(), sigma.re, sigma.im, ComplexPart::Real).unwrap();
        let im = DenseComplexShift::new(a.clone(), sigma.re, sigma.im, ComplexPart::Imag).unwrap();
        let x: Vec<f64> = (0..n).map(|i| (i as f64).cos()).collect();
        let (mut yr, mut yi) = (vec![0.0; n], vec![0.0; n]);
        re.solve(&x, &mut yr).unwrap();
        im.solve(&x, &mut yi).unwrap();
        // (A - σI) z must reproduce x
        for i in 0..n {
            let az: Complex64 = (0..n).map(|j| Complex64::new(yr[j], yi[j]) * a[(i, j)]).sum();
            let r = az - sigma * Complex64::new(yr[i], yi[i]);
            assert_relative_eq!(r.re, x[i], epsilon = 1e-10);
            assert_relative_eq!(r.im, 0.0, epsilon = 1e-10);
        }
    }
}
