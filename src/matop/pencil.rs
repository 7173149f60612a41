//! Dense generalized pencil `(A, B)` for `A x = λ B x`.

use faer::Mat;

use crate::core::traits::{Capabilities, MatOp, MatOpKind, MatVec};
use crate::error::{check_dims, EigsError};
use crate::matop::prod::require_square;
use crate::matrix::dense::shifted_pencil;
use crate::solver::LuFactor;

/// Dense pencil with optional cached factorizations of `B` and `A - σB`.
pub struct DensePencil {
    a: Mat<f64>,
    b: Mat<f64>,
    sigma: Option<f64>,
    lu_shift: Option<LuFactor>,
    lu_b: Option<LuFactor>,
}

impl DensePencil {
    /// Pencil for the regular-inverse mode, `OP = B⁻¹A`. `B` must be
    /// nonsingular.
    pub fn new(a: Mat<f64>, b: Mat<f64>) -> Result<Self, EigsError> {
        let n = check_pencil(&a, &b)?;
        let lu_b = LuFactor::new(&b)
            .ok_or_else(|| EigsError::Factorization(format!("B ({n}x{n}) is numerically singular")))?;
        Ok(Self { a, b, sigma: None, lu_shift: None, lu_b: Some(lu_b) })
    }

    /// Pencil for the shift modes, factoring `A - σB`.
    pub fn with_shift(a: Mat<f64>, b: Mat<f64>, sigma: f64) -> Result<Self, EigsError> {
        check_pencil(&a, &b)?;
        let lu = LuFactor::new(&shifted_pencil(&a, &b, sigma)).ok_or_else(|| EigsError::singular(sigma))?;
        Ok(Self { a, b, sigma: Some(sigma), lu_shift: Some(lu), lu_b: None })
    }

    pub fn sigma(&self) -> Option<f64> {
        self.sigma
    }
}

fn check_pencil(a: &Mat<f64>, b: &Mat<f64>) -> Result<usize, EigsError> {
    let n = require_square(a.nrows(), a.ncols())?;
    let nb = require_square(b.nrows(), b.ncols())?;
    if n != nb {
        return Err(EigsError::Configuration(format!("pencil sizes differ: A is {n}x{n}, B is {nb}x{nb}")));
    }
    Ok(n)
}

impl MatOp for DensePencil {
    fn dim(&self) -> usize {
        self.a.nrows()
    }
    fn kind(&self) -> MatOpKind {
        MatOpKind::Pencil
    }
    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::PENCIL;
        if self.lu_shift.is_some() {
            caps |= Capabilities::SOLVE;
        }
        if self.lu_b.is_some() {
            caps |= Capabilities::SOLVE_B;
        }
        caps
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.a.matvec(x, y);
        Ok(())
    }
    fn solve(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        let lu = self.lu_shift.as_ref().ok_or(EigsError::Unsupported("solve"))?;
        check_dims(self.dim(), x, y)?;
        lu.solve(x, y);
        Ok(())
    }
    fn apply_b(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.b.matvec(x, y);
        Ok(())
    }
    fn solve_b(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        let lu = self.lu_b.as_ref().ok_or(EigsError::Unsupported("solve_b"))?;
        check_dims(self.dim(), x, y)?;
        lu.solve(x, y);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pencil() -> (Mat<f64>, Mat<f64>) {
        let a = Mat::from_fn(3, 3, |i, j| if i == j { 2.0 * (i + 1) as f64 } else { 0.0 });
        let b = Mat::from_fn(3, 3, |i, j| if i == j { 2.0 } else { 0.0 });
        (a, b)
    }

    #[test]
    fn regular_pencil_capabilities() {
        let (a, b) = pencil();
        let op = DensePencil::new(a, b).unwrap();
        let caps = op.capabilities();
        assert!(caps.contains(Capabilities::PENCIL | Capabilities::SOLVE_B));
        assert!(!caps.contains(Capabilities::SOLVE));
        let mut y = [0.0; 3];
        op.solve_b(&[2.0, 4.0, 6.0], &mut y).unwrap();
        assert_eq!(y, [1.0, 2.0, 3.0]);
        assert!(matches!(op.solve(&[1.0; 3], &mut y), Err(EigsError::Unsupported("solve"))));
    }

    #[test]
    fn shifted_pencil_solves() {
        let (a, b) = pencil();
        let op = DensePencil::with_shift(a, b, 0.5).unwrap();
        // (A - 0.5 B) = diag(1, 3, 5)
        let mut y = [0.0; 3];
        op.solve(&[1.0, 3.0, 5.0], &mut y).unwrap();
        for v in y {
            assert_relative_eq!(v, 1.0, epsilon = 1e-12);
        }
        op.apply_b(&[1.0, 1.0, 1.0], &mut y).unwrap();
        assert_eq!(y, [2.0, 2.0, 2.0]);
    }

    #[test]
    fn singular_inputs_rejected() {
        let (a, b) = pencil();
        assert!(matches!(DensePencil::with_shift(a.clone(), b.clone(), 1.0), Err(EigsError::SingularShift { .. })));
        assert!(matches!(DensePencil::new(a.clone(), Mat::zeros(3, 3)), Err(EigsError::Factorization(_))));
        assert!(matches!(DensePencil::new(a, Mat::zeros(2, 2)), Err(EigsError::Configuration(_))));
    }
}
