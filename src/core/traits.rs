//! Core linear-algebra traits for krylov-eigs.

use bitflags::bitflags;

use crate::error::EigsError;

/// Matrix–vector product on raw storage: y ← A x.
pub trait MatVec {
    /// Number of rows (and columns; storage here is square).
    fn dim(&self) -> usize;
    /// Compute y = A · x. Lengths are checked by the caller.
    fn matvec(&self, x: &[f64], y: &mut [f64]);
}

/// Inner products & norms.
pub trait InnerProduct<V: ?Sized> {
    /// Compute dot(x, y).
    fn dot(&self, x: &V, y: &V) -> f64;
    /// Compute ‖x‖₂.
    fn norm(&self, x: &V) -> f64;
}

bitflags! {
    /// Operations an operator can perform.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        /// y = A x
        const APPLY          = 0b0000_0001;
        /// y = (A - σB)⁻¹ x, or the selected part of it for a complex σ
        const SOLVE          = 0b0000_0010;
        /// y = B x
        const APPLY_B        = 0b0000_0100;
        /// y = B⁻¹ x
        const SOLVE_B        = 0b0000_1000;
        /// `solve` works on a complex shift
        const COMPLEX_SHIFT  = 0b0001_0000;
        const SHIFT_INVERT   = Self::APPLY.bits() | Self::SOLVE.bits();
        const PENCIL         = Self::APPLY.bits() | Self::APPLY_B.bits();
    }
}

/// Variant tag of a matrix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatOpKind {
    DenseGeneral,
    DenseSymmetric,
    PackedSymmetric,
    SparseGeneral,
    SparseSymmetric,
    ComplexShift,
    Pencil,
    Function,
}

/// Uniform product/solve contract driven by the eigensolver.
///
/// Every call checks that `x` and `y` have length [`MatOp::dim`] and fails with
/// [`EigsError::DimensionMismatch`] before writing into `y` if they do not.
/// Operators only hold immutable data and factorizations fixed at construction.
pub trait MatOp: Send + Sync {
    fn dim(&self) -> usize;

    fn kind(&self) -> MatOpKind;

    fn capabilities(&self) -> Capabilities;

    /// y = A x.
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError>;

    /// y = (A - σB)⁻¹ x.
    fn solve(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        let _ = (x, y);
        Err(EigsError::Unsupported("solve"))
    }

    /// y = B x.
    fn apply_b(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        let _ = (x, y);
        Err(EigsError::Unsupported("apply_b"))
    }

    /// y = B⁻¹ x.
    fn solve_b(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        let _ = (x, y);
        Err(EigsError::Unsupported("solve_b"))
    }
}

impl<M: MatOp + ?Sized> MatOp for Box<M> {
    fn dim(&self) -> usize {
        (**self).dim()
    }
    fn kind(&self) -> MatOpKind {
        (**self).kind()
    }
    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        (**self).apply(x, y)
    }
    fn solve(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        (**self).solve(x, y)
    }
    fn apply_b(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        (**self).apply_b(x, y)
    }
    fn solve_b(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        (**self).solve_b(x, y)
    }
}
