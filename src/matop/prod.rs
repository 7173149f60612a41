//! Product-only operators: y = A x over each storage layout.

use faer::Mat;

use crate::core::traits::{Capabilities, MatOp, MatOpKind, MatVec};
use crate::error::{check_dims, EigsError};
use crate::matrix::dense::sym_lower_matvec;
use crate::matrix::{CsrMatrix, PackedSym};

pub(crate) fn require_square(nrows: usize, ncols: usize) -> Result<usize, EigsError> {
    if nrows != ncols {
        return Err(EigsError::Configuration(format!("operator must be square, got {nrows}x{ncols}")));
    }
    Ok(nrows)
}

/// General dense matrix.
#[derive(Debug, Clone)]
pub struct DenseProd {
    a: Mat<f64>,
}

impl DenseProd {
    pub fn new(a: Mat<f64>) -> Result<Self, EigsError> {
        require_square(a.nrows(), a.ncols())?;
        Ok(Self { a })
    }

    pub fn matrix(&self) -> &Mat<f64> {
        &self.a
    }
}

impl MatOp for DenseProd {
    fn dim(&self) -> usize {
        self.a.nrows()
    }
    fn kind(&self) -> MatOpKind {
        MatOpKind::DenseGeneral
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::APPLY
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.a.matvec(x, y);
        Ok(())
    }
}

/// Dense symmetric matrix; only the lower triangle is read.
#[derive(Debug, Clone)]
pub struct SymDenseProd {
    a: Mat<f64>,
}

impl SymDenseProd {
    pub fn new(a: Mat<f64>) -> Result<Self, EigsError> {
        require_square(a.nrows(), a.ncols())?;
        Ok(Self { a })
    }
}

impl MatOp for SymDenseProd {
    fn dim(&self) -> usize {
        self.a.nrows()
    }
    fn kind(&self) -> MatOpKind {
        MatOpKind::DenseSymmetric
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::APPLY
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        sym_lower_matvec(&self.a, x, y);
        Ok(())
    }
}

/// Symmetric matrix in packed storage.
#[derive(Debug, Clone)]
pub struct PackedSymProd {
    a: PackedSym,
}

impl PackedSymProd {
    pub fn new(a: PackedSym) -> Self {
        Self { a }
    }
}

impl MatOp for PackedSymProd {
    fn dim(&self) -> usize {
        self.a.n()
    }
    fn kind(&self) -> MatOpKind {
        MatOpKind::PackedSymmetric
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::APPLY
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.a.matvec(x, y);
        Ok(())
    }
}

/// General CSR matrix.
#[derive(Debug, Clone)]
pub struct SparseProd {
    a: CsrMatrix,
}

impl SparseProd {
    pub fn new(a: CsrMatrix) -> Result<Self, EigsError> {
        require_square(a.nrows(), a.ncols())?;
        Ok(Self { a })
    }
}

impl MatOp for SparseProd {
    fn dim(&self) -> usize {
        self.a.nrows()
    }
    fn kind(&self) -> MatOpKind {
        MatOpKind::SparseGeneral
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::APPLY
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.a.spmv(x, y);
        Ok(())
    }
}

/// Symmetric CSR matrix given by its lower triangle.
#[derive(Debug, Clone)]
pub struct SparseSymProd {
    lower: CsrMatrix,
}

impl SparseSymProd {
    pub fn new(lower: CsrMatrix) -> Result<Self, EigsError> {
        require_square(lower.nrows(), lower.ncols())?;
        Ok(Self { lower })
    }
}

impl MatOp for SparseSymProd {
    fn dim(&self) -> usize {
        self.lower.nrows()
    }
    fn kind(&self) -> MatOpKind {
        MatOpKind::SparseSymmetric
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::APPLY
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.dim(), x, y)?;
        self.lower.sym_lower_spmv(x, y);
        Ok(())
    }
}

/// Operator defined by a caller-supplied product closure.
pub struct FnOp<F> {
    n: usize,
    f: F,
}

impl<F> FnOp<F>
where
    F: Fn(&[f64], &mut [f64]) + Send + Sync,
{
    pub fn new(n: usize, f: F) -> Self {
        Self { n, f }
    }
}

impl<F> MatOp for FnOp<F>
where
    F: Fn(&[f64], &mut [f64]) + Send + Sync,
{
    fn dim(&self) -> usize {
        self.n
    }
    fn kind(&self) -> MatOpKind {
        MatOpKind::Function
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::APPLY
    }
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), EigsError> {
        check_dims(self.n, x, y)?;
        (self.f)(x, y);
        Ok(())
    }
}
