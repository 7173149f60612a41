//! MatOp family: one operator struct per storage layout and transformation.

pub mod complex_shift;
pub mod pencil;
pub mod prod;
pub mod real_shift;

pub use complex_shift::{DenseComplexShift, SparseComplexShift};
pub use pencil::DensePencil;
pub use prod::{DenseProd, FnOp, PackedSymProd, SparseProd, SparseSymProd, SymDenseProd};
pub use real_shift::{DenseShift, PackedSymShift, SparseShift, SparseSymShift, SymDenseShift};

use faer::Mat;

use crate::matrix::{CsrMatrix, PackedSym};

/// Matrix data handed to [`crate::config::build_operator`].
#[derive(Debug, Clone)]
pub enum MatrixData {
    Dense(Mat<f64>),
    /// Only the lower triangle is read.
    SymDense(Mat<f64>),
    SymPacked(PackedSym),
    Sparse(CsrMatrix),
    /// Lower triangle of a symmetric matrix.
    SparseSym(CsrMatrix),
    Pencil { a: Mat<f64>, b: Mat<f64> },
}

impl MatrixData {
    pub fn dim(&self) -> usize {
        match self {
            MatrixData::Dense(a) | MatrixData::SymDense(a) => a.nrows(),
            MatrixData::SymPacked(p) => p.n(),
            MatrixData::Sparse(a) | MatrixData::SparseSym(a) => a.nrows(),
            MatrixData::Pencil { a, .. } => a.nrows(),
        }
    }

    /// Whether the layout itself carries symmetry.
    pub fn is_symmetric_layout(&self) -> bool {
        matches!(self, MatrixData::SymDense(_) | MatrixData::SymPacked(_) | MatrixData::SparseSym(_))
    }
}
