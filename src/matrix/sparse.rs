// CSR storage over faer's sparse row matrix, plus the shifted column-major
// copies the sparse LU factors

use crate::core::traits::MatVec;
use crate::error::EigsError;
use faer::sparse::{SparseColMat, SparseRowMat, Triplet};
use faer::c64;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Rows shorter than this many in total are multiplied serially.
#[cfg(feature = "rayon")]
const PAR_ROWS: usize = 2048;

/// A read-only CSR matrix.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    inner: SparseRowMat<usize, f64>,
}

impl CsrMatrix {
    /// Build a CSR from raw row-ptr, col-idx, and values. Columns within a
    /// row may be unsorted; duplicates are summed.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self, EigsError> {
        if row_ptr.len() != nrows + 1 || row_ptr[0] != 0 {
            return Err(EigsError::Configuration("row_ptr must have nrows + 1 entries starting at 0".into()));
        }
        if row_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(EigsError::Configuration("row_ptr must be non-decreasing".into()));
        }
        let nnz = row_ptr[nrows];
        if col_idx.len() != nnz || values.len() != nnz {
            return Err(EigsError::Configuration(format!(
                "expected {nnz} column indices and values, got {} and {}",
                col_idx.len(),
                values.len()
            )));
        }
        let triplets: Vec<(usize, usize, f64)> = (0..nrows)
            .flat_map(|i| (row_ptr[i]..row_ptr[i + 1]).map(move |k| (i, k)))
            .map(|(i, k)| (i, col_idx[k], values[k]))
            .collect();
        Self::from_triplets(nrows, ncols, &triplets)
    }

    /// Build from (row, col, value) triplets; duplicates are summed.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, f64)]) -> Result<Self, EigsError> {
        if let Some(&(i, j, _)) = triplets.iter().find(|&&(i, j, _)| i >= nrows || j >= ncols) {
            return Err(EigsError::Configuration(format!("entry ({i}, {j}) outside a {nrows}x{ncols} matrix")));
        }
        let entries: Vec<Triplet<usize, usize, f64>> =
            triplets.iter().map(|&(i, j, v)| Triplet::new(i, j, v)).collect();
        let inner = SparseRowMat::try_new_from_triplets(nrows, ncols, &entries)
            .map_err(|e| EigsError::Configuration(format!("cannot assemble CSR matrix: {e:?}")))?;
        Ok(Self { inner })
    }

    pub fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    pub fn nnz(&self) -> usize {
        self.inner.val().len()
    }

    /// Column indices and values of row `i`, columns ascending.
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let sym = self.inner.symbolic();
        let range = sym.row_range(i);
        (&sym.col_idx()[range.clone()], &self.inner.val()[range])
    }

    fn row_dot(&self, i: usize, x: &[f64]) -> f64 {
        let (cols, vals) = self.row(i);
        cols.iter().zip(vals).map(|(&j, &v)| v * x[j]).sum()
    }

    /// Every stored entry as (row, col, value).
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.nrows()).flat_map(move |i| {
            let (cols, vals) = self.row(i);
            cols.iter().zip(vals).map(move |(&j, &v)| (i, j, v))
        })
    }

    /// y = A x using the full stored pattern.
    pub fn spmv(&self, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.ncols());
        debug_assert_eq!(y.len(), self.nrows());
        #[cfg(feature = "rayon")]
        {
            if self.nrows() >= PAR_ROWS {
                self.spmv_parallel(x, y);
                return;
            }
        }
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = self.row_dot(i, x);
        }
    }

    /// Parallel SpMV using Rayon
    #[cfg(feature = "rayon")]
    pub fn spmv_parallel(&self, x: &[f64], y: &mut [f64]) {
        y.par_iter_mut().enumerate().for_each(|(i, yi)| {
            *yi = self.row_dot(i, x);
        });
    }

    /// y = A x treating the stored entries with `col <= row` as the lower
    /// triangle of a symmetric matrix. Entries above the diagonal are ignored.
    pub fn sym_lower_spmv(&self, x: &[f64], y: &mut [f64]) {
        y.iter_mut().for_each(|yi| *yi = 0.0);
        for (i, j, v) in self.triplets().filter(|&(i, j, _)| j <= i) {
            y[i] += v * x[j];
            if j != i {
                y[j] += v * x[i];
            }
        }
    }

    /// Full symmetric matrix from the lower triangle.
    pub fn expand_symmetric_lower(&self) -> Result<Self, EigsError> {
        let mut triplets = Vec::with_capacity(2 * self.nnz());
        for (i, j, v) in self.triplets().filter(|&(i, j, _)| j <= i) {
            triplets.push((i, j, v));
            if j != i {
                triplets.push((j, i, v));
            }
        }
        Self::from_triplets(self.nrows(), self.ncols(), &triplets)
    }

    /// `A - σI` in column-major form, ready for the sparse LU.
    pub fn shifted(&self, sigma: f64) -> Result<SparseColMat<usize, f64>, EigsError> {
        self.shifted_with(sigma, |v| v)
    }

    /// `A - σI` for a complex σ, in column-major form.
    pub fn shifted_complex(&self, sigma: c64) -> Result<SparseColMat<usize, c64>, EigsError> {
        self.shifted_with(sigma, |v| c64::new(v, 0.0))
    }

    fn shifted_with<T>(&self, sigma: T, lift: impl Fn(f64) -> T) -> Result<SparseColMat<usize, T>, EigsError>
    where
        T: faer::traits::ComplexField + Copy + std::ops::Neg<Output = T>,
    {
        let n = self.nrows();
        let entries: Vec<Triplet<usize, usize, T>> = self
            .triplets()
            .map(|(i, j, v)| Triplet::new(i, j, lift(v)))
            .chain((0..n).map(|i| Triplet::new(i, i, -sigma)))
            .collect();
        SparseColMat::try_new_from_triplets(n, self.ncols(), &entries)
            .map_err(|e| EigsError::Factorization(format!("cannot assemble shifted matrix: {e:?}")))
    }
}

impl MatVec for CsrMatrix {
    fn dim(&self) -> usize {
        self.nrows()
    }

    fn matvec(&self, x: &[f64], y: &mut [f64]) {
        self.spmv(x, y)
    }
}
