//! Kernel status codes, warnings and the structured solve outcome.

use bitflags::bitflags;
use faer::Mat;
use num_complex::Complex64;

bitflags! {
    /// Non-fatal conditions reported with an outcome.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct Warnings: u8 {
        /// The iteration cap was reached before `nev` values converged.
        const MAX_ITERATIONS = 0b001;
        /// No shifts could be applied during a restart.
        const NO_SHIFTS      = 0b010;
        /// Nothing converged; the outcome is empty.
        const ZERO_CONVERGED = 0b100;
    }
}

/// Summary classification of an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Converged,
    ConvergenceWarning,
    ZeroConverged,
}

impl Status {
    pub fn from_warnings(w: Warnings) -> Self {
        if w.contains(Warnings::ZERO_CONVERGED) {
            Status::ZeroConverged
        } else if w.is_empty() {
            Status::Converged
        } else {
            Status::ConvergenceWarning
        }
    }
}

/// Warnings implied by a non-negative iterate `info`.
pub fn iterate_warnings(info: i32) -> Warnings {
    match info {
        1 => Warnings::MAX_ITERATIONS,
        3 => Warnings::NO_SHIFTS,
        _ => Warnings::empty(),
    }
}

/// Message for an iterate-phase status code.
pub fn iterate_message(code: i32) -> &'static str {
    match code {
        1 => "maximum number of iterations taken",
        3 => "no shifts could be applied, try to increase ncv",
        -1 => "n must be positive",
        -2 => "nev must be positive",
        -3 => "nev < ncv <= n is required",
        -4 => "maxiter must be positive",
        -5 => "which is not valid for this problem type",
        -7 => "length of private work array WORKL is not sufficient",
        -8 => "error return from the projected eigenvalue calculation",
        -9 => "starting vector is zero",
        -10 => "work mode is not supported",
        -11 => "mode 1 cannot be combined with a generalized problem",
        -12 => "only exact shifts (ishift = 1) are supported",
        -13 => "nev must be greater than 1 when which = BE",
        -9999 => "couldn't build an Arnoldi factorization",
        _ => "unknown iterate status",
    }
}

/// Message for an extract-phase status code.
pub fn extract_message(code: i32) -> &'static str {
    match code {
        -1 => "n must be positive",
        -2 => "nev must be positive",
        -3 => "nev < ncv <= n is required",
        -5 => "which is not valid for this problem type",
        -7 => "length of private work array WORKL is not sufficient",
        -8 => "error return from the projected eigenvalue calculation",
        -9 => "starting vector is zero",
        -14 => "the iteration did not find any eigenvalues to sufficient accuracy",
        -17 => "extraction got a different count of converged Ritz values than the iteration",
        _ => "unknown extract status",
    }
}

/// Eigenvectors of a real non-symmetric problem, split into real and
/// imaginary blocks (`n x nconv` each).
#[derive(Debug, Clone)]
pub struct ComplexVectors {
    pub re: Mat<f64>,
    pub im: Mat<f64>,
}

impl ComplexVectors {
    pub fn column(&self, j: usize) -> Vec<Complex64> {
        (0..self.re.nrows()).map(|i| Complex64::new(self.re[(i, j)], self.im[(i, j)])).collect()
    }

    pub fn ncols(&self) -> usize {
        self.re.ncols()
    }
}

/// Result of one solve.
#[derive(Debug, Clone)]
pub struct Outcome<T, B> {
    pub nconv: usize,
    /// Most wanted first.
    pub values: Vec<T>,
    pub vectors: Option<B>,
    pub iterations: usize,
    pub num_op: usize,
    pub num_opb: usize,
    pub num_reorth: usize,
    pub status: Status,
    pub warnings: Warnings,
}

pub type SymOutcome = Outcome<f64, Mat<f64>>;
pub type NonSymOutcome = Outcome<Complex64, ComplexVectors>;

impl<T, B> Outcome<T, B> {
    pub fn is_converged(&self) -> bool {
        self.status == Status::Converged
    }

    /// Outcome with no values, flagged `ZERO_CONVERGED`.
    pub fn empty(iterations: usize, num_op: usize, num_opb: usize, num_reorth: usize, warnings: Warnings) -> Self {
        let warnings = warnings | Warnings::ZERO_CONVERGED;
        Self {
            nconv: 0,
            values: Vec::new(),
            vectors: None,
            iterations,
            num_op,
            num_opb,
            num_reorth,
            status: Status::from_warnings(warnings),
            warnings,
        }
    }
}
