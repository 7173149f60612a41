//! Reverse-communication eigenvalue kernel.
//!
//! The kernel never touches the operator. Each call to [`Kernel::advance`]
//! either finishes or leaves a request in [`Workspace::ido`]: a vector sits in
//! `workd` at the 1-based offset `ipntr[0]` and the caller must write the
//! requested product at `ipntr[1]` before calling again. Ritz values and
//! vectors are recovered afterwards with [`Kernel::extract`].
//!
//! Two strategies share one implicitly restarted Arnoldi state machine:
//! [`Symmetric`] keeps a tridiagonal projection and produces real Ritz values,
//! [`General`] keeps a full Hessenberg projection and produces complex pairs.

pub mod arnoldi;
pub mod dense;
pub mod sort;

pub use arnoldi::{Arnoldi, General, Strategy, Symmetric};

use faer::Mat;
use num_complex::Complex64;

use crate::config::mode::Bmat;
use crate::config::options::Which;
use crate::driver::Workspace;

/// `iparam` slots.
pub const IPARAM_SHIFT: usize = 0;
pub const IPARAM_MAXITER: usize = 2;
pub const IPARAM_NCONV: usize = 4;
pub const IPARAM_MODE: usize = 6;
pub const IPARAM_NUM_OP: usize = 8;
pub const IPARAM_NUM_OPB: usize = 9;
pub const IPARAM_NUM_REORTH: usize = 10;

/// `ipntr` slots (values are 1-based offsets).
pub const IPNTR_X: usize = 0;
pub const IPNTR_Y: usize = 1;
pub const IPNTR_BX: usize = 2;
pub const IPNTR_H: usize = 4;
pub const IPNTR_RITZ: usize = 5;

/// Minimum `workl` length.
pub fn scratch_len(symmetric: bool, ncv: usize) -> usize {
    if symmetric {
        ncv * (ncv + 8)
    } else {
        3 * ncv * ncv + 6 * ncv
    }
}

/// Reverse-communication request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ido {
    /// First call.
    #[default]
    Start,
    /// Y = OP·X while building a start vector.
    OpInit,
    /// Y = OP·X; in generalized shift modes B·X is also provided.
    Op,
    /// Y = B·X.
    BProduct,
    /// Caller-supplied shifts. Never requested with exact shifts.
    Shifts,
    /// Iteration finished; see `info`.
    Done,
}

impl Ido {
    pub fn code(&self) -> i32 {
        match self {
            Ido::Start => 0,
            Ido::OpInit => -1,
            Ido::Op => 1,
            Ido::BProduct => 2,
            Ido::Shifts => 3,
            Ido::Done => 99,
        }
    }
}

/// Fixed problem parameters passed on every kernel call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelProblem {
    pub bmat: Bmat,
    pub n: usize,
    pub which: Which,
    pub nev: usize,
    pub tol: f64,
    pub ncv: usize,
}

/// Parameters of the post-loop extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractRequest {
    pub want_vectors: bool,
    pub sigma_re: f64,
    pub sigma_im: f64,
}

/// Numeric status code reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelCode(pub i32);

/// Converged Ritz pairs, most wanted first.
#[derive(Debug, Clone)]
pub struct RitzPairs {
    /// Eigenvalue estimates, already mapped back through the spectral
    /// transformation when the mode allows it.
    pub values: Vec<Complex64>,
    /// Real parts of the unit eigenvectors, `n x values.len()`.
    pub vectors_re: Option<Mat<f64>>,
    /// Imaginary parts; `None` for real problems.
    pub vectors_im: Option<Mat<f64>>,
}

/// The narrow interface the driver needs from a kernel.
pub trait Kernel {
    /// One reverse-communication step.
    fn advance(&mut self, problem: &KernelProblem, ws: &mut Workspace);

    /// Recover the converged Ritz pairs after `advance` reported `Done`.
    fn extract(
        &mut self,
        problem: &KernelProblem,
        request: &ExtractRequest,
        ws: &mut Workspace,
    ) -> Result<RitzPairs, KernelCode>;
}
