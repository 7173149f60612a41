//! Reverse-communication driver.
//!
//! [`ReverseCommDriver`] owns the workspace of one solve and runs the plain
//! loop: call [`Kernel::advance`], read the request in `ido`, compute the
//! product the active [`WorkMode`] calls for with the [`MatOp`], write it
//! back, repeat until the kernel reports `Done`.

pub mod workspace;
pub use workspace::Workspace;

use log::trace;

use crate::config::mode::{Bmat, ModeConfig, WorkMode};
use crate::config::options::{ProblemDescriptor, Seed};
use crate::core::traits::MatOp;
use crate::error::{EigsError, KernelPhase};
use crate::kernel::{
    ExtractRequest, Ido, Kernel, KernelProblem, RitzPairs, IPARAM_MAXITER, IPARAM_MODE, IPARAM_NCONV,
    IPARAM_NUM_OP, IPARAM_NUM_OPB, IPARAM_NUM_REORTH, IPARAM_SHIFT, IPNTR_BX, IPNTR_X, IPNTR_Y,
};
use crate::utils::diagnostics::{extract_message, iterate_message};

/// Protocol state of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Init,
    /// Waiting on the operator for the given request.
    RequestProduct(Ido),
    /// The kernel finished with a non-negative `info`.
    Converged,
    /// The kernel finished with a negative `info`.
    Failed(i32),
}

/// Counters the kernel reports once the loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationReport {
    pub info: i32,
    pub iterations: usize,
    pub nconv: usize,
    pub num_op: usize,
    pub num_opb: usize,
    pub num_reorth: usize,
}

/// Drives a [`Kernel`] against a [`MatOp`] for one solve.
pub struct ReverseCommDriver<'a, K> {
    op: &'a dyn MatOp,
    kernel: K,
    problem: KernelProblem,
    mode: ModeConfig,
    max_iterations: usize,
    ws: Workspace,
    state: DriverState,
    x: Vec<f64>,
    bx: Vec<f64>,
    y: Vec<f64>,
}

impl<'a, K: Kernel> ReverseCommDriver<'a, K> {
    pub fn new(op: &'a dyn MatOp, kernel: K, desc: &ProblemDescriptor, mode: ModeConfig) -> Result<Self, EigsError> {
        if op.dim() != desc.n {
            return Err(EigsError::Configuration(format!(
                "operator has dimension {}, descriptor says n = {}",
                op.dim(),
                desc.n
            )));
        }
        let problem = KernelProblem {
            bmat: mode.bmat,
            n: desc.n,
            which: desc.which,
            nev: desc.nev,
            tol: desc.effective_tol(),
            ncv: desc.ncv,
        };
        let n = desc.n;
        Ok(Self {
            op,
            kernel,
            problem,
            mode,
            max_iterations: desc.max_iterations,
            ws: Workspace::new(n, desc.ncv, desc.symmetric),
            state: DriverState::Init,
            x: vec![0.0; n],
            bx: vec![0.0; n],
            y: vec![0.0; n],
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn workspace(&self) -> &Workspace {
        &self.ws
    }

    pub fn problem(&self) -> &KernelProblem {
        &self.problem
    }

    /// Fill the initial residual.
    ///
    /// The default probe seeds `resid = OP p` with `p[i] = sin(i + 0.5)` and
    /// sets `info = 1` so the kernel starts from it.
    pub fn seed(&mut self, seed: &Seed) -> Result<(), EigsError> {
        let n = self.problem.n;
        match seed {
            Seed::Probe => {
                let probe: Vec<f64> = (0..n).map(|i| (i as f64 + 0.5).sin()).collect();
                let mut resid = vec![0.0; n];
                self.apply_operator(Ido::OpInit, &probe, None, &mut resid)?;
                self.ws.resid = resid;
                self.ws.info = 1;
            }
            Seed::Kernel => self.ws.info = 0,
            Seed::Vector(v) => {
                if v.len() != n {
                    return Err(EigsError::DimensionMismatch { expected: n, found: v.len() });
                }
                self.ws.resid.copy_from_slice(v);
                self.ws.info = 1;
            }
        }
        Ok(())
    }

    /// y = OP x (or B x) for the active work mode.
    ///
    /// `bx` is the B·x the kernel supplies with `Ido::Op` in generalized
    /// shift modes.
    fn apply_operator(&self, ido: Ido, x: &[f64], bx: Option<&[f64]>, y: &mut [f64]) -> Result<(), EigsError> {
        let op = self.op;
        let generalized = self.mode.bmat == Bmat::Generalized;
        if ido == Ido::BProduct {
            // buckling takes its inner product from A
            return match self.mode.work_mode {
                WorkMode::Buckling => op.apply(x, y),
                _ => op.apply_b(x, y),
            };
        }
        let n = x.len();
        match self.mode.work_mode {
            WorkMode::Regular => op.apply(x, y),
            WorkMode::RegularInverse => {
                let mut t = vec![0.0; n];
                op.apply(x, &mut t)?;
                op.solve_b(&t, y)
            }
            WorkMode::ShiftInvert | WorkMode::ComplexReal | WorkMode::ComplexImag => {
                if !generalized {
                    return op.solve(x, y);
                }
                match bx {
                    Some(bx) => op.solve(bx, y),
                    None => {
                        let mut t = vec![0.0; n];
                        op.apply_b(x, &mut t)?;
                        op.solve(&t, y)
                    }
                }
            }
            WorkMode::Buckling => match bx {
                Some(ax) => op.solve(ax, y),
                None => {
                    let mut t = vec![0.0; n];
                    op.apply(x, &mut t)?;
                    op.solve(&t, y)
                }
            },
            WorkMode::Cayley => {
                let sigma = self.mode.sigma_re;
                let mut t = vec![0.0; n];
                op.apply(x, &mut t)?;
                if !generalized {
                    t.iter_mut().zip(x).for_each(|(ti, xi)| *ti += sigma * xi);
                } else {
                    let mut b = vec![0.0; n];
                    match bx {
                        Some(bx) => b.copy_from_slice(bx),
                        None => op.apply_b(x, &mut b)?,
                    }
                    t.iter_mut().zip(&b).for_each(|(ti, bi)| *ti += sigma * bi);
                }
                op.solve(&t, y)
            }
        }
    }

    /// `workd` range named by `ipntr[slot]`; a missing one is a kernel fault.
    fn slot(&mut self, slot: usize) -> Result<std::ops::Range<usize>, EigsError> {
        self.ws.workd_range(slot).ok_or_else(|| {
            self.state = DriverState::Failed(-9999);
            EigsError::KernelFatal { phase: KernelPhase::Iterate, code: -9999, message: iterate_message(-9999) }
        })
    }

    /// Serve one request: copy the inputs out of `workd`, compute, write Y.
    fn dispatch(&mut self, ido: Ido) -> Result<(), EigsError> {
        let xr = self.slot(IPNTR_X)?;
        let yr = self.slot(IPNTR_Y)?;
        self.x.copy_from_slice(&self.ws.workd[xr]);
        let with_bx = ido == Ido::Op && self.mode.bmat == Bmat::Generalized && self.mode.work_mode.code() >= 3;
        if with_bx {
            let br = self.slot(IPNTR_BX)?;
            self.bx.copy_from_slice(&self.ws.workd[br]);
        }
        let mut y = std::mem::take(&mut self.y);
        let bx = if with_bx { Some(self.bx.as_slice()) } else { None };
        let result = self.apply_operator(ido, &self.x, bx, &mut y);
        if result.is_ok() {
            self.ws.workd[yr].copy_from_slice(&y);
        }
        self.y = y;
        result
    }

    /// Run the iteration until the kernel reports `Done`.
    pub fn run(&mut self) -> Result<IterationReport, EigsError> {
        self.ws.iparam[IPARAM_SHIFT] = 1;
        self.ws.iparam[IPARAM_MAXITER] = self.max_iterations;
        self.ws.iparam[IPARAM_MODE] = self.mode.work_mode.code() as usize;
        self.ws.ido = Ido::Start;
        self.state = DriverState::Init;

        loop {
            self.kernel.advance(&self.problem, &mut self.ws);
            let ido = self.ws.ido;
            match ido {
                Ido::OpInit | Ido::Op | Ido::BProduct => {
                    self.state = DriverState::RequestProduct(ido);
                    trace!("request ido = {}, x at {}, y at {}", ido.code(), self.ws.ipntr[IPNTR_X], self.ws.ipntr[IPNTR_Y]);
                    self.dispatch(ido)?;
                }
                Ido::Done => break,
                Ido::Shifts => return Err(EigsError::Unsupported("caller-supplied shifts")),
                Ido::Start => {
                    return Err(EigsError::KernelFatal {
                        phase: KernelPhase::Iterate,
                        code: -9999,
                        message: iterate_message(-9999),
                    })
                }
            }
        }

        let info = self.ws.info;
        if info < 0 {
            self.state = DriverState::Failed(info);
            return Err(EigsError::KernelFatal { phase: KernelPhase::Iterate, code: info, message: iterate_message(info) });
        }
        self.state = DriverState::Converged;
        Ok(IterationReport {
            info,
            iterations: self.ws.iparam[IPARAM_MAXITER],
            nconv: self.ws.iparam[IPARAM_NCONV],
            num_op: self.ws.iparam[IPARAM_NUM_OP],
            num_opb: self.ws.iparam[IPARAM_NUM_OPB],
            num_reorth: self.ws.iparam[IPARAM_NUM_REORTH],
        })
    }

    /// Post-loop extraction of the converged pairs.
    pub fn extract(&mut self, want_vectors: bool) -> Result<RitzPairs, EigsError> {
        let request =
            ExtractRequest { want_vectors, sigma_re: self.mode.sigma_re, sigma_im: self.mode.sigma_im };
        self.kernel.extract(&self.problem, &request, &mut self.ws).map_err(|code| EigsError::KernelFatal {
            phase: KernelPhase::Extract,
            code: code.0,
            message: extract_message(code.0),
        })
    }
}
