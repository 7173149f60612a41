//! Solve context for sparse eigenvalue problems.
//!
//! An `EigsContext` holds a validated [`ProblemDescriptor`], the operator that
//! serves it and the resolved [`ModeConfig`]. `solve_symmetric` and
//! `solve_general` run the reverse-communication loop with the matching kernel
//! strategy and decode the kernel's report into an [`Outcome`].
//!
//! # Example
//! ```rust,ignore
//! use krylov_eigs::{eigs_sym, MatrixData, ProblemDescriptor, Which};
//! let desc = ProblemDescriptor::symmetric(100, 4).with_which(Which::LargestAlgebraic);
//! let out = eigs_sym(desc, MatrixData::SymDense(a))?;
//! println!("{:?}", out.values);
//! ```

use faer::Mat;
use log::{info, warn};
use num_complex::Complex64;

use crate::config::mode::{build_operator, ModeConfig};
use crate::config::options::ProblemDescriptor;
use crate::core::traits::MatOp;
use crate::core::wrappers::dot;
use crate::driver::{IterationReport, ReverseCommDriver};
use crate::error::EigsError;
use crate::kernel::{Arnoldi, Kernel, RitzPairs};
use crate::matop::MatrixData;
use crate::utils::diagnostics::{
    iterate_message, iterate_warnings, ComplexVectors, NonSymOutcome, Outcome, Status, SymOutcome,
};

/// Descriptor, operator and mode of one eigenvalue problem.
pub struct EigsContext {
    desc: ProblemDescriptor,
    op: Box<dyn MatOp>,
    mode: ModeConfig,
}

impl EigsContext {
    /// Build the operator for `data` and resolve the work mode.
    pub fn new(desc: ProblemDescriptor, data: MatrixData) -> Result<Self, EigsError> {
        let op = build_operator(&desc, data)?;
        Self::with_operator(desc, op)
    }

    /// Use a caller-provided operator.
    pub fn with_operator(desc: ProblemDescriptor, op: Box<dyn MatOp>) -> Result<Self, EigsError> {
        let mode = ModeConfig::resolve(&desc, op.capabilities())?;
        if op.dim() != desc.n {
            return Err(EigsError::Configuration(format!(
                "operator has dimension {}, descriptor says n = {}",
                op.dim(),
                desc.n
            )));
        }
        Ok(Self { desc, op, mode })
    }

    pub fn descriptor(&self) -> &ProblemDescriptor {
        &self.desc
    }

    pub fn mode(&self) -> &ModeConfig {
        &self.mode
    }

    pub fn operator(&self) -> &dyn MatOp {
        self.op.as_ref()
    }

    /// Solve a symmetric problem with the Lanczos strategy.
    pub fn solve_symmetric(&self) -> Result<SymOutcome, EigsError> {
        if !self.desc.symmetric {
            return Err(EigsError::InvalidMode("solve_symmetric called on a non-symmetric problem".into()));
        }
        let want = self.desc.want_vectors;
        let (report, pairs) = self.run(Arnoldi::symmetric(), want)?;
        let Some(pairs) = pairs else {
            return Ok(self.empty(&report));
        };
        let values: Vec<f64> = pairs.values.iter().map(|v| v.re).collect();
        let vectors = if want { pairs.vectors_re } else { None };
        Ok(self.finish(&report, values, vectors))
    }

    /// Solve a non-symmetric problem with the Arnoldi strategy.
    pub fn solve_general(&self) -> Result<NonSymOutcome, EigsError> {
        if self.desc.symmetric {
            return Err(EigsError::InvalidMode("solve_general called on a symmetric problem".into()));
        }
        let want = self.desc.want_vectors;
        let complex_shift = self.mode.work_mode.is_complex_shift();
        // Rayleigh quotients need the vectors even when the caller does not
        let (report, pairs) = self.run(Arnoldi::general(), want || complex_shift)?;
        let Some(pairs) = pairs else {
            return Ok(self.empty(&report));
        };
        let vectors = match (pairs.vectors_re, pairs.vectors_im) {
            (Some(re), Some(im)) => Some(ComplexVectors { re, im }),
            (Some(re), None) => {
                let im = Mat::zeros(re.nrows(), re.ncols());
                Some(ComplexVectors { re, im })
            }
            _ => None,
        };
        let values = match (&vectors, complex_shift) {
            (Some(x), true) => self.rayleigh_quotients(x)?,
            _ => pairs.values,
        };
        Ok(self.finish(&report, values, if want { vectors } else { None }))
    }

    /// Seed, iterate and (when anything converged) extract.
    fn run<K: Kernel>(&self, kernel: K, want_vectors: bool) -> Result<(IterationReport, Option<RitzPairs>), EigsError> {
        let mut driver = ReverseCommDriver::new(self.op.as_ref(), kernel, &self.desc, self.mode)?;
        driver.seed(&self.desc.seed)?;
        let report = driver.run()?;
        if report.info != 0 {
            warn!("{} (info = {})", iterate_message(report.info), report.info);
        }
        if report.nconv == 0 {
            return Ok((report, None));
        }
        let pairs = driver.extract(want_vectors)?;
        Ok((report, Some(pairs)))
    }

    /// `xᴴ A x / xᴴ x` for every extracted column.
    fn rayleigh_quotients(&self, x: &ComplexVectors) -> Result<Vec<Complex64>, EigsError> {
        let n = self.desc.n;
        let mut ar = vec![0.0; n];
        let mut ai = vec![0.0; n];
        (0..x.ncols())
            .map(|j| -> Result<Complex64, EigsError> {
                let re: Vec<f64> = (0..n).map(|i| x.re[(i, j)]).collect();
                let im: Vec<f64> = (0..n).map(|i| x.im[(i, j)]).collect();
                self.op.apply(&re, &mut ar)?;
                self.op.apply(&im, &mut ai)?;
                let num = Complex64::new(dot(&re, &ar) + dot(&im, &ai), dot(&re, &ai) - dot(&im, &ar));
                let den = dot(&re, &re) + dot(&im, &im);
                Ok(num / den)
            })
            .collect()
    }

    fn empty<T, B>(&self, report: &IterationReport) -> Outcome<T, B> {
        let out = Outcome::empty(
            report.iterations,
            report.num_op,
            report.num_opb,
            report.num_reorth,
            iterate_warnings(report.info),
        );
        warn!("no Ritz values converged after {} iterations", report.iterations);
        out
    }

    fn finish<T, B>(&self, report: &IterationReport, values: Vec<T>, vectors: Option<B>) -> Outcome<T, B> {
        let warnings = iterate_warnings(report.info);
        let status = Status::from_warnings(warnings);
        info!(
            "{} solve, {}: {}/{} converged in {} iterations ({} OP, {} B products, {} reorthogonalizations)",
            if self.desc.symmetric { "symmetric" } else { "non-symmetric" },
            self.mode.work_mode,
            values.len(),
            self.desc.nev,
            report.iterations,
            report.num_op,
            report.num_opb,
            report.num_reorth
        );
        Outcome {
            nconv: values.len(),
            values,
            vectors,
            iterations: report.iterations,
            num_op: report.num_op,
            num_opb: report.num_opb,
            num_reorth: report.num_reorth,
            status,
            warnings,
        }
    }
}

/// Solve a symmetric eigenvalue problem.
pub fn eigs_sym(desc: ProblemDescriptor, data: MatrixData) -> Result<SymOutcome, EigsError> {
    EigsContext::new(desc, data)?.solve_symmetric()
}

/// Solve a real non-symmetric eigenvalue problem.
pub fn eigs(desc: ProblemDescriptor, data: MatrixData) -> Result<NonSymOutcome, EigsError> {
    EigsContext::new(desc, data)?.solve_general()
}
