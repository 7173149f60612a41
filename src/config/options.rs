//! API options for eigenvalue problems.
//!
//! This module provides the `ProblemDescriptor` struct, which fully describes one
//! eigenvalue solve: problem size, how many eigenpairs are wanted and which ones,
//! the Krylov subspace size, convergence controls and the operator mode (ordinary,
//! shift-invert, buckling, Cayley or complex shift). Selection criteria use the
//! two-letter codes common to ARPACK-style solvers (`"LM"`, `"SA"`, ...).

use std::fmt;
use std::str::FromStr;

use crate::error::EigsError;

/// Default cap on implicit restarts.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Which end of the spectrum to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Which {
    /// Largest magnitude (`LM`).
    LargestMagnitude,
    /// Smallest magnitude (`SM`).
    SmallestMagnitude,
    /// Largest algebraic value (`LA`, symmetric only).
    LargestAlgebraic,
    /// Smallest algebraic value (`SA`, symmetric only).
    SmallestAlgebraic,
    /// Largest real part (`LR`, non-symmetric only).
    LargestReal,
    /// Smallest real part (`SR`, non-symmetric only).
    SmallestReal,
    /// Largest imaginary part in magnitude (`LI`, non-symmetric only).
    LargestImag,
    /// Smallest imaginary part in magnitude (`SI`, non-symmetric only).
    SmallestImag,
    /// Half from each end of the spectrum (`BE`, symmetric only).
    BothEnds,
}

impl Which {
    /// Two-letter code.
    pub fn code(&self) -> &'static str {
        match self {
            Which::LargestMagnitude => "LM",
            Which::SmallestMagnitude => "SM",
            Which::LargestAlgebraic => "LA",
            Which::SmallestAlgebraic => "SA",
            Which::LargestReal => "LR",
            Which::SmallestReal => "SR",
            Which::LargestImag => "LI",
            Which::SmallestImag => "SI",
            Which::BothEnds => "BE",
        }
    }

    /// Whether the criterion is meaningful for a symmetric (real spectrum) problem.
    pub fn valid_for_symmetric(&self) -> bool {
        matches!(
            self,
            Which::LargestMagnitude
                | Which::SmallestMagnitude
                | Which::LargestAlgebraic
                | Which::SmallestAlgebraic
                | Which::BothEnds
        )
    }

    /// Whether the criterion is meaningful for a non-symmetric problem.
    pub fn valid_for_nonsymmetric(&self) -> bool {
        matches!(
            self,
            Which::LargestMagnitude
                | Which::SmallestMagnitude
                | Which::LargestReal
                | Which::SmallestReal
                | Which::LargestImag
                | Which::SmallestImag
        )
    }
}

impl fmt::Display for Which {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Which {
    type Err = EigsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LM" => Ok(Which::LargestMagnitude),
            "SM" => Ok(Which::SmallestMagnitude),
            "LA" => Ok(Which::LargestAlgebraic),
            "SA" => Ok(Which::SmallestAlgebraic),
            "LR" => Ok(Which::LargestReal),
            "SR" => Ok(Which::SmallestReal),
            "LI" => Ok(Which::LargestImag),
            "SI" => Ok(Which::SmallestImag),
            "BE" => Ok(Which::BothEnds),
            other => Err(EigsError::Configuration(format!("unknown selection criterion '{other}'"))),
        }
    }
}

/// Spectral transformation requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatorMode {
    /// Iterate with A (or B⁻¹A for generalized problems).
    #[default]
    Ordinary,
    /// Iterate with (A - σB)⁻¹.
    ShiftInvert,
    /// Buckling transformation (A - σB)⁻¹A, symmetric generalized only.
    Buckling,
    /// Cayley transformation (A - σB)⁻¹(A + σB), symmetric only.
    Cayley,
    /// Real or imaginary part of (A - σI)⁻¹ for a complex σ, non-symmetric only.
    ComplexShift,
}

/// Which part of the complex resolvent the complex-shift operator exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComplexPart {
    #[default]
    Real,
    Imag,
}

/// How the initial residual vector is produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Seed {
    /// resid = OP · p with p[i] = sin(i + 0.5).
    #[default]
    Probe,
    /// Let the kernel draw its own (fixed-seed) random start vector.
    Kernel,
    /// Caller-supplied start vector, used as is.
    Vector(Vec<f64>),
}

/// Full description of one eigenvalue problem.
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemDescriptor {
    /// Operator dimension.
    pub n: usize,
    /// Number of requested eigenpairs.
    pub nev: usize,
    /// Krylov subspace dimension, `nev < ncv <= n`.
    pub ncv: usize,
    pub which: Which,
    pub symmetric: bool,
    /// Generalized problem A x = λ B x.
    pub generalized: bool,
    /// Relative tolerance on Ritz estimates; 0 selects machine epsilon.
    pub tol: f64,
    pub max_iterations: usize,
    pub mode: OperatorMode,
    pub sigma: Option<f64>,
    /// Complex shift as (real, imaginary).
    pub sigma_complex: Option<(f64, f64)>,
    pub complex_part: ComplexPart,
    pub want_vectors: bool,
    pub seed: Seed,
}

impl ProblemDescriptor {
    /// Symmetric standard problem with the default options
    /// (`ncv = min(n, max(2 nev + 1, 20))`, LM, 1000 restarts, machine tolerance).
    pub fn symmetric(n: usize, nev: usize) -> Self {
        Self::new(n, nev, true)
    }

    /// Non-symmetric standard problem with default options.
    pub fn nonsymmetric(n: usize, nev: usize) -> Self {
        Self::new(n, nev, false)
    }

    fn new(n: usize, nev: usize, symmetric: bool) -> Self {
        Self {
            n,
            nev,
            ncv: default_ncv(n, nev),
            which: Which::LargestMagnitude,
            symmetric,
            generalized: false,
            tol: 0.0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            mode: OperatorMode::Ordinary,
            sigma: None,
            sigma_complex: None,
            complex_part: ComplexPart::Real,
            want_vectors: true,
            seed: Seed::Probe,
        }
    }

    pub fn with_which(mut self, which: Which) -> Self {
        self.which = which;
        self
    }

    pub fn with_ncv(mut self, ncv: usize) -> Self {
        self.ncv = ncv;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn generalized(mut self) -> Self {
        self.generalized = true;
        self
    }

    /// Shift-invert around a real σ.
    pub fn with_shift(mut self, sigma: f64) -> Self {
        self.mode = OperatorMode::ShiftInvert;
        self.sigma = Some(sigma);
        self
    }

    /// Buckling mode around σ.
    pub fn with_buckling(mut self, sigma: f64) -> Self {
        self.mode = OperatorMode::Buckling;
        self.sigma = Some(sigma);
        self
    }

    /// Cayley mode around σ.
    pub fn with_cayley(mut self, sigma: f64) -> Self {
        self.mode = OperatorMode::Cayley;
        self.sigma = Some(sigma);
        self
    }

    /// Complex shift σ = re + i·im.
    pub fn with_complex_shift(mut self, re: f64, im: f64) -> Self {
        self.mode = OperatorMode::ComplexShift;
        self.sigma_complex = Some((re, im));
        self
    }

    pub fn with_complex_part(mut self, part: ComplexPart) -> Self {
        self.complex_part = part;
        self
    }

    pub fn with_vectors(mut self, want_vectors: bool) -> Self {
        self.want_vectors = want_vectors;
        self
    }

    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    /// Effective tolerance (machine epsilon when zero).
    pub fn effective_tol(&self) -> f64 {
        crate::utils::convergence::effective_tol(self.tol)
    }

    /// Checks the size, tolerance and iteration-cap invariants.
    pub fn validate(&self) -> Result<(), EigsError> {
        if self.n == 0 {
            return Err(EigsError::Configuration("n must be positive".into()));
        }
        if self.nev == 0 {
            return Err(EigsError::Configuration("nev must be positive".into()));
        }
        if self.ncv <= self.nev || self.ncv > self.n {
            return Err(EigsError::Configuration(format!(
                "need nev < ncv <= n, got nev = {}, ncv = {}, n = {}",
                self.nev, self.ncv, self.n
            )));
        }
        if !(self.tol >= 0.0) {
            return Err(EigsError::Configuration(format!("tolerance must be >= 0, got {}", self.tol)));
        }
        if self.max_iterations == 0 {
            return Err(EigsError::Configuration("iteration cap must be positive".into()));
        }
        if let Seed::Vector(v) = &self.seed {
            if v.len() != self.n {
                return Err(EigsError::Configuration(format!(
                    "start vector has length {}, expected {}",
                    v.len(),
                    self.n
                )));
            }
        }
        Ok(())
    }
}

/// `min(n, max(2 nev + 1, 20))`.
pub fn default_ncv(n: usize, nev: usize) -> usize {
    n.min((2 * nev + 1).max(20))
}
