//! Mode configuration: descriptor + operator capabilities → kernel work mode.

use std::fmt;

use log::debug;

use crate::config::options::{ComplexPart, OperatorMode, ProblemDescriptor};
use crate::core::traits::{Capabilities, MatOp};
use crate::error::EigsError;
use crate::matop::{
    DenseComplexShift, DensePencil, DenseProd, DenseShift, MatrixData, PackedSymProd, PackedSymShift,
    SparseComplexShift, SparseProd, SparseShift, SparseSymProd, SparseSymShift, SymDenseProd, SymDenseShift,
};
use crate::matrix::dense::symmetrize_lower;

/// Whether the kernel works with the B-inner product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bmat {
    /// Standard problem, B = I.
    Standard,
    /// Generalized problem.
    Generalized,
}

impl Bmat {
    pub fn code(&self) -> char {
        match self {
            Bmat::Standard => 'I',
            Bmat::Generalized => 'G',
        }
    }
}

/// Kernel work mode. The numeric code is the kernel's `iparam[6]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkMode {
    /// OP = A.
    Regular,
    /// OP = B⁻¹A.
    RegularInverse,
    /// OP = (A - σB)⁻¹B.
    ShiftInvert,
    /// OP = (A - σB)⁻¹A, B-inner product taken with A.
    Buckling,
    /// OP = (A - σB)⁻¹(A + σB).
    Cayley,
    /// OP = Re((A - σI)⁻¹) for complex σ.
    ComplexReal,
    /// OP = Im((A - σI)⁻¹) for complex σ.
    ComplexImag,
}

impl WorkMode {
    pub fn code(&self) -> i32 {
        match self {
            WorkMode::Regular => 1,
            WorkMode::RegularInverse => 2,
            WorkMode::ShiftInvert | WorkMode::ComplexReal => 3,
            WorkMode::Buckling | WorkMode::ComplexImag => 4,
            WorkMode::Cayley => 5,
        }
    }

    pub fn is_complex_shift(&self) -> bool {
        matches!(self, WorkMode::ComplexReal | WorkMode::ComplexImag)
    }
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkMode::Regular => "regular",
            WorkMode::RegularInverse => "regular-inverse",
            WorkMode::ShiftInvert => "shift-invert",
            WorkMode::Buckling => "buckling",
            WorkMode::Cayley => "cayley",
            WorkMode::ComplexReal => "complex-shift (real part)",
            WorkMode::ComplexImag => "complex-shift (imaginary part)",
        };
        write!(f, "{name} (mode {})", self.code())
    }
}

/// Resolved configuration for one solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeConfig {
    pub work_mode: WorkMode,
    pub bmat: Bmat,
    /// Real shift, or the real part of a complex one. Zero when unshifted.
    pub sigma_re: f64,
    pub sigma_im: f64,
}

impl ModeConfig {
    /// Resolve `desc` against the capabilities of the operator that will
    /// serve it.
    pub fn resolve(desc: &ProblemDescriptor, caps: Capabilities) -> Result<Self, EigsError> {
        let cfg = Self::from_descriptor(desc)?;
        let needed = cfg.required_capabilities();
        if !caps.contains(needed) {
            return Err(EigsError::InvalidMode(format!(
                "{} needs operator capabilities {:?}, operator provides {:?}",
                cfg.work_mode, needed, caps
            )));
        }
        debug!("resolved {} with bmat = {}", cfg.work_mode, cfg.bmat.code());
        Ok(cfg)
    }

    /// Checks that depend only on the descriptor.
    pub fn from_descriptor(desc: &ProblemDescriptor) -> Result<Self, EigsError> {
        desc.validate()?;
        let valid_which =
            if desc.symmetric { desc.which.valid_for_symmetric() } else { desc.which.valid_for_nonsymmetric() };
        if !valid_which {
            return Err(EigsError::InvalidMode(format!(
                "selection '{}' is not valid for a {} problem",
                desc.which,
                if desc.symmetric { "symmetric" } else { "non-symmetric" }
            )));
        }
        if desc.symmetric && desc.sigma_complex.is_some() {
            return Err(EigsError::InvalidMode("symmetric problems take a real shift only".into()));
        }

        let bmat = if desc.generalized { Bmat::Generalized } else { Bmat::Standard };
        // a shift set without a mode selects the matching shift mode
        let mode = match desc.mode {
            OperatorMode::Ordinary if desc.sigma_complex.is_some() => OperatorMode::ComplexShift,
            OperatorMode::Ordinary if desc.sigma.is_some() => OperatorMode::ShiftInvert,
            mode => mode,
        };
        if mode != desc.mode {
            debug!("shift given with {:?} mode, using {:?}", desc.mode, mode);
        }
        let real_shift =
            || desc.sigma.ok_or_else(|| EigsError::InvalidMode(format!("{mode:?} mode requires a shift")));
        let (work_mode, sigma_re, sigma_im) = match mode {
            OperatorMode::Ordinary if desc.generalized => (WorkMode::RegularInverse, 0.0, 0.0),
            OperatorMode::Ordinary => (WorkMode::Regular, 0.0, 0.0),
            OperatorMode::ShiftInvert => (WorkMode::ShiftInvert, real_shift()?, 0.0),
            OperatorMode::Buckling => {
                if !desc.symmetric || !desc.generalized {
                    return Err(EigsError::InvalidMode(
                        "buckling mode applies to symmetric generalized problems only".into(),
                    ));
                }
                let sigma = real_shift()?;
                if sigma == 0.0 {
                    return Err(EigsError::InvalidMode("buckling mode requires a non-zero shift".into()));
                }
                (WorkMode::Buckling, sigma, 0.0)
            }
            OperatorMode::Cayley => {
                if !desc.symmetric {
                    return Err(EigsError::InvalidMode("Cayley mode applies to symmetric problems only".into()));
                }
                let sigma = real_shift()?;
                if sigma == 0.0 {
                    return Err(EigsError::InvalidMode("Cayley mode requires a non-zero shift".into()));
                }
                (WorkMode::Cayley, sigma, 0.0)
            }
            OperatorMode::ComplexShift => {
                if desc.symmetric {
                    return Err(EigsError::InvalidMode("complex shifts apply to non-symmetric problems only".into()));
                }
                if desc.generalized {
                    return Err(EigsError::InvalidMode("complex shifts apply to standard problems only".into()));
                }
                let (re, im) = desc
                    .sigma_complex
                    .ok_or_else(|| EigsError::InvalidMode("complex-shift mode requires a complex shift".into()))?;
                let mode = match desc.complex_part {
                    ComplexPart::Real => WorkMode::ComplexReal,
                    // Im((A - σI)⁻¹) vanishes for a real σ
                    ComplexPart::Imag if im == 0.0 => {
                        return Err(EigsError::InvalidMode(
                            "the imaginary-part operator needs a shift with non-zero imaginary part".into(),
                        ));
                    }
                    ComplexPart::Imag => WorkMode::ComplexImag,
                };
                (mode, re, im)
            }
        };
        Ok(Self { work_mode, bmat, sigma_re, sigma_im })
    }

    /// Operator calls the driver will issue in this configuration.
    pub fn required_capabilities(&self) -> Capabilities {
        let generalized = self.bmat == Bmat::Generalized;
        match self.work_mode {
            WorkMode::Regular => Capabilities::APPLY,
            WorkMode::RegularInverse => Capabilities::PENCIL | Capabilities::SOLVE_B,
            WorkMode::ShiftInvert | WorkMode::Cayley if generalized => {
                Capabilities::SHIFT_INVERT | Capabilities::APPLY_B
            }
            WorkMode::ShiftInvert | WorkMode::Cayley => Capabilities::SHIFT_INVERT,
            WorkMode::Buckling => Capabilities::SHIFT_INVERT,
            WorkMode::ComplexReal | WorkMode::ComplexImag => {
                Capabilities::SHIFT_INVERT | Capabilities::COMPLEX_SHIFT
            }
        }
    }
}

/// Build the operator that serves `desc` from the given matrix data.
///
/// Descriptor checks run before any factorization is attempted.
pub fn build_operator(desc: &ProblemDescriptor, data: MatrixData) -> Result<Box<dyn MatOp>, EigsError> {
    let cfg = ModeConfig::from_descriptor(desc)?;
    if data.dim() != desc.n {
        return Err(EigsError::Configuration(format!(
            "matrix has dimension {}, descriptor says n = {}",
            data.dim(),
            desc.n
        )));
    }
    let is_pencil = matches!(data, MatrixData::Pencil { .. });
    if desc.generalized != is_pencil {
        return Err(EigsError::InvalidMode(if desc.generalized {
            "generalized problems need pencil data (A, B)".into()
        } else {
            "pencil data given for a standard problem".into()
        }));
    }

    let sigma = cfg.sigma_re;
    let op: Box<dyn MatOp> = match cfg.work_mode {
        WorkMode::Regular => match data {
            MatrixData::Dense(a) => Box::new(DenseProd::new(a)?),
            MatrixData::SymDense(a) => Box::new(SymDenseProd::new(a)?),
            MatrixData::SymPacked(p) => Box::new(PackedSymProd::new(p)),
            MatrixData::Sparse(a) => Box::new(SparseProd::new(a)?),
            MatrixData::SparseSym(a) => Box::new(SparseSymProd::new(a)?),
            MatrixData::Pencil { .. } => unreachable_pencil()?,
        },
        WorkMode::RegularInverse => match data {
            MatrixData::Pencil { a, b } => Box::new(DensePencil::new(a, b)?),
            _ => unreachable_pencil()?,
        },
        WorkMode::ShiftInvert | WorkMode::Buckling | WorkMode::Cayley => match data {
            MatrixData::Dense(a) => Box::new(DenseShift::new(a, sigma)?),
            MatrixData::SymDense(a) => Box::new(SymDenseShift::new(a, sigma)?),
            MatrixData::SymPacked(p) => Box::new(PackedSymShift::new(p, sigma)?),
            MatrixData::Sparse(a) => Box::new(SparseShift::new(a, sigma)?),
            MatrixData::SparseSym(a) => Box::new(SparseSymShift::new(a, sigma)?),
            MatrixData::Pencil { a, b } => Box::new(DensePencil::with_shift(a, b, sigma)?),
        },
        WorkMode::ComplexReal | WorkMode::ComplexImag => {
            let (re, im, part) = (cfg.sigma_re, cfg.sigma_im, desc.complex_part);
            match data {
                MatrixData::Dense(a) => Box::new(DenseComplexShift::new(a, re, im, part)?),
                MatrixData::SymDense(a) => Box::new(DenseComplexShift::new(symmetrize_lower(&a), re, im, part)?),
                MatrixData::SymPacked(p) => Box::new(DenseComplexShift::new(p.to_dense(), re, im, part)?),
                MatrixData::Sparse(a) => Box::new(SparseComplexShift::new(a, re, im, part)?),
                MatrixData::SparseSym(a) => {
                    Box::new(SparseComplexShift::new(a.expand_symmetric_lower()?, re, im, part)?)
                }
                MatrixData::Pencil { .. } => unreachable_pencil()?,
            }
        }
    };
    debug!("built {:?} operator of dimension {} for {}", op.kind(), op.dim(), cfg.work_mode);
    Ok(op)
}

// Pencil/standard mismatches are rejected above; this keeps the match total.
fn unreachable_pencil() -> Result<Box<dyn MatOp>, EigsError> {
    Err(EigsError::InvalidMode("matrix data does not match the problem kind".into()))
}
