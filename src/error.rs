use std::fmt;
use thiserror::Error;

// Unified error type for krylov-eigs

/// Phase of the reverse-communication kernel that reported a fatal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelPhase {
    /// The `advance` loop (ARPACK `*aupd`).
    Iterate,
    /// The post-loop extraction (ARPACK `*eupd`).
    Extract,
}

impl fmt::Display for KernelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelPhase::Iterate => write!(f, "iterate"),
            KernelPhase::Extract => write!(f, "extract"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EigsError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid mode: {0}")]
    InvalidMode(String),
    #[error("shift ({sigma_re}, {sigma_im}) makes the shifted operator singular")]
    SingularShift { sigma_re: f64, sigma_im: f64 },
    #[error("dimension mismatch: expected length {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("kernel {phase} phase failed with code {code}: {message}")]
    KernelFatal {
        phase: KernelPhase,
        code: i32,
        message: &'static str,
    },
    #[error("factorization error: {0}")]
    Factorization(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl EigsError {
    pub(crate) fn singular(sigma: f64) -> Self {
        EigsError::SingularShift { sigma_re: sigma, sigma_im: 0.0 }
    }

    /// Numeric kernel code, if this error came out of the kernel.
    pub fn kernel_code(&self) -> Option<i32> {
        match self {
            EigsError::KernelFatal { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Fails with `DimensionMismatch` unless both buffers have length `n`.
pub(crate) fn check_dims(n: usize, x: &[f64], y: &[f64]) -> Result<(), EigsError> {
    if x.len() != n {
        return Err(EigsError::DimensionMismatch { expected: n, found: x.len() });
    }
    if y.len() != n {
        return Err(EigsError::DimensionMismatch { expected: n, found: y.len() });
    }
    Ok(())
}
