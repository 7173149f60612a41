//! krylov-eigs: implicitly restarted Arnoldi/Lanczos eigensolvers over Faer
//!
//! This crate computes a few eigenvalues (and optionally eigenvectors) of large
//! real matrices and pencils. A reverse-communication kernel drives the
//! iteration and asks for products with an operator; the operator family
//! covers dense, packed symmetric and CSR storage with regular, shift-invert,
//! buckling, Cayley and complex-shift transformations.

pub mod config;
pub mod context;
pub mod core;
pub mod driver;
pub mod error;
pub mod kernel;
pub mod matop;
pub mod matrix;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use crate::core::*;
pub use error::*;
pub use matop::*;
pub use matrix::{CsrMatrix, PackedSym};
pub use utils::*;

pub use driver::{DriverState, IterationReport, ReverseCommDriver, Workspace};
pub use kernel::{Arnoldi, ExtractRequest, Ido, Kernel, KernelCode, KernelProblem, RitzPairs};
