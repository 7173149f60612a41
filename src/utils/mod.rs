//! Convergence tests and result diagnostics.

pub mod convergence;
pub mod diagnostics;

pub use convergence::{effective_tol, Convergence};
pub use diagnostics::{ComplexVectors, NonSymOutcome, Outcome, Status, SymOutcome, Warnings};
