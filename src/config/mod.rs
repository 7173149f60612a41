//! Problem options and mode resolution.

pub mod mode;
pub mod options;

pub use mode::{build_operator, Bmat, ModeConfig, WorkMode};
pub use options::{default_ncv, ComplexPart, OperatorMode, ProblemDescriptor, Seed, Which, DEFAULT_MAX_ITERATIONS};
