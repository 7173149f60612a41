//! Direct factorizations backing the shift-invert operators.

pub mod direct_lu;
pub use direct_lu::{LuFactor, Scalar, SparseLuFactor};
