//! Matrix module: dense, packed and sparse storage.

pub mod dense;
pub use dense::PackedSym;
pub mod sparse;
pub use sparse::CsrMatrix;
