pub mod traits;
pub mod wrappers;

pub use traits::{Capabilities, InnerProduct, MatOp, MatOpKind, MatVec};
