//! Solve contexts.
//!
//! [`EigsContext`] ties a problem descriptor to the operator that serves it
//! and runs the symmetric or non-symmetric solve. [`eigs_sym`] and [`eigs`]
//! are one-call shortcuts over it.

pub mod eigs_context;
pub use eigs_context::{eigs, eigs_sym, EigsContext};
