//! Buffers shared between the driver and the kernel for one solve.

use crate::kernel::{scratch_len, Ido};

/// Iteration workspace. Allocated once per solve and dropped with it.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub n: usize,
    pub ncv: usize,
    /// Residual / start vector.
    pub resid: Vec<f64>,
    /// Krylov basis, `n x ncv` column-major.
    pub v: Vec<f64>,
    /// Exchange buffer of length `3n`.
    pub workd: Vec<f64>,
    /// Kernel-private scratch.
    pub workl: Vec<f64>,
    pub iparam: [usize; 11],
    /// 1-based offsets into `workd` / `workl`.
    pub ipntr: [usize; 11],
    pub ido: Ido,
    pub info: i32,
}

impl Workspace {
    pub fn new(n: usize, ncv: usize, symmetric: bool) -> Self {
        Self::with_scratch(n, ncv, scratch_len(symmetric, ncv))
    }

    /// Workspace with an explicit `workl` length.
    pub fn with_scratch(n: usize, ncv: usize, lworkl: usize) -> Self {
        Self {
            n,
            ncv,
            resid: vec![0.0; n],
            v: vec![0.0; n * ncv],
            workd: vec![0.0; 3 * n],
            workl: vec![0.0; lworkl],
            iparam: [0; 11],
            ipntr: [0; 11],
            ido: Ido::Start,
            info: 0,
        }
    }

    /// 0-based range of the `workd` slot named by `ipntr[slot]`, or `None`
    /// when the pointer is unset or runs past the end of `workd`.
    pub fn workd_range(&self, slot: usize) -> Option<std::ops::Range<usize>> {
        let start = self.ipntr[slot].checked_sub(1)?;
        let end = start + self.n;
        (end <= self.workd.len()).then_some(start..end)
    }
}
