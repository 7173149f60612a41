//! Implicitly restarted Arnoldi iteration driven by reverse communication.
//!
//! The factorization `OP V_m = V_m H_m + f e_mᵀ` is built one column at a
//! time. Every operator product is handed back to the caller through
//! `ido`, so the iteration is a state machine over [`Stage`]. Once `m = ncv`
//! columns exist the Ritz estimates are checked, and if fewer than `nev` of
//! the wanted values have converged the unwanted Ritz values are applied as
//! exact shifts and the factorization is compressed back to `k` columns.
//!
//! The basis is kept orthonormal in the B-inner product with full
//! reorthogonalization (classical Gram-Schmidt plus one DGKS correction).

use faer::Mat;
use log::debug;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::dense::{double_shift_step, hqr, inverse_iteration, jacobi_eigen, single_shift_step};
use super::sort::select_order;
use super::{
    scratch_len, ExtractRequest, Ido, Kernel, KernelCode, KernelProblem, RitzPairs, IPARAM_MAXITER, IPARAM_MODE,
    IPARAM_NCONV, IPARAM_NUM_OP, IPARAM_NUM_OPB, IPARAM_NUM_REORTH, IPARAM_SHIFT, IPNTR_BX, IPNTR_H, IPNTR_RITZ,
    IPNTR_X, IPNTR_Y,
};
use crate::config::mode::Bmat;
use crate::config::options::Which;
use crate::core::wrappers::{axpy, dot};
use crate::driver::Workspace;
use crate::utils::convergence::Convergence;

const KERNEL_SEED: u64 = 0x5eed_1234_abcd_0042;
/// DGKS reorthogonalization threshold, 1/sqrt(2).
const DGKS: f64 = 0.717;
/// Relative residual below which a column is treated as an invariant subspace.
const BREAKDOWN: f64 = 1e-12;
const MAX_FRESH_TRIES: usize = 3;

/// Ritz values of the projected matrix with their unit eigenvectors.
pub struct RitzSet {
    pub values: Vec<Complex64>,
    /// `vectors[i]` belongs to `values[i]`, length `ncv`.
    pub vectors: Vec<Vec<Complex64>>,
}

/// What differs between the Lanczos and the Arnoldi variant.
pub trait Strategy {
    const SYMMETRIC: bool;

    /// Largest admissible work mode.
    const MAX_MODE: usize;

    fn valid_which(&self, which: Which) -> bool;

    /// Store the projection coefficients of column `j` into H (`m x m`,
    /// column-major).
    fn store_column(&self, h: &mut [f64], m: usize, j: usize, coeffs: &[f64]);

    /// Set the coupling `H[j+1, j]`.
    fn set_coupling(&self, h: &mut [f64], m: usize, j: usize, beta: f64);

    fn ritz(&self, h: &Mat<f64>) -> Option<RitzSet>;

    /// Restore the structure of H after the shifted QR steps.
    fn tidy(&self, h: &mut Mat<f64>);

    /// Map a Ritz value of OP back to an eigenvalue of the pencil (A, B).
    fn back_transform(&self, theta: Complex64, mode: usize, sigma_re: f64, sigma_im: f64) -> Complex64;
}

/// Lanczos: symmetric tridiagonal projection, real Ritz values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Symmetric;

impl Strategy for Symmetric {
    const SYMMETRIC: bool = true;
    const MAX_MODE: usize = 5;

    fn valid_which(&self, which: Which) -> bool {
        which.valid_for_symmetric()
    }

    fn store_column(&self, h: &mut [f64], m: usize, j: usize, coeffs: &[f64]) {
        h[j + j * m] = coeffs[j];
    }

    fn set_coupling(&self, h: &mut [f64], m: usize, j: usize, beta: f64) {
        h[(j + 1) + j * m] = beta;
        h[j + (j + 1) * m] = beta;
    }

    fn ritz(&self, h: &Mat<f64>) -> Option<RitzSet> {
        let (vals, vecs) = jacobi_eigen(h)?;
        let m = h.nrows();
        let vectors = (0..vals.len()).map(|c| (0..m).map(|r| Complex64::new(vecs[(r, c)], 0.0)).collect()).collect();
        Some(RitzSet { values: vals.into_iter().map(|v| Complex64::new(v, 0.0)).collect(), vectors })
    }

    fn tidy(&self, h: &mut Mat<f64>) {
        let m = h.nrows();
        for j in 0..m {
            for i in 0..m {
                if i.abs_diff(j) > 1 {
                    h[(i, j)] = 0.0;
                }
            }
            if j + 1 < m {
                let sub = h[(j + 1, j)];
                h[(j, j + 1)] = sub;
            }
        }
    }

    fn back_transform(&self, theta: Complex64, mode: usize, sigma: f64, _sigma_im: f64) -> Complex64 {
        let t = theta.re;
        let lambda = match mode {
            3 => sigma + 1.0 / t,
            4 => sigma * t / (t - 1.0),
            5 => sigma * (t + 1.0) / (t - 1.0),
            _ => t,
        };
        Complex64::new(lambda, 0.0)
    }
}

/// Arnoldi: upper Hessenberg projection, complex-conjugate Ritz pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct General;

impl Strategy for General {
    const SYMMETRIC: bool = false;
    const MAX_MODE: usize = 4;

    fn valid_which(&self, which: Which) -> bool {
        which.valid_for_nonsymmetric()
    }

    fn store_column(&self, h: &mut [f64], m: usize, j: usize, coeffs: &[f64]) {
        for (i, &c) in coeffs.iter().enumerate().take(j + 1) {
            h[i + j * m] = c;
        }
    }

    fn set_coupling(&self, h: &mut [f64], m: usize, j: usize, beta: f64) {
        h[(j + 1) + j * m] = beta;
    }

    fn ritz(&self, h: &Mat<f64>) -> Option<RitzSet> {
        let values = hqr(h)?;
        let vectors = values.iter().map(|&theta| inverse_iteration(h, theta)).collect();
        Some(RitzSet { values, vectors })
    }

    fn tidy(&self, h: &mut Mat<f64>) {
        let m = h.nrows();
        for j in 0..m {
            for i in (j + 2)..m {
                h[(i, j)] = 0.0;
            }
        }
    }

    fn back_transform(&self, theta: Complex64, mode: usize, sigma_re: f64, sigma_im: f64) -> Complex64 {
        if mode == 3 && sigma_im == 0.0 {
            Complex64::new(sigma_re, 0.0) + theta.inv()
        } else {
            theta
        }
    }
}

/// Where the iteration stopped to wait for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    /// Waiting for OP·resid on the start vector (generalized problems).
    StartOp,
    /// Waiting for B·resid on the start vector.
    StartNorm,
    /// Waiting for OP·v_j.
    Apply { j: usize },
    /// Waiting for B·resid during the orthogonalization of column `j`:
    /// pass 0 before the first projection, 1 before the correction, 2 before
    /// the final norm. `fresh` marks a replacement vector after breakdown.
    Orth { j: usize, pass: u8, fresh: bool },
    /// Waiting for OP·random for a replacement vector after column `j`.
    FreshOp { j: usize },
    /// Waiting for B·resid after compressing to `k` columns.
    RestartNorm { k: usize },
    Done,
}

/// Reverse-communication Arnoldi kernel.
pub struct Arnoldi<S> {
    strategy: S,
    stage: Stage,
    rng: StdRng,
    mode: usize,
    iter: usize,
    maxiter: usize,
    nconv: usize,
    rnorm: f64,
    wnorm: f64,
    coeffs: Vec<f64>,
    /// B·resid, generalized problems only.
    bresid: Vec<f64>,
    /// B·v_j of the newest basis column.
    bv: Vec<f64>,
    fresh_tries: usize,
}

impl Arnoldi<Symmetric> {
    pub fn symmetric() -> Self {
        Self::new(Symmetric)
    }
}

impl Arnoldi<General> {
    pub fn general() -> Self {
        Self::new(General)
    }
}

fn generalized(p: &KernelProblem) -> bool {
    p.bmat == Bmat::Generalized
}

fn load_h(ws: &Workspace, m: usize) -> Mat<f64> {
    Mat::from_fn(m, m, |i, j| ws.workl[i + j * m])
}

fn store_h(ws: &mut Workspace, h: &Mat<f64>) {
    let m = h.nrows();
    for j in 0..m {
        for i in 0..m {
            ws.workl[i + j * m] = h[(i, j)];
        }
    }
}

impl<S: Strategy> Arnoldi<S> {
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            stage: Stage::Start,
            rng: StdRng::seed_from_u64(KERNEL_SEED),
            mode: 1,
            iter: 0,
            maxiter: 0,
            nconv: 0,
            rnorm: 0.0,
            wnorm: 0.0,
            coeffs: Vec::new(),
            bresid: Vec::new(),
            bv: Vec::new(),
            fresh_tries: 0,
        }
    }

    fn validate(&self, p: &KernelProblem, ws: &Workspace) -> Result<(), i32> {
        if p.n == 0 {
            return Err(-1);
        }
        if p.nev == 0 {
            return Err(-2);
        }
        if p.ncv <= p.nev || p.ncv > p.n {
            return Err(-3);
        }
        if ws.iparam[IPARAM_MAXITER] == 0 {
            return Err(-4);
        }
        if !self.strategy.valid_which(p.which) {
            return Err(-5);
        }
        let shapes_ok = ws.n == p.n
            && ws.ncv == p.ncv
            && ws.resid.len() == p.n
            && ws.v.len() >= p.n * p.ncv
            && ws.workd.len() >= 3 * p.n;
        if !shapes_ok || ws.workl.len() < scratch_len(S::SYMMETRIC, p.ncv) {
            return Err(-7);
        }
        let mode = ws.iparam[IPARAM_MODE];
        if mode == 0 || mode > S::MAX_MODE {
            return Err(-10);
        }
        if mode == 1 && generalized(p) {
            return Err(-11);
        }
        if ws.iparam[IPARAM_SHIFT] != 1 {
            return Err(-12);
        }
        if S::SYMMETRIC && p.which == Which::BothEnds && p.nev == 1 {
            return Err(-13);
        }
        Ok(())
    }

    fn fail(&mut self, ws: &mut Workspace, code: i32) {
        debug!("kernel stopped with info = {code}");
        ws.info = code;
        ws.iparam[IPARAM_NCONV] = 0;
        ws.iparam[IPARAM_MAXITER] = self.iter;
        ws.ido = Ido::Done;
        self.stage = Stage::Done;
    }

    fn finish(&mut self, ws: &mut Workspace, info: i32) {
        ws.info = info;
        ws.iparam[IPARAM_NCONV] = self.nconv;
        ws.iparam[IPARAM_MAXITER] = self.iter;
        ws.ido = Ido::Done;
        self.stage = Stage::Done;
    }

    fn set_pointers(ws: &mut Workspace) {
        let n = ws.n;
        ws.ipntr[IPNTR_X] = 1;
        ws.ipntr[IPNTR_Y] = n + 1;
        ws.ipntr[IPNTR_BX] = 2 * n + 1;
    }

    /// Hand `resid` to the caller as X.
    fn request_resid(&mut self, ws: &mut Workspace, ido: Ido, stage: Stage) {
        let n = ws.n;
        Self::set_pointers(ws);
        ws.workd[..n].copy_from_slice(&ws.resid);
        match ido {
            Ido::BProduct => ws.iparam[IPARAM_NUM_OPB] += 1,
            _ => ws.iparam[IPARAM_NUM_OP] += 1,
        }
        ws.ido = ido;
        self.stage = stage;
    }

    /// Hand basis column `j` to the caller for OP·v_j.
    fn request_op(&mut self, p: &KernelProblem, ws: &mut Workspace, j: usize) {
        let n = ws.n;
        Self::set_pointers(ws);
        ws.workd[..n].copy_from_slice(&ws.v[j * n..(j + 1) * n]);
        if generalized(p) && self.mode >= 3 {
            ws.workd[2 * n..3 * n].copy_from_slice(&self.bv);
        }
        ws.iparam[IPARAM_NUM_OP] += 1;
        ws.ido = Ido::Op;
        self.stage = Stage::Apply { j };
    }

    /// Y as placed by `set_pointers`.
    fn y_slot(ws: &Workspace) -> &[f64] {
        &ws.workd[ws.n..2 * ws.n]
    }

    fn take_y_into_resid(ws: &mut Workspace) {
        let n = ws.n;
        ws.resid.copy_from_slice(&ws.workd[n..2 * n]);
    }

    fn take_y_into_bresid(&mut self, ws: &Workspace) {
        self.bresid.copy_from_slice(Self::y_slot(ws));
    }

    /// `sqrt(<resid, B resid>)`.
    fn resid_bnorm(&self, p: &KernelProblem, ws: &Workspace) -> f64 {
        let d = if generalized(p) { dot(&ws.resid, &self.bresid) } else { dot(&ws.resid, &ws.resid) };
        d.max(0.0).sqrt()
    }

    fn start(&mut self, p: &KernelProblem, ws: &mut Workspace) {
        if let Err(code) = self.validate(p, ws) {
            self.fail(ws, code);
            return;
        }
        let (n, m) = (p.n, p.ncv);
        self.mode = ws.iparam[IPARAM_MODE];
        self.maxiter = ws.iparam[IPARAM_MAXITER];
        self.iter = 0;
        self.nconv = 0;
        self.fresh_tries = 0;
        self.coeffs = vec![0.0; m];
        self.bresid = vec![0.0; n];
        self.bv = vec![0.0; n];
        ws.iparam[IPARAM_NUM_OP] = 0;
        ws.iparam[IPARAM_NUM_OPB] = 0;
        ws.iparam[IPARAM_NUM_REORTH] = 0;
        ws.ipntr[IPNTR_H] = 1;
        ws.ipntr[IPNTR_RITZ] = m * m + 1;
        ws.ipntr[IPNTR_RITZ + 1] = m * m + m + 1;
        if !S::SYMMETRIC {
            ws.ipntr[IPNTR_RITZ + 2] = m * m + 2 * m + 1;
        }
        ws.workl.iter_mut().for_each(|x| *x = 0.0);
        ws.v.iter_mut().for_each(|x| *x = 0.0);

        if ws.info == 0 {
            for x in ws.resid.iter_mut() {
                *x = self.rng.gen_range(-1.0..1.0);
            }
        }
        ws.info = 0;
        if generalized(p) {
            // push the start vector into the range of OP
            self.request_resid(ws, Ido::OpInit, Stage::StartOp);
            return;
        }
        self.start_vector_ready(p, ws);
    }

    fn start_vector_ready(&mut self, p: &KernelProblem, ws: &mut Workspace) {
        let rnorm = self.resid_bnorm(p, ws);
        if rnorm == 0.0 || !rnorm.is_finite() {
            self.fail(ws, -9);
            return;
        }
        self.install_column(p, ws, 0, rnorm);
        self.request_op(p, ws, 0);
    }

    /// `v_j = resid / beta` and `B v_j = B resid / beta`.
    fn install_column(&mut self, p: &KernelProblem, ws: &mut Workspace, j: usize, beta: f64) {
        let n = ws.n;
        for (dst, src) in ws.v[j * n..(j + 1) * n].iter_mut().zip(&ws.resid) {
            *dst = src / beta;
        }
        if generalized(p) {
            for (dst, src) in self.bv.iter_mut().zip(&self.bresid) {
                *dst = src / beta;
            }
        }
    }

    fn begin_orth(&mut self, p: &KernelProblem, ws: &mut Workspace, j: usize, fresh: bool) {
        if generalized(p) {
            self.request_resid(ws, Ido::BProduct, Stage::Orth { j, pass: 0, fresh });
            return;
        }
        self.orth_step(p, ws, j, 0, fresh);
    }

    /// Classical Gram-Schmidt against columns `0..=j`; returns the coefficients.
    fn project(&self, p: &KernelProblem, ws: &mut Workspace, j: usize) -> Vec<f64> {
        let n = ws.n;
        let coeffs: Vec<f64> = (0..=j)
            .map(|c| {
                let bw = if generalized(p) { &self.bresid } else { &ws.resid };
                dot(&ws.v[c * n..(c + 1) * n], bw)
            })
            .collect();
        for (c, &coef) in coeffs.iter().enumerate() {
            axpy(-coef, &ws.v[c * n..(c + 1) * n], &mut ws.resid);
        }
        coeffs
    }

    fn orth_step(&mut self, p: &KernelProblem, ws: &mut Workspace, j: usize, pass: u8, fresh: bool) {
        match pass {
            0 => {
                self.wnorm = self.resid_bnorm(p, ws);
                let c = self.project(p, ws, j);
                self.coeffs.iter_mut().for_each(|x| *x = 0.0);
                self.coeffs[..c.len()].copy_from_slice(&c);
                if generalized(p) {
                    self.request_resid(ws, Ido::BProduct, Stage::Orth { j, pass: 1, fresh });
                } else {
                    self.orth_step(p, ws, j, 1, fresh);
                }
            }
            1 => {
                let rn = self.resid_bnorm(p, ws);
                if rn > DGKS * self.wnorm {
                    self.rnorm = rn;
                    self.complete_column(p, ws, j, fresh);
                    return;
                }
                ws.iparam[IPARAM_NUM_REORTH] += 1;
                let c = self.project(p, ws, j);
                for (acc, x) in self.coeffs.iter_mut().zip(c) {
                    *acc += x;
                }
                if generalized(p) {
                    self.request_resid(ws, Ido::BProduct, Stage::Orth { j, pass: 2, fresh });
                } else {
                    self.orth_step(p, ws, j, 2, fresh);
                }
            }
            _ => {
                self.rnorm = self.resid_bnorm(p, ws);
                self.complete_column(p, ws, j, fresh);
            }
        }
    }

    fn complete_column(&mut self, p: &KernelProblem, ws: &mut Workspace, j: usize, fresh: bool) {
        let m = p.ncv;
        let small = self.rnorm == 0.0 || self.rnorm <= BREAKDOWN * self.wnorm;
        if fresh {
            if small {
                self.fresh_tries += 1;
                if self.fresh_tries >= MAX_FRESH_TRIES {
                    self.fail(ws, -9999);
                } else {
                    self.fresh_vector(p, ws, j);
                }
                return;
            }
            self.fresh_tries = 0;
            self.strategy.set_coupling(&mut ws.workl, m, j, 0.0);
            let rnorm = self.rnorm;
            self.install_column(p, ws, j + 1, rnorm);
            self.request_op(p, ws, j + 1);
            return;
        }

        let coeffs = std::mem::take(&mut self.coeffs);
        self.strategy.store_column(&mut ws.workl, m, j, &coeffs);
        self.coeffs = coeffs;
        if j + 1 == m {
            self.factorization_complete(p, ws);
            return;
        }
        if small {
            debug!("invariant subspace after {} columns, drawing a new direction", j + 1);
            self.fresh_vector(p, ws, j);
            return;
        }
        let rnorm = self.rnorm;
        self.strategy.set_coupling(&mut ws.workl, m, j, rnorm);
        self.install_column(p, ws, j + 1, rnorm);
        self.request_op(p, ws, j + 1);
    }

    /// Replace a vanished residual by a random direction orthogonal to
    /// columns `0..=j`.
    fn fresh_vector(&mut self, p: &KernelProblem, ws: &mut Workspace, j: usize) {
        for x in ws.resid.iter_mut() {
            *x = self.rng.gen_range(-1.0..1.0);
        }
        if generalized(p) {
            self.request_resid(ws, Ido::OpInit, Stage::FreshOp { j });
            return;
        }
        self.begin_orth(p, ws, j, true);
    }

    /// Ritz values, bounds and selection order of the current projection.
    fn ritz_estimates(&self, p: &KernelProblem, ws: &Workspace) -> Option<(RitzSet, Vec<f64>, Vec<usize>)> {
        let m = p.ncv;
        let set = self.strategy.ritz(&load_h(ws, m))?;
        let bounds: Vec<f64> = set.vectors.iter().map(|s| self.rnorm * s[m - 1].norm()).collect();
        let order = select_order(p.which, &set.values);
        Some((set, bounds, order))
    }

    fn converged_wanted(&self, p: &KernelProblem, set: &RitzSet, bounds: &[f64], order: &[usize]) -> Vec<usize> {
        let conv = Convergence { tol: p.tol, max_iters: self.maxiter };
        order[..p.nev]
            .iter()
            .copied()
            .filter(|&i| conv.is_converged(bounds[i], set.values[i].norm()))
            .collect()
    }

    fn store_ritz(ws: &mut Workspace, m: usize, set: &RitzSet, bounds: &[f64]) {
        let base = m * m;
        for (i, z) in set.values.iter().enumerate() {
            ws.workl[base + i] = z.re;
            if !S::SYMMETRIC {
                ws.workl[base + m + i] = z.im;
            }
        }
        let boff = if S::SYMMETRIC { base + m } else { base + 2 * m };
        ws.workl[boff..boff + m].copy_from_slice(bounds);
    }

    fn factorization_complete(&mut self, p: &KernelProblem, ws: &mut Workspace) {
        let m = p.ncv;
        let Some((set, bounds, order)) = self.ritz_estimates(p, ws) else {
            self.fail(ws, -8);
            return;
        };
        Self::store_ritz(ws, m, &set, &bounds);
        let conv = Convergence { tol: p.tol, max_iters: self.maxiter };
        self.nconv = conv.count(order[..p.nev].iter().map(|&i| (bounds[i], set.values[i].norm())));
        self.iter += 1;
        debug!(
            "iteration {}: {} of {} wanted Ritz values converged, rnorm = {:.3e}",
            self.iter, self.nconv, p.nev, self.rnorm
        );

        if self.nconv >= p.nev {
            self.finish(ws, 0);
        } else if conv.exhausted(self.iter) {
            self.finish(ws, 1);
        } else {
            self.restart(p, ws, &set.values, &order);
        }
    }

    fn restart(&mut self, p: &KernelProblem, ws: &mut Workspace, values: &[Complex64], order: &[usize]) {
        let (n, m, nev) = (p.n, p.ncv, p.nev);
        let mut k = nev + self.nconv.min((m - nev) / 2);
        if k == 1 {
            k = if m >= 6 {
                m / 2
            } else if m > 3 {
                2
            } else {
                1
            };
        }
        if !S::SYMMETRIC && k < m && is_conjugate(values[order[k - 1]], values[order[k]]) {
            k += 1;
        }
        if k >= m {
            debug!("no shifts left to apply (k = {k}, ncv = {m})");
            self.finish(ws, 3);
            return;
        }

        let mut h = load_h(ws, m);
        let mut q = Mat::from_fn(m, m, |i, j| if i == j { 1.0 } else { 0.0 });
        let shifts: Vec<Complex64> = order[k..].iter().map(|&i| values[i]).collect();
        let mut skip = false;
        for (s, &mu) in shifts.iter().enumerate() {
            if skip {
                skip = false;
                continue;
            }
            if S::SYMMETRIC || mu.im == 0.0 {
                single_shift_step(&mut h, &mut q, mu.re);
            } else {
                double_shift_step(&mut h, &mut q, mu);
                skip = shifts.get(s + 1).is_some_and(|&next| is_conjugate(mu, next));
            }
        }
        self.strategy.tidy(&mut h);

        // V <- V Q[:, 0..k], keeping (V Q)[:, k] for the new residual
        let mut vk = vec![0.0; n];
        let mut row = vec![0.0; k + 1];
        for r in 0..n {
            for (c, slot) in row.iter_mut().enumerate() {
                *slot = (0..m).map(|l| ws.v[r + l * n] * q[(l, c)]).sum();
            }
            for c in 0..k {
                ws.v[r + c * n] = row[c];
            }
            vk[r] = row[k];
        }
        for c in k..m {
            ws.v[c * n..(c + 1) * n].iter_mut().for_each(|x| *x = 0.0);
        }
        let (beta_k, sigma_k) = (h[(k, k - 1)], q[(m - 1, k - 1)]);
        for (f, v) in ws.resid.iter_mut().zip(&vk) {
            *f = v * beta_k + *f * sigma_k;
        }
        for j in 0..m {
            for i in 0..m {
                if i >= k || j >= k {
                    h[(i, j)] = 0.0;
                }
            }
        }
        store_h(ws, &h);

        if generalized(p) {
            self.request_resid(ws, Ido::BProduct, Stage::RestartNorm { k });
            return;
        }
        self.restart_norm_ready(p, ws, k);
    }

    fn restart_norm_ready(&mut self, p: &KernelProblem, ws: &mut Workspace, k: usize) {
        let m = p.ncv;
        let rnorm = self.resid_bnorm(p, ws);
        let hscale = ws.workl[..m * m].iter().fold(0.0, |a: f64, x| a.max(x.abs()));
        if rnorm == 0.0 || rnorm <= BREAKDOWN * hscale {
            self.fresh_vector(p, ws, k - 1);
            return;
        }
        self.rnorm = rnorm;
        self.strategy.set_coupling(&mut ws.workl, m, k - 1, rnorm);
        self.install_column(p, ws, k, rnorm);
        self.request_op(p, ws, k);
    }
}

fn is_conjugate(a: Complex64, b: Complex64) -> bool {
    if a.im == 0.0 {
        return false;
    }
    let scale = a.norm().max(1.0);
    (a.re - b.re).abs() <= 1e-10 * scale && (a.im + b.im).abs() <= 1e-10 * scale
}

impl<S: Strategy> Kernel for Arnoldi<S> {
    fn advance(&mut self, p: &KernelProblem, ws: &mut Workspace) {
        match self.stage {
            Stage::Start => self.start(p, ws),
            Stage::StartOp => {
                Self::take_y_into_resid(ws);
                self.request_resid(ws, Ido::BProduct, Stage::StartNorm);
            }
            Stage::StartNorm => {
                self.take_y_into_bresid(ws);
                self.start_vector_ready(p, ws);
            }
            Stage::Apply { j } => {
                Self::take_y_into_resid(ws);
                self.begin_orth(p, ws, j, false);
            }
            Stage::Orth { j, pass, fresh } => {
                self.take_y_into_bresid(ws);
                self.orth_step(p, ws, j, pass, fresh);
            }
            Stage::FreshOp { j } => {
                Self::take_y_into_resid(ws);
                self.begin_orth(p, ws, j, true);
            }
            Stage::RestartNorm { k } => {
                self.take_y_into_bresid(ws);
                self.restart_norm_ready(p, ws, k);
            }
            Stage::Done => ws.ido = Ido::Done,
        }
    }

    fn extract(
        &mut self,
        p: &KernelProblem,
        request: &ExtractRequest,
        ws: &mut Workspace,
    ) -> Result<RitzPairs, KernelCode> {
        if p.n == 0 {
            return Err(KernelCode(-1));
        }
        if p.nev == 0 {
            return Err(KernelCode(-2));
        }
        if p.ncv <= p.nev || p.ncv > p.n {
            return Err(KernelCode(-3));
        }
        if !self.strategy.valid_which(p.which) {
            return Err(KernelCode(-5));
        }
        if ws.workl.len() < scratch_len(S::SYMMETRIC, p.ncv) || ws.v.len() < p.n * p.ncv {
            return Err(KernelCode(-7));
        }
        let expected = ws.iparam[IPARAM_NCONV];
        if self.stage != Stage::Done || expected == 0 {
            return Err(KernelCode(-14));
        }

        let (n, m) = (p.n, p.ncv);
        let (set, bounds, order) = self.ritz_estimates(p, ws).ok_or(KernelCode(-8))?;
        let picked = self.converged_wanted(p, &set, &bounds, &order);
        if picked.len() != expected {
            return Err(KernelCode(-17));
        }

        let values: Vec<Complex64> = picked
            .iter()
            .map(|&i| self.strategy.back_transform(set.values[i], self.mode, request.sigma_re, request.sigma_im))
            .collect();

        let (vectors_re, vectors_im) = if request.want_vectors {
            let k = picked.len();
            let mut re = Mat::zeros(n, k);
            let mut im = Mat::zeros(n, k);
            for (col, &i) in picked.iter().enumerate() {
                let s = &set.vectors[i];
                let mut norm2 = 0.0;
                for r in 0..n {
                    let mut acc = Complex64::new(0.0, 0.0);
                    for (l, sl) in s.iter().enumerate().take(m) {
                        acc += *sl * ws.v[r + l * n];
                    }
                    re[(r, col)] = acc.re;
                    im[(r, col)] = acc.im;
                    norm2 += acc.norm_sqr();
                }
                let norm = norm2.sqrt();
                if norm > 0.0 {
                    for r in 0..n {
                        re[(r, col)] /= norm;
                        im[(r, col)] /= norm;
                    }
                }
            }
            (Some(re), if S::SYMMETRIC { None } else { Some(im) })
        } else {
            (None, None)
        };

        Ok(RitzPairs { values, vectors_re, vectors_im })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the kernel directly against a dense symmetric matrix.
    fn run<S: Strategy>(kernel: &mut Arnoldi<S>, a: &Mat<f64>, p: &KernelProblem, ws: &mut Workspace) {
        let n = p.n;
        loop {
            kernel.advance(p, ws);
            match ws.ido {
                Ido::Op | Ido::OpInit => {
                    let x = ws.workd_range(IPNTR_X).unwrap();
                    let y = ws.workd_range(IPNTR_Y).unwrap();
                    for i in 0..n {
                        ws.workd[y.start + i] = (0..n).map(|j| a[(i, j)] * ws.workd[x.start + j]).sum();
                    }
                }
                Ido::BProduct => {
                    let x = ws.workd_range(IPNTR_X).unwrap();
                    let y = ws.workd_range(IPNTR_Y).unwrap();
                    for i in 0..n {
                        ws.workd[y.start + i] = ws.workd[x.start + i];
                    }
                }
                _ => break,
            }
        }
    }

    fn problem(n: usize, nev: usize, ncv: usize, which: Which) -> KernelProblem {
        KernelProblem { bmat: Bmat::Standard, n, which, nev, tol: 1e-10, ncv }
    }

    fn fresh_ws(n: usize, ncv: usize, symmetric: bool) -> Workspace {
        let mut ws = Workspace::new(n, ncv, symmetric);
        ws.iparam[IPARAM_SHIFT] = 1;
        ws.iparam[IPARAM_MAXITER] = 300;
        ws.iparam[IPARAM_MODE] = 1;
        ws
    }

    #[test]
    fn lanczos_finds_largest_of_diagonal() {
        let n = 40;
        let a = Mat::from_fn(n, n, |i, j| if i == j { (i + 1) as f64 } else { 0.0 });
        let p = problem(n, 3, 12, Which::LargestAlgebraic);
        let mut ws = fresh_ws(n, 12, true);
        let mut k = Arnoldi::symmetric();
        run(&mut k, &a, &p, &mut ws);
        assert_eq!(ws.info, 0);
        assert_eq!(ws.iparam[IPARAM_NCONV], 3);
        let pairs = k.extract(&p, &ExtractRequest { want_vectors: true, sigma_re: 0.0, sigma_im: 0.0 }, &mut ws).unwrap();
        let vals: Vec<f64> = pairs.values.iter().map(|z| z.re).collect();
        for (got, want) in vals.iter().zip([40.0, 39.0, 38.0]) {
            assert!((got - want).abs() < 1e-8, "{vals:?}");
        }
        let x = pairs.vectors_re.unwrap();
        assert!((x[(39, 0)].abs() - 1.0).abs() < 1e-6);
        assert!(pairs.vectors_im.is_none());
    }

    #[test]
    fn arnoldi_finds_complex_pair() {
        // block diagonal: rotation blocks [[k, 1], [-1, k]] with eigenvalues k ± i
        let n = 30;
        let a = Mat::from_fn(n, n, |i, j| {
            let (bi, bj) = (i / 2, j / 2);
            if bi != bj {
                return 0.0;
            }
            let kk = (bi + 1) as f64;
            match (i % 2, j % 2) {
                (0, 0) | (1, 1) => kk,
                (0, 1) => 1.0,
                _ => -1.0,
            }
        });
        let p = problem(n, 2, 14, Which::LargestReal);
        let mut ws = fresh_ws(n, 14, false);
        let mut k = Arnoldi::general();
        run(&mut k, &a, &p, &mut ws);
        assert_eq!(ws.info, 0);
        let pairs = k.extract(&p, &ExtractRequest { want_vectors: false, sigma_re: 0.0, sigma_im: 0.0 }, &mut ws).unwrap();
        assert_eq!(pairs.values.len(), 2);
        assert!((pairs.values[0] - Complex64::new(15.0, 1.0)).norm() < 1e-8, "{:?}", pairs.values);
        assert!((pairs.values[1] - Complex64::new(15.0, -1.0)).norm() < 1e-8, "{:?}", pairs.values);
    }

    #[test]
    fn rejects_bad_parameters() {
        let n = 10;
        let a = Mat::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 });
        let mut k = Arnoldi::symmetric();
        let mut ws = fresh_ws(n, 5, true);
        run(&mut k, &a, &problem(n, 5, 5, Which::LargestMagnitude), &mut ws);
        assert_eq!(ws.info, -3);

        let mut k = Arnoldi::symmetric();
        let mut ws = Workspace::with_scratch(n, 5, 10);
        ws.iparam[IPARAM_SHIFT] = 1;
        ws.iparam[IPARAM_MAXITER] = 10;
        ws.iparam[IPARAM_MODE] = 1;
        run(&mut k, &a, &problem(n, 2, 5, Which::LargestMagnitude), &mut ws);
        assert_eq!(ws.info, -7);

        let mut k = Arnoldi::symmetric();
        let mut ws = fresh_ws(n, 5, true);
        run(&mut k, &a, &problem(n, 2, 5, Which::LargestImag), &mut ws);
        assert_eq!(ws.info, -5);

        let mut k = Arnoldi::symmetric();
        let mut ws = fresh_ws(n, 5, true);
        ws.iparam[IPARAM_MODE] = 1;
        let mut generalized_problem = problem(n, 2, 5, Which::LargestMagnitude);
        generalized_problem.bmat = Bmat::Generalized;
        run(&mut k, &a, &generalized_problem, &mut ws);
        assert_eq!(ws.info, -11);

        // zero start vector supplied by the caller
        let mut k = Arnoldi::symmetric();
        let mut ws = fresh_ws(n, 5, true);
        ws.info = 1;
        run(&mut k, &a, &problem(n, 2, 5, Which::LargestMagnitude), &mut ws);
        assert_eq!(ws.info, -9);
        assert_eq!(ws.ipntr[IPNTR_BX], 0);
    }
}
