//! Convergence tests on Ritz estimates.

use num_traits::Float;

/// Tolerance actually used: machine epsilon when `tol <= 0`.
pub fn effective_tol(tol: f64) -> f64 {
    if tol > 0.0 {
        tol
    } else {
        f64::EPSILON
    }
}

/// `eps^(2/3)`, floor of the relative scale in the convergence test.
pub fn eps23<T: Float>() -> T {
    let two_thirds = T::from(2.0 / 3.0).unwrap_or_else(T::one);
    T::epsilon().powf(two_thirds)
}

/// Stopping criteria for the restart loop.
#[derive(Clone, Copy, Debug)]
pub struct Convergence<T> {
    pub tol: T,
    pub max_iters: usize,
}

impl<T: Float> Convergence<T> {
    /// A Ritz value θ with error bound `bound` has converged when
    /// `bound <= tol * max(eps^(2/3), |θ|)`.
    pub fn is_converged(&self, bound: T, theta_abs: T) -> bool {
        bound <= self.tol * theta_abs.max(eps23())
    }

    /// Number of converged entries among `(bound, |θ|)` pairs.
    pub fn count<I: IntoIterator<Item = (T, T)>>(&self, pairs: I) -> usize {
        pairs.into_iter().filter(|&(b, t)| self.is_converged(b, t)).count()
    }

    pub fn exhausted(&self, iterations: usize) -> bool {
        iterations >= self.max_iters
    }
}
