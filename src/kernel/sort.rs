//! Ordering Ritz values by the selection criterion.

use std::cmp::Ordering;

use num_complex::Complex64;

use crate::config::options::Which;

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Indices of `ritz`, most wanted first.
///
/// Ties (a conjugate pair in particular) put the member with the larger
/// imaginary part first.
pub fn select_order(which: Which, ritz: &[Complex64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..ritz.len()).collect();
    let tie = |a: &usize, b: &usize| cmp_f64(ritz[*b].im, ritz[*a].im);
    match which {
        Which::LargestMagnitude => idx.sort_by(|a, b| cmp_f64(ritz[*b].norm(), ritz[*a].norm()).then(tie(a, b))),
        Which::SmallestMagnitude => idx.sort_by(|a, b| cmp_f64(ritz[*a].norm(), ritz[*b].norm()).then(tie(a, b))),
        Which::LargestAlgebraic | Which::LargestReal => {
            idx.sort_by(|a, b| cmp_f64(ritz[*b].re, ritz[*a].re).then(tie(a, b)))
        }
        Which::SmallestAlgebraic | Which::SmallestReal => {
            idx.sort_by(|a, b| cmp_f64(ritz[*a].re, ritz[*b].re).then(tie(a, b)))
        }
        Which::LargestImag => idx.sort_by(|a, b| cmp_f64(ritz[*b].im.abs(), ritz[*a].im.abs()).then(tie(a, b))),
        Which::SmallestImag => idx.sort_by(|a, b| cmp_f64(ritz[*a].im.abs(), ritz[*b].im.abs()).then(tie(a, b))),
        Which::BothEnds => {
            idx.sort_by(|a, b| cmp_f64(ritz[*a].re, ritz[*b].re));
            let mut out = Vec::with_capacity(idx.len());
            let (mut lo, mut hi) = (0usize, idx.len());
            let mut take_high = true;
            while lo < hi {
                if take_high {
                    hi -= 1;
                    out.push(idx[hi]);
                } else {
                    out.push(idx[lo]);
                    lo += 1;
                }
                take_high = !take_high;
            }
            idx = out;
        }
    }
    idx
}
