//! Small dense routines on the projected matrix.
//!
//! Everything here works on the `ncv x ncv` matrix H of the Krylov
//! factorization, so the cubic cost is independent of `n`.

use faer::Mat;
use num_complex::Complex64;

const JACOBI_MAX_SWEEPS: usize = 100;
const HQR_MAX_ITS: usize = 60;

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns `(values, vectors)` with orthonormal eigenvectors in the columns.
/// `None` if the sweeps fail to converge.
pub fn jacobi_eigen(a: &Mat<f64>) -> Option<(Vec<f64>, Mat<f64>)> {
    let n = a.nrows();
    let mut a = Mat::from_fn(n, n, |i, j| a[(i, j)]);
    let mut v = Mat::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 });
    let fro = frobenius(&a);
    if fro == 0.0 {
        return Some((vec![0.0; n], v));
    }
    let mut converged = false;
    for _ in 0..JACOBI_MAX_SWEEPS {
        let off: f64 = (0..n).flat_map(|p| ((p + 1)..n).map(move |q| (p, q))).map(|(p, q)| a[(p, q)].powi(2)).sum();
        if off.sqrt() <= f64::EPSILON * fro {
            converged = true;
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[(p, q)];
                if apq.abs() <= f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[(q, q)] - a[(p, p)]) / (2.0 * apq);
                let t = if theta.abs() > 1e150 {
                    0.5 / theta
                } else {
                    theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..n {
                    let (akp, akq) = (a[(k, p)], a[(k, q)]);
                    a[(k, p)] = c * akp - s * akq;
                    a[(k, q)] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[(p, k)], a[(q, k)]);
                    a[(p, k)] = c * apk - s * aqk;
                    a[(q, k)] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let (vkp, vkq) = (v[(k, p)], v[(k, q)]);
                    v[(k, p)] = c * vkp - s * vkq;
                    v[(k, q)] = s * vkp + c * vkq;
                }
            }
        }
    }
    if !converged {
        let off: f64 = (0..n).flat_map(|p| ((p + 1)..n).map(move |q| (p, q))).map(|(p, q)| a[(p, q)].powi(2)).sum();
        if off.sqrt() > 1e3 * f64::EPSILON * fro {
            return None;
        }
    }
    Some(((0..n).map(|i| a[(i, i)]).collect(), v))
}

fn frobenius(a: &Mat<f64>) -> f64 {
    let mut s = 0.0;
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            s += a[(i, j)] * a[(i, j)];
        }
    }
    s.sqrt()
}

fn sign(a: f64, b: f64) -> f64 {
    if b >= 0.0 {
        a.abs()
    } else {
        -a.abs()
    }
}

/// Eigenvalues of a real upper Hessenberg matrix by the Francis double-shift
/// QR algorithm. Conjugate pairs come out adjacent.
pub fn hqr(h: &Mat<f64>) -> Option<Vec<Complex64>> {
    let n = h.nrows();
    let mut a = Mat::from_fn(n, n, |i, j| if i <= j + 1 { h[(i, j)] } else { 0.0 });
    let mut wr = vec![0.0; n];
    let mut wi = vec![0.0; n];
    if n == 0 {
        return Some(Vec::new());
    }

    let mut anorm = 0.0;
    for i in 0..n {
        for j in i.saturating_sub(1)..n {
            anorm += a[(i, j)].abs();
        }
    }

    let mut nn = n as isize - 1;
    let mut t = 0.0;
    while nn >= 0 {
        let nu = nn as usize;
        let mut its = 0;
        loop {
            // look for a single small subdiagonal element
            let mut l = nu;
            while l >= 1 {
                let mut s = a[(l - 1, l - 1)].abs() + a[(l, l)].abs();
                if s == 0.0 {
                    s = anorm;
                }
                if a[(l, l - 1)].abs() + s == s {
                    a[(l, l - 1)] = 0.0;
                    break;
                }
                l -= 1;
            }
            let mut x = a[(nu, nu)];
            if l == nu {
                wr[nu] = x + t;
                wi[nu] = 0.0;
                nn -= 1;
                break;
            }
            let mut y = a[(nu - 1, nu - 1)];
            let mut w = a[(nu, nu - 1)] * a[(nu - 1, nu)];
            if l == nu - 1 {
                let p = 0.5 * (y - x);
                let q = p * p + w;
                let mut z = q.abs().sqrt();
                x += t;
                if q >= 0.0 {
                    z = p + sign(z, p);
                    wr[nu - 1] = x + z;
                    wr[nu] = x + z;
                    if z != 0.0 {
                        wr[nu] = x - w / z;
                    }
                    wi[nu - 1] = 0.0;
                    wi[nu] = 0.0;
                } else {
                    wr[nu - 1] = x + p;
                    wr[nu] = x + p;
                    wi[nu - 1] = z;
                    wi[nu] = -z;
                }
                nn -= 2;
                break;
            }

            if its == HQR_MAX_ITS {
                return None;
            }
            if its == 10 || its == 20 {
                // exceptional shift
                t += x;
                for i in 0..=nu {
                    a[(i, i)] -= x;
                }
                let s = a[(nu, nu - 1)].abs() + a[(nu - 1, nu - 2)].abs();
                x = 0.75 * s;
                y = x;
                w = -0.4375 * s * s;
            }
            its += 1;

            // two consecutive small subdiagonal elements
            let mut m = nu - 2;
            let (mut p, mut q, mut r) = (0.0, 0.0, 0.0);
            loop {
                let z = a[(m, m)];
                let rr = x - z;
                let ss = y - z;
                p = (rr * ss - w) / a[(m + 1, m)] + a[(m, m + 1)];
                q = a[(m + 1, m + 1)] - z - rr - ss;
                r = a[(m + 2, m + 1)];
                let s = p.abs() + q.abs() + r.abs();
                p /= s;
                q /= s;
                r /= s;
                if m == l {
                    break;
                }
                let u = a[(m, m - 1)].abs() * (q.abs() + r.abs());
                let v = p.abs() * (a[(m - 1, m - 1)].abs() + z.abs() + a[(m + 1, m + 1)].abs());
                if u + v == v {
                    break;
                }
                m -= 1;
            }
            for i in (m + 2)..=nu {
                a[(i, i - 2)] = 0.0;
                if i != m + 2 {
                    a[(i, i - 3)] = 0.0;
                }
            }

            // double QR step on rows l..=nu and columns m..=nu
            let mut k = m;
            while k < nu {
                if k != m {
                    p = a[(k, k - 1)];
                    q = a[(k + 1, k - 1)];
                    r = if k != nu - 1 { a[(k + 2, k - 1)] } else { 0.0 };
                    x = p.abs() + q.abs() + r.abs();
                    if x != 0.0 {
                        p /= x;
                        q /= x;
                        r /= x;
                    }
                }
                let s = sign((p * p + q * q + r * r).sqrt(), p);
                if s != 0.0 {
                    if k == m {
                        if l != m {
                            a[(k, k - 1)] = -a[(k, k - 1)];
                        }
                    } else {
                        a[(k, k - 1)] = -s * x;
                    }
                    p += s;
                    x = p / s;
                    y = q / s;
                    let z = r / s;
                    q /= p;
                    r /= p;
                    for j in k..=nu {
                        let mut pp = a[(k, j)] + q * a[(k + 1, j)];
                        if k != nu - 1 {
                            pp += r * a[(k + 2, j)];
                            a[(k + 2, j)] -= pp * z;
                        }
                        a[(k + 1, j)] -= pp * y;
                        a[(k, j)] -= pp * x;
                    }
                    let mmin = if nu < k + 3 { nu } else { k + 3 };
                    for i in l..=mmin {
                        let mut pp = x * a[(i, k)] + y * a[(i, k + 1)];
                        if k != nu - 1 {
                            pp += z * a[(i, k + 2)];
                            a[(i, k + 2)] -= pp * r;
                        }
                        a[(i, k + 1)] -= pp * q;
                        a[(i, k)] -= pp;
                    }
                }
                k += 1;
            }
        }
    }
    Some(wr.into_iter().zip(wi).map(|(re, im)| Complex64::new(re, im)).collect())
}

/// Unit eigenvector of `h` for the (approximate) eigenvalue `theta`, by
/// inverse iteration on `h - theta I`.
pub fn inverse_iteration(h: &Mat<f64>, theta: Complex64) -> Vec<Complex64> {
    let n = h.nrows();
    let hnorm = frobenius(h).max(f64::MIN_POSITIVE);
    let tiny = f64::EPSILON * hnorm;

    // row-major LU with partial pivoting; tiny pivots are perturbed
    let mut lu: Vec<Complex64> = (0..n * n)
        .map(|k| {
            let (i, j) = (k / n, k % n);
            let d = if i == j { theta } else { Complex64::new(0.0, 0.0) };
            Complex64::new(h[(i, j)], 0.0) - d
        })
        .collect();
    let mut perm: Vec<usize> = (0..n).collect();
    for k in 0..n {
        let mut piv = k;
        for i in (k + 1)..n {
            if lu[i * n + k].norm() > lu[piv * n + k].norm() {
                piv = i;
            }
        }
        if piv != k {
            for j in 0..n {
                lu.swap(k * n + j, piv * n + j);
            }
            perm.swap(k, piv);
        }
        if lu[k * n + k].norm() < tiny {
            lu[k * n + k] = Complex64::new(tiny, 0.0);
        }
        let pivot = lu[k * n + k];
        for i in (k + 1)..n {
            let f = lu[i * n + k] / pivot;
            lu[i * n + k] = f;
            if f.norm() != 0.0 {
                for j in (k + 1)..n {
                    let u = lu[k * n + j];
                    lu[i * n + j] -= f * u;
                }
            }
        }
    }

    let solve = |b: &[Complex64]| -> Vec<Complex64> {
        let mut y: Vec<Complex64> = perm.iter().map(|&p| b[p]).collect();
        for i in 0..n {
            for j in 0..i {
                let l = lu[i * n + j];
                y[i] = y[i] - l * y[j];
            }
        }
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                let u = lu[i * n + j];
                y[i] = y[i] - u * y[j];
            }
            y[i] /= lu[i * n + i];
        }
        y
    };

    let mut x = vec![Complex64::new(1.0 / (n as f64).sqrt(), 0.0); n];
    for _ in 0..3 {
        let y = solve(&x);
        let norm = y.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
        if !norm.is_finite() || norm == 0.0 {
            break;
        }
        x = y.into_iter().map(|z| z / norm).collect();
    }
    normalize_phase(&mut x);
    x
}

/// Rotate `x` so its largest component is real and positive.
fn normalize_phase(x: &mut [Complex64]) {
    let big = x.iter().copied().fold(Complex64::new(0.0, 0.0), |m, z| if z.norm() > m.norm() { z } else { m });
    let mag = big.norm();
    if mag > 0.0 {
        let phase = big.conj() / mag;
        x.iter_mut().for_each(|z| *z *= phase);
    }
}

/// One implicit single-shift QR step `H - μI = QR`, `H ← RQ + μI`, on an
/// upper Hessenberg `h`. The rotations are accumulated into `q`.
pub fn single_shift_step(h: &mut Mat<f64>, q: &mut Mat<f64>, mu: f64) {
    let m = h.nrows();
    if m < 2 {
        return;
    }
    for i in 0..m {
        h[(i, i)] -= mu;
    }
    let mut rots = Vec::with_capacity(m - 1);
    for i in 0..(m - 1) {
        let (a, b) = (h[(i, i)], h[(i + 1, i)]);
        let r = a.hypot(b);
        let (c, s) = if r == 0.0 { (1.0, 0.0) } else { (a / r, b / r) };
        for j in 0..m {
            let (x, y) = (h[(i, j)], h[(i + 1, j)]);
            h[(i, j)] = c * x + s * y;
            h[(i + 1, j)] = -s * x + c * y;
        }
        rots.push((c, s));
    }
    for (i, &(c, s)) in rots.iter().enumerate() {
        for k in 0..m {
            let (x, y) = (h[(k, i)], h[(k, i + 1)]);
            h[(k, i)] = c * x + s * y;
            h[(k, i + 1)] = -s * x + c * y;
        }
        for k in 0..q.nrows() {
            let (x, y) = (q[(k, i)], q[(k, i + 1)]);
            q[(k, i)] = c * x + s * y;
            q[(k, i + 1)] = -s * x + c * y;
        }
    }
    for i in 0..m {
        h[(i, i)] += mu;
    }
}

/// Double-shift step for the conjugate pair `μ, conj(μ)`: `M = (H - μI)(H -
/// conj(μ)I)` is factored `M = QR` and `H ← QᵀHQ`, keeping H Hessenberg.
pub fn double_shift_step(h: &mut Mat<f64>, q: &mut Mat<f64>, mu: Complex64) {
    let m = h.nrows();
    if m < 2 {
        return;
    }
    let hh = &*h * &*h;
    let mut mm = Mat::from_fn(m, m, |i, j| {
        hh[(i, j)] - 2.0 * mu.re * h[(i, j)] + if i == j { mu.norm_sqr() } else { 0.0 }
    });

    // Householder QR of M; reflectors applied to H from both sides and to q
    for k in 0..(m - 1) {
        let last = (k + 2).min(m - 1);
        let alpha: f64 = (k..=last).map(|i| mm[(i, k)].powi(2)).sum::<f64>().sqrt();
        if alpha == 0.0 {
            continue;
        }
        let beta = if mm[(k, k)] > 0.0 { -alpha } else { alpha };
        let mut v: Vec<f64> = (k..=last).map(|i| mm[(i, k)]).collect();
        v[0] -= beta;
        let vnorm2: f64 = v.iter().map(|x| x * x).sum();
        if vnorm2 == 0.0 {
            continue;
        }
        let tau = 2.0 / vnorm2;
        // P = I - tau v vᵀ acting on rows k..=last
        let reflect_rows = |a: &mut Mat<f64>| {
            for j in 0..a.ncols() {
                let s: f64 = v.iter().enumerate().map(|(t, vt)| vt * a[(k + t, j)]).sum();
                for (t, vt) in v.iter().enumerate() {
                    a[(k + t, j)] -= tau * vt * s;
                }
            }
        };
        let reflect_cols = |a: &mut Mat<f64>| {
            for i in 0..a.nrows() {
                let s: f64 = v.iter().enumerate().map(|(t, vt)| vt * a[(i, k + t)]).sum();
                for (t, vt) in v.iter().enumerate() {
                    a[(i, k + t)] -= tau * vt * s;
                }
            }
        };
        reflect_rows(&mut mm);
        reflect_rows(&mut *h);
        reflect_cols(&mut *h);
        reflect_cols(&mut *q);
    }
    for j in 0..m {
        for i in (j + 2)..m {
            h[(i, j)] = 0.0;
        }
    }
}
