//! Integration tests for real non-symmetric problems, including complex
//! conjugate pairs and the complex-shift modes.

use approx::assert_abs_diff_eq;
use faer::Mat;
use krylov_eigs::{eigs, ComplexPart, CsrMatrix, EigsError, MatrixData, ProblemDescriptor, Status, Warnings, Which};
use num_complex::Complex64;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Block diagonal matrix: 2x2 rotation blocks for the complex pairs, then a
/// diagonal tail.
fn block_matrix(pairs: &[(f64, f64)], tail: &[f64]) -> Mat<f64> {
    let n = 2 * pairs.len() + tail.len();
    let mut a = Mat::zeros(n, n);
    for (b, &(re, im)) in pairs.iter().enumerate() {
        let k = 2 * b;
        a[(k, k)] = re;
        a[(k + 1, k + 1)] = re;
        a[(k, k + 1)] = im;
        a[(k + 1, k)] = -im;
    }
    for (t, &d) in tail.iter().enumerate() {
        let k = 2 * pairs.len() + t;
        a[(k, k)] = d;
    }
    a
}

fn test_matrix() -> Mat<f64> {
    let tail: Vec<f64> = [1.0, 2.0, 4.0, 5.0].into_iter().chain((7..29).map(|i| i as f64 * 0.5)).collect();
    block_matrix(&[(3.0, 1.0), (6.0, 2.0)], &tail)
}

fn dense_triplets(a: &Mat<f64>) -> Vec<(usize, usize, f64)> {
    let mut t = Vec::new();
    for i in 0..a.nrows() {
        for j in 0..a.ncols() {
            if a[(i, j)] != 0.0 {
                t.push((i, j, a[(i, j)]));
            }
        }
    }
    t
}

fn sorted_by_imag(mut v: Vec<Complex64>) -> Vec<Complex64> {
    v.sort_by(|a, b| a.im.total_cmp(&b.im));
    v
}

#[test]
fn finds_complex_pair_with_largest_real_part() {
    let a = block_matrix(&[(15.0, 1.0)], &(1..=28).map(|i| i as f64 * 0.5).collect::<Vec<_>>());
    let desc = ProblemDescriptor::nonsymmetric(30, 2).with_which(Which::LargestReal).with_tol(1e-10);
    let out = eigs(desc, MatrixData::Dense(a)).unwrap();
    assert_eq!(out.status, Status::Converged);
    assert!(out.nconv >= 2);
    let top = sorted_by_imag(out.values[..2].to_vec());
    assert_abs_diff_eq!(top[0].re, 15.0, epsilon = 1e-8);
    assert_abs_diff_eq!(top[0].im, -1.0, epsilon = 1e-8);
    assert_abs_diff_eq!(top[1].im, 1.0, epsilon = 1e-8);
}

#[test]
fn eigenvectors_of_a_complex_pair() {
    let a = test_matrix();
    let n = a.nrows();
    let desc = ProblemDescriptor::nonsymmetric(n, 2).with_which(Which::LargestImag).with_tol(1e-12);
    let out = eigs(desc, MatrixData::Dense(a.clone())).unwrap();
    let k = out.values.iter().position(|v| v.im > 0.0).unwrap();
    let lambda = out.values[k];
    assert_abs_diff_eq!(lambda.re, 6.0, epsilon = 1e-8);
    assert_abs_diff_eq!(lambda.im, 2.0, epsilon = 1e-8);
    let x = out.vectors.unwrap();
    let col = x.column(k);
    let norm: f64 = col.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
    assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-10);
    for i in 0..n {
        let ax: Complex64 = (0..n).map(|j| col[j] * a[(i, j)]).sum();
        let lx = lambda * col[i];
        assert_abs_diff_eq!(ax.re, lx.re, epsilon = 1e-6);
        assert_abs_diff_eq!(ax.im, lx.im, epsilon = 1e-6);
    }
}

#[test]
fn upper_triangular_matrix() {
    let n = 30;
    let a = Mat::from_fn(n, n, |i, j| {
        if i == j {
            (i + 1) as f64
        } else if j == i + 1 {
            0.5
        } else {
            0.0
        }
    });
    let desc = ProblemDescriptor::nonsymmetric(n, 3).with_tol(1e-10);
    let out = eigs(desc, MatrixData::Dense(a)).unwrap();
    assert_eq!(out.nconv, 3);
    for (k, v) in out.values.iter().enumerate() {
        assert_abs_diff_eq!(v.re, (n - k) as f64, epsilon = 1e-6);
        assert_abs_diff_eq!(v.im, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn sparse_and_dense_agree() {
    let a = test_matrix();
    let n = a.nrows();
    let csr = CsrMatrix::from_triplets(n, n, &dense_triplets(&a)).unwrap();
    let desc = || ProblemDescriptor::nonsymmetric(n, 4).with_tol(1e-11);
    let dense = eigs(desc(), MatrixData::Dense(a)).unwrap();
    let sparse = eigs(desc(), MatrixData::Sparse(csr)).unwrap();
    assert_eq!(dense.nconv, sparse.nconv);
    for (x, y) in dense.values.iter().zip(&sparse.values) {
        assert_abs_diff_eq!(x.re, y.re, epsilon = 1e-8);
        assert_abs_diff_eq!(x.im, y.im, epsilon = 1e-8);
    }
}

#[test]
fn real_shift_invert() {
    let a = test_matrix();
    let n = a.nrows();
    let desc = ProblemDescriptor::nonsymmetric(n, 1).with_shift(4.1).with_tol(1e-10);
    let out = eigs(desc, MatrixData::Dense(a)).unwrap();
    assert_abs_diff_eq!(out.values[0].re, 4.0, epsilon = 1e-8);
    assert_abs_diff_eq!(out.values[0].im, 0.0, epsilon = 1e-8);
}

#[test]
fn complex_shift_recovers_conjugate_pair() {
    init_logging();
    let a = test_matrix();
    let n = a.nrows();
    for part in [ComplexPart::Real, ComplexPart::Imag] {
        let desc = ProblemDescriptor::nonsymmetric(n, 2)
            .with_complex_shift(3.1, 0.9)
            .with_complex_part(part)
            .with_vectors(false)
            .with_tol(1e-10);
        let out = eigs(desc, MatrixData::Dense(a.clone())).unwrap();
        assert!(out.vectors.is_none());
        assert!(out.nconv >= 2);
        let pair = sorted_by_imag(out.values[..2].to_vec());
        assert_abs_diff_eq!(pair[0].re, 3.0, epsilon = 1e-7);
        assert_abs_diff_eq!(pair[0].im, -1.0, epsilon = 1e-7);
        assert_abs_diff_eq!(pair[1].re, 3.0, epsilon = 1e-7);
        assert_abs_diff_eq!(pair[1].im, 1.0, epsilon = 1e-7);
    }
}

#[test]
fn sparse_complex_shift() {
    let a = test_matrix();
    let n = a.nrows();
    let csr = CsrMatrix::from_triplets(n, n, &dense_triplets(&a)).unwrap();
    let desc = ProblemDescriptor::nonsymmetric(n, 2).with_complex_shift(6.2, 1.8).with_tol(1e-10);
    let out = eigs(desc, MatrixData::Sparse(csr)).unwrap();
    let pair = sorted_by_imag(out.values[..2].to_vec());
    assert_abs_diff_eq!(pair[1].re, 6.0, epsilon = 1e-7);
    assert_abs_diff_eq!(pair[1].im, 2.0, epsilon = 1e-7);
    assert!(out.vectors.is_some());
}

#[test]
fn invalid_nonsymmetric_configurations() {
    let a = || MatrixData::Dense(test_matrix());
    let n = 30;
    let bad_which = ProblemDescriptor::nonsymmetric(n, 2).with_which(Which::BothEnds);
    assert!(matches!(eigs(bad_which, a()), Err(EigsError::InvalidMode(_))));

    let cayley = ProblemDescriptor::nonsymmetric(n, 2).with_cayley(1.0);
    assert!(matches!(eigs(cayley, a()), Err(EigsError::InvalidMode(_))));

    let imag_of_real_shift =
        ProblemDescriptor::nonsymmetric(n, 2).with_complex_shift(2.5, 0.0).with_complex_part(ComplexPart::Imag);
    assert!(matches!(eigs(imag_of_real_shift, a()), Err(EigsError::InvalidMode(_))));

    let on_eigenvalue = ProblemDescriptor::nonsymmetric(n, 2).with_complex_shift(3.0, 1.0);
    assert!(matches!(eigs(on_eigenvalue, a()), Err(EigsError::SingularShift { .. })));

    let sym = ProblemDescriptor::symmetric(n, 2);
    let ctx = krylov_eigs::EigsContext::new(sym, a()).unwrap();
    assert!(matches!(ctx.solve_general(), Err(EigsError::InvalidMode(_))));
}

#[test]
fn smallest_subspace_reports_instead_of_failing() {
    let a = test_matrix();
    let n = a.nrows();
    let desc = ProblemDescriptor::nonsymmetric(n, 2).with_ncv(3).with_tol(1e-10).with_max_iterations(50);
    let out = eigs(desc, MatrixData::Dense(a)).unwrap();
    assert!(out.nconv <= 2);
    assert!(out.iterations <= 50);
    if out.nconv < 2 {
        assert!(out.warnings.contains(Warnings::MAX_ITERATIONS));
        assert_ne!(out.status, Status::Converged);
    }
    if out.nconv == 0 {
        assert_eq!(out.status, Status::ZeroConverged);
        assert!(out.values.is_empty());
        assert!(out.vectors.is_none());
    }
}

#[test]
fn dense_real_shift_on_large_diagonal() {
    let n = 32;
    let a = Mat::from_fn(n, n, |i, j| if i == j { (i + 1) as f64 } else { 0.0 });
    let desc = ProblemDescriptor::nonsymmetric(n, 1).with_shift(9.8).with_tol(1e-10);
    let out = eigs(desc, MatrixData::Dense(a)).unwrap();
    assert_abs_diff_eq!(out.values[0].re, 10.0, epsilon = 1e-8);
    assert_abs_diff_eq!(out.values[0].im, 0.0, epsilon = 1e-8);
}
