//! Operator contract tests: capability sets, length checks and agreement
//! between storage layouts.

use approx::assert_abs_diff_eq;
use faer::Mat;
use krylov_eigs::{
    build_operator, Capabilities, CsrMatrix, DenseComplexShift, DensePencil, DenseProd, DenseShift, EigsError,
    MatOp, MatOpKind, MatrixData, PackedSym, PackedSymShift, ProblemDescriptor, SparseProd, SparseShift,
    SymDenseProd, ComplexPart,
};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

fn random_matrix(n: usize, rng: &mut StdRng) -> Mat<f64> {
    Mat::from_fn(n, n, |i, j| if i == j { 4.0 + rng.gen_range(0.0..1.0) } else { rng.gen_range(-0.5..0.5) })
}

fn triplets(a: &Mat<f64>) -> Vec<(usize, usize, f64)> {
    (0..a.nrows()).flat_map(|i| (0..a.ncols()).map(move |j| (i, j))).map(|(i, j)| (i, j, a[(i, j)])).collect()
}

fn apply(op: &dyn MatOp, x: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; x.len()];
    op.apply(x, &mut y).unwrap();
    y
}

#[test]
fn wrong_lengths_are_rejected_without_writing() {
    let n = 6;
    let mut rng = StdRng::seed_from_u64(7);
    let a = random_matrix(n, &mut rng);
    let ops: Vec<Box<dyn MatOp>> = vec![
        Box::new(DenseProd::new(a.clone()).unwrap()),
        Box::new(DenseShift::new(a.clone(), 0.25).unwrap()),
        Box::new(SparseShift::new(CsrMatrix::from_triplets(n, n, &triplets(&a)).unwrap(), 0.25).unwrap()),
        Box::new(DenseComplexShift::new(a.clone(), 0.5, 0.5, ComplexPart::Real).unwrap()),
    ];
    for op in &ops {
        let x = vec![1.0; n - 1];
        let mut y = vec![-3.0; n];
        let err = op.apply(&x, &mut y).unwrap_err();
        assert_eq!(err, EigsError::DimensionMismatch { expected: n, found: n - 1 });
        assert!(y.iter().all(|&v| v == -3.0));
        if op.capabilities().contains(Capabilities::SOLVE) {
            let mut short = vec![-3.0; n + 2];
            assert!(matches!(op.solve(&vec![1.0; n], &mut short), Err(EigsError::DimensionMismatch { .. })));
            assert!(short.iter().all(|&v| v == -3.0));
        }
    }
}

#[test]
fn sparse_and_dense_products_agree() {
    let n = 25;
    let mut rng = StdRng::seed_from_u64(11);
    let a = random_matrix(n, &mut rng);
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let dense = DenseProd::new(a.clone()).unwrap();
    let sparse = SparseProd::new(CsrMatrix::from_triplets(n, n, &triplets(&a)).unwrap()).unwrap();
    for (d, s) in apply(&dense, &x).iter().zip(apply(&sparse, &x)) {
        assert_abs_diff_eq!(*d, s, epsilon = 1e-12);
    }
}

#[test]
fn shift_solves_invert_the_shifted_matrix() {
    let n = 12;
    let mut rng = StdRng::seed_from_u64(3);
    let a = random_matrix(n, &mut rng);
    let sym = Mat::from_fn(n, n, |i, j| 0.5 * (a[(i, j)] + a[(j, i)]));
    let sigma = 1.5;
    let op = PackedSymShift::new(PackedSym::from_dense(&sym), sigma).unwrap();
    let x: Vec<f64> = (0..n).map(|i| (i as f64).cos()).collect();
    let mut y = vec![0.0; n];
    op.solve(&x, &mut y).unwrap();
    // (A - σI) y = x
    for i in 0..n {
        let r: f64 = (0..n).map(|j| sym[(i, j)] * y[j]).sum::<f64>() - sigma * y[i];
        assert_abs_diff_eq!(r, x[i], epsilon = 1e-10);
    }
}

#[test]
fn missing_capabilities_are_unsupported() {
    let n = 4;
    let a = Mat::from_fn(n, n, |i, j| if i == j { 1.0 + i as f64 } else { 0.0 });
    let prod = SymDenseProd::new(a.clone()).unwrap();
    assert_eq!(prod.capabilities(), Capabilities::APPLY);
    let mut y = vec![0.0; n];
    assert_eq!(prod.solve(&[1.0; 4], &mut y), Err(EigsError::Unsupported("solve")));

    let pencil = DensePencil::new(a.clone(), a.clone()).unwrap();
    assert!(pencil.capabilities().contains(Capabilities::PENCIL | Capabilities::SOLVE_B));
    assert!(!pencil.capabilities().contains(Capabilities::SOLVE));
    assert!(matches!(pencil.solve(&[1.0; 4], &mut y), Err(EigsError::Unsupported(_))));

    let zero_b = Mat::zeros(n, n);
    assert!(matches!(DensePencil::new(a, zero_b), Err(EigsError::Factorization(_))));
}

#[test]
fn operator_is_chosen_by_layout() {
    let n = 8;
    let a = Mat::from_fn(n, n, |i, j| if i == j { 2.0 } else if i.abs_diff(j) == 1 { -1.0 } else { 0.0 });
    let desc = ProblemDescriptor::symmetric(n, 2).with_ncv(5);
    let lower = CsrMatrix::from_triplets(
        n,
        n,
        &triplets(&a).into_iter().filter(|&(i, j, v)| j <= i && v != 0.0).collect::<Vec<_>>(),
    )
    .unwrap();
    let cases = [
        (MatrixData::Dense(a.clone()), MatOpKind::DenseGeneral),
        (MatrixData::SymDense(a.clone()), MatOpKind::DenseSymmetric),
        (MatrixData::SymPacked(PackedSym::from_dense(&a)), MatOpKind::PackedSymmetric),
        (MatrixData::SparseSym(lower), MatOpKind::SparseSymmetric),
    ];
    let x: Vec<f64> = (0..n).map(|i| i as f64 + 1.0).collect();
    let reference = apply(&DenseProd::new(a.clone()).unwrap(), &x);
    for (data, kind) in cases {
        let op = build_operator(&desc, data).unwrap();
        assert_eq!(op.kind(), kind);
        assert_eq!(op.dim(), n);
        for (r, v) in reference.iter().zip(apply(op.as_ref(), &x)) {
            assert_abs_diff_eq!(*r, v, epsilon = 1e-14);
        }
    }
}
