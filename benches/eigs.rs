use criterion::{black_box, criterion_group, criterion_main, Criterion};
use faer::Mat;
use krylov_eigs::{eigs, eigs_sym, CsrMatrix, MatrixData, ProblemDescriptor, Which};

fn laplacian_lower(n: usize) -> CsrMatrix {
    let mut t = Vec::with_capacity(2 * n);
    for i in 0..n {
        t.push((i, i, 2.0));
        if i > 0 {
            t.push((i, i - 1, -1.0));
        }
    }
    CsrMatrix::from_triplets(n, n, &t).unwrap()
}

fn bench_eigs(c: &mut Criterion) {
    let n = 400;
    let lower = laplacian_lower(n);

    c.bench_function("lanczos LA sparse n=400", |ben| {
        ben.iter(|| {
            let desc = ProblemDescriptor::symmetric(n, 4).with_which(Which::LargestAlgebraic).with_tol(1e-8);
            eigs_sym(desc, MatrixData::SparseSym(black_box(lower.clone()))).unwrap()
        })
    });

    c.bench_function("lanczos shift-invert sparse n=400", |ben| {
        ben.iter(|| {
            let desc = ProblemDescriptor::symmetric(n, 4).with_shift(0.0).with_tol(1e-8);
            eigs_sym(desc, MatrixData::SparseSym(black_box(lower.clone()))).unwrap()
        })
    });

    let m = 200;
    let data: Vec<f64> = (0..m * m).map(|i| (i as f64).sin()).collect();
    let a = Mat::from_fn(m, m, |i, j| data[j * m + i] + if i == j { (i + 1) as f64 } else { 0.0 });
    c.bench_function("arnoldi LM dense n=200", |ben| {
        ben.iter(|| {
            let desc = ProblemDescriptor::nonsymmetric(m, 4).with_tol(1e-8);
            eigs(desc, MatrixData::Dense(black_box(a.clone()))).unwrap()
        })
    });
}

criterion_group!(benches, bench_eigs);
criterion_main!(benches);
