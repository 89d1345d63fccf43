use std::hint::black_box;
use std::path::PathBuf;
use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::{Array2, Array3};
use bci2a_prep::{
    extract_trials, one_hot, shuffle_trials, standardize, PickleWriter, Run, Session,
    TrialSet, TrialWindow, ZeroVariance,
};

fn synthetic(n: usize, seed: f64) -> Array3<f64> {
    Array3::from_shape_fn((n, 22, 1125), |(i, c, t)| {
        ((i * 1125 + t) as f64 * 0.01 + seed + c as f64).sin() * (c + 1) as f64
    })
}

/// Six runs of 48 trials, the size of a full training session.
fn synthetic_session() -> Session {
    let runs = (0..6)
        .map(|r| {
            let n_samples = 100 + 48 * 1750 + 400;
            Run {
                signal: Array2::from_shape_fn((25, n_samples), |(c, t)| {
                    ((t as f64) * 0.013 + r as f64 + c as f64).sin()
                }),
                onsets: (0..48).map(|i| 100 + i * 1750).collect(),
                classes: (0..48).map(|i| (i % 4) as i64 + 1).collect(),
                artifacts: (0..48).map(|i| i % 7 == 0).collect(),
                fs: Some(250.0),
            }
        })
        .collect();
    Session { path: PathBuf::from("synthetic.mat"), runs }
}

fn bench_extract(c: &mut Criterion) {
    let session = synthetic_session();
    let w = TrialWindow::default();
    c.bench_function("extract_trials 288 × [22×1125]", |b| {
        b.iter(|| {
            let set = extract_trials(black_box(&session), &w, true).unwrap();
            black_box(set.len())
        })
    });
}

fn bench_standardize(c: &mut Criterion) {
    let train = synthetic(288, 0.0);
    let test = synthetic(288, 3.0);
    c.bench_function("standardize 288 + 288 trials", |b| {
        b.iter(|| {
            let (x, y) = standardize(train.clone(), test.clone(), 22, ZeroVariance::Unit).unwrap();
            black_box(x[[0, 0, 0]] + y[[0, 0, 0]])
        })
    });
}

fn bench_shuffle_one_hot(c: &mut Criterion) {
    let set = TrialSet { windows: synthetic(288, 1.0), labels: (0..288).map(|i| i % 4).collect() };
    c.bench_function("shuffle + one_hot 288 trials", |b| {
        b.iter(|| {
            let s = shuffle_trials(set.clone(), black_box(42));
            black_box(one_hot(&s.labels, 4).unwrap())
        })
    });
}

fn bench_pickle(c: &mut Criterion) {
    let x = synthetic(288, 2.0);
    c.bench_function("pickle [288×22×1125] f64", |b| {
        b.iter(|| {
            let mut w = PickleWriter::new();
            w.begin_tuple();
            w.ndarray_f64(black_box(&x)).unwrap();
            w.end_tuple();
            black_box(w.finish().len())
        })
    });
}

criterion_group!(benches, bench_extract, bench_standardize, bench_shuffle_one_hot, bench_pickle);
criterion_main!(benches);
