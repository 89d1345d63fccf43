//! Per-subject dataset assembly.
//!
//! ```text
//! A0nT.mat ─ extract ─┐                    ┌─ one-hot ─► y_train_onehot [N, K]
//!                     ├─ shuffle (seeded) ─┼─ standardize (fit on train)
//! A0nE.mat ─ extract ─┘                    └─ group axis ─► x_{train,test} [N, 1, C, T]
//! ```
//!
//! Shuffling permutes windows and labels together, each set independently,
//! with a Fisher–Yates pass driven by `ChaCha8Rng::seed_from_u64(seed)`. The
//! permutation is reproducible across platforms for a given seed; it does not
//! reproduce NumPy's.
use ndarray::{Array2, Array4, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::DatasetConfig;
use crate::error::{PrepError, Result};
use crate::extract::{extract, TrialSet};
use crate::normalize::{standardize_inplace, ChannelStats};
use crate::session::SessionKind;

/// Everything produced for one subject.
#[derive(Debug, Clone)]
pub struct SubjectData {
    pub subject: u32,
    /// `[trials, 1, channels, samples]`.
    pub x_train: Array4<f64>,
    pub y_train: Vec<usize>,
    /// `[trials, n_classes]`.
    pub y_train_onehot: Array2<f64>,
    pub x_test: Array4<f64>,
    pub y_test: Vec<usize>,
    pub y_test_onehot: Array2<f64>,
    /// Fitted parameters, `None` when standardization is disabled.
    pub stats: Option<Vec<ChannelStats>>,
}

/// Build the training and testing tensors for `subject`.
pub fn prepare_subject(cfg: &DatasetConfig, subject: u32) -> Result<SubjectData> {
    let train = extract(&cfg.data_path, subject, SessionKind::Training, cfg.keep_artifacts, &cfg.window)?;
    let test = extract(&cfg.data_path, subject, SessionKind::Evaluation, cfg.keep_artifacts, &cfg.window)?;
    assemble(subject, train, test, cfg)
}

/// Shuffle, one-hot, standardize and reshape two already extracted sets.
pub fn assemble(subject: u32, train: TrialSet, test: TrialSet, cfg: &DatasetConfig) -> Result<SubjectData> {
    let (mut train, mut test) = if cfg.shuffle {
        (shuffle_trials(train, cfg.seed), shuffle_trials(test, cfg.seed))
    } else {
        (train, test)
    };

    let y_train_onehot = one_hot(&train.labels, cfg.n_classes)?;
    let y_test_onehot = one_hot(&test.labels, cfg.n_classes)?;

    let stats = if cfg.standardize {
        Some(standardize_inplace(&mut train.windows, &mut test.windows, cfg.zero_variance)?)
    } else {
        None
    };

    let x_train = train.windows.insert_axis(Axis(1));
    let x_test = test.windows.insert_axis(Axis(1));
    log::info!(
        "subject {subject}: x_train {:?}, x_test {:?}",
        x_train.shape(),
        x_test.shape()
    );

    Ok(SubjectData {
        subject,
        x_train,
        y_train: train.labels,
        y_train_onehot,
        x_test,
        y_test: test.labels,
        y_test_onehot,
        stats,
    })
}

/// Seeded permutation of a trial set (windows and labels move together).
pub fn shuffle_trials(set: TrialSet, seed: u64) -> TrialSet {
    let perm = permutation(set.len(), seed);
    let windows = set.windows.select(Axis(0), &perm);
    let labels = perm.iter().map(|&i| set.labels[i]).collect();
    TrialSet { windows, labels }
}

/// `0..n` shuffled with a fresh `ChaCha8Rng` seeded from `seed`.
pub fn permutation(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(&mut rng);
    idx
}

/// Expand 0-based labels into `[labels.len(), n_classes]` indicator rows.
pub fn one_hot(labels: &[usize], n_classes: usize) -> Result<Array2<f64>> {
    let mut out = Array2::<f64>::zeros((labels.len(), n_classes));
    for (i, &label) in labels.iter().enumerate() {
        if label >= n_classes {
            return Err(PrepError::LabelOutOfRange { label, n_classes });
        }
        out[[i, label]] = 1.0;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    fn tagged_set(n: usize) -> TrialSet {
        // Every sample of trial i carries the value i, label = i % 4.
        let windows = Array3::from_shape_fn((n, 2, 5), |(i, _, _)| i as f64);
        TrialSet { windows, labels: (0..n).map(|i| i % 4).collect() }
    }

    #[test]
    fn one_hot_scenario() {
        let y = one_hot(&[0, 2], 4).unwrap();
        assert_eq!(y, array![[1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]]);
    }

    #[test]
    fn one_hot_rejects_out_of_range() {
        let err = one_hot(&[1, 4], 4).unwrap_err();
        assert!(matches!(err, PrepError::LabelOutOfRange { label: 4, n_classes: 4 }));
    }

    #[test]
    fn permutation_is_reproducible_and_complete() {
        let a = permutation(288, 42);
        assert_eq!(a, permutation(288, 42));
        assert_ne!(a, permutation(288, 43));
        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..288).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_keeps_windows_and_labels_paired() {
        let set = tagged_set(40);
        let shuffled = shuffle_trials(set, 7);
        assert_eq!(shuffled.len(), 40);
        for (i, &label) in shuffled.labels.iter().enumerate() {
            let src = shuffled.windows[[i, 0, 0]] as usize;
            assert_eq!(label, src % 4);
            assert!(shuffled.window(i).iter().all(|&v| v == src as f64));
        }
    }

    #[test]
    fn shuffle_of_empty_set() {
        let set = TrialSet { windows: Array3::zeros((0, 2, 5)), labels: vec![] };
        assert!(shuffle_trials(set, 42).is_empty());
    }

    #[test]
    fn assemble_shapes_without_shuffle_or_scaling() {
        let cfg = DatasetConfig { shuffle: false, standardize: false, ..DatasetConfig::default() };
        let data = assemble(1, tagged_set(6), tagged_set(3), &cfg).unwrap();
        assert_eq!(data.x_train.shape(), &[6, 1, 2, 5]);
        assert_eq!(data.x_test.shape(), &[3, 1, 2, 5]);
        assert_eq!(data.y_train_onehot.dim(), (6, 4));
        assert_eq!(data.y_train, vec![0, 1, 2, 3, 0, 1]);
        assert_eq!(data.x_train[[5, 0, 1, 4]], 5.0);
        assert!(data.stats.is_none());
    }

    #[test]
    fn assemble_onehot_follows_shuffled_labels() {
        let cfg = DatasetConfig { standardize: false, ..DatasetConfig::default() };
        let data = assemble(1, tagged_set(12), tagged_set(12), &cfg).unwrap();
        for (i, &l) in data.y_train.iter().enumerate() {
            assert_eq!(data.y_train_onehot[[i, l]], 1.0);
            assert_eq!(data.y_train_onehot.row(i).sum(), 1.0);
        }
        // Same seed, same length → same permutation for both sets.
        assert_eq!(data.y_train, data.y_test);
    }
}
