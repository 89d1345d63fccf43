//! # bci2a-prep: BCI Competition IV-2a preprocessing in pure Rust
//!
//! Turns the per-subject MATLAB recordings of the BCI Competition IV-2a
//! motor-imagery dataset into standardized tensors ready for classifier
//! training, written as a pickle that NumPy code loads directly.
//!
//! ## Pipeline overview
//!
//! ```text
//! s<n>/A0<n>T.mat  s<n>/A0<n>E.mat
//!   │                │
//!   ├─ mat::MatFile::open()        native MAT v5 reader (zlib via flate2)
//!   ├─ session::load_session()     runs → signal, onsets, classes, artifact flags
//!   ├─ extract::extract_trials()   22 ch × [onset+375, onset+1500) per trial, labels − 1
//!   ├─ dataset::shuffle_trials()   seeded permutation, per set
//!   ├─ dataset::one_hot()          [N] → [N, 4]
//!   ├─ normalize::standardize()    per-channel (x − μ) / σ, fitted on training only
//!   └─ group axis                  [N, 22, 1125] → [N, 1, 22, 1125]
//!        │
//!        └─→ data_all_<n>.pkl  (x_train, x_test, y_train_onehot, y_test_onehot)
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use bci2a_prep::{prepare_subject, DatasetConfig};
//! use bci2a_prep::io::{artifact_path, save_subject, OutputFormat};
//! use std::path::Path;
//!
//! let cfg = DatasetConfig {
//!     data_path: "datasets/BCI2a".into(),
//!     ..DatasetConfig::default()
//! };
//! let data = prepare_subject(&cfg, 1).unwrap();
//! println!("train {:?}, test {:?}", data.x_train.shape(), data.x_test.shape());
//!
//! let out = artifact_path(Path::new("data"), 1, OutputFormat::Pickle);
//! save_subject(&data, &out, OutputFormat::Pickle).unwrap();
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use bci2a_prep::{extract, standardize, SessionKind, TrialWindow, ZeroVariance};
//! use std::path::Path;
//!
//! let w = TrialWindow::default();
//! let base = Path::new("datasets/BCI2a");
//! let train = extract(base, 1, SessionKind::Training, true, &w).unwrap();
//! let test = extract(base, 1, SessionKind::Evaluation, true, &w).unwrap();
//!
//! let (x_train, x_test) =
//!     standardize(train.windows, test.windows, w.n_channels, ZeroVariance::Unit).unwrap();
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod io;
pub mod mat;
pub mod normalize;
pub mod session;

use std::path::{Path, PathBuf};

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{DatasetConfig, TrialWindow};

// dataset
pub use dataset::{assemble, one_hot, permutation, prepare_subject, shuffle_trials, SubjectData};

// error
pub use error::PrepError;

// extract
pub use extract::{extract, extract_trials, TrialSet};

// io
pub use io::{artifact_path, save_subject, OutputFormat, PickleWriter, StWriter};

// mat
pub use mat::{MatArray, MatFile};

// normalize
pub use normalize::{
    apply_channel_stats, fit_channel_stats, is_constant, standardize, standardize_inplace,
    ChannelStats, ZeroVariance,
};

// session
pub use session::{load_session, session_path, Run, Session, SessionKind};

/// Prepare one subject and write its artifact into `out_dir`.
///
/// Nothing is written unless every step succeeds. Returns the artifact path.
///
/// # Errors
///
/// Any [`PrepError`] from extraction or standardization, or an I/O error
/// while writing.
pub fn process_subject(
    cfg: &DatasetConfig,
    subject: u32,
    out_dir: &Path,
    format: OutputFormat,
) -> anyhow::Result<PathBuf> {
    let data = prepare_subject(cfg, subject)?;
    let path = artifact_path(out_dir, subject, format);
    save_subject(&data, &path, format)?;
    Ok(path)
}
