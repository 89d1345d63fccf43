//! Error taxonomy for the extraction and normalisation stages.
//!
//! None of these are recovered locally: they abort processing of the
//! current subject and surface to the batch driver.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrepError {
    /// The session recording does not exist.
    #[error("recording not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// The recording exists but does not have the expected run/trial layout.
    #[error("malformed recording {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    /// A channel has zero training variance and the policy forbids the
    /// unit-std fallback.
    #[error("channel {channel} has zero variance in the training set")]
    DegenerateInput { channel: usize },

    #[error("cannot fit standardization on an empty training set")]
    EmptyTrainingSet,

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("label {label} out of range for {n_classes} classes")]
    LabelOutOfRange { label: usize, n_classes: usize },
}

impl PrepError {
    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PrepError::Format { path: path.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;
