//! Session recordings: one `.mat` file per (subject, session).
//!
//! Each file holds a `data` cell array with one struct per run. Fields are
//! addressed by position, as the release lays them out:
//!
//! ```text
//! 0  X          [samples, channels]  continuous signal (22 EEG + 3 EOG)
//! 1  trial      [n_trials]           onset sample index of each trial
//! 2  y          [n_trials]           class code, 1-based
//! 3  fs         scalar               sampling rate (optional here)
//! 5  artifacts  [n_trials]           non-zero = trial marked as corrupted
//! ```
//!
//! The first runs of every session are EOG calibration runs without trials;
//! they load as runs with empty trial lists.
use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::error::{PrepError, Result};
use crate::mat::{MatArray, MatFile, NumericArray, StructArray};

const FIELD_SIGNAL: usize = 0;
const FIELD_ONSETS: usize = 1;
const FIELD_CLASSES: usize = 2;
const FIELD_FS: usize = 3;
const FIELD_ARTIFACTS: usize = 5;

/// Which of a subject's two recording sessions to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    /// Session 1, file suffix `T`.
    Training,
    /// Session 2, file suffix `E`.
    Evaluation,
}

impl SessionKind {
    pub fn suffix(self) -> char {
        match self {
            SessionKind::Training => 'T',
            SessionKind::Evaluation => 'E',
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Training => f.write_str("training"),
            SessionKind::Evaluation => f.write_str("evaluation"),
        }
    }
}

/// `<base>/s<subject>/A0<subject><T|E>.mat`
pub fn session_path(base: &Path, subject: u32, kind: SessionKind) -> PathBuf {
    base.join(format!("s{subject}"))
        .join(format!("A0{subject}{}.mat", kind.suffix()))
}

/// One run of a session.
#[derive(Debug, Clone)]
pub struct Run {
    /// `[channels, samples]`.
    pub signal: Array2<f64>,
    /// Trial onsets as sample indices into `signal`, used as stored.
    pub onsets: Vec<usize>,
    /// Raw class codes, 1-based.
    pub classes: Vec<i64>,
    /// `true` when the trial is flagged as an artifact.
    pub artifacts: Vec<bool>,
    /// Sampling rate recorded with the run, if any.
    pub fs: Option<f64>,
}

impl Run {
    pub fn n_trials(&self) -> usize {
        self.onsets.len()
    }

    pub fn n_channels(&self) -> usize {
        self.signal.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.signal.ncols()
    }
}

/// All runs of one session file.
#[derive(Debug, Clone)]
pub struct Session {
    /// Source file, kept for error messages.
    pub path: PathBuf,
    pub runs: Vec<Run>,
}

impl Session {
    pub fn n_trials(&self) -> usize {
        self.runs.iter().map(Run::n_trials).sum()
    }
}

/// Load and validate a session file.
///
/// Fails with [`PrepError::MissingFile`] if `path` does not exist and
/// [`PrepError::Format`] if it is not a MAT v5 file with the run layout
/// described in the module docs.
pub fn load_session(path: &Path) -> Result<Session> {
    if !path.is_file() {
        return Err(PrepError::MissingFile(path.to_path_buf()));
    }
    let mat = MatFile::open(path).map_err(|e| PrepError::format(path, format!("{e:#}")))?;
    let session = session_from_mat(&mat, path)?;
    log::debug!(
        "{}: {} runs, {} trials",
        path.display(),
        session.runs.len(),
        session.n_trials()
    );
    Ok(session)
}

/// Interpret an already decoded MAT file as a session.
pub fn session_from_mat(mat: &MatFile, path: &Path) -> Result<Session> {
    let bad = |reason: String| PrepError::format(path, reason);

    let data = mat
        .get("data")
        .ok_or_else(|| bad("no `data` variable".into()))?;

    // `data` is normally a cell of 1×1 structs; a plain struct array is accepted too.
    let mut runs = Vec::new();
    match data {
        MatArray::Cell(cell) => {
            for (i, c) in cell.cells.iter().enumerate() {
                let s = c
                    .as_struct()
                    .ok_or_else(|| bad(format!("run {i}: expected struct, found {}", c.kind())))?;
                if s.len() != 1 {
                    return Err(bad(format!("run {i}: expected a 1x1 struct, found {} elements", s.len())));
                }
                runs.push(parse_run(s, 0).map_err(|r| bad(format!("run {i}: {r}")))?);
            }
        }
        MatArray::Struct(s) => {
            for i in 0..s.len() {
                runs.push(parse_run(s, i).map_err(|r| bad(format!("run {i}: {r}")))?);
            }
        }
        other => return Err(bad(format!("`data` is a {} array, expected cell", other.kind()))),
    }

    Ok(Session { path: path.to_path_buf(), runs })
}

fn parse_run(s: &StructArray, elem: usize) -> std::result::Result<Run, String> {
    if s.field_names.len() <= FIELD_ARTIFACTS {
        return Err(format!(
            "run record has {} fields, need at least {}",
            s.field_names.len(),
            FIELD_ARTIFACTS + 1
        ));
    }
    let numeric = |idx: usize| -> std::result::Result<&NumericArray, String> {
        let name = &s.field_names[idx];
        s.field_at(elem, idx)
            .and_then(MatArray::as_numeric)
            .ok_or_else(|| format!("field {idx} ({name}) is not numeric"))
    };

    // Stored as [samples, channels]; an empty X (0×0) gives an empty signal.
    let x = numeric(FIELD_SIGNAL)?;
    let signal = if x.is_empty() {
        Array2::zeros((0, 0))
    } else {
        x.to_array2().map_err(|e| format!("signal: {e:#}"))?.reversed_axes()
    };

    let onsets = numeric(FIELD_ONSETS)?
        .as_slice()
        .iter()
        .map(|&v| {
            // `as` saturates, so anything at or past 2^64 would alias usize::MAX.
            if v >= 0.0 && v < usize::MAX as f64 && v.fract() == 0.0 {
                Ok(v as usize)
            } else {
                Err(format!("onset {v} is not a sample index"))
            }
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let classes = numeric(FIELD_CLASSES)?
        .as_slice()
        .iter()
        .map(|&v| {
            if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                Ok(v as i64)
            } else {
                Err(format!("class code {v} is not an integer"))
            }
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let artifacts: Vec<bool> = numeric(FIELD_ARTIFACTS)?
        .as_slice()
        .iter()
        .map(|&v| v != 0.0)
        .collect();

    let n = onsets.len();
    if classes.len() != n || artifacts.len() != n {
        return Err(format!(
            "{n} onsets but {} class codes and {} artifact flags",
            classes.len(),
            artifacts.len()
        ));
    }

    let fs = s
        .field_at(elem, FIELD_FS)
        .and_then(MatArray::as_numeric)
        .and_then(NumericArray::scalar);

    Ok(Run { signal, onsets, classes, artifacts, fs })
}
