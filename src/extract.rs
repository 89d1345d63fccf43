//! Trial extraction.
//!
//! Cuts one fixed window per trial out of each run, starting at the trial
//! onset, keeps the leading EEG channels, then crops every window to the
//! motor-imagery analysis segment:
//!
//! ```text
//! onset                                                     onset + 1750
//!   │◄──────────────── raw window (7 s) ─────────────────────────►│
//!   │        │◄────────── kept: [375, 1500) ───────────►│         │
//!   0 s     1.5 s                                      6 s        7 s
//! ```
//!
//! Labels are shifted from the file's 1-based codes to 0-based classes.
use std::path::Path;

use ndarray::{s, stack, Array3, ArrayView2, Axis};

use crate::config::TrialWindow;
use crate::error::{PrepError, Result};
use crate::session::{load_session, session_path, Session, SessionKind};

/// Extracted trials of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSet {
    /// `[trials, channels, samples]`.
    pub windows: Array3<f64>,
    /// 0-based class per trial, parallel to `windows`.
    pub labels: Vec<usize>,
}

impl TrialSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Trial `i` as a `[channels, samples]` view.
    pub fn window(&self, i: usize) -> ArrayView2<'_, f64> {
        self.windows.index_axis(Axis(0), i)
    }
}

/// Read `<base>/s<subject>/A0<subject><T|E>.mat` and extract its trials.
pub fn extract(
    base: &Path,
    subject: u32,
    kind: SessionKind,
    keep_artifacts: bool,
    window: &TrialWindow,
) -> Result<TrialSet> {
    let path = session_path(base, subject, kind);
    let session = load_session(&path)?;
    let set = extract_trials(&session, window, keep_artifacts)?;
    log::info!(
        "subject {subject} {kind}: {} of {} trials kept from {}",
        set.len(),
        session.n_trials(),
        path.display()
    );
    Ok(set)
}

/// Extract trial windows from an in-memory session.
///
/// With `keep_artifacts == false` flagged trials are dropped entirely; no
/// placeholder is emitted. Trials keep run order, then in-run order.
pub fn extract_trials(
    session: &Session,
    window: &TrialWindow,
    keep_artifacts: bool,
) -> Result<TrialSet> {
    let bad = |reason: String| PrepError::format(&session.path, reason);

    window.validate().map_err(|r| PrepError::Shape(format!("trial window: {r}")))?;
    let n_ch = window.n_channels;
    let len = window.window_samples();
    let crop = window.crop_range();

    let mut cuts: Vec<ArrayView2<f64>> = Vec::new();
    let mut codes: Vec<i64> = Vec::new();

    for (r, run) in session.runs.iter().enumerate() {
        if run.n_trials() == 0 {
            log::debug!("run {r}: no trials");
            continue;
        }
        if run.n_channels() < n_ch {
            return Err(bad(format!(
                "run {r}: signal has {} channels, need {n_ch}",
                run.n_channels()
            )));
        }
        if let Some(fs) = run.fs {
            if (fs - window.sfreq as f64).abs() > 1e-6 {
                log::warn!(
                    "run {r}: recorded at {fs} Hz but windows assume {} Hz",
                    window.sfreq
                );
            }
        }

        for t in 0..run.n_trials() {
            if run.artifacts[t] && !keep_artifacts {
                continue;
            }
            let onset = run.onsets[t];
            match onset.checked_add(len) {
                Some(end) if end <= run.n_samples() => {}
                _ => {
                    return Err(bad(format!(
                        "run {r} trial {t}: window of {len} samples from {onset} exceeds {} samples",
                        run.n_samples()
                    )))
                }
            }
            if cuts.len() == window.max_trials {
                return Err(bad(format!("more than {} valid trials", window.max_trials)));
            }
            // Only the cropped part of the raw window is ever read.
            cuts.push(run.signal.slice(s![
                ..n_ch,
                onset + crop.start..onset + crop.end
            ]));
            codes.push(run.classes[t]);
        }
    }

    let windows = if cuts.is_empty() {
        Array3::zeros((0, n_ch, crop.len()))
    } else {
        stack(Axis(0), &cuts).map_err(|e| PrepError::Shape(e.to_string()))?
    };

    let labels = codes
        .into_iter()
        .map(|c| {
            c.checked_sub(1)
                .and_then(|l| usize::try_from(l).ok())
                .ok_or_else(|| bad(format!("class code {c} is not 1-based")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TrialSet { windows, labels })
}
