//! Extraction and dataset configuration.
//!
//! [`TrialWindow`] describes how a trial is cut out of a run, and
//! [`DatasetConfig`] holds everything the per-subject assembler needs. The
//! defaults reproduce the BCI Competition IV-2a settings used to build the
//! published training tensors.
use std::ops::Range;
use std::path::PathBuf;

use crate::normalize::ZeroVariance;

/// Geometry of one motor-imagery trial window.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use bci2a_prep::TrialWindow;
///
/// let w = TrialWindow {
///     crop_start_secs: 2.0,   // start at the cue
///     ..TrialWindow::default()
/// };
/// assert_eq!(w.crop_range(), 500..1500);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TrialWindow {
    /// Number of leading EEG channels kept from each run's signal matrix.
    /// The remaining columns (EOG) are dropped.
    ///
    /// Default: `22`.
    pub n_channels: usize,

    /// Sampling rate in Hz, used to turn the durations below into samples.
    ///
    /// Default: `250.0`.
    pub sfreq: f32,

    /// Length of the raw window cut from each trial onset, in seconds.
    /// A trial whose window runs past the end of the run is a format error.
    ///
    /// Default: `7.0` s (1 750 samples).
    pub window_secs: f32,

    /// Start of the analysis crop, seconds after onset (inclusive).
    ///
    /// Default: `1.5` s.
    pub crop_start_secs: f32,

    /// End of the analysis crop, seconds after onset (exclusive).
    ///
    /// Default: `6.0` s.
    pub crop_end_secs: f32,

    /// Upper bound on retained trials per session (6 runs × 48 trials).
    ///
    /// Default: `288`.
    pub max_trials: usize,
}

impl Default for TrialWindow {
    fn default() -> Self {
        Self {
            n_channels: 22,
            sfreq: 250.0,
            window_secs: 7.0,
            crop_start_secs: 1.5,
            crop_end_secs: 6.0,
            max_trials: 6 * 48,
        }
    }
}

impl TrialWindow {
    /// Raw window length in samples, `floor(window_secs × sfreq)`.
    ///
    /// ```
    /// use bci2a_prep::TrialWindow;
    /// assert_eq!(TrialWindow::default().window_samples(), 1750);
    /// ```
    pub fn window_samples(&self) -> usize {
        (self.window_secs * self.sfreq) as usize
    }

    /// Sample offsets kept after cropping, relative to the onset.
    pub fn crop_range(&self) -> Range<usize> {
        let start = (self.crop_start_secs * self.sfreq) as usize;
        let end = (self.crop_end_secs * self.sfreq) as usize;
        start..end
    }

    /// Samples per cropped trial (1 125 at the defaults).
    pub fn crop_samples(&self) -> usize {
        self.crop_range().len()
    }

    /// `Err` with a reason when the crop does not fit inside the window.
    pub fn validate(&self) -> Result<(), String> {
        let crop = self.crop_range();
        if self.n_channels == 0 {
            return Err("n_channels must be positive".into());
        }
        if crop.is_empty() {
            return Err(format!("empty crop range {crop:?}"));
        }
        if crop.end > self.window_samples() {
            return Err(format!(
                "crop end {} exceeds window of {} samples",
                crop.end,
                self.window_samples()
            ));
        }
        Ok(())
    }
}

/// Per-subject assembly settings.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Dataset root; subject `n` is read from `<data_path>/s<n>/A0<n>{T,E}.mat`.
    pub data_path: PathBuf,

    /// Width of the one-hot label vectors.
    ///
    /// Default: `4` (left hand, right hand, feet, tongue).
    pub n_classes: usize,

    /// Fit per-channel standardization on the training set and apply it to
    /// both sets.
    ///
    /// Default: `true`.
    pub standardize: bool,

    /// Shuffle each set's trial order with [`seed`](Self::seed).
    ///
    /// Default: `true`.
    pub shuffle: bool,

    /// Seed for the trial permutation. Both sets are shuffled with a fresh
    /// generator seeded with this value.
    ///
    /// Default: `42`.
    pub seed: u64,

    /// Keep trials flagged as artifacts. `false` drops them entirely.
    ///
    /// Default: `true`.
    pub keep_artifacts: bool,

    /// What to do with a zero-variance training channel.
    ///
    /// Default: [`ZeroVariance::Unit`].
    pub zero_variance: ZeroVariance,

    pub window: TrialWindow,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/BCI2a"),
            n_classes: 4,
            standardize: true,
            shuffle: true,
            seed: 42,
            keep_artifacts: true,
            zero_variance: ZeroVariance::Unit,
            window: TrialWindow::default(),
        }
    }
}
