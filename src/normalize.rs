//! Per-channel standardization fitted on the training set.
//!
//! For every channel `j`:
//!   μⱼ = mean(train[:, j, :]),  σⱼ = std(train[:, j, :])  (ddof = 0)
//!   train[:, j, :] = (train[:, j, :] − μⱼ) / σⱼ
//!   test[:, j, :]  = (test[:, j, :]  − μⱼ) / σⱼ
//!
//! The statistics pool all trials and all time points of a channel and are
//! never influenced by the test set. Channels are independent.
use std::fmt;
use std::str::FromStr;

use ndarray::{Array3, Axis};

use crate::error::{PrepError, Result};

/// `true` when `var` is within the rounding error that summing `n` copies
/// of `mean` can leave behind, i.e. the channel is constant.
///
/// The bound grows with the sample count and the magnitude of the mean, so a
/// constant such as `0.1` over a full session is caught even though its
/// computed variance is not exactly zero.
pub fn is_constant(var: f64, mean: f64, n: f64) -> bool {
    let eps = f64::EPSILON;
    var <= n * eps * var + (n * mean * eps).powi(2)
}

/// Handling of a channel whose training values are constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroVariance {
    /// Centre only: σ is replaced by 1.
    #[default]
    Unit,
    /// Fail with [`PrepError::DegenerateInput`].
    Error,
}

impl FromStr for ZeroVariance {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unit" => Ok(ZeroVariance::Unit),
            "error" => Ok(ZeroVariance::Error),
            other => Err(format!("unknown zero-variance policy {other:?} (unit|error)")),
        }
    }
}

impl fmt::Display for ZeroVariance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ZeroVariance::Unit => "unit",
            ZeroVariance::Error => "error",
        })
    }
}

/// Fitted affine parameters of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: f64,
    /// Divisor actually applied (1.0 for a zero-variance channel under
    /// [`ZeroVariance::Unit`]).
    pub std: f64,
}

/// Fit `(mean, std)` per channel of `train` (`[trials, channels, samples]`).
pub fn fit_channel_stats(train: &Array3<f64>, policy: ZeroVariance) -> Result<Vec<ChannelStats>> {
    let (n_tr, n_ch, n_t) = train.dim();
    if n_tr == 0 || n_t == 0 {
        return Err(PrepError::EmptyTrainingSet);
    }
    let n = (n_tr * n_t) as f64;

    let mut stats = Vec::with_capacity(n_ch);
    for j in 0..n_ch {
        let ch = train.index_axis(Axis(1), j);
        let mean = ch.iter().sum::<f64>() / n;
        let var = ch.iter().map(|&v| {
            let d = v - mean; d * d
        }).sum::<f64>() / n;
        let mut std = var.sqrt();

        if is_constant(var, mean, n) {
            match policy {
                ZeroVariance::Unit => {
                    log::warn!("channel {j}: zero training variance, centring only");
                    std = 1.0;
                }
                ZeroVariance::Error => return Err(PrepError::DegenerateInput { channel: j }),
            }
        }
        log::debug!("channel {j}: mean={mean:.4} std={std:.4}");
        stats.push(ChannelStats { mean, std });
    }
    Ok(stats)
}

/// Apply fitted parameters in place. `data` may have any trial and sample
/// count but must have one channel per entry of `stats`.
pub fn apply_channel_stats(data: &mut Array3<f64>, stats: &[ChannelStats]) -> Result<()> {
    let n_ch = data.len_of(Axis(1));
    if n_ch != stats.len() {
        return Err(PrepError::Shape(format!(
            "{n_ch} channels but {} fitted parameter sets",
            stats.len()
        )));
    }
    for (j, st) in stats.iter().enumerate() {
        let (mean, std) = (st.mean, st.std);
        data.index_axis_mut(Axis(1), j).mapv_inplace(|v| (v - mean) / std);
    }
    Ok(())
}

/// Fit on `train`, then standardize `train` and `test` in place.
/// Returns the fitted parameters.
pub fn standardize_inplace(
    train: &mut Array3<f64>,
    test: &mut Array3<f64>,
    policy: ZeroVariance,
) -> Result<Vec<ChannelStats>> {
    let (tr_ch, te_ch) = (train.len_of(Axis(1)), test.len_of(Axis(1)));
    if tr_ch != te_ch {
        return Err(PrepError::Shape(format!(
            "train has {tr_ch} channels, test has {te_ch}"
        )));
    }
    let stats = fit_channel_stats(train, policy)?;
    apply_channel_stats(train, &stats)?;
    apply_channel_stats(test, &stats)?;
    Ok(stats)
}

/// Owned-value form: checks both sets have `channel_count` channels and
/// returns the standardized arrays.
pub fn standardize(
    mut train: Array3<f64>,
    mut test: Array3<f64>,
    channel_count: usize,
    policy: ZeroVariance,
) -> Result<(Array3<f64>, Array3<f64>)> {
    if train.len_of(Axis(1)) != channel_count {
        return Err(PrepError::Shape(format!(
            "train has {} channels, expected {channel_count}",
            train.len_of(Axis(1))
        )));
    }
    standardize_inplace(&mut train, &mut test, policy)?;
    Ok((train, test))
}
