//src/kde.rs

use std::f64::consts::PI;

use crate::config::{AnalyzeConfig, BandwidthMethod};
use crate::error::{HgtError, Result};
use crate::stats::{self, logsumexp};
use crate::types::DensityCurve;

/// One-dimensional Gaussian kernel density estimator.
#[derive(Debug, Clone)]
pub struct GaussianKde {
    data: Vec<f64>,
    bandwidth: f64,
}

impl GaussianKde {
    pub fn fit(data: &[f64], bandwidth: f64) -> Self {
        Self {
            data: data.to_vec(),
            bandwidth,
        }
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Log density at `x`.
    pub fn score_sample(&self, x: f64) -> f64 {
        let h = self.bandwidth;
        let log_norm = -((self.data.len() as f64) * h * (2.0 * PI).sqrt()).ln();
        let two_h2 = 2.0 * h * h;
        log_norm + logsumexp(self.data.iter().map(|t| -(x - t) * (x - t) / two_h2))
    }

    /// Total log-likelihood of `xs`.
    pub fn score(&self, xs: &[f64]) -> f64 {
        xs.iter().map(|&x| self.score_sample(x)).sum()
    }

    pub fn density(&self, x: f64) -> f64 {
        self.score_sample(x).exp()
    }
}

/// Silverman's rule of thumb: `0.9 * min(std, IQR / 1.34) * n^(-1/5)`.
///
/// A zero spread (constant data) falls back to a unit spread so the
/// bandwidth stays positive.
pub fn silverman_bw(data: &[f64]) -> Result<f64> {
    let n = data.len();
    if n < 2 {
        return Err(HgtError::InsufficientData {
            action: "calculate bandwidth",
            n,
        });
    }
    let sd = stats::std_dev(data, 1);
    let iqr = stats::iqr(data);
    let mut spread = if iqr > 0.0 { sd.min(iqr / 1.34) } else { sd };
    if spread <= 0.0 {
        spread = 1.0;
    }
    Ok(0.9 * spread * (n as f64).powf(-0.2))
}

/// Candidate bandwidths for the cross-validated search.
///
/// `low` and `high` are fractions of the data range, so the grid follows
/// the scale of the scores: weighted ring sums near zero and hit counts in
/// the hundreds get the same resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandwidthGrid {
    pub low: f64,
    pub high: f64,
    pub steps: usize,
}

impl BandwidthGrid {
    pub fn from_config(config: &AnalyzeConfig) -> Self {
        Self {
            low: config.grid_low,
            high: config.grid_high,
            steps: config.bw_steps,
        }
    }

    /// Log-spaced bandwidths from `low * range` to `high * range`.
    pub fn candidates(&self, range: f64) -> Vec<f64> {
        stats::logspace(self.low * range, self.high * range, self.steps)
    }
}

/// Pick the grid bandwidth with the best mean held-out log-likelihood over
/// `steps` contiguous folds. Constant data gets the low bound as is.
pub fn grid_kde(data: &[f64], grid: &BandwidthGrid) -> Result<GaussianKde> {
    let n = data.len();
    if n < grid.steps || n < 2 {
        return Err(HgtError::InsufficientData {
            action: "perform grid search",
            n,
        });
    }

    let (min, max) = min_max(data);
    if min == max {
        return Ok(GaussianKde::fit(data, grid.low));
    }

    let candidates = grid.candidates(max - min);
    let folds = fold_bounds(n, grid.steps);
    let mut best: Option<(f64, f64)> = None;
    for &bw in &candidates {
        let mut total = 0.0;
        for &(start, end) in &folds {
            let mut train = Vec::with_capacity(n - (end - start));
            train.extend_from_slice(&data[..start]);
            train.extend_from_slice(&data[end..]);
            total += GaussianKde::fit(&train, bw).score(&data[start..end]);
        }
        let mean_score = total / folds.len() as f64;
        log::trace!("grid bandwidth {bw:.5}: mean log-likelihood {mean_score:.5}");
        if best.map_or(true, |(_, s)| mean_score > s) {
            best = Some((bw, mean_score));
        }
    }
    let bw = best.map_or(grid.low * (max - min), |(bw, _)| bw);
    Ok(GaussianKde::fit(data, bw))
}

/// `[start, end)` of `k` contiguous folds, the first `n % k` one element larger.
fn fold_bounds(n: usize, k: usize) -> Vec<(usize, usize)> {
    let mut bounds = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let size = n / k + usize::from(i < n % k);
        bounds.push((start, start + size));
        start += size;
    }
    bounds
}

pub(crate) fn min_max(data: &[f64]) -> (f64, f64) {
    data.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

/// Evaluate `kde` on `n_points` evenly spaced points spanning the data.
pub fn density_func(data: &[f64], kde: &GaussianKde, n_points: usize) -> DensityCurve {
    let (min, max) = min_max(data);
    let x = stats::linspace(min, max, n_points);
    let y = x.iter().map(|&xi| kde.density(xi)).collect();
    DensityCurve { x, y }
}

/// Fit a density estimator with the configured bandwidth method.
/// `Auto` behaves like `Grid` here; its refinement lives in `predict::smart_kde`.
pub fn perform_kde(data: &[f64], config: &AnalyzeConfig) -> Result<(GaussianKde, f64)> {
    let kde = match config.bandwidth {
        BandwidthMethod::Auto | BandwidthMethod::Grid => {
            grid_kde(data, &BandwidthGrid::from_config(config))?
        }
        BandwidthMethod::Silverman => GaussianKde::fit(data, silverman_bw(data)?),
        BandwidthMethod::Fixed(bw) => GaussianKde::fit(data, bw),
    };
    let bw = kde.bandwidth();
    log::debug!("Fitted {:?} density on {} values, bandwidth {:.5}", config.bandwidth, data.len(), bw);
    Ok((kde, bw))
}
