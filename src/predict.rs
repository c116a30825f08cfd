//src/predict.rs

use crate::config::{AnalyzeConfig, BandwidthMethod};
use crate::error::{HgtError, Result};
use crate::hill::{first_hill_curve, hill_threshold};
use crate::kde::{density_func, grid_kde, perform_kde, silverman_bw, BandwidthGrid, GaussianKde};
use crate::render::{render_or_warn, Renderer};
use crate::types::{relevant_rings, ring_column, DensityCurve, KdeOutcome, Ring, ScoreRow};

/// Every `ceil(n / m)`-th value, so at most `m` values spread over the input.
fn subsample(data: &[f64], m: usize) -> Vec<f64> {
    if data.len() <= m || m == 0 {
        return data.to_vec();
    }
    let step = data.len().div_ceil(m);
    data.iter().step_by(step).copied().collect()
}

/// Fit `data` with `bandwidth` and cut its first hill.
fn fit_hill(data: &[f64], bandwidth: f64, config: &AnalyzeConfig) -> Result<(DensityCurve, KdeOutcome)> {
    let kde = GaussianKde::fit(data, bandwidth);
    let curve = density_func(data, &kde, config.density_points);
    let (peak, valley) = first_hill_curve(&curve)?;
    let outcome = KdeOutcome {
        bandwidth,
        peak,
        valley,
        threshold: hill_threshold(peak, valley, config.noise),
    };
    Ok((curve, outcome))
}

/// Bandwidth adapted to the first hill of the data.
///
/// A grid search on a subsample gives a sharp estimate. If that curve shows a
/// first hill holding at most `low_part` percent of the values, the result is
/// a geometric blend of the grid and Silverman bandwidths, moving towards the
/// smoother one as the hill grows. Otherwise Silverman's rule is used.
pub fn smart_kde(data: &[f64], config: &AnalyzeConfig) -> Result<f64> {
    let sample = subsample(data, config.smart_subsample);
    let grid_bw = grid_kde(&sample, &BandwidthGrid::from_config(config))?.bandwidth();
    let silverman = silverman_bw(data)?;

    let th = match fit_hill(data, grid_bw, config) {
        Ok((_, outcome)) => outcome.threshold,
        Err(e) if e.is_shape() => {
            log::debug!("Smart KDE falls back to Silverman's rule: {e}");
            return Ok(silverman);
        }
        Err(e) => return Err(e),
    };

    let low = data.iter().filter(|&&v| v < th).count() as f64 * 100.0 / data.len() as f64;
    if low > config.low_part {
        log::debug!("Smart KDE: low partition holds {low:.2}% of values, using Silverman's rule");
        return Ok(silverman);
    }

    let w = low / config.low_part;
    let (sharp, smooth) = (grid_bw.min(silverman), grid_bw.max(silverman));
    let bw = ((1.0 - w) * sharp.ln() + w * smooth.ln()).exp();
    log::debug!("Smart KDE: grid {grid_bw:.5}, Silverman {silverman:.5}, low {low:.2}% -> {bw:.5}");
    Ok(bw)
}

/// Density threshold of one ring, in score units.
///
/// Distal values are negated before fitting so the HGT side is always the
/// first hill; the outcome is mapped back afterwards.
pub fn cluster_kde(
    rows: &[ScoreRow],
    ring: Ring,
    config: &AnalyzeConfig,
    renderer: &dyn Renderer,
) -> Result<KdeOutcome> {
    let flip = ring.hgt_is_high();
    let mut data = ring_column(rows, ring);
    if flip {
        data.iter_mut().for_each(|v| *v = -*v);
    }
    if data.len() < 2 {
        return Err(HgtError::InsufficientData {
            action: "estimate density",
            n: data.len(),
        });
    }

    let bandwidth = match config.bandwidth {
        BandwidthMethod::Auto => smart_kde(&data, config)?,
        _ => perform_kde(&data, config)?.1,
    };
    let (mut curve, mut outcome) = fit_hill(&data, bandwidth, config)?;

    if flip {
        curve.x.iter_mut().for_each(|x| *x = -*x);
        outcome.peak = -outcome.peak;
        outcome.valley = -outcome.valley;
        outcome.threshold = -outcome.threshold;
    }
    log::info!(
        "{ring}: bandwidth {:.5}, peak {:.5}, valley {:.5}, threshold {:.5}",
        outcome.bandwidth,
        outcome.peak,
        outcome.valley,
        outcome.threshold
    );
    render_or_warn(renderer.plot_density(ring.name(), &curve, &outcome), "density curve");
    Ok(outcome)
}

/// Label genes as HGT: below the threshold of every low-side ring and above
/// the distal threshold. Returns the outcome of each relevant ring.
pub fn predict_hgt(
    rows: &mut [ScoreRow],
    config: &AnalyzeConfig,
    renderer: &dyn Renderer,
) -> Result<Vec<(Ring, KdeOutcome)>> {
    let rings = relevant_rings(config.self_low);
    let mut outcomes = Vec::with_capacity(rings.len());
    for &ring in rings {
        outcomes.push((ring, cluster_kde(rows, ring, config, renderer)?));
    }

    for row in rows.iter_mut() {
        row.hgt = outcomes.iter().all(|(ring, outcome)| {
            let v = row.score(*ring);
            if ring.hgt_is_high() {
                v > outcome.threshold
            } else {
                v < outcome.threshold
            }
        });
    }
    let n = rows.iter().filter(|r| r.hgt).count();
    log::info!("Predicted {n} HGT genes out of {}", rows.len());
    Ok(outcomes)
}
