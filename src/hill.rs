//src/hill.rs

use crate::error::{HgtError, Result};
use crate::types::DensityCurve;

/// Locate the first hill of a density curve: the x of the first local
/// maximum (peak) and of the first local minimum (valley).
///
/// Fails with `NoBimodality` when either is missing, and with `InvertedHill`
/// when the valley comes before the peak or is denser than it.
pub fn first_hill(x: &[f64], y: &[f64]) -> Result<(f64, f64)> {
    let n = x.len().min(y.len());
    let mut peak = None;
    let mut valley = None;
    for i in 1..n.saturating_sub(1) {
        if peak.is_none() && y[i - 1] < y[i] && y[i] > y[i + 1] {
            peak = Some(i);
        }
        if valley.is_none() && y[i - 1] > y[i] && y[i] < y[i + 1] {
            valley = Some(i);
        }
        if peak.is_some() && valley.is_some() {
            break;
        }
    }

    let (Some(p), Some(v)) = (peak, valley) else {
        return Err(HgtError::NoBimodality);
    };
    if x[p] > x[v] || y[v] > y[p] {
        return Err(HgtError::InvertedHill);
    }
    Ok((x[p], x[v]))
}

pub fn first_hill_curve(curve: &DensityCurve) -> Result<(f64, f64)> {
    first_hill(&curve.x, &curve.y)
}

/// Cut-off between the first hill and the rest: `noise` percent of the
/// peak-valley span to the left of the valley.
pub fn hill_threshold(peak: f64, valley: f64, noise: f64) -> f64 {
    valley - (valley - peak) * noise / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{bimodal, normal};
    use crate::kde::{density_func, GaussianKde};
    use assert_matches::assert_matches;

    #[test]
    fn test_first_hill_bimodal() {
        let data = bimodal();
        let kde = GaussianKde::fit(&data, 0.5);
        let curve = density_func(&data, &kde, 100);
        let (peak, valley) = first_hill_curve(&curve).unwrap();
        // peak on the small mode, valley between the modes
        assert!(peak > 0.5 && peak < 1.5, "peak {peak}");
        assert!(valley > 1.5 && valley < 3.5, "valley {valley}");
        assert!(curve.x.contains(&peak) && curve.x.contains(&valley));
        let th = hill_threshold(peak, valley, 50.0);
        assert!((th - (peak + valley) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_first_hill_unimodal() {
        let data = normal(5.0, 2.0, 600, 1);
        let kde = GaussianKde::fit(&data, 2.0);
        let curve = density_func(&data, &kde, 100);
        let err = first_hill_curve(&curve).unwrap_err();
        assert_eq!(err.to_string(), "Cannot identify at least two peaks.");
        assert!(err.is_shape());

        // monotonic
        let x = [0.0, 1.0, 2.0, 3.0];
        assert_matches!(first_hill(&x, &[4.0, 3.0, 2.0, 1.0]), Err(HgtError::NoBimodality));
    }

    #[test]
    fn test_first_hill_inverted() {
        // the curve dips before it reaches its first peak
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [0.3, 0.1, 0.2, 0.5, 0.4, 0.3];
        let err = first_hill(&x, &y).unwrap_err();
        assert_eq!(err.to_string(), "Peak is larger than valley.");
    }

    #[test]
    fn test_hill_threshold() {
        assert_eq!(hill_threshold(1.0, 3.0, 50.0), 2.0);
        assert_eq!(hill_threshold(1.0, 3.0, 0.0), 3.0);
        assert_eq!(hill_threshold(1.0, 3.0, 100.0), 1.0);
    }
}
