//src/refine.rs

use rayon::prelude::*;

use crate::error::{HgtError, Result};
use crate::stats::{self, euclidean};
use crate::types::{Ring, ScoreRow};

/// Per-ring centroids of the HGT and non-HGT clusters.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterProps {
    pub hgt_centroid: Vec<f64>,
    pub other_centroid: Vec<f64>,
}

/// Silhouette of every point for a two-cluster labeling.
///
/// `(b - a) / max(a, b)` with `a` the mean distance to the rest of the point's
/// own cluster and `b` the mean distance to the other cluster. Points alone in
/// their cluster, or with no other cluster, score 0.
pub fn silhouette(points: &[Vec<f64>], labels: &[bool]) -> Vec<f64> {
    let n_true = labels.iter().filter(|&&l| l).count();
    let n_false = labels.len() - n_true;
    (0..points.len())
        .into_par_iter()
        .map(|i| {
            let (n_same, n_other) = if labels[i] { (n_true, n_false) } else { (n_false, n_true) };
            if n_same < 2 || n_other == 0 {
                return 0.0;
            }
            let (mut same, mut other) = (0.0, 0.0);
            for (j, p) in points.iter().enumerate() {
                if j == i {
                    continue;
                }
                let d = euclidean(&points[i], p);
                if labels[j] == labels[i] {
                    same += d;
                } else {
                    other += d;
                }
            }
            let a = same / (n_same - 1) as f64;
            let b = other / n_other as f64;
            let m = a.max(b);
            if m == 0.0 {
                0.0
            } else {
                (b - a) / m
            }
        })
        .collect()
}

fn centroid(points: &[Vec<f64>], labels: &[bool], which: bool, dims: usize) -> Vec<f64> {
    (0..dims)
        .map(|d| {
            let col: Vec<f64> = points
                .iter()
                .zip(labels)
                .filter(|&(_, &l)| l == which)
                .map(|(p, _)| p[d])
                .collect();
            stats::mean(&col)
        })
        .collect()
}

/// Centroids of both clusters over `rings`; sets every row's silhouette.
pub fn calc_cluster_props(rows: &mut [ScoreRow], rings: &[Ring]) -> ClusterProps {
    let points: Vec<Vec<f64>> = rows.iter().map(|r| r.point(rings)).collect();
    let labels: Vec<bool> = rows.iter().map(|r| r.hgt).collect();
    for (row, s) in rows.iter_mut().zip(silhouette(&points, &labels)) {
        row.silhouette = Some(s);
    }
    ClusterProps {
        hgt_centroid: centroid(&points, &labels, true, rings.len()),
        other_centroid: centroid(&points, &labels, false, rings.len()),
    }
}

/// Shrink the HGT cluster to genes separated at least `threshold` from the rest.
///
/// Each round relabels the low-silhouette HGT gene farthest from the HGT
/// centroid, then recomputes centroid and silhouettes. Fails rather than
/// leaving the cluster empty.
pub fn refine_cluster(rows: &mut [ScoreRow], rings: &[Ring], threshold: f64) -> Result<ClusterProps> {
    let initial = rows.iter().filter(|r| r.hgt).count();
    if initial == 0 {
        log::warn!("No HGT genes to refine");
        return Ok(calc_cluster_props(rows, rings));
    }

    let mut props = calc_cluster_props(rows, rings);
    let mut rounds = 0;
    loop {
        let mut farthest: Option<(usize, f64)> = None;
        let mut hgts = 0;
        for (i, row) in rows.iter().enumerate().filter(|(_, r)| r.hgt) {
            hgts += 1;
            if row.silhouette.unwrap_or(0.0) >= threshold {
                continue;
            }
            let d = euclidean(&row.point(rings), &props.hgt_centroid);
            if farthest.map_or(true, |(_, best)| d > best) {
                farthest = Some((i, d));
            }
        }
        let Some((i, _)) = farthest else {
            break;
        };
        if hgts == 1 {
            return Err(HgtError::EmptyCluster { ring_size: initial });
        }
        rows[i].hgt = false;
        rounds += 1;
        props = calc_cluster_props(rows, rings);
    }

    let kept = rows.iter().filter(|r| r.hgt).count();
    log::info!("Refinement kept {kept} of {initial} HGT genes after {rounds} rounds");
    Ok(props)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{exponential, lognormal};
    use crate::types::relevant_rings;
    use assert_matches::assert_matches;

    fn skewed_labeled() -> Vec<ScoreRow> {
        exponential(2.0, 800, 3)
            .into_iter()
            .zip(lognormal(800, 4))
            .enumerate()
            .map(|(i, (c, d))| {
                let mut row = ScoreRow::new(format!("g{i}"), [0.0, c, d]);
                row.hgt = c < 2.0 && d > 2.0;
                row
            })
            .collect()
    }

    #[test]
    fn test_silhouette() {
        let points = vec![vec![0.0], vec![1.0], vec![10.0], vec![11.0]];
        let s = silhouette(&points, &[true, true, false, false]);
        // a = 1, b = 10 (or 9 and 11 averaged)
        assert!((s[0] - (10.5 - 1.0) / 10.5).abs() < 1e-12);
        assert!((s[1] - (9.5 - 1.0) / 9.5).abs() < 1e-12);
        assert!((s[2] - s[1]).abs() < 1e-12);

        // singleton cluster and single label
        let s = silhouette(&points, &[true, false, false, false]);
        assert_eq!(s[0], 0.0);
        assert!(silhouette(&points, &[true; 4]).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_calc_cluster_props() {
        let mut rows = skewed_labeled();
        let rings = relevant_rings(false);
        let labels: Vec<bool> = rows.iter().map(|r| r.hgt).collect();
        let n_hgt = labels.iter().filter(|&&l| l).count();
        assert!(n_hgt > 50 && n_hgt < 250, "{n_hgt} HGT genes");

        let props = calc_cluster_props(&mut rows, rings);
        let hgt_close: Vec<f64> = rows.iter().filter(|r| r.hgt).map(|r| r.score(Ring::Close)).collect();
        let other_distal: Vec<f64> = rows.iter().filter(|r| !r.hgt).map(|r| r.score(Ring::Distal)).collect();
        assert!((props.hgt_centroid[0] - stats::mean(&hgt_close)).abs() < 1e-12);
        assert!((props.other_centroid[1] - stats::mean(&other_distal)).abs() < 1e-12);
        // HGT genes: fewer close hits, more distal hits
        assert!(props.hgt_centroid[0] < props.other_centroid[0]);
        assert!(props.hgt_centroid[1] > props.other_centroid[1]);

        // labels untouched, silhouettes in range and matching the direct computation
        assert_eq!(rows.iter().map(|r| r.hgt).collect::<Vec<_>>(), labels);
        let points: Vec<Vec<f64>> = rows.iter().map(|r| r.point(rings)).collect();
        let expected = silhouette(&points, &labels);
        for (row, s) in rows.iter().zip(&expected) {
            assert_eq!(row.silhouette, Some(*s));
            assert!((-1.0..=1.0).contains(s));
        }
    }

    #[test]
    fn test_refine_cluster() {
        let mut rows = skewed_labeled();
        let rings = relevant_rings(false);
        let initial = rows.iter().filter(|r| r.hgt).count();
        let props = refine_cluster(&mut rows, rings, 0.5).unwrap();

        let kept = rows.iter().filter(|r| r.hgt).count();
        assert!(kept > 0 && kept < initial, "{kept} of {initial}");
        assert!(rows
            .iter()
            .filter(|r| r.hgt)
            .all(|r| r.silhouette.unwrap() >= 0.5));
        // refinement only removes
        let relabeled = skewed_labeled();
        assert!(rows.iter().zip(&relabeled).all(|(r, o)| !r.hgt || o.hgt));
        // returned centroid matches the final labeling
        let check = calc_cluster_props(&mut rows.clone(), rings);
        assert_eq!(props, check);
    }

    #[test]
    fn test_refine_cluster_empty() {
        let rings = relevant_rings(false);
        let mut rows: Vec<ScoreRow> = (0..4)
            .map(|i| ScoreRow::new(format!("g{i}"), [0.0, i as f64, 1.0]))
            .collect();

        // nothing to refine
        refine_cluster(&mut rows, rings, 0.5).unwrap();
        assert!(rows.iter().all(|r| r.silhouette == Some(0.0)));

        // a lone HGT gene always scores 0 and would be removed
        rows[0].hgt = true;
        let err = refine_cluster(&mut rows, rings, 0.5).unwrap_err();
        assert_matches!(err, HgtError::EmptyCluster { ring_size: 1 });
    }
}
