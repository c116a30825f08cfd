//src/outliers.rs

use crate::config::{AnalyzeConfig, OutlierMethod};
use crate::stats;
use crate::types::{ring_column, Ring, ScoreRow};

/// Drop genes without a single hit in any of `rings`.
pub fn remove_orphans(mut rows: Vec<ScoreRow>, rings: &[Ring]) -> Vec<ScoreRow> {
    let before = rows.len();
    rows.retain(|row| rings.iter().any(|&r| row.score(r) != 0.0));
    log::info!("Removed {} orphan genes, {} remain", before - rows.len(), rows.len());
    rows
}

/// Apply the configured outlier strategy over `rings`.
pub fn remove_outliers(rows: Vec<ScoreRow>, rings: &[Ring], config: &AnalyzeConfig) -> Vec<ScoreRow> {
    let before = rows.len();
    let rows = match config.outliers {
        OutlierMethod::None => return rows,
        OutlierMethod::ZScore => outliers_zscore(rows, rings, config.zscore_cutoff),
        OutlierMethod::Boxplot => outliers_boxplot(rows, rings, config.iqr_factor),
    };
    log::info!(
        "Removed {} outlier genes ({:?}), {} remain",
        before - rows.len(),
        config.outliers,
        rows.len()
    );
    rows
}

/// Keep rows whose absolute z-score stays below `cutoff` in every ring.
/// A ring without spread flags nothing.
pub fn outliers_zscore(rows: Vec<ScoreRow>, rings: &[Ring], cutoff: f64) -> Vec<ScoreRow> {
    let bounds: Vec<(Ring, f64, f64)> = rings
        .iter()
        .map(|&ring| {
            let col = ring_column(&rows, ring);
            (ring, stats::mean(&col), stats::std_dev(&col, 0))
        })
        .collect();
    retain_rows(rows, |row| {
        bounds
            .iter()
            .all(|&(ring, mean, sd)| sd == 0.0 || ((row.score(ring) - mean) / sd).abs() < cutoff)
    })
}

/// Keep rows inside the boxplot whiskers `[Q1 - k*IQR, Q3 + k*IQR]` of every ring.
pub fn outliers_boxplot(rows: Vec<ScoreRow>, rings: &[Ring], factor: f64) -> Vec<ScoreRow> {
    let fences: Vec<(Ring, f64, f64)> = rings
        .iter()
        .map(|&ring| {
            let col = stats::sorted(&ring_column(&rows, ring));
            let q1 = stats::quantile_sorted(&col, 0.25);
            let q3 = stats::quantile_sorted(&col, 0.75);
            let iqr = q3 - q1;
            (ring, q1 - factor * iqr, q3 + factor * iqr)
        })
        .collect();
    retain_rows(rows, |row| {
        fences.iter().all(|&(ring, lo, hi)| {
            let v = row.score(ring);
            v >= lo && v <= hi
        })
    })
}

fn retain_rows(mut rows: Vec<ScoreRow>, keep: impl Fn(&ScoreRow) -> bool) -> Vec<ScoreRow> {
    rows.retain(|row| keep(row));
    rows
}
