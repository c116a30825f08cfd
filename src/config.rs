//src/config.rs

use crate::error::{HgtError, Result};
use crate::taxdb::Rank;

/// How the kernel density bandwidth is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandwidthMethod {
    /// Grid search refined by the bimodality of the resulting curve.
    Auto,
    /// Cross-validated grid search.
    Grid,
    /// Silverman's rule of thumb.
    Silverman,
    Fixed(f64),
}

impl std::str::FromStr for BandwidthMethod {
    type Err = HgtError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(BandwidthMethod::Auto),
            "grid" => Ok(BandwidthMethod::Grid),
            "silverman" => Ok(BandwidthMethod::Silverman),
            other => other
                .parse::<f64>()
                .map(BandwidthMethod::Fixed)
                .map_err(|_| HgtError::InvalidConfig(format!("unknown bandwidth '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierMethod {
    None,
    ZScore,
    Boxplot,
}

impl std::str::FromStr for OutlierMethod {
    type Err = HgtError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(OutlierMethod::None),
            "zscore" => Ok(OutlierMethod::ZScore),
            "boxplot" => Ok(OutlierMethod::Boxplot),
            other => Err(HgtError::InvalidConfig(format!("unknown outlier method '{other}'"))),
        }
    }
}

/// Settings for the analysis of one genome.
///
/// ```rust
/// use hgt_rs::config::{AnalyzeConfig, BandwidthMethod};
///
/// let config = AnalyzeConfig {
///     bandwidth: BandwidthMethod::Silverman,
///     self_low: true,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    /// Comma-separated self taxa; inferred from the hits when `None`.
    pub self_tax: Option<String>,
    /// Comma-separated close taxa; inferred from the self group when `None`.
    pub close_tax: Option<String>,
    /// Rank the inferred self taxon is raised to.
    pub self_rank: Option<Rank>,
    /// Minimum number of taxa in an inferred close group.
    pub close_size: Option<usize>,

    /// Fraction of the best score a hit needs to count towards a gene's match.
    pub match_threshold: f64,
    /// Percent of voting genes the genome taxon has to cover.
    pub genome_coverage: f64,

    /// Sum normalized bit scores per ring instead of counting hits.
    pub weighted: bool,
    pub ignore_self: bool,
    pub ignore_taxa: Vec<String>,

    /// Let the self ring take part in classification.
    pub self_low: bool,
    pub keep_orphans: bool,
    pub outliers: OutlierMethod,
    pub zscore_cutoff: f64,
    pub iqr_factor: f64,

    pub bandwidth: BandwidthMethod,
    /// Number of grid candidates, also the number of cross-validation folds.
    pub bw_steps: usize,
    /// Smallest grid bandwidth, as a fraction of the data range.
    pub grid_low: f64,
    /// Largest grid bandwidth, as a fraction of the data range.
    pub grid_high: f64,
    pub density_points: usize,
    /// Percent of the peak-to-valley span the threshold sits left of the valley.
    pub noise: f64,
    /// Largest share (percent) of genes the low partition may hold for smart KDE.
    pub low_part: f64,
    /// Values used by the smart-KDE grid search; larger inputs are subsampled.
    pub smart_subsample: usize,

    /// Silhouette below which HGT genes are dropped; `None` skips refinement.
    pub silhouette: Option<f64>,
    pub donor_rank: Option<Rank>,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            self_tax: None,
            close_tax: None,
            self_rank: None,
            close_size: None,
            match_threshold: 0.9,
            genome_coverage: 50.0,
            weighted: true,
            ignore_self: false,
            ignore_taxa: Vec::new(),
            self_low: false,
            keep_orphans: false,
            outliers: OutlierMethod::ZScore,
            zscore_cutoff: 3.0,
            iqr_factor: 1.5,
            bandwidth: BandwidthMethod::Auto,
            bw_steps: 20,
            grid_low: 0.005,
            grid_high: 0.25,
            density_points: 100,
            noise: 50.0,
            low_part: 75.0,
            smart_subsample: 1000,
            silhouette: Some(0.5),
            donor_rank: None,
        }
    }
}

impl AnalyzeConfig {
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: &str| Err(HgtError::InvalidConfig(msg.to_string()));
        if !(self.match_threshold > 0.0 && self.match_threshold <= 1.0) {
            return bad("match_threshold must be in (0, 1]");
        }
        if !(self.genome_coverage > 0.0 && self.genome_coverage <= 100.0) {
            return bad("genome_coverage must be in (0, 100]");
        }
        if !(0.0..=100.0).contains(&self.noise) {
            return bad("noise must be in [0, 100]");
        }
        if !(self.low_part > 0.0 && self.low_part <= 100.0) {
            return bad("low_part must be in (0, 100]");
        }
        if self.bw_steps < 2 {
            return bad("bw_steps must be at least 2");
        }
        if !(self.grid_low > 0.0 && self.grid_low < self.grid_high) {
            return bad("grid bounds must satisfy 0 < grid_low < grid_high");
        }
        if let BandwidthMethod::Fixed(bw) = self.bandwidth {
            if !(bw > 0.0 && bw.is_finite()) {
                return bad("fixed bandwidth must be positive");
            }
        }
        if self.density_points < 3 {
            return bad("density_points must be at least 3");
        }
        if self.smart_subsample < self.bw_steps {
            return bad("smart_subsample must not be smaller than bw_steps");
        }
        if !(self.zscore_cutoff > 0.0 && self.iqr_factor >= 0.0) {
            return bad("outlier cut-offs must be positive");
        }
        if let Some(th) = self.silhouette {
            if !(-1.0..=1.0).contains(&th) {
                return bad("silhouette must be in [-1, 1]");
            }
        }
        Ok(())
    }
}
