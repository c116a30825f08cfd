//src/types.rs

use std::fmt;

/// One homology hit of a query gene.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub reference: String,
    pub score: f64,
    pub evalue: f64,
    pub taxid: String,
}

/// A query gene with its hits, ordered by descending score.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneHits {
    pub id: String,
    /// Bit score of the gene against itself (or its best hit).
    pub top_score: f64,
    pub hits: Vec<Hit>,
}

/// The three nested taxonomic rings a hit can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ring {
    Own,
    Close,
    Distal,
}

impl Ring {
    pub const ALL: [Ring; 3] = [Ring::Own, Ring::Close, Ring::Distal];

    pub fn name(&self) -> &'static str {
        match self {
            Ring::Own => "self",
            Ring::Close => "close",
            Ring::Distal => "distal",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// HGT genes sit on the high side of the distal ring and on the low side of the others.
    pub fn hgt_is_high(&self) -> bool {
        matches!(self, Ring::Distal)
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rings taking part in classification.
pub fn relevant_rings(self_low: bool) -> &'static [Ring] {
    if self_low {
        &Ring::ALL
    } else {
        &[Ring::Close, Ring::Distal]
    }
}

/// Per-gene scores and, once classified, the label.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub gene: String,
    /// Indexed by `Ring::index()`.
    pub scores: [f64; 3],
    /// Taxon best representing the hits outside the self group.
    pub match_tax: String,
    pub hgt: bool,
    pub silhouette: Option<f64>,
    pub donor: Option<String>,
}

impl ScoreRow {
    pub fn new(gene: impl Into<String>, scores: [f64; 3]) -> Self {
        Self {
            gene: gene.into(),
            scores,
            match_tax: crate::taxdb::UNASSIGNED.to_string(),
            hgt: false,
            silhouette: None,
            donor: None,
        }
    }

    #[inline]
    pub fn score(&self, ring: Ring) -> f64 {
        self.scores[ring.index()]
    }

    /// Scores of `rings`, in order.
    pub fn point(&self, rings: &[Ring]) -> Vec<f64> {
        rings.iter().map(|r| self.score(*r)).collect()
    }
}

/// Values of one ring across the table.
pub fn ring_column(rows: &[ScoreRow], ring: Ring) -> Vec<f64> {
    rows.iter().map(|r| r.score(ring)).collect()
}

/// A density curve evaluated on evenly spaced points.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityCurve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// What `cluster_kde` settled on for one ring, in the ring's own orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdeOutcome {
    pub bandwidth: f64,
    pub peak: f64,
    pub valley: f64,
    pub threshold: f64,
}
