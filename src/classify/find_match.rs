// src/classify/find_match.rs

use crate::taxdb::{TaxId, TaxonomyTree, UNASSIGNED};
use crate::types::Hit;

/// Taxon best representing the high-scoring hits of one gene.
///
/// Hits scoring at least `match_threshold * max_score` survive; a single
/// survivor is returned as is, several are reduced to their LCA. An empty
/// table (or one whose survivors are all unknown to the tree) is unassigned.
///
/// Taxa unknown to the tree are skipped by the LCA but a lone unknown
/// survivor is still reported, so raising the threshold only narrows the
/// match while every hit taxon is in the tree.
pub fn find_match(hits: &[Hit], match_threshold: f64, tree: &TaxonomyTree) -> TaxId {
    let max_score = hits.iter().map(|h| h.score).fold(f64::NEG_INFINITY, f64::max);
    if !max_score.is_finite() {
        return UNASSIGNED.to_string();
    }
    let th = max_score * match_threshold;
    let matched: Vec<&str> = hits
        .iter()
        .filter(|h| h.score >= th)
        .map(|h| h.taxid.as_str())
        .collect();

    if let [only] = matched.as_slice() {
        return only.to_string();
    }
    tree.lca(matched)
        .map(str::to_string)
        .unwrap_or_else(|| UNASSIGNED.to_string())
}
