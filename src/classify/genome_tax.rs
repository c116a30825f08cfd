// src/classify/genome_tax.rs

use ahash::AHashMap;

use crate::taxdb::{TaxId, TaxonomyTree, UNASSIGNED};
use crate::types::GeneHits;

/// Consensus taxon of a genome from the best hits of its genes.
///
/// Every gene with hits votes for the taxon of its top hit. Votes are summed
/// up each lineage; the most specific taxon whose clade holds at least
/// `coverage` percent of the votes wins, returned with that percentage.
/// `("0", 0.0)` when no gene voted or nothing reaches the threshold.
pub fn infer_genome_tax(genes: &[GeneHits], tree: &TaxonomyTree, coverage: f64) -> (TaxId, f64) {
    let votes: Vec<&str> = genes
        .iter()
        .filter_map(|g| g.hits.first())
        .map(|h| h.taxid.as_str())
        .collect();
    let n = votes.len();
    if n == 0 {
        return (UNASSIGNED.to_string(), 0.0);
    }

    // Direct votes, in first-seen order
    let mut direct: Vec<(&str, usize)> = Vec::new();
    for &taxid in &votes {
        match direct.iter_mut().find(|(t, _)| *t == taxid) {
            Some((_, c)) => *c += 1,
            None => direct.push((taxid, 1)),
        }
    }

    // Propagate votes up the tree
    let lineages: Vec<Vec<&str>> = direct
        .iter()
        .map(|&(taxid, _)| tree.lineage(taxid).unwrap_or_else(|| vec![taxid]))
        .collect();
    let mut clade: AHashMap<&str, usize> = AHashMap::new();
    for (lineage, &(_, count)) in lineages.iter().zip(&direct) {
        for &taxid in lineage {
            *clade.entry(taxid).or_insert(0) += count;
        }
    }

    let covers = |count: usize| count as f64 * 100.0 >= coverage * n as f64;

    // Walk each voted lineage from the tip; keep the deepest qualifying taxon
    let mut best: Option<(&str, usize, usize)> = None;
    for lineage in &lineages {
        let hit = lineage
            .iter()
            .enumerate()
            .rev()
            .map(|(depth, &taxid)| (taxid, depth, clade[taxid]))
            .find(|&(_, _, count)| covers(count));
        if let Some(cand) = hit {
            let better = match best {
                None => true,
                Some((_, depth, count)) => cand.1 > depth || (cand.1 == depth && cand.2 > count),
            };
            if better {
                best = Some(cand);
            }
        }
    }

    match best {
        Some((taxid, _, count)) => {
            let pct = count as f64 * 100.0 / n as f64;
            log::info!("Genome assigned to {taxid} covering {pct:.2}% of {n} voting genes");
            (taxid.to_string(), pct)
        }
        None => {
            log::warn!("No taxon covers {coverage}% of {n} voting genes");
            (UNASSIGNED.to_string(), 0.0)
        }
    }
}
