// src/classify/scores.rs

use ahash::AHashSet;

use super::find_match::find_match;
use crate::config::AnalyzeConfig;
use crate::groups::TaxonGroups;
use crate::taxdb::{Rank, TaxId, TaxonomyTree, UNASSIGNED};
use crate::types::{GeneHits, Hit, Ring, ScoreRow};

/// Hits that survive the ignore options.
fn usable_hits<'a>(
    gene: &'a GeneHits,
    ignored: &'a AHashSet<TaxId>,
    ignore_self: bool,
) -> impl Iterator<Item = &'a Hit> + 'a {
    gene.hits.iter().filter(move |h| {
        !(ignore_self && h.reference == gene.id) && !ignored.contains(&h.taxid)
    })
}

/// Score every gene against the self / close / distal rings.
///
/// Weighted scores are bit-score sums divided by the gene's top score (its
/// best hit score when no top score was reported); unweighted scores count
/// hits. Hits on taxa unknown to the tree fall in no ring. Each row also
/// carries the match taxon of the hits outside the self group.
pub fn make_score_table(
    genes: &[GeneHits],
    tree: &TaxonomyTree,
    groups: &TaxonGroups,
    config: &AnalyzeConfig,
) -> Vec<ScoreRow> {
    let mut ignored: AHashSet<TaxId> = AHashSet::new();
    for taxid in &config.ignore_taxa {
        if tree.contains(taxid) {
            ignored.extend(tree.subtree(taxid));
        } else {
            ignored.insert(taxid.clone());
        }
    }

    let mut rows = Vec::with_capacity(genes.len());
    for gene in genes {
        let hits: Vec<&Hit> = usable_hits(gene, &ignored, config.ignore_self).collect();
        let norm = if gene.top_score > 0.0 {
            gene.top_score
        } else {
            hits.iter().map(|h| h.score).fold(0.0, f64::max)
        };

        let mut scores = [0.0; 3];
        let mut outside_self: Vec<Hit> = Vec::with_capacity(hits.len());
        for hit in &hits {
            let ring = groups.ring_of(&hit.taxid, tree);
            if let Some(ring) = ring {
                scores[ring.index()] += if !config.weighted {
                    1.0
                } else if norm > 0.0 {
                    hit.score / norm
                } else {
                    0.0
                };
            }
            if ring != Some(Ring::Own) {
                outside_self.push((*hit).clone());
            }
        }

        let mut row = ScoreRow::new(gene.id.clone(), scores);
        row.match_tax = find_match(&outside_self, config.match_threshold, tree);
        rows.push(row);
    }
    log::info!("Scored {} genes", rows.len());
    rows
}

/// Report each HGT gene's donor: its match taxon raised to `donor_rank`
/// (the match itself without a rank or when no ancestor has that rank).
pub fn assign_donors(rows: &mut [ScoreRow], tree: &TaxonomyTree, donor_rank: Option<Rank>) {
    for row in rows.iter_mut() {
        row.donor = if row.hgt && row.match_tax != UNASSIGNED {
            let donor = donor_rank
                .and_then(|rank| tree.ancestor_at_rank(&row.match_tax, rank))
                .unwrap_or(&row.match_tax);
            Some(donor.to_string())
        } else {
            None
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{gene, hit, proteo_tree};
    use crate::groups::{define_groups, GroupSpec};

    fn groups(tree: &TaxonomyTree) -> TaxonGroups {
        let spec = GroupSpec {
            self_tax: Some("561,620"),
            close_tax: Some("543"),
            ..Default::default()
        };
        define_groups(&spec, tree).unwrap()
    }

    fn genes() -> Vec<GeneHits> {
        vec![
            gene(
                "g1",
                100.0,
                vec![
                    hit("g1", 100.0, "562"),
                    hit("r2", 90.0, "622"),
                    hit("r3", 80.0, "548"),
                    hit("r4", 70.0, "766"),
                    hit("r5", 60.0, "999999"),
                ],
            ),
            gene("g2", 50.0, vec![]),
            gene("g3", 0.0, vec![hit("r1", 40.0, "766"), hit("r2", 20.0, "548")]),
        ]
    }

    fn assert_scores(row: &ScoreRow, expected: [f64; 3]) {
        for (obs, exp) in row.scores.iter().zip(expected) {
            assert!((obs - exp).abs() < 1e-12, "{:?} != {:?}", row.scores, expected);
        }
    }

    #[test]
    fn test_make_score_table() {
        let tree = proteo_tree();
        let rows = make_score_table(&genes(), &tree, &groups(&tree), &AnalyzeConfig::default());
        assert_eq!(rows.len(), 3);
        assert_scores(&rows[0], [1.9, 0.8, 0.7]);
        assert_eq!(rows[0].match_tax, "548");
        assert_scores(&rows[1], [0.0, 0.0, 0.0]);
        assert_eq!(rows[1].match_tax, "0");
        // no top score: normalized by the best hit
        assert_scores(&rows[2], [0.0, 0.5, 1.0]);
        assert_eq!(rows[2].match_tax, "766");
    }

    #[test]
    fn test_make_score_table_options() {
        let tree = proteo_tree();
        let config = AnalyzeConfig {
            weighted: false,
            ignore_self: true,
            ignore_taxa: vec!["28211".to_string()],
            ..Default::default()
        };
        let rows = make_score_table(&genes(), &tree, &groups(&tree), &config);
        assert_scores(&rows[0], [1.0, 1.0, 0.0]);
        assert_scores(&rows[2], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_assign_donors() {
        let tree = proteo_tree();
        let mut rows = vec![ScoreRow::new("a", [0.0; 3]), ScoreRow::new("b", [0.0; 3])];
        rows[0].match_tax = "585056".to_string();
        rows[0].hgt = true;
        rows[1].match_tax = "548".to_string();

        assign_donors(&mut rows, &tree, Some(Rank::Genus));
        assert_eq!(rows[0].donor.as_deref(), Some("561"));
        assert_eq!(rows[1].donor, None);

        assign_donors(&mut rows, &tree, Some(Rank::Kingdom));
        assert_eq!(rows[0].donor.as_deref(), Some("585056"));
        assign_donors(&mut rows, &tree, None);
        assert_eq!(rows[0].donor.as_deref(), Some("585056"));
    }
}
