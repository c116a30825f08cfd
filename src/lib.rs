// src/lib.rs
pub mod classify;
pub mod config;
pub mod error;
pub mod groups;
pub mod hill;
pub mod kde;
pub mod outliers;
pub mod predict;
pub mod refine;
pub mod render;
pub mod search;
pub mod stats;
pub mod taxdb;
pub mod types;

#[cfg(test)]
mod fixtures;

use ahash::AHashMap;
use std::fmt::Write as FmtWrite;

use crate::classify::{assign_donors, infer_genome_tax, make_score_table};
use crate::config::AnalyzeConfig;
use crate::error::Result;
use crate::groups::{define_groups, GroupSpec, TaxonGroups};
use crate::outliers::{remove_orphans, remove_outliers};
use crate::predict::predict_hgt;
use crate::refine::{calc_cluster_props, refine_cluster, ClusterProps};
use crate::render::{render_or_warn, Renderer};
use crate::taxdb::{TaxId, TaxonomyTree, UNASSIGNED};
use crate::types::{relevant_rings, ring_column, GeneHits, KdeOutcome, Ring, ScoreRow};

/// Everything the analysis of one genome produced.
/// Text reports are generated on demand from the structured data.
pub struct AnalysisResults {
    /// Consensus taxon and its coverage, when the self group was inferred.
    pub genome_tax: Option<(TaxId, f64)>,
    pub groups: TaxonGroups,
    /// Rings that took part in classification.
    pub rings: &'static [Ring],

    /// Genes that survived filtering, with labels and silhouettes
    pub rows: Vec<ScoreRow>,
    pub outcomes: Vec<(Ring, KdeOutcome)>,
    pub clusters: ClusterProps,

    /// Names of the reported donors
    pub donor_names: AHashMap<TaxId, String>,
}

impl AnalysisResults {
    pub fn hgt_count(&self) -> usize {
        self.rows.iter().filter(|r| r.hgt).count()
    }

    /// Per-gene table: relevant ring scores, match, label, silhouette and donor.
    pub fn get_scores_output(&self) -> String {
        let mut output = String::from("gene");
        for ring in self.rings {
            write!(output, "\t{ring}").unwrap();
        }
        output.push_str("\tmatch\thgt\tsilhouette\tdonor\n");

        for row in &self.rows {
            output.push_str(&row.gene);
            for &ring in self.rings {
                write!(output, "\t{:.6}", row.score(ring)).unwrap();
            }
            let silhouette = row.silhouette.map(|s| format!("{s:.6}")).unwrap_or_default();
            writeln!(
                output,
                "\t{}\t{}\t{}\t{}",
                row.match_tax,
                u8::from(row.hgt),
                silhouette,
                row.donor.as_deref().unwrap_or_default()
            )
            .unwrap();
        }
        output
    }

    /// HGT genes with their donor id and name.
    pub fn get_hgt_list(&self) -> String {
        let mut output = String::new();
        for row in self.rows.iter().filter(|r| r.hgt) {
            let donor = row.donor.as_deref().unwrap_or(UNASSIGNED);
            let name = self.donor_names.get(donor).map(String::as_str).unwrap_or_default();
            writeln!(output, "{}\t{}\t{}", row.gene, donor, name).unwrap();
        }
        output
    }
}

/// Predict the horizontally transferred genes of one genome.
///
/// Stages run in order: groups, ring scores, histograms, orphan and outlier
/// filters, density thresholds, cluster refinement, donors. Any stage error
/// aborts the genome.
pub fn analyze_genome(
    genes: &[GeneHits],
    tree: &TaxonomyTree,
    config: &AnalyzeConfig,
    renderer: &dyn Renderer,
) -> Result<AnalysisResults> {
    config.validate()?;

    // 1. Self and close groups, from the genome taxon when not declared
    let genome_tax = if config.self_tax.is_none() {
        Some(infer_genome_tax(genes, tree, config.genome_coverage))
    } else {
        None
    };
    let spec = GroupSpec {
        self_tax: config.self_tax.as_deref(),
        close_tax: config.close_tax.as_deref(),
        lca: genome_tax
            .as_ref()
            .map(|(taxid, _)| taxid.as_str())
            .filter(|&t| t != UNASSIGNED),
        self_rank: config.self_rank,
        close_size: config.close_size,
    };
    let groups = define_groups(&spec, tree)?;

    // 2. Score table
    let rings = relevant_rings(config.self_low);
    let mut rows = make_score_table(genes, tree, &groups, config);
    for &ring in rings {
        render_or_warn(renderer.plot_hist(ring.name(), &ring_column(&rows, ring)), "histogram");
    }

    // 3. Filters
    if !config.keep_orphans {
        rows = remove_orphans(rows, rings);
    }
    rows = remove_outliers(rows, rings, config);

    // 4. Classification
    let outcomes = predict_hgt(&mut rows, config, renderer)?;
    let clusters = match config.silhouette {
        Some(threshold) => refine_cluster(&mut rows, rings, threshold)?,
        None => calc_cluster_props(&mut rows, rings),
    };

    // 5. Donors
    assign_donors(&mut rows, tree, config.donor_rank);
    let mut donor_names: AHashMap<TaxId, String> = AHashMap::new();
    for donor in rows.iter().filter_map(|r| r.donor.as_ref()) {
        if let Some(name) = tree.name(donor) {
            donor_names.insert(donor.clone(), name.to_string());
        }
    }

    let results = AnalysisResults {
        genome_tax,
        groups,
        rings,
        rows,
        outcomes,
        clusters,
        donor_names,
    };
    render_or_warn(renderer.plot_hgts("hgts", &results.rows, rings), "scatter plot");
    log::info!(
        "Genome done: {} HGT genes among {} scored",
        results.hgt_count(),
        results.rows.len()
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BandwidthMethod, OutlierMethod};
    use crate::error::HgtError;
    use crate::fixtures::{gene, hit, proteo_tree, two_populations};
    use crate::render::{NoopRenderer, TsvRenderer};
    use crate::taxdb::Rank;
    use assert_matches::assert_matches;

    /// Hit tables reproducing the two-population score table with self
    /// in Escherichia, close in Enterobacteriaceae and distal in Rickettsiales.
    fn genome() -> Vec<GeneHits> {
        two_populations()
            .into_iter()
            .map(|row| {
                let hits = vec![
                    hit("self", 500.0, "562"),
                    hit("close", row.score(Ring::Close) * 100.0, "548"),
                    hit("distal", row.score(Ring::Distal) * 100.0, "766"),
                ];
                gene(&row.gene, 100.0, hits)
            })
            .collect()
    }

    fn config() -> AnalyzeConfig {
        AnalyzeConfig {
            self_rank: Some(Rank::Genus),
            outliers: OutlierMethod::None,
            bandwidth: BandwidthMethod::Fixed(0.3),
            donor_rank: Some(Rank::Order),
            ..Default::default()
        }
    }

    #[test]
    fn test_analyze_genome() {
        let tree = proteo_tree();
        let results = analyze_genome(&genome(), &tree, &config(), &NoopRenderer).unwrap();

        assert_eq!(results.genome_tax, Some(("562".to_string(), 100.0)));
        assert_eq!(results.groups.self_tax, vec!["561"]);
        assert_eq!(results.groups.close_tax, vec!["543"]);
        assert_eq!(results.rows.len(), 300);
        assert_eq!(results.outcomes.len(), 2);

        let n_hgt = results.hgt_count();
        assert!(n_hgt >= 45 && n_hgt <= 60, "{n_hgt} HGT genes");
        for (i, row) in results.rows.iter().enumerate() {
            if row.hgt {
                assert!(i < 60);
                assert_eq!(row.donor.as_deref(), Some("766"));
                assert!(row.silhouette.unwrap() >= 0.5);
            } else {
                assert_eq!(row.donor, None);
            }
        }

        let list = results.get_hgt_list();
        assert_eq!(list.lines().count(), n_hgt);
        assert!(list.lines().all(|l| l.ends_with("\t766\tRickettsiales")));

        let scores = results.get_scores_output();
        let mut lines = scores.lines();
        assert_eq!(lines.next(), Some("gene\tclose\tdistal\tmatch\thgt\tsilhouette\tdonor"));
        assert_eq!(lines.count(), 300);
    }

    #[test]
    fn test_analyze_genome_declared_groups() {
        let tree = proteo_tree();
        let config = AnalyzeConfig {
            self_tax: Some("561".to_string()),
            close_tax: Some("543".to_string()),
            silhouette: None,
            ..config()
        };
        let dir = tempfile::tempdir().unwrap();
        let renderer = TsvRenderer::new(dir.path(), "genome");
        let results = analyze_genome(&genome(), &tree, &config, &renderer).unwrap();

        assert_eq!(results.genome_tax, None);
        let inferred = analyze_genome(&genome(), &tree, &self::config(), &NoopRenderer).unwrap();
        assert_eq!(results.hgt_count(), inferred.hgt_count());
        assert!(results.rows.iter().enumerate().all(|(i, r)| !r.hgt || i < 60));
        assert!(results.rows.iter().all(|r| r.silhouette.is_some()));
        for name in ["close.hist", "distal.hist", "close.kde", "distal.kde", "hgts.scatter"] {
            assert!(renderer.path_for(name).exists(), "{name} not written");
        }
    }

    #[test]
    fn test_analyze_genome_failures() {
        let tree = proteo_tree();

        // no hits at all: nothing to infer the self group from
        let genes = vec![gene("g1", 100.0, vec![]), gene("g2", 100.0, vec![])];
        let err = analyze_genome(&genes, &tree, &config(), &NoopRenderer).err().unwrap();
        assert_matches!(err, HgtError::InvalidConfig(_));

        // one population only: the close ring has no first hill
        let genes: Vec<GeneHits> = genome().into_iter().skip(60).collect();
        let err = analyze_genome(&genes, &tree, &config(), &NoopRenderer).err().unwrap();
        assert!(err.is_shape());

        let config = AnalyzeConfig {
            match_threshold: 0.0,
            ..config()
        };
        let err = analyze_genome(&genome(), &tree, &config, &NoopRenderer).err().unwrap();
        assert_matches!(err, HgtError::InvalidConfig(_));
    }
}
