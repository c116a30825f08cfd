//src/fixtures.rs
//
// Shared test data. Random samples come from fixed seeds.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp, LogNormal, Normal};

use crate::taxdb::TaxonomyTree;
use crate::types::{GeneHits, Hit, ScoreRow};

pub const TAXDUMP_PROTEO: &[(&str, &str, &str, &str)] = &[
    ("1", "root", "1", "no rank"),
    ("131567", "cellular organisms", "1", "no rank"),
    ("2", "Bacteria", "131567", "superkingdom"),
    ("1224", "Proteobacteria", "2", "phylum"),
    ("28211", "Alphaproteobacteria", "1224", "class"),
    ("766", "Rickettsiales", "28211", "order"),
    ("1236", "Gammaproteobacteria", "1224", "class"),
    ("91347", "Enterobacterales", "1236", "order"),
    ("543", "Enterobacteriaceae", "91347", "family"),
    ("561", "Escherichia", "543", "genus"),
    ("562", "Escherichia coli", "561", "species"),
    ("585056", "Escherichia coli UMN026", "562", "no rank"),
    ("1038927", "Escherichia coli O104:H4", "562", "no rank"),
    ("2580236", "synthetic Escherichia coli Syn61", "561", "species"),
    ("620", "Shigella", "543", "genus"),
    ("622", "Shigella dysenteriae", "620", "species"),
    ("570", "Klebsiella", "543", "genus"),
    ("548", "Klebsiella aerogenes", "570", "species"),
    ("118884", "unclassified Gammaproteobacteria", "1236", "no rank"),
    ("126792", "Plasmid pPY113", "1", "species"),
];

pub fn proteo_taxids() -> Vec<&'static str> {
    TAXDUMP_PROTEO.iter().map(|&(taxid, ..)| taxid).collect()
}

pub fn proteo_tree() -> TaxonomyTree {
    TaxonomyTree::from_records(TAXDUMP_PROTEO.iter().copied()).unwrap()
}

pub fn hit(reference: &str, score: f64, taxid: &str) -> Hit {
    Hit {
        reference: reference.to_string(),
        score,
        evalue: 0.0,
        taxid: taxid.to_string(),
    }
}

pub fn gene(id: &str, top_score: f64, hits: Vec<Hit>) -> GeneHits {
    GeneHits {
        id: id.to_string(),
        top_score,
        hits,
    }
}

/// The seven-hit table used for match finding.
pub fn match_table() -> Vec<Hit> {
    vec![
        hit("r1", 100.0, "585056"),
        hit("r2", 99.0, "1038927"),
        hit("r3", 97.0, "562"),
        hit("r4", 95.0, "622"),
        hit("r5", 92.0, "543"),
        hit("r6", 88.0, "548"),
        hit("r7", 80.0, "766"),
    ]
}

/// Genes whose best hits vote for the given taxa (empty string = no hits).
pub fn voting_genes(best: &[&str]) -> Vec<GeneHits> {
    best.iter()
        .enumerate()
        .map(|(i, taxid)| {
            let hits = if taxid.is_empty() {
                Vec::new()
            } else {
                vec![hit("best", 100.0, taxid), hit("other", 50.0, "2")]
            };
            gene(&format!("g{i}"), 100.0, hits)
        })
        .collect()
}

fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn normal(mean: f64, sd: f64, n: usize, seed: u64) -> Vec<f64> {
    let dist = Normal::new(mean, sd).unwrap();
    dist.sample_iter(rng(seed)).take(n).collect()
}

/// Standard log-normal sample.
pub fn lognormal(n: usize, seed: u64) -> Vec<f64> {
    LogNormal::new(0.0, 1.0).unwrap().sample_iter(rng(seed)).take(n).collect()
}

pub fn exponential(scale: f64, n: usize, seed: u64) -> Vec<f64> {
    Exp::new(1.0 / scale).unwrap().sample_iter(rng(seed)).take(n).collect()
}

/// 500 values around 1.0 and 1500 around 5.0, shuffled so that contiguous
/// folds see both modes.
pub fn bimodal() -> Vec<f64> {
    let mut v = normal(1.0, 0.5, 500, 42);
    v.extend(normal(5.0, 1.0, 1500, 43));
    v.shuffle(&mut rng(44));
    v
}

/// 60 genes with few close and many distal hits, 240 with the opposite.
pub fn two_populations() -> Vec<ScoreRow> {
    let mut close = normal(0.5, 0.2, 60, 7);
    close.extend(normal(3.0, 0.5, 240, 11));
    let mut distal = normal(3.0, 0.5, 60, 13);
    distal.extend(normal(0.5, 0.2, 240, 17));
    close
        .iter()
        .zip(&distal)
        .enumerate()
        .map(|(i, (&c, &d))| ScoreRow::new(format!("g{i}"), [0.0, c, d]))
        .collect()
}
