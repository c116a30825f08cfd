use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ahash::AHashSet;
use flate2::read::MultiGzDecoder;

use crate::error::{HgtError, Result};
use crate::types::{GeneHits, Hit};

fn parse_f64(field: &str, what: &str, line: usize) -> Result<f64> {
    field.trim().parse::<f64>().map_err(|_| HgtError::Parse {
        line,
        message: format!("invalid {what} '{field}'"),
    })
}

/// Reads homology search results (plain or `.gz`), one hit per line:
/// ```text
/// <gene_id>\t<top_score>\t<reference_id>\t<score>\t<evalue>\t<taxid>
/// ```
/// A gene without hits is a line with only its id and top score. Hits of a
/// gene must be contiguous; they are kept in descending score order and cut
/// to `max_hits` when given.
pub fn read_hit_table<P: AsRef<Path>>(path: P, max_hits: Option<usize>) -> Result<Vec<GeneHits>> {
    let path = path.as_ref();
    let f = File::open(path)?;
    let is_gz = path.extension().map(|ext| ext == "gz").unwrap_or(false);
    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    let genes = parse_hit_table(reader, max_hits)?;
    log::debug!("Read {} genes from {}", genes.len(), path.display());
    Ok(genes)
}

pub fn parse_hit_table<R: BufRead>(reader: R, max_hits: Option<usize>) -> Result<Vec<GeneHits>> {
    let mut genes: Vec<GeneHits> = Vec::new();
    let mut seen: AHashSet<String> = AHashSet::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = i + 1;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() != 2 && parts.len() < 6 {
            return Err(HgtError::Parse {
                line: lineno,
                message: format!("expected 2 or 6 fields, found {}", parts.len()),
            });
        }
        let id = parts[0].trim();
        let top_score = parse_f64(parts[1], "top score", lineno)?;

        let same_gene = genes.last().map_or(false, |g| g.id == id);
        if !same_gene {
            if !seen.insert(id.to_string()) {
                return Err(HgtError::Parse {
                    line: lineno,
                    message: format!("hits of gene {id} are not contiguous"),
                });
            }
            genes.push(GeneHits {
                id: id.to_string(),
                top_score,
                hits: Vec::new(),
            });
        }
        if parts.len() == 2 {
            continue;
        }

        let hit = Hit {
            reference: parts[2].trim().to_string(),
            score: parse_f64(parts[3], "score", lineno)?,
            evalue: parse_f64(parts[4], "evalue", lineno)?,
            taxid: parts[5].trim().to_string(),
        };
        if let Some(gene) = genes.last_mut() {
            gene.hits.push(hit);
        }
    }

    for gene in &mut genes {
        gene.hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        if let Some(max) = max_hits {
            gene.hits.truncate(max);
        }
    }
    Ok(genes)
}
