//src/taxdb.rs

use ahash::{AHashMap, AHashSet};
use flate2::read::MultiGzDecoder;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::error::{HgtError, Result};

/// Taxon ids are kept as strings; `"0"` means unassigned.
pub type TaxId = String;

pub const UNASSIGNED: &str = "0";

/// Named taxonomic ranks, ordered from most specific to most inclusive.
/// Anything else in a taxdump ("no rank", "clade", ...) is stored as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Strain,
    Subspecies,
    Species,
    Genus,
    Family,
    Order,
    Class,
    Phylum,
    Kingdom,
    Superkingdom,
}

impl Rank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Strain => "strain",
            Rank::Subspecies => "subspecies",
            Rank::Species => "species",
            Rank::Genus => "genus",
            Rank::Family => "family",
            Rank::Order => "order",
            Rank::Class => "class",
            Rank::Phylum => "phylum",
            Rank::Kingdom => "kingdom",
            Rank::Superkingdom => "superkingdom",
        }
    }

    /// Lenient parse used by the taxdump loader.
    pub fn parse(s: &str) -> Option<Rank> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strain" => Some(Rank::Strain),
            "subspecies" => Some(Rank::Subspecies),
            "species" => Some(Rank::Species),
            "genus" => Some(Rank::Genus),
            "family" => Some(Rank::Family),
            "order" => Some(Rank::Order),
            "class" => Some(Rank::Class),
            "phylum" => Some(Rank::Phylum),
            "kingdom" => Some(Rank::Kingdom),
            "superkingdom" | "domain" => Some(Rank::Superkingdom),
            _ => None,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = HgtError;

    fn from_str(s: &str) -> Result<Self> {
        Rank::parse(s).ok_or_else(|| HgtError::InvalidConfig(format!("unknown rank '{s}'")))
    }
}

#[derive(Debug, Clone)]
pub struct TaxonNode {
    pub name: String,
    pub parent: TaxId,
    pub rank: Option<Rank>,
    /// Rank as written in the taxdump, kept for reports.
    pub rank_name: String,
}

/// Read-only taxonomy context shared by every genome of a run.
///
/// Only parent links come from the taxdump; the `parent -> children` index is
/// derived once at construction so subtree queries never re-walk ancestors.
#[derive(Debug, Clone)]
pub struct TaxonomyTree {
    nodes: AHashMap<TaxId, TaxonNode>,
    children: AHashMap<TaxId, Vec<TaxId>>,
    root: TaxId,
}

impl TaxonomyTree {
    /// Build a tree from `(taxid, name, parent, rank)` records.
    pub fn from_records<I, S>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, S, S, S)>,
        S: Into<String>,
    {
        let mut nodes: AHashMap<TaxId, TaxonNode> = AHashMap::new();
        for (taxid, name, parent, rank) in records {
            let rank_name: String = rank.into();
            nodes.insert(
                taxid.into(),
                TaxonNode {
                    name: name.into(),
                    parent: parent.into(),
                    rank: Rank::parse(&rank_name),
                    rank_name,
                },
            );
        }

        // The root points at itself; a dangling parent also ends a lineage.
        let mut roots: Vec<&TaxId> = nodes
            .iter()
            .filter(|(id, node)| *id == &node.parent || !nodes.contains_key(&node.parent))
            .map(|(id, _)| id)
            .collect();
        roots.sort();
        let root = roots
            .iter()
            .find(|id| nodes.get(id.as_str()).map(|n| &n.parent) == Some(**id))
            .or_else(|| roots.first())
            .map(|id| (*id).clone())
            .ok_or_else(|| HgtError::InvalidConfig("taxonomy has no root".to_string()))?;

        let children = build_children_map(&nodes);
        Ok(Self { nodes, children, root })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, taxid: &str) -> bool {
        self.nodes.contains_key(taxid)
    }

    pub fn get(&self, taxid: &str) -> Option<&TaxonNode> {
        self.nodes.get(taxid)
    }

    pub fn name(&self, taxid: &str) -> Option<&str> {
        self.nodes.get(taxid).map(|n| n.name.as_str())
    }

    pub fn rank(&self, taxid: &str) -> Option<Rank> {
        self.nodes.get(taxid).and_then(|n| n.rank)
    }

    /// Parent of `taxid`, `None` at the root or for unknown ids.
    pub fn parent(&self, taxid: &str) -> Option<&str> {
        let node = self.nodes.get(taxid)?;
        if node.parent == taxid || !self.nodes.contains_key(&node.parent) {
            None
        } else {
            Some(node.parent.as_str())
        }
    }

    /// Path from the root down to `taxid` (both included).
    pub fn lineage(&self, taxid: &str) -> Option<Vec<&str>> {
        let (start, _) = self.nodes.get_key_value(taxid)?;
        let mut path = vec![start.as_str()];
        let mut cur = start.as_str();
        while let Some(p) = self.parent(cur) {
            // corrupt dumps may loop
            if path.len() > self.nodes.len() {
                break;
            }
            path.push(p);
            cur = p;
        }
        path.reverse();
        Some(path)
    }

    /// Every descendant of `taxid`, excluding itself.
    pub fn descendants(&self, taxid: &str) -> Vec<&str> {
        let mut out = Vec::new();
        let mut stack: Vec<&str> = vec![taxid];
        while let Some(cur) = stack.pop() {
            if let Some(kids) = self.children.get(cur) {
                for kid in kids {
                    out.push(kid.as_str());
                    stack.push(kid.as_str());
                }
            }
        }
        out
    }

    /// `taxid` plus all its descendants.
    pub fn subtree(&self, taxid: &str) -> AHashSet<TaxId> {
        let mut set: AHashSet<TaxId> = self
            .descendants(taxid)
            .into_iter()
            .map(str::to_string)
            .collect();
        set.insert(taxid.to_string());
        set
    }

    /// Lowest common ancestor of the resolvable ids in `taxids`.
    /// Each lineage is computed once and the common root-first prefix is kept.
    pub fn lca<'a, I>(&self, taxids: I) -> Option<&str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut common: Option<Vec<&str>> = None;
        for taxid in taxids {
            let Some(lineage) = self.lineage(taxid) else {
                continue;
            };
            common = Some(match common {
                None => lineage,
                Some(prefix) => {
                    let shared = prefix
                        .iter()
                        .zip(lineage.iter())
                        .take_while(|(a, b)| a == b)
                        .count();
                    lineage[..shared].to_vec()
                }
            });
        }
        common.and_then(|path| path.last().copied())
    }

    /// Closest taxon at `rank` on the lineage of `taxid` (itself included).
    pub fn ancestor_at_rank(&self, taxid: &str, rank: Rank) -> Option<&str> {
        self.lineage(taxid)?
            .into_iter()
            .rev()
            .find(|id| self.rank(id) == Some(rank))
    }
}

/// Build a map of `parent -> Vec<child>` for traversing the taxonomy.
fn build_children_map(nodes: &AHashMap<TaxId, TaxonNode>) -> AHashMap<TaxId, Vec<TaxId>> {
    let mut children_map: AHashMap<TaxId, Vec<TaxId>> = AHashMap::new();
    for (child, node) in nodes {
        if &node.parent != child {
            children_map
                .entry(node.parent.clone())
                .or_default()
                .push(child.clone());
        }
    }
    for kids in children_map.values_mut() {
        kids.sort();
    }
    children_map
}

/// Parses a taxDB file (plain or `.gz`) in the format:
/// ```text
/// <taxid>\t<parentid>\t<taxname>\t<rank>
/// ```
/// Malformed lines are skipped.
pub fn parse_taxdb<P: AsRef<Path>>(filepath: P) -> Result<TaxonomyTree> {
    let path = filepath.as_ref();
    let file = File::open(path)?;
    let is_gz = path.extension().map(|ext| ext == "gz").unwrap_or(false);
    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut records = Vec::new();
    for line_result in reader.lines() {
        let line = line_result?;
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 4 {
            continue;
        }
        let taxid = parts[0].trim();
        let parentid = parts[1].trim();
        if taxid.is_empty() || parentid.is_empty() {
            continue;
        }
        records.push((
            taxid.to_string(),
            parts[2].trim().to_string(),
            parentid.to_string(),
            parts[3].trim().to_string(),
        ));
    }
    let tree = TaxonomyTree::from_records(records)?;
    log::info!("Loaded taxonomy with {} taxa from {}", tree.len(), path.display());
    Ok(tree)
}
