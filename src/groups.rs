//src/groups.rs

use ahash::AHashSet;

use crate::error::{HgtError, Result};
use crate::taxdb::{Rank, TaxId, TaxonomyTree};
use crate::types::Ring;

/// Self and close taxon sets; distal is everything else in the tree.
#[derive(Debug, Clone, Default)]
pub struct TaxonGroups {
    pub self_tax: Vec<TaxId>,
    pub close_tax: Vec<TaxId>,
    pub self_group: AHashSet<TaxId>,
    pub close_group: AHashSet<TaxId>,
}

impl TaxonGroups {
    /// Ring of a hit taxon. Taxa unknown to the tree belong to no ring.
    pub fn ring_of(&self, taxid: &str, tree: &TaxonomyTree) -> Option<Ring> {
        if self.self_group.contains(taxid) {
            Some(Ring::Own)
        } else if self.close_group.contains(taxid) {
            Some(Ring::Close)
        } else if tree.contains(taxid) {
            Some(Ring::Distal)
        } else {
            None
        }
    }
}

/// Split a comma-separated taxon list, checking every id against the tree.
pub fn parse_taxid_list(list: &str, tree: &TaxonomyTree) -> Result<Vec<TaxId>> {
    let mut out: Vec<TaxId> = Vec::new();
    for taxid in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !tree.contains(taxid) {
            return Err(HgtError::UnknownTaxon(taxid.to_string()));
        }
        if !out.iter().any(|t| t == taxid) {
            out.push(taxid.to_string());
        }
    }
    Ok(out)
}

fn union_of_subtrees(taxa: &[TaxId], tree: &TaxonomyTree) -> AHashSet<TaxId> {
    let mut set = AHashSet::new();
    for taxid in taxa {
        set.extend(tree.subtree(taxid));
    }
    set
}

/// Inputs for `define_groups`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupSpec<'a> {
    pub self_tax: Option<&'a str>,
    pub close_tax: Option<&'a str>,
    /// Consensus taxon of the genome, needed when `self_tax` is absent.
    pub lca: Option<&'a str>,
    pub self_rank: Option<Rank>,
    pub close_size: Option<usize>,
}

/// Build self and close groups from declared taxa, inferring whichever is missing.
pub fn define_groups(spec: &GroupSpec<'_>, tree: &TaxonomyTree) -> Result<TaxonGroups> {
    let mut groups = TaxonGroups::default();

    groups.self_tax = match spec.self_tax {
        Some(list) => parse_taxid_list(list, tree)?,
        None => {
            let lca = spec
                .lca
                .ok_or_else(|| HgtError::InvalidConfig("no self taxa given and no genome taxon inferred".to_string()))?;
            vec![infer_self_group(lca, spec.self_rank, tree)?]
        }
    };
    if groups.self_tax.is_empty() {
        return Err(HgtError::InvalidConfig("empty self taxon list".to_string()));
    }
    groups.self_group = union_of_subtrees(&groups.self_tax, tree);

    match spec.close_tax {
        Some(list) => {
            groups.close_tax = parse_taxid_list(list, tree)?;
            let close = union_of_subtrees(&groups.close_tax, tree);
            groups.close_group = close.difference(&groups.self_group).cloned().collect();
        }
        None => infer_close_group(&mut groups, spec.close_size, tree)?,
    }

    log::info!(
        "Self group: {} ({} taxa); close group: {} ({} taxa)",
        groups.self_tax.join(","),
        groups.self_group.len(),
        groups.close_tax.join(","),
        groups.close_group.len()
    );
    Ok(groups)
}

/// Raise the genome consensus taxon until it reaches `self_rank`.
///
/// Unranked taxa are climbed through; the walk stops at the first taxon
/// whose rank is at or above the target, or at the root.
pub fn infer_self_group(lca: &str, self_rank: Option<Rank>, tree: &TaxonomyTree) -> Result<TaxId> {
    if !tree.contains(lca) {
        return Err(HgtError::UnknownTaxon(lca.to_string()));
    }
    let Some(target) = self_rank else {
        return Ok(lca.to_string());
    };
    let mut cur = lca;
    loop {
        if matches!(tree.rank(cur), Some(rank) if rank >= target) {
            break;
        }
        match tree.parent(cur) {
            Some(p) => cur = p,
            None => break,
        }
    }
    log::debug!("Raised self taxon {lca} to {cur} (target rank {target})");
    Ok(cur.to_string())
}

/// Close group = subtree of the taxon above the self group, minus the self group.
///
/// With one self lineage the close root is the parent of the self LCA; when
/// self spans several lineages it is the LCA itself. If `close_size` is set
/// the root keeps moving up until the group is large enough.
pub fn infer_close_group(
    groups: &mut TaxonGroups,
    close_size: Option<usize>,
    tree: &TaxonomyTree,
) -> Result<()> {
    let lca = tree
        .lca(groups.self_tax.iter().map(String::as_str))
        .ok_or_else(|| HgtError::UnknownTaxon(groups.self_tax.join(",")))?;

    let mut root = if groups.self_tax.iter().any(|t| t == lca) {
        tree.parent(lca).ok_or_else(|| HgtError::GroupConstraint {
            taxid: lca.to_string(),
            size: 0,
            required: close_size.unwrap_or(1),
        })?
    } else {
        lca
    };

    loop {
        let group: AHashSet<TaxId> = tree
            .subtree(root)
            .difference(&groups.self_group)
            .cloned()
            .collect();
        let required = close_size.unwrap_or(0);
        if group.len() >= required {
            groups.close_tax = vec![root.to_string()];
            groups.close_group = group;
            return Ok(());
        }
        log::debug!("Close group under {root} has {} taxa, {required} required", group.len());
        root = tree.parent(root).ok_or_else(|| HgtError::GroupConstraint {
            taxid: root.to_string(),
            size: group.len(),
            required,
        })?;
    }
}
