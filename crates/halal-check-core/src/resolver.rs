use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::knowledge::KnowledgeBase;
use crate::model::Ruling;

/// Outcome of walking an ingredient's derivation graph.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ResolvedStatus {
    pub identifier: String,
    pub ruling: Ruling,
    /// Root-most haram ancestor reached through the first haram branch.
    pub inherited_haram_source: Option<String>,
    /// Every ancestor resolved anywhere below this identifier, in traversal order.
    pub chain: Vec<String>,
    /// Ancestors missing from the store or dropped by the cycle guard.
    pub unresolved: Vec<String>,
}

/// Resolve an identifier (or alias) against its ancestors.
///
/// Returns `None` when the identifier is not in the Knowledge Base.
#[must_use]
pub fn resolve(kb: &KnowledgeBase, identifier: &str) -> Option<ResolvedStatus> {
    let canonical = kb.canonical_identifier(identifier)?;
    resolve_branch(kb, canonical, &BTreeSet::new())
}

fn resolve_branch(
    kb: &KnowledgeBase,
    identifier: &str,
    visited: &BTreeSet<String>,
) -> Option<ResolvedStatus> {
    if visited.contains(identifier) {
        tracing::debug!(identifier, "cycle guard dropped branch");
        return None;
    }
    let record = kb.get(identifier)?;
    let own_ruling = record.ruling.unwrap_or(Ruling::Unknown);

    if record.derives_from.is_empty() {
        return Some(ResolvedStatus {
            identifier: record.identifier.clone(),
            ruling: own_ruling,
            inherited_haram_source: None,
            chain: Vec::new(),
            unresolved: Vec::new(),
        });
    }

    // each ancestor branch gets its own copy so siblings never see each other's path
    let mut branch_visited = visited.clone();
    branch_visited.insert(record.identifier.clone());

    let mut chain: Vec<String> = Vec::new();
    let mut unresolved: Vec<String> = Vec::new();
    let mut haram_source: Option<String> = None;
    let mut any_conditional = false;

    for ancestor in &record.derives_from {
        let Some(status) = resolve_branch(kb, ancestor, &branch_visited) else {
            push_unique(&mut unresolved, ancestor);
            continue;
        };

        push_unique(&mut chain, &status.identifier);
        for inherited in &status.chain {
            push_unique(&mut chain, inherited);
        }
        for missing in &status.unresolved {
            push_unique(&mut unresolved, missing);
        }

        match status.ruling {
            Ruling::Haram if haram_source.is_none() => {
                haram_source = Some(
                    status.inherited_haram_source.clone().unwrap_or_else(|| status.identifier.clone()),
                );
            }
            Ruling::Conditional => any_conditional = true,
            _ => {}
        }
    }

    let ruling = if haram_source.is_some() {
        Ruling::Haram
    } else if any_conditional {
        Ruling::Conditional
    } else {
        own_ruling
    };

    tracing::debug!(
        identifier = %record.identifier,
        ruling = ruling.as_str(),
        chain_len = chain.len(),
        "resolved derivation chain"
    );

    Some(ResolvedStatus {
        identifier: record.identifier.clone(),
        ruling,
        inherited_haram_source: haram_source,
        chain,
        unresolved,
    })
}

fn push_unique(items: &mut Vec<String>, value: &str) {
    if !items.iter().any(|item| item == value) {
        items.push(value.to_string());
    }
}
