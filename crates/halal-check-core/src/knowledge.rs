use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::model::{normalize_identifier, IngredientRecord};
use crate::KernelError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityKind {
    SelfReference,
    DuplicateDerivation,
    DanglingDerivation,
    DuplicateIdentifier,
    AliasConflict,
    AliasShadowsIdentifier,
}

impl DataQualityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelfReference => "self_reference",
            Self::DuplicateDerivation => "duplicate_derivation",
            Self::DanglingDerivation => "dangling_derivation",
            Self::DuplicateIdentifier => "duplicate_identifier",
            Self::AliasConflict => "alias_conflict",
            Self::AliasShadowsIdentifier => "alias_shadows_identifier",
        }
    }
}

/// A cleanup applied while indexing records. Never surfaced as an error.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct DataQualityIssue {
    pub kind: DataQualityKind,
    pub identifier: String,
    pub detail: String,
}

/// Flat identifier -> record mapping with an alias index.
///
/// Derivation lists are adjacency lists keyed by identifier, so cyclic data
/// never turns into cyclic ownership. The store is immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeBase {
    records: BTreeMap<String, IngredientRecord>,
    aliases: BTreeMap<String, String>,
    issues: Vec<DataQualityIssue>,
}

impl KnowledgeBase {
    /// Index records, normalizing identifiers and stripping self-references.
    ///
    /// # Errors
    /// Returns [`KernelError::Validation`] when a record fails
    /// [`IngredientRecord::validate`].
    pub fn from_records<I>(records: I) -> Result<Self, KernelError>
    where
        I: IntoIterator<Item = IngredientRecord>,
    {
        let mut indexed: BTreeMap<String, IngredientRecord> = BTreeMap::new();
        let mut issues = Vec::new();

        for record in records {
            record.validate()?;
            let record = clean_record(record, &mut issues);
            if indexed.contains_key(&record.identifier) {
                issues.push(DataQualityIssue {
                    kind: DataQualityKind::DuplicateIdentifier,
                    identifier: record.identifier.clone(),
                    detail: "later record replaced an earlier one".to_string(),
                });
            }
            indexed.insert(record.identifier.clone(), record);
        }

        for record in indexed.values() {
            for ancestor in &record.derives_from {
                if !indexed.contains_key(ancestor) {
                    issues.push(DataQualityIssue {
                        kind: DataQualityKind::DanglingDerivation,
                        identifier: record.identifier.clone(),
                        detail: format!("ancestor `{ancestor}` is not in the knowledge base"),
                    });
                }
            }
        }

        let aliases = build_alias_index(&indexed, &mut issues);

        for issue in &issues {
            tracing::warn!(
                kind = issue.kind.as_str(),
                identifier = %issue.identifier,
                "{}",
                issue.detail
            );
        }

        Ok(Self { records: indexed, aliases, issues })
    }

    /// Look up by identifier or alias. The input must already be normalized.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&IngredientRecord> {
        self.records
            .get(identifier)
            .or_else(|| self.aliases.get(identifier).and_then(|target| self.records.get(target)))
    }

    /// The canonical identifier an identifier or alias points at.
    #[must_use]
    pub fn canonical_identifier<'a>(&'a self, identifier: &'a str) -> Option<&'a str> {
        if self.records.contains_key(identifier) {
            return Some(identifier);
        }
        self.aliases.get(identifier).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.get(identifier).is_some()
    }

    pub fn records(&self) -> impl Iterator<Item = &IngredientRecord> {
        self.records.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    #[must_use]
    pub fn data_quality_issues(&self) -> &[DataQualityIssue] {
        &self.issues
    }

    /// One derivation cycle per strongly connected component, starting at the
    /// component's smallest identifier and following the shortest way back to it.
    ///
    /// Runs in near-linear time in records plus derivation edges.
    #[must_use]
    pub fn derivation_cycles(&self) -> Vec<Vec<String>> {
        let identifiers: Vec<&str> = self.records.keys().map(String::as_str).collect();
        let position: BTreeMap<&str, usize> =
            identifiers.iter().enumerate().map(|(index, id)| (*id, index)).collect();
        let edges: Vec<Vec<usize>> = self
            .records
            .values()
            .map(|record| {
                record
                    .derives_from
                    .iter()
                    .filter_map(|ancestor| position.get(ancestor.as_str()).copied())
                    .collect()
            })
            .collect();

        // self-references are stripped on construction, so single-node components are acyclic
        let mut cycles: Vec<Vec<String>> = strongly_connected_components(&edges)
            .iter()
            .filter(|component| component.len() > 1)
            .filter_map(|component| shortest_cycle(&edges, component))
            .map(|cycle| cycle.into_iter().map(|index| identifiers[index].to_string()).collect())
            .collect();
        cycles.sort();
        cycles
    }
}

/// Iterative Tarjan over an adjacency list of node indices.
#[allow(clippy::needless_range_loop)]
fn strongly_connected_components(edges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    const UNVISITED: usize = usize::MAX;

    let mut index = vec![UNVISITED; edges.len()];
    let mut low = vec![0; edges.len()];
    let mut on_stack = vec![false; edges.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut components = Vec::new();
    let mut next_index = 0;

    for root in 0..edges.len() {
        if index[root] != UNVISITED {
            continue;
        }
        index[root] = next_index;
        low[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;
        // (node, next edge to follow)
        let mut frames: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(frame) = frames.last_mut() {
            let node = frame.0;
            if let Some(&target) = edges[node].get(frame.1) {
                frame.1 += 1;
                if index[target] == UNVISITED {
                    index[target] = next_index;
                    low[target] = next_index;
                    next_index += 1;
                    stack.push(target);
                    on_stack[target] = true;
                    frames.push((target, 0));
                } else if on_stack[target] {
                    low[node] = low[node].min(index[target]);
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                low[parent] = low[parent].min(low[node]);
            }
            if low[node] == index[node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }
    components
}

/// Breadth-first path from the component's smallest node back to itself.
fn shortest_cycle(edges: &[Vec<usize>], component: &[usize]) -> Option<Vec<usize>> {
    let members: BTreeSet<usize> = component.iter().copied().collect();
    let start = *members.first()?;
    let mut parent: BTreeMap<usize, usize> = BTreeMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        for &target in &edges[node] {
            if !members.contains(&target) {
                continue;
            }
            if target == start {
                let mut cycle = vec![node];
                let mut current = node;
                while let Some(&previous) = parent.get(&current) {
                    cycle.push(previous);
                    current = previous;
                }
                cycle.reverse();
                return Some(cycle);
            }
            if !parent.contains_key(&target) {
                parent.insert(target, node);
                queue.push_back(target);
            }
        }
    }
    None
}

fn clean_record(mut record: IngredientRecord, issues: &mut Vec<DataQualityIssue>) -> IngredientRecord {
    record.identifier = normalize_identifier(&record.identifier);

    let mut ancestors: Vec<String> = Vec::with_capacity(record.derives_from.len());
    for raw in &record.derives_from {
        let ancestor = normalize_identifier(raw);
        if ancestor.is_empty() {
            continue;
        }
        if ancestor == record.identifier {
            issues.push(DataQualityIssue {
                kind: DataQualityKind::SelfReference,
                identifier: record.identifier.clone(),
                detail: "stripped self-reference from derives_from".to_string(),
            });
            continue;
        }
        if ancestors.contains(&ancestor) {
            issues.push(DataQualityIssue {
                kind: DataQualityKind::DuplicateDerivation,
                identifier: record.identifier.clone(),
                detail: format!("dropped repeated ancestor `{ancestor}`"),
            });
            continue;
        }
        ancestors.push(ancestor);
    }
    record.derives_from = ancestors;

    let mut aliases: Vec<String> = Vec::with_capacity(record.aliases.len());
    for raw in &record.aliases {
        let alias = normalize_identifier(raw);
        if !alias.is_empty() && alias != record.identifier && !aliases.contains(&alias) {
            aliases.push(alias);
        }
    }
    record.aliases = aliases;
    record
}

fn build_alias_index(
    records: &BTreeMap<String, IngredientRecord>,
    issues: &mut Vec<DataQualityIssue>,
) -> BTreeMap<String, String> {
    let mut index: BTreeMap<String, String> = BTreeMap::new();
    for record in records.values() {
        for alias in &record.aliases {
            if records.contains_key(alias) {
                issues.push(DataQualityIssue {
                    kind: DataQualityKind::AliasShadowsIdentifier,
                    identifier: record.identifier.clone(),
                    detail: format!("alias `{alias}` is also a record identifier and was ignored"),
                });
                continue;
            }
            match index.get(alias) {
                Some(owner) if owner != &record.identifier => {
                    issues.push(DataQualityIssue {
                        kind: DataQualityKind::AliasConflict,
                        identifier: record.identifier.clone(),
                        detail: format!("alias `{alias}` already belongs to `{owner}`"),
                    });
                }
                Some(_) => {}
                None => {
                    index.insert(alias.clone(), record.identifier.clone());
                }
            }
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Ruling;

    fn kb(records: Vec<IngredientRecord>) -> KnowledgeBase {
        match KnowledgeBase::from_records(records) {
            Ok(kb) => kb,
            Err(err) => panic!("knowledge base should build: {err}"),
        }
    }

    #[test]
    fn self_references_are_stripped_and_reported() {
        let kb = kb(vec![IngredientRecord::new("Gelatin", Some(Ruling::Haram))
            .derived_from(["gelatin", "pork", "Pork"])]);

        let record = match kb.get("gelatin") {
            Some(record) => record,
            None => panic!("gelatin should be indexed under its normalized identifier"),
        };
        assert_eq!(record.derives_from, vec!["pork".to_string()]);
        let kinds = kb.data_quality_issues().iter().map(|issue| issue.kind).collect::<Vec<_>>();
        assert!(kinds.contains(&DataQualityKind::SelfReference));
        assert!(kinds.contains(&DataQualityKind::DuplicateDerivation));
        assert!(kinds.contains(&DataQualityKind::DanglingDerivation));
    }

    #[test]
    fn aliases_resolve_to_canonical_record() {
        let mut sugar = IngredientRecord::new("sugar", Some(Ruling::Halal));
        sugar.aliases = vec!["Cane Sugar".to_string(), "sucrose".to_string()];
        let kb = kb(vec![sugar]);

        assert_eq!(kb.canonical_identifier("cane_sugar"), Some("sugar"));
        assert!(kb.contains("sucrose"));
        assert_eq!(kb.alias_count(), 2);
    }

    #[test]
    fn conflicting_alias_keeps_first_owner() {
        let mut first = IngredientRecord::new("beet_sugar", Some(Ruling::Halal));
        first.aliases = vec!["sugar".to_string()];
        let mut second = IngredientRecord::new("cane_sugar", Some(Ruling::Halal));
        second.aliases = vec!["sugar".to_string()];
        let kb = kb(vec![first, second]);

        assert_eq!(kb.canonical_identifier("sugar"), Some("beet_sugar"));
        assert!(kb
            .data_quality_issues()
            .iter()
            .any(|issue| issue.kind == DataQualityKind::AliasConflict));
    }

    #[test]
    fn duplicate_identifier_later_record_wins() {
        let kb = kb(vec![
            IngredientRecord::new("vanilla", Some(Ruling::Conditional)),
            IngredientRecord::new("Vanilla", Some(Ruling::Halal)),
        ]);
        assert_eq!(kb.len(), 1);
        assert_eq!(kb.get("vanilla").and_then(|record| record.ruling), Some(Ruling::Halal));
    }

    #[test]
    fn derivation_cycles_are_listed_once() {
        let kb = kb(vec![
            IngredientRecord::new("a", Some(Ruling::Halal)).derived_from(["b"]),
            IngredientRecord::new("b", Some(Ruling::Halal)).derived_from(["c"]),
            IngredientRecord::new("c", Some(Ruling::Halal)).derived_from(["a"]),
            IngredientRecord::new("d", Some(Ruling::Halal)).derived_from(["a"]),
        ]);
        assert_eq!(
            kb.derivation_cycles(),
            vec![vec!["a".to_string(), "b".to_string(), "c".to_string()]]
        );
    }

    #[test]
    fn dense_cycle_is_reported_once_per_component() {
        let kb = kb(vec![
            IngredientRecord::new("a", Some(Ruling::Halal)).derived_from(["b", "c"]),
            IngredientRecord::new("b", Some(Ruling::Halal)).derived_from(["a", "c"]),
            IngredientRecord::new("c", Some(Ruling::Halal)).derived_from(["a", "b"]),
            IngredientRecord::new("x", Some(Ruling::Halal)).derived_from(["y"]),
            IngredientRecord::new("y", Some(Ruling::Halal)).derived_from(["x"]),
        ]);
        assert_eq!(
            kb.derivation_cycles(),
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["x".to_string(), "y".to_string()],
            ]
        );
    }

    #[test]
    fn wide_layered_graph_without_cycles_is_scanned_quickly() {
        let layers = 40;
        let width = 3;
        let mut records = Vec::new();
        for layer in 0..layers {
            for slot in 0..width {
                let identifier = format!("layer_{layer}_{slot}");
                let ancestors: Vec<String> = if layer + 1 < layers {
                    (0..width).map(|next| format!("layer_{}_{next}", layer + 1)).collect()
                } else {
                    Vec::new()
                };
                records.push(IngredientRecord::new(&identifier, Some(Ruling::Halal)).derived_from(ancestors));
            }
        }
        let kb = kb(records);

        let started = std::time::Instant::now();
        assert!(kb.derivation_cycles().is_empty());
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn invalid_record_fails_construction() {
        let mut record = IngredientRecord::new("salt", Some(Ruling::Halal));
        record.base_confidence = Some(-1.0);
        assert!(KnowledgeBase::from_records(vec![record]).is_err());
    }
}
