//! Aggregate statistics over a (sub)tree.

use super::node::PackageView;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Package names that occur most often in a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MostReferred {
    pub count: usize,
    pub names: Vec<String>,
}

/// Counting helpers over every node below (and optionally including) a root.
#[derive(Debug, Clone)]
pub struct DependencyStats<V> {
    all: Vec<V>,
}

impl<V: PackageView> DependencyStats<V> {
    #[must_use]
    pub fn new(root: V, include_root: bool) -> Self {
        let mut all = Vec::new();
        root.visit(include_root, |node| all.push(node));
        Self { all }
    }

    /// Every node, pre-order.
    #[must_use]
    pub fn all(&self) -> &[V] {
        &self.all
    }

    #[must_use]
    pub fn transitive_count(&self) -> usize {
        self.all.len()
    }

    #[must_use]
    pub fn distinct_names(&self) -> BTreeSet<String> {
        self.all.iter().map(|n| n.name().to_string()).collect()
    }

    #[must_use]
    pub fn distinct_name_count(&self) -> usize {
        self.distinct_names().len()
    }

    /// Number of distinct `name@version` pairs.
    #[must_use]
    pub fn distinct_version_count(&self) -> usize {
        self.all
            .iter()
            .map(PackageView::full_name)
            .collect::<BTreeSet<_>>()
            .len()
    }

    #[must_use]
    pub fn most_referred(&self) -> MostReferred {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for node in &self.all {
            *counts.entry(node.name()).or_default() += 1;
        }

        let Some(&count) = counts.values().max() else {
            return MostReferred::default();
        };
        let mut names: Vec<String> = counts
            .into_iter()
            .filter(|&(_, c)| c == count)
            .map(|(name, _)| name.to_string())
            .collect();
        names.sort();

        MostReferred { count, names }
    }

    /// Nodes ordered by number of direct dependencies, largest first. Ties
    /// keep tree order.
    #[must_use]
    pub fn most_direct_dependencies(&self) -> Vec<V> {
        let mut nodes: Vec<(usize, V)> = self
            .all
            .iter()
            .map(|n| (n.direct_dependencies().len(), *n))
            .collect();
        nodes.sort_by(|a, b| b.0.cmp(&a.0));
        nodes.into_iter().map(|(_, n)| n).collect()
    }

    /// Every name with the set of versions it resolved to.
    #[must_use]
    pub fn versions_by_name(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut versions: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for node in &self.all {
            versions
                .entry(node.name().to_string())
                .or_default()
                .insert(node.version().to_string());
        }
        versions
    }

    /// Names that resolved to the largest number of versions. Empty when no
    /// name has more than one version.
    #[must_use]
    pub fn most_versions(&self) -> BTreeMap<String, BTreeSet<String>> {
        let versions = self.versions_by_name();
        let max = versions.values().map(BTreeSet::len).max().unwrap_or(0);
        if max < 2 {
            return BTreeMap::new();
        }
        versions
            .into_iter()
            .filter(|(_, v)| v.len() == max)
            .collect()
    }
}
