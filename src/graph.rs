//! Definition and dependency graphs for one file
//!
//! [`DefinitionMap`] answers "which excerpt defines this qualified name",
//! [`DependencyGraph`] answers "which names does this definition reference".
//! Both are rebuilt for every resolution request.

use crate::symbol::{ContextItem, ItemKind};
use std::collections::{BTreeSet, HashMap};

/// Suffix of the pseudo-node a call site depends on.
pub const DECLARE_SUFFIX: &str = "-declare";

/// Name of the declaration pseudo-node for `qualified`.
pub fn declare_name(qualified: &str) -> String {
    format!("{}{}", qualified, DECLARE_SUFFIX)
}

/// Qualified name -> defining item.
#[derive(Debug, Default, Clone)]
pub struct DefinitionMap {
    items: HashMap<String, ContextItem>,
}

impl DefinitionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the name is already defined. The first definition wins,
    /// except that a real body replaces a bodiless prototype.
    pub fn define(&mut self, name: impl Into<String>, item: ContextItem) -> bool {
        let name = name.into();
        match self.items.get(&name) {
            Some(existing)
                if existing.kind != ItemKind::Declaration || item.kind == ItemKind::Declaration =>
            {
                false
            }
            _ => {
                self.items.insert(name, item);
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ContextItem> {
        self.items.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Defined names in sorted order.
    #[cfg(test)]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.items.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Qualified name -> names it references.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    edges_from: HashMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `from` references `to`. Self edges are dropped.
    pub fn add_edge(&mut self, from: &str, to: impl Into<String>) {
        let to = to.into();
        if to == from {
            return;
        }
        self.edges_from.entry(from.to_string()).or_default().insert(to);
    }

    pub fn add_edges<I, S>(&mut self, from: &str, targets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for to in targets {
            self.add_edge(from, to);
        }
    }

    /// Names referenced by `name`, in sorted order.
    pub fn neighbors(&self, name: &str) -> impl Iterator<Item = &str> {
        self.edges_from
            .get(name)
            .into_iter()
            .flat_map(|targets| targets.iter().map(String::as_str))
    }
}

/// Everything dependency mode learns about one file.
#[derive(Debug, Default, Clone)]
pub struct FileIndex {
    pub definitions: DefinitionMap,
    pub dependencies: DependencyGraph,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }
}
