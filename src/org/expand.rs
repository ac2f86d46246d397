//! Expand/collapse state, keyed by [`NodeKey`].
//!
//! Leaf keys never enter the set: expanding a leaf is a no-op and
//! `is_expanded` on a leaf always answers false. The set outlives forest
//! rebuilds; `prune` drops keys the new forest no longer expands.

use std::collections::HashSet;

use crate::org::node::{Forest, NodeKey};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionSet {
    expanded: HashSet<NodeKey>,
}

impl ExpansionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial state for a freshly built forest: every root with at
    /// least one child starts expanded.
    pub fn for_forest(forest: &Forest) -> Self {
        let expanded = forest
            .roots()
            .iter()
            .filter(|root| root.has_children())
            .map(|root| root.key)
            .collect();
        Self { expanded }
    }

    pub fn is_expanded(&self, key: NodeKey) -> bool {
        self.expanded.contains(&key)
    }

    /// Expand a node. No-op for leaves and for keys not in the forest.
    pub fn expand(&mut self, forest: &Forest, key: NodeKey) {
        if forest.get(key).is_some_and(|node| node.has_children()) {
            self.expanded.insert(key);
        }
    }

    pub fn collapse(&mut self, key: NodeKey) {
        self.expanded.remove(&key);
    }

    pub fn toggle(&mut self, forest: &Forest, key: NodeKey) {
        if self.expanded.contains(&key) {
            self.expanded.remove(&key);
        } else {
            self.expand(forest, key);
        }
    }

    /// Expand every node in the forest that has at least one child.
    pub fn expand_all(&mut self, forest: &Forest) {
        for node in forest.iter() {
            if node.has_children() {
                self.expanded.insert(node.key);
            }
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Drop keys the new forest cannot expand: absent nodes, and nodes
    /// that no longer have children. Everything else is left untouched.
    pub fn prune(&mut self, forest: &Forest) {
        let expandable: HashSet<NodeKey> = forest
            .iter()
            .filter(|node| node.has_children())
            .map(|node| node.key)
            .collect();
        self.expanded.retain(|key| expandable.contains(key));
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}
