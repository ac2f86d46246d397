//! Selection state with descendant-closure semantics.
//!
//! Selecting a node together with its subtree is kind-agnostic: a
//! department child joins the closure exactly like a sub-institution.
//! The set is plain set algebra over [`NodeKey`]s, so "select all of
//! type X" composes with manual deselection through `union` and
//! `difference`. Like expansion state, selection survives forest
//! rebuilds modulo pruning of stale keys.

use std::collections::HashSet;

use serde::Serialize;

use crate::org::node::{Forest, NodeKey, NodeKind, OrgNode};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    selected: HashSet<NodeKey>,
}

/// Wire shape expected by bulk-action and audience-estimation endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionExport {
    pub institution_ids: Vec<u64>,
    pub department_ids: Vec<u64>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, key: NodeKey) {
        self.selected.insert(key);
    }

    pub fn deselect(&mut self, key: NodeKey) {
        self.selected.remove(&key);
    }

    pub fn toggle(&mut self, key: NodeKey) {
        if !self.selected.remove(&key) {
            self.selected.insert(key);
        }
    }

    pub fn is_selected(&self, key: NodeKey) -> bool {
        self.selected.contains(&key)
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Select a node and every node in its subtree. Idempotent.
    pub fn select_with_descendants(&mut self, node: &OrgNode) {
        for descendant in node.iter_subtree() {
            self.selected.insert(descendant.key);
        }
    }

    /// Deselect a node and every node in its subtree.
    pub fn deselect_with_descendants(&mut self, node: &OrgNode) {
        for descendant in node.iter_subtree() {
            self.selected.remove(&descendant.key);
        }
    }

    /// True when the node and its entire subtree are selected.
    pub fn is_subtree_selected(&self, node: &OrgNode) -> bool {
        node.iter_subtree().all(|n| self.selected.contains(&n.key))
    }

    /// Union in the key of every node, at any depth, matching the
    /// predicate. Equivalent to filtering a full pre-order flattening.
    pub fn select_by_predicate<F>(&mut self, forest: &Forest, predicate: F)
    where
        F: Fn(&OrgNode) -> bool,
    {
        for node in forest.iter() {
            if predicate(node) {
                self.selected.insert(node.key);
            }
        }
    }

    pub fn union(&self, other: &SelectionSet) -> SelectionSet {
        SelectionSet {
            selected: self.selected.union(&other.selected).copied().collect(),
        }
    }

    pub fn difference(&self, other: &SelectionSet) -> SelectionSet {
        SelectionSet {
            selected: self.selected.difference(&other.selected).copied().collect(),
        }
    }

    /// Drop keys no longer present in the forest.
    pub fn prune(&mut self, forest: &Forest) {
        self.selected.retain(|key| forest.contains(*key));
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.selected.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Split the selection into per-kind id lists for submission.
    /// Ids are sorted so the export is deterministic.
    pub fn export(&self) -> SelectionExport {
        let mut institution_ids: Vec<u64> = Vec::new();
        let mut department_ids: Vec<u64> = Vec::new();
        for key in &self.selected {
            match key.kind() {
                NodeKind::Institution => institution_ids.push(key.id()),
                NodeKind::Department => department_ids.push(key.id()),
            }
        }
        institution_ids.sort_unstable();
        department_ids.sort_unstable();
        SelectionExport {
            institution_ids,
            department_ids,
        }
    }
}
