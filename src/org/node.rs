//! Core data model: node identity, organization nodes, and the forest.
//!
//! All expansion/selection bookkeeping is keyed by [`NodeKey`], the pair
//! of node kind and numeric id. Institution ids and department ids live
//! in separate id spaces on the server, so the kind is part of the
//! identity — never an arithmetic offset folded into the id.

use std::collections::HashSet;
use std::fmt;

use crate::error::{AppError, Result};

/// Kind of organization node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Institution,
    Department,
}

impl NodeKind {
    /// Parse a wire-level kind string. Rejects anything unrecognized.
    pub fn from_wire(s: &str) -> Result<Self> {
        match s {
            "institution" => Ok(NodeKind::Institution),
            "department" => Ok(NodeKind::Department),
            other => Err(AppError::UnknownKind(other.to_string())),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Institution => "institution",
            NodeKind::Department => "department",
        }
    }
}

/// Stable identity of a node: the (kind, id) pair.
///
/// Two nodes with equal `id` but different `kind` compare unequal, so a
/// single expansion or selection set can hold both kinds without
/// cross-kind collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    kind: NodeKind,
    id: u64,
}

impl NodeKey {
    pub fn new(kind: NodeKind, id: u64) -> Self {
        Self { kind, id }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.label(), self.id)
    }
}

/// Kind-specific detail carried by a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeDetail {
    /// Hierarchy level 1 (ministry) through 5, plus the server's type
    /// label ("ministry", "region", "sector", "school", ...).
    Institution { type_label: String, level: u8 },
    /// Department category ("academic", "administrative", ...).
    Department { category: String },
}

/// One organization or department node.
#[derive(Debug, Clone, PartialEq)]
pub struct OrgNode {
    pub key: NodeKey,
    pub name: String,
    pub short_name: String,
    pub detail: NodeDetail,
    pub is_active: bool,
    /// Ordered children; may mix kinds (sub-institutions and departments).
    pub children: Vec<OrgNode>,
    /// Back-reference for lookups; `None` for roots and detached nodes.
    pub parent: Option<NodeKey>,
}

impl OrgNode {
    pub fn new(key: NodeKey, name: String, short_name: String, detail: NodeDetail, is_active: bool) -> Self {
        Self {
            key,
            name,
            short_name,
            detail,
            is_active,
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.key.kind()
    }

    pub fn id(&self) -> u64 {
        self.key.id()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Institution hierarchy level, if this is an institution.
    pub fn level(&self) -> Option<u8> {
        match &self.detail {
            NodeDetail::Institution { level, .. } => Some(*level),
            NodeDetail::Department { .. } => None,
        }
    }

    /// The server's type label ("school", "region", ...) or department category.
    pub fn type_label(&self) -> &str {
        match &self.detail {
            NodeDetail::Institution { type_label, .. } => type_label,
            NodeDetail::Department { category } => category,
        }
    }

    /// Pre-order traversal over this node and all of its descendants.
    pub fn iter_subtree(&self) -> PreorderIter<'_> {
        PreorderIter { stack: vec![self] }
    }
}

impl Drop for OrgNode {
    /// Tear down deep chains iteratively; the derived drop glue would
    /// recurse once per level.
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

/// Ordered collection of root nodes and their descendants.
///
/// Invariants, enforced at construction: no key appears twice, and every
/// non-root node is reachable from exactly one root (ownership via
/// `children` makes sharing and cycles unrepresentable).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Forest {
    roots: Vec<OrgNode>,
    keys: HashSet<NodeKey>,
}

impl Forest {
    /// Build a forest from root nodes, rejecting duplicate keys.
    pub fn new(roots: Vec<OrgNode>) -> Result<Self> {
        let mut keys = HashSet::new();
        let mut stack: Vec<&OrgNode> = roots.iter().collect();
        while let Some(node) = stack.pop() {
            if !keys.insert(node.key) {
                return Err(AppError::DuplicateNode(node.key));
            }
            stack.extend(node.children.iter());
        }
        Ok(Self { roots, keys })
    }

    pub fn roots(&self) -> &[OrgNode] {
        &self.roots
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn keys(&self) -> &HashSet<NodeKey> {
        &self.keys
    }

    /// Total node count across all roots.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Find a node anywhere in the forest by key.
    pub fn get(&self, key: NodeKey) -> Option<&OrgNode> {
        if !self.keys.contains(&key) {
            return None;
        }
        self.iter().find(|node| node.key == key)
    }

    /// Depth-first pre-order traversal over every node in the forest.
    ///
    /// Explicit stack: traversal depth is bounded by heap, not the call
    /// stack, because organizational depth is data-driven.
    pub fn iter(&self) -> PreorderIter<'_> {
        PreorderIter {
            stack: self.roots.iter().rev().collect(),
        }
    }
}

/// Iterator for [`Forest::iter`] and [`OrgNode::iter_subtree`].
pub struct PreorderIter<'a> {
    stack: Vec<&'a OrgNode>,
}

impl<'a> Iterator for PreorderIter<'a> {
    type Item = &'a OrgNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn same_id_different_kind_yields_distinct_keys() {
        let a = NodeKey::new(NodeKind::Institution, 5);
        let b = NodeKey::new(NodeKind::Department, 5);
        assert_ne!(a, b);
        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn key_accessors_are_inverses() {
        let key = NodeKey::new(NodeKind::Department, 42);
        assert_eq!(key.kind(), NodeKind::Department);
        assert_eq!(key.id(), 42);
    }

    #[test]
    fn key_display_is_kind_tagged() {
        assert_eq!(NodeKey::new(NodeKind::Institution, 5).to_string(), "institution:5");
        assert_eq!(NodeKey::new(NodeKind::Department, 5).to_string(), "department:5");
    }

    #[test]
    fn kind_from_wire_accepts_known() {
        assert_eq!(NodeKind::from_wire("institution").unwrap(), NodeKind::Institution);
        assert_eq!(NodeKind::from_wire("department").unwrap(), NodeKind::Department);
    }

    #[test]
    fn kind_from_wire_rejects_unknown() {
        let err = NodeKind::from_wire("faculty").unwrap_err();
        assert!(matches!(err, AppError::UnknownKind(ref s) if s == "faculty"));
    }

    #[test]
    fn forest_rejects_duplicate_keys() {
        let a = institution(1, "A", "ministry", 1, true);
        let b = institution(1, "B", "ministry", 1, true);
        let err = Forest::new(vec![a, b]).unwrap_err();
        assert!(matches!(err, AppError::DuplicateNode(_)));
    }

    #[test]
    fn forest_allows_same_id_across_kinds() {
        let dept = department(4, "Accounting", "administrative", true);
        let inst = with_children(institution(4, "School", "school", 4, true), vec![dept]);
        let forest = Forest::new(vec![inst]).unwrap();
        assert_eq!(forest.len(), 2);
        assert!(forest.contains(NodeKey::new(NodeKind::Institution, 4)));
        assert!(forest.contains(NodeKey::new(NodeKind::Department, 4)));
    }

    #[test]
    fn preorder_visits_parents_before_children_in_order() {
        let forest = ministry_chain();
        let ids: Vec<u64> = forest.iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn preorder_across_multiple_roots_keeps_root_order() {
        let a = with_children(
            institution(1, "A", "region", 2, true),
            vec![institution(2, "A1", "sector", 3, true)],
        );
        let b = institution(3, "B", "region", 2, true);
        let forest = Forest::new(vec![a, b]).unwrap();
        let ids: Vec<u64> = forest.iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn get_finds_nested_node() {
        let forest = ministry_chain();
        let node = forest.get(NodeKey::new(NodeKind::Institution, 3)).unwrap();
        assert_eq!(node.name, "Sector East");
        assert_eq!(node.parent, Some(NodeKey::new(NodeKind::Institution, 2)));
    }

    #[test]
    fn get_misses_absent_key() {
        let forest = ministry_chain();
        assert!(forest.get(NodeKey::new(NodeKind::Department, 1)).is_none());
    }

    #[test]
    fn empty_forest() {
        let forest = Forest::new(Vec::new()).unwrap();
        assert!(forest.is_empty());
        assert_eq!(forest.len(), 0);
        assert_eq!(forest.iter().count(), 0);
    }
}
