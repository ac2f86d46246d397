//! Aggregate statistics over a subtree, computed on demand.
//!
//! Traversal uses the explicit-stack iterators from `node`, never
//! call-stack recursion: hierarchy depth comes from server data and is
//! not bounded by the client.

use crate::org::node::{Forest, NodeKind, OrgNode};

/// Immediate-children tally by kind (not the full subtree).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub institutions: usize,
    pub departments: usize,
}

impl KindCounts {
    fn tally<'a>(children: impl Iterator<Item = &'a OrgNode>) -> Self {
        let mut counts = KindCounts::default();
        for child in children {
            match child.kind() {
                NodeKind::Institution => counts.institutions += 1,
                NodeKind::Department => counts.departments += 1,
            }
        }
        counts
    }
}

/// Derived statistics for one subtree root.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateStats {
    /// Nodes in the subtree, the root included.
    pub total_nodes: usize,
    /// Subtree nodes with the server's `is_active` flag set.
    pub active_nodes: usize,
    /// `active_nodes / total_nodes * 100`, 0 for an empty subtree.
    pub active_percent: f64,
    /// Immediate children of the root, tallied by kind.
    pub child_counts: KindCounts,
}

impl AggregateStats {
    fn from_counts(total_nodes: usize, active_nodes: usize, child_counts: KindCounts) -> Self {
        let active_percent = if total_nodes == 0 {
            0.0
        } else {
            active_nodes as f64 / total_nodes as f64 * 100.0
        };
        Self {
            total_nodes,
            active_nodes,
            active_percent,
            child_counts,
        }
    }
}

/// Compute statistics for a node's subtree. Every node is visited
/// exactly once; the forest invariants forbid shared nodes, so no
/// visited-set is needed.
pub fn aggregate(node: &OrgNode) -> AggregateStats {
    let mut total = 0;
    let mut active = 0;
    for descendant in node.iter_subtree() {
        total += 1;
        if descendant.is_active {
            active += 1;
        }
    }
    AggregateStats::from_counts(total, active, KindCounts::tally(node.children.iter()))
}

/// Statistics over the whole forest. `child_counts` tallies the roots.
pub fn aggregate_forest(forest: &Forest) -> AggregateStats {
    let mut total = 0;
    let mut active = 0;
    for node in forest.iter() {
        total += 1;
        if node.is_active {
            active += 1;
        }
    }
    AggregateStats::from_counts(total, active, KindCounts::tally(forest.roots().iter()))
}
