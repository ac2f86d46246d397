//! The engine facade: the only surface a rendering or submission layer
//! talks to. One mutation entry point per user intent, one read entry
//! point per derived fact.

use crate::error::Result;
use crate::org::build::{build, BuildOutput};
use crate::org::expand::ExpansionSet;
use crate::org::node::{Forest, NodeKey, OrgNode};
use crate::org::payload::OrgListing;
use crate::org::select::{SelectionExport, SelectionSet};
use crate::org::stats::{aggregate, aggregate_forest, AggregateStats};

pub struct TreeEngine {
    forest: Forest,
    detached: Vec<OrgNode>,
    expansion: ExpansionSet,
    selection: SelectionSet,
    /// Sequence number of the last listing applied via [`on_rebuild`].
    ///
    /// [`on_rebuild`]: TreeEngine::on_rebuild
    last_applied_seq: u64,
}

impl TreeEngine {
    /// Build the initial forest. Roots with children start expanded;
    /// nothing is selected.
    pub fn new(listing: &OrgListing) -> Result<Self> {
        let BuildOutput { forest, detached } = build(listing)?;
        let expansion = ExpansionSet::for_forest(&forest);
        Ok(Self {
            forest,
            detached,
            expansion,
            selection: SelectionSet::new(),
            last_applied_seq: 0,
        })
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Orphaned subtrees from the last build, kept for reporting.
    pub fn detached(&self) -> &[OrgNode] {
        &self.detached
    }

    pub fn last_applied_seq(&self) -> u64 {
        self.last_applied_seq
    }

    // ── Mutations ───────────────────────────────────────────────────────

    pub fn on_toggle_expand(&mut self, key: NodeKey) {
        self.expansion.toggle(&self.forest, key);
    }

    pub fn on_expand_all(&mut self) {
        self.expansion.expand_all(&self.forest);
    }

    pub fn on_collapse_all(&mut self) {
        self.expansion.collapse_all();
    }

    pub fn on_toggle_select(&mut self, key: NodeKey) {
        if self.forest.contains(key) {
            self.selection.toggle(key);
        }
    }

    /// Select the node's descendant closure; if the closure is already
    /// fully selected, deselect it instead.
    pub fn on_select_subtree(&mut self, key: NodeKey) {
        let Some(node) = self.forest.get(key) else {
            return;
        };
        if self.selection.is_subtree_selected(node) {
            self.selection.deselect_with_descendants(node);
        } else {
            self.selection.select_with_descendants(node);
        }
    }

    pub fn on_select_by_predicate<F>(&mut self, predicate: F)
    where
        F: Fn(&OrgNode) -> bool,
    {
        self.selection.select_by_predicate(&self.forest, predicate);
    }

    pub fn on_clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Replace the forest from a fresh listing.
    ///
    /// `seq` is assigned by the caller when the fetch is *issued*, so a
    /// slow stale response cannot clobber a newer one: listings whose
    /// sequence number is not above the last applied one are discarded
    /// (`Ok(false)`). Expansion state is pruned before selection state;
    /// callers never observe a forest alongside state sets that
    /// reference nodes the forest no longer contains. On build errors
    /// the previous forest and state sets stay untouched.
    pub fn on_rebuild(&mut self, seq: u64, listing: &OrgListing) -> Result<bool> {
        if seq <= self.last_applied_seq {
            return Ok(false);
        }
        let BuildOutput { forest, detached } = build(listing)?;
        self.forest = forest;
        self.detached = detached;
        self.expansion.prune(&self.forest);
        self.selection.prune(&self.forest);
        self.last_applied_seq = seq;
        Ok(true)
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn is_expanded(&self, key: NodeKey) -> bool {
        self.expansion.is_expanded(key)
    }

    pub fn is_selected(&self, key: NodeKey) -> bool {
        self.selection.is_selected(key)
    }

    /// Aggregate statistics for the subtree rooted at `key`.
    pub fn stats_for(&self, key: NodeKey) -> Option<AggregateStats> {
        self.forest.get(key).map(aggregate)
    }

    pub fn forest_stats(&self) -> AggregateStats {
        aggregate_forest(&self.forest)
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_export(&self) -> SelectionExport {
        self.selection.export()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::org::node::{NodeKind, NodeKey};
    use crate::org::payload::OrgListing;

    fn ikey(id: u64) -> NodeKey {
        NodeKey::new(NodeKind::Institution, id)
    }

    fn dkey(id: u64) -> NodeKey {
        NodeKey::new(NodeKind::Department, id)
    }

    /// Ministry(1) → Region(2) → Sector(3) → School(4), Sector inactive,
    /// with department HR(9) under the ministry.
    fn listing() -> OrgListing {
        OrgListing::from_json(
            r#"[
            {
                "id": 1, "name": "Ministry", "type": "ministry", "level": 1,
                "children": [
                    { "id": 2, "name": "Region", "type": "region", "level": 2,
                      "children": [
                        { "id": 3, "name": "Sector", "type": "sector", "level": 3,
                          "is_active": false,
                          "children": [
                            { "id": 4, "name": "School", "type": "school", "level": 4 }
                          ] }
                      ] }
                ],
                "departments": [
                    { "id": 9, "name": "HR", "department_type": "administrative" }
                ]
            }
        ]"#,
        )
        .unwrap()
    }

    /// Same hierarchy with Sector(3) and School(4) removed.
    fn listing_without_sector() -> OrgListing {
        OrgListing::from_json(
            r#"[
            {
                "id": 1, "name": "Ministry", "type": "ministry", "level": 1,
                "children": [
                    { "id": 2, "name": "Region", "type": "region", "level": 2,
                      "children": [
                        { "id": 5, "name": "Sector West", "type": "sector", "level": 3 }
                      ] }
                ],
                "departments": [
                    { "id": 9, "name": "HR", "department_type": "administrative" }
                ]
            }
        ]"#,
        )
        .unwrap()
    }

    #[test]
    fn new_engine_expands_roots_only() {
        let engine = TreeEngine::new(&listing()).unwrap();
        assert!(engine.is_expanded(ikey(1)));
        assert!(!engine.is_expanded(ikey(2)));
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn toggle_expand_and_select_round_trip() {
        let mut engine = TreeEngine::new(&listing()).unwrap();
        engine.on_toggle_expand(ikey(2));
        assert!(engine.is_expanded(ikey(2)));
        engine.on_toggle_select(ikey(2));
        assert!(engine.is_selected(ikey(2)));
        engine.on_toggle_select(ikey(2));
        assert!(!engine.is_selected(ikey(2)));
    }

    #[test]
    fn selecting_a_key_outside_the_forest_is_a_noop() {
        let mut engine = TreeEngine::new(&listing()).unwrap();
        engine.on_toggle_select(ikey(777));
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn select_subtree_selects_closure_and_toggles_off() {
        let mut engine = TreeEngine::new(&listing()).unwrap();
        engine.on_select_subtree(ikey(2));
        assert!(engine.is_selected(ikey(2)));
        assert!(engine.is_selected(ikey(3)));
        assert!(engine.is_selected(ikey(4)));
        assert_eq!(engine.selection().len(), 3);

        engine.on_select_subtree(ikey(2));
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn select_by_predicate_feeds_export() {
        let mut engine = TreeEngine::new(&listing()).unwrap();
        engine.on_select_by_predicate(|n| n.level() == Some(3) || n.kind() == NodeKind::Department);
        let export = engine.selection_export();
        assert_eq!(export.institution_ids, vec![3]);
        assert_eq!(export.department_ids, vec![9]);
    }

    #[test]
    fn stats_for_subtree_and_forest() {
        let engine = TreeEngine::new(&listing()).unwrap();
        let ministry = engine.stats_for(ikey(1)).unwrap();
        assert_eq!(ministry.total_nodes, 5);
        assert_eq!(ministry.active_nodes, 4);
        assert_eq!(ministry.active_percent, 80.0);

        let chain = engine.stats_for(ikey(2)).unwrap();
        assert_eq!(chain.total_nodes, 3);
        assert_eq!(chain.active_nodes, 2);

        assert_eq!(engine.forest_stats().total_nodes, 5);
        assert!(engine.stats_for(ikey(777)).is_none());
    }

    #[test]
    fn rebuild_prunes_stale_state_and_keeps_the_rest() {
        let mut engine = TreeEngine::new(&listing()).unwrap();
        engine.on_expand_all();
        engine.on_select_subtree(ikey(2));
        engine.on_toggle_select(dkey(9));
        assert!(engine.is_expanded(ikey(3)));

        let applied = engine.on_rebuild(1, &listing_without_sector()).unwrap();
        assert!(applied);

        // Sector(3) and School(4) are gone from both state sets.
        assert!(!engine.is_expanded(ikey(3)));
        assert!(!engine.is_selected(ikey(3)));
        assert!(!engine.is_selected(ikey(4)));
        // Surviving keys are untouched.
        assert!(engine.is_expanded(ikey(1)));
        assert!(engine.is_expanded(ikey(2)));
        assert!(engine.is_selected(ikey(2)));
        assert!(engine.is_selected(dkey(9)));

        assert_eq!(engine.forest_stats().total_nodes, 5);
        assert_eq!(engine.stats_for(ikey(1)).unwrap().total_nodes, 5);
    }

    #[test]
    fn stale_rebuild_is_discarded() {
        let mut engine = TreeEngine::new(&listing()).unwrap();
        assert!(engine.on_rebuild(2, &listing_without_sector()).unwrap());
        assert_eq!(engine.last_applied_seq(), 2);

        // A slower fetch issued earlier arrives late and is dropped.
        let applied = engine.on_rebuild(1, &listing()).unwrap();
        assert!(!applied);
        assert_eq!(engine.last_applied_seq(), 2);
        assert!(!engine.forest().contains(ikey(3)));
    }

    #[test]
    fn failed_rebuild_leaves_state_untouched() {
        let mut engine = TreeEngine::new(&listing()).unwrap();
        engine.on_toggle_select(ikey(4));

        let bad = OrgListing::Flat(vec![crate::org::payload::FlatEntry {
            id: 1,
            kind: "faculty".to_string(),
            name: "X".to_string(),
            short_name: String::new(),
            institution_type: None,
            level: None,
            department_type: None,
            is_active: true,
            parent_id: None,
            parent_kind: None,
        }]);
        assert!(engine.on_rebuild(1, &bad).is_err());

        assert_eq!(engine.last_applied_seq(), 0);
        assert!(engine.is_selected(ikey(4)));
        assert_eq!(engine.forest_stats().total_nodes, 5);
    }

    #[test]
    fn detached_nodes_are_reported_not_merged() {
        let flat = OrgListing::Flat(vec![
            crate::org::payload::FlatEntry {
                id: 1,
                kind: "institution".to_string(),
                name: "Ministry".to_string(),
                short_name: String::new(),
                institution_type: Some("ministry".to_string()),
                level: Some(1),
                department_type: None,
                is_active: true,
                parent_id: None,
                parent_kind: None,
            },
            crate::org::payload::FlatEntry {
                id: 6,
                kind: "department".to_string(),
                name: "Lost Dept".to_string(),
                short_name: String::new(),
                institution_type: None,
                level: None,
                department_type: None,
                is_active: true,
                parent_id: Some(404),
                parent_kind: Some("institution".to_string()),
            },
        ]);
        let engine = TreeEngine::new(&flat).unwrap();
        assert_eq!(engine.forest_stats().total_nodes, 1);
        assert_eq!(engine.detached().len(), 1);
        assert_eq!(engine.detached()[0].name, "Lost Dept");
    }
}
