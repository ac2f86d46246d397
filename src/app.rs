//! Application state: the view over the organization tree engine.
//!
//! `App` owns the [`TreeEngine`] and derives `flat_items`, the visible
//! rows of the tree panel, from the forest plus expansion state. Any
//! mutation that can change visibility re-runs `flatten()`.

use std::path::PathBuf;
use std::time::Instant;

use crate::config::AppConfig;
use crate::error::Result;
use crate::org::engine::TreeEngine;
use crate::org::node::{NodeKey, NodeKind, OrgNode};
use crate::org::payload::OrgListing;
use crate::theme::ThemeColors;

/// A flattened representation of a tree node for rendering.
#[derive(Debug, Clone)]
pub struct FlatItem {
    pub key: NodeKey,
    pub name: String,
    pub short_name: String,
    pub kind: NodeKind,
    pub depth: usize,
    pub is_active: bool,
    pub is_expanded: bool,
    pub has_children: bool,
    pub is_last_sibling: bool,
}

/// Main application state.
pub struct App {
    pub engine: TreeEngine,
    pub flat_items: Vec<FlatItem>,
    pub selected_index: usize,
    pub scroll_offset: usize,
    /// Show inactive organizations in the tree.
    pub show_inactive: bool,
    /// Current inline filter query string.
    pub filter_query: String,
    /// Whether the tree is currently being filtered.
    pub is_filtering: bool,
    /// Whether filter input mode is active (keys go to the query).
    pub filter_input_active: bool,
    pub should_quit: bool,
    pub status_message: Option<(String, Instant)>,
    pub watcher_active: bool,
    pub payload_path: PathBuf,
    pub theme: ThemeColors,
    pub use_icons: bool,
    pub short_names: bool,
}

impl App {
    /// Create the application state from an initial listing.
    pub fn new(
        listing: &OrgListing,
        payload_path: PathBuf,
        config: &AppConfig,
        theme: ThemeColors,
    ) -> Result<Self> {
        let engine = TreeEngine::new(listing)?;
        let mut app = Self {
            engine,
            flat_items: Vec::new(),
            selected_index: 0,
            scroll_offset: 0,
            show_inactive: config.show_inactive(),
            filter_query: String::new(),
            is_filtering: false,
            filter_input_active: false,
            should_quit: false,
            status_message: None,
            watcher_active: false,
            payload_path,
            theme,
            use_icons: config.use_icons(),
            short_names: config.short_names(),
        };
        app.flatten();
        Ok(app)
    }

    // ── Flattening ──────────────────────────────────────────────────────

    /// Rebuild the flat items list from the forest, respecting expansion
    /// state, `show_inactive`, and the active filter query.
    pub fn flatten(&mut self) {
        if self.is_filtering && !self.filter_query.is_empty() {
            self.apply_filter();
            return;
        }
        self.flat_items.clear();

        let roots = self.engine.forest().roots();
        let visible: Vec<&OrgNode> = roots
            .iter()
            .filter(|n| self.show_inactive || n.is_active)
            .collect();
        for (i, root) in visible.iter().enumerate() {
            let is_last = i == visible.len() - 1;
            Self::flatten_node(
                &self.engine,
                root,
                &mut self.flat_items,
                0,
                self.show_inactive,
                is_last,
            );
        }
        self.clamp_selection();
    }

    fn flatten_node(
        engine: &TreeEngine,
        node: &OrgNode,
        items: &mut Vec<FlatItem>,
        depth: usize,
        show_inactive: bool,
        is_last: bool,
    ) {
        items.push(FlatItem {
            key: node.key,
            name: node.name.clone(),
            short_name: node.short_name.clone(),
            kind: node.kind(),
            depth,
            is_active: node.is_active,
            is_expanded: engine.is_expanded(node.key),
            has_children: node.has_children(),
            is_last_sibling: is_last,
        });

        if engine.is_expanded(node.key) {
            let visible: Vec<&OrgNode> = node
                .children
                .iter()
                .filter(|c| show_inactive || c.is_active)
                .collect();
            for (i, child) in visible.iter().enumerate() {
                let is_last_child = i == visible.len() - 1;
                Self::flatten_node(engine, child, items, depth + 1, show_inactive, is_last_child);
            }
        }
    }

    /// Apply inline filter: rebuild flat_items showing only matches plus
    /// their ancestors. Case-insensitive substring match on the name.
    pub fn apply_filter(&mut self) {
        if self.filter_query.is_empty() {
            self.is_filtering = false;
            self.flatten();
            return;
        }

        self.is_filtering = true;
        self.flat_items.clear();

        let query_lower = self.filter_query.to_lowercase();
        let roots = self.engine.forest().roots();
        let visible: Vec<&OrgNode> = roots
            .iter()
            .filter(|n| self.show_inactive || n.is_active)
            .collect();
        for (i, root) in visible.iter().enumerate() {
            let is_last = i == visible.len() - 1;
            let mut sub_items = Vec::new();
            if Self::flatten_node_filtered(
                root,
                &mut sub_items,
                0,
                self.show_inactive,
                is_last,
                &query_lower,
            ) {
                self.flat_items.extend(sub_items);
            }
        }
        self.clamp_selection();
    }

    /// Flatten a subtree, keeping only matching nodes and ancestors of
    /// matches. Matching subtrees render fully expanded so the match is
    /// reachable. Returns true if the subtree contains any match.
    fn flatten_node_filtered(
        node: &OrgNode,
        items: &mut Vec<FlatItem>,
        depth: usize,
        show_inactive: bool,
        is_last: bool,
        query: &str,
    ) -> bool {
        let self_matches = node.name.to_lowercase().contains(query)
            || node.short_name.to_lowercase().contains(query);

        let mut child_matches = false;
        let mut child_items = Vec::new();
        let visible: Vec<&OrgNode> = node
            .children
            .iter()
            .filter(|c| show_inactive || c.is_active)
            .collect();
        for (i, child) in visible.iter().enumerate() {
            let is_last_child = i == visible.len() - 1;
            if Self::flatten_node_filtered(
                child,
                &mut child_items,
                depth + 1,
                show_inactive,
                is_last_child,
                query,
            ) {
                child_matches = true;
            }
        }

        if self_matches || child_matches {
            items.push(FlatItem {
                key: node.key,
                name: node.name.clone(),
                short_name: node.short_name.clone(),
                kind: node.kind(),
                depth,
                is_active: node.is_active,
                is_expanded: child_matches,
                has_children: node.has_children(),
                is_last_sibling: is_last,
            });
            items.extend(child_items);
            true
        } else {
            false
        }
    }

    fn clamp_selection(&mut self) {
        if !self.flat_items.is_empty() && self.selected_index >= self.flat_items.len() {
            self.selected_index = self.flat_items.len() - 1;
        }
        if self.flat_items.is_empty() {
            self.selected_index = 0;
        }
    }

    // ── Cursor movement ─────────────────────────────────────────────────

    /// The currently focused row, if any.
    pub fn selected_item(&self) -> Option<&FlatItem> {
        self.flat_items.get(self.selected_index)
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        let len = self.flat_items.len();
        if len > 0 && self.selected_index < len - 1 {
            self.selected_index += 1;
        }
    }

    /// Move selection up by one item.
    pub fn select_previous(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        if !self.flat_items.is_empty() {
            self.selected_index = self.flat_items.len() - 1;
        }
    }

    /// Update the scroll offset to keep the selected item visible.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_index - visible_height + 1;
        }
    }

    // ── Expansion ───────────────────────────────────────────────────────

    /// Expand the focused node (no-op on leaves and already-expanded nodes).
    pub fn expand_selected(&mut self) {
        let Some(item) = self.selected_item() else {
            return;
        };
        if !item.has_children || item.is_expanded {
            return;
        }
        let key = item.key;
        self.engine.on_toggle_expand(key);
        self.flatten();
    }

    /// Collapse the focused node if expanded, otherwise jump to its parent.
    pub fn collapse_selected(&mut self) {
        let Some(item) = self.selected_item() else {
            return;
        };
        let key = item.key;

        if item.is_expanded {
            self.engine.on_toggle_expand(key);
            self.flatten();
            return;
        }

        let parent = self.engine.forest().get(key).and_then(|n| n.parent);
        if let Some(parent_key) = parent {
            if let Some(i) = self.flat_items.iter().position(|it| it.key == parent_key) {
                self.selected_index = i;
            }
        }
    }

    /// Toggle expansion of the focused node.
    pub fn toggle_selected(&mut self) {
        let Some(item) = self.selected_item() else {
            return;
        };
        if !item.has_children {
            return;
        }
        let key = item.key;
        self.engine.on_toggle_expand(key);
        self.flatten();
    }

    pub fn expand_all(&mut self) {
        self.engine.on_expand_all();
        self.flatten();
    }

    pub fn collapse_all(&mut self) {
        self.engine.on_collapse_all();
        self.flatten();
    }

    // ── Selection ───────────────────────────────────────────────────────

    /// Toggle membership of the focused node in the selection.
    pub fn toggle_select_current(&mut self) {
        if let Some(item) = self.selected_item() {
            self.engine.on_toggle_select(item.key);
        }
    }

    /// Select or deselect the focused node together with its descendants.
    pub fn select_subtree_current(&mut self) {
        if let Some(item) = self.selected_item() {
            let key = item.key;
            self.engine.on_select_subtree(key);
            let count = self.engine.selection().len();
            self.set_status_message(format!("Selection: {count} node(s)"));
        }
    }

    /// Select every institution at the given hierarchy level.
    pub fn select_institutions_at_level(&mut self, level: u8) {
        self.engine.on_select_by_predicate(|n| n.level() == Some(level));
        let count = self.engine.selection().len();
        self.set_status_message(format!("Selected level {level}: {count} node(s) total"));
    }

    /// Select every department in the forest.
    pub fn select_all_departments(&mut self) {
        self.engine
            .on_select_by_predicate(|n| n.kind() == NodeKind::Department);
        let count = self.engine.selection().len();
        self.set_status_message(format!("Selected departments: {count} node(s) total"));
    }

    pub fn clear_selection(&mut self) {
        self.engine.on_clear_selection();
        self.set_status_message("Selection cleared".to_string());
    }

    /// Render the current selection export as a JSON preview.
    pub fn export_selection_preview(&mut self) {
        let export = self.engine.selection_export();
        match serde_json::to_string(&export) {
            Ok(json) => self.set_status_message(format!("Export: {json}")),
            Err(e) => self.set_status_message(format!("Export failed: {e}")),
        }
    }

    // ── Visibility toggles ──────────────────────────────────────────────

    /// Toggle visibility of inactive organizations and re-flatten.
    pub fn toggle_inactive(&mut self) {
        self.show_inactive = !self.show_inactive;
        self.flatten();
    }

    // ── Filter input ────────────────────────────────────────────────────

    pub fn start_filter(&mut self) {
        self.filter_input_active = true;
        self.filter_query.clear();
        self.apply_filter();
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter_query.push(c);
        self.apply_filter();
    }

    pub fn pop_filter_char(&mut self) {
        self.filter_query.pop();
        self.apply_filter();
    }

    /// Leave filter input mode but keep the filtered view.
    pub fn confirm_filter(&mut self) {
        self.filter_input_active = false;
    }

    /// Cancel filtering entirely and restore the normal view.
    pub fn cancel_filter(&mut self) {
        self.filter_input_active = false;
        self.filter_query.clear();
        self.is_filtering = false;
        self.flatten();
    }

    // ── Reload ──────────────────────────────────────────────────────────

    /// Apply a freshly fetched listing.
    ///
    /// `seq` is the fetch sequence number assigned when the fetch was
    /// issued; stale listings are discarded by the engine.
    pub fn reload(&mut self, seq: u64, listing: &OrgListing) {
        match self.engine.on_rebuild(seq, listing) {
            Ok(true) => {
                self.flatten();
                let stats = self.engine.forest_stats();
                let detached = self.engine.detached().len();
                if detached > 0 {
                    self.set_status_message(format!(
                        "Reloaded: {} node(s), {} orphaned entr{} skipped",
                        stats.total_nodes,
                        detached,
                        if detached == 1 { "y" } else { "ies" }
                    ));
                } else {
                    self.set_status_message(format!("Reloaded: {} node(s)", stats.total_nodes));
                }
            }
            Ok(false) => {
                // Stale fetch; a newer listing has already been applied
            }
            Err(e) => {
                self.set_status_message(format!("Reload failed: {e}"));
            }
        }
    }

    // ── Status & lifecycle ──────────────────────────────────────────────

    /// Set a status message with current timestamp.
    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Clear the status message if it has been displayed for more than 4 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, ref created)) = self.status_message {
            if created.elapsed().as_secs() > 4 {
                self.status_message = None;
            }
        }
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}
