use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::app::{App, FlatItem};
use crate::org::node::NodeKind;
use crate::theme::ThemeColors;

/// Tree widget that renders the organization tree with box-drawing characters.
pub struct TreeWidget<'a> {
    app: &'a App,
    theme: &'a ThemeColors,
    use_icons: bool,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(app: &'a App, theme: &'a ThemeColors, use_icons: bool) -> Self {
        Self {
            app,
            theme,
            use_icons,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    /// Build the prefix string for tree indentation using box-drawing characters.
    ///
    /// We need to know the ancestor chain to draw continuation lines correctly.
    fn build_prefix(item: &FlatItem, items: &[FlatItem], item_index: usize) -> String {
        if item.depth == 0 {
            return String::new();
        }

        // Build prefix from left to right for each depth level
        let mut parts: Vec<&str> = Vec::new();

        // For each ancestor level (1..depth), determine if it's the last sibling at that level
        // We need to look backwards through ancestors to figure this out
        for d in 1..item.depth {
            // Find the ancestor at depth d that contains this item
            let mut ancestor_is_last = false;
            // Walk backwards from current item to find the ancestor at depth d
            for j in (0..item_index).rev() {
                if items[j].depth == d {
                    ancestor_is_last = items[j].is_last_sibling;
                    break;
                }
                if items[j].depth < d {
                    break;
                }
            }
            if ancestor_is_last {
                parts.push("   ");
            } else {
                parts.push("│  ");
            }
        }

        // The connector for this item
        if item.is_last_sibling {
            parts.push("└──");
        } else {
            parts.push("├──");
        }

        parts.join("")
    }

    /// Expansion arrow for nodes with children, aligning spacer for leaves.
    fn expansion_arrow(item: &FlatItem) -> &'static str {
        if !item.has_children {
            "  "
        } else if item.is_expanded {
            "▾ "
        } else {
            "▸ "
        }
    }

    /// Kind indicator: institution vs department.
    fn item_indicator(&self, item: &FlatItem) -> &'static str {
        if self.use_icons {
            match item.kind {
                NodeKind::Institution => "\u{f1ad} ",
                NodeKind::Department => "\u{f0c0} ",
            }
        } else {
            match item.kind {
                NodeKind::Institution => "[O] ",
                NodeKind::Department => "[D] ",
            }
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let items = &self.app.flat_items;
        let selected = self.app.selected_index;
        let visible_height = inner_area.height as usize;

        if items.is_empty() || visible_height == 0 {
            return;
        }

        let scroll = self.app.scroll_offset;
        let visible_items = items.iter().enumerate().skip(scroll).take(visible_height);

        for (i, (idx, item)) in visible_items.enumerate() {
            let y = inner_area.y + i as u16;
            if y >= inner_area.y + inner_area.height {
                break;
            }

            let prefix = Self::build_prefix(item, items, idx);
            let arrow = Self::expansion_arrow(item);
            let indicator = self.item_indicator(item);

            let is_focused = idx == selected;
            let is_checked = self.app.engine.is_selected(item.key);

            let style = if is_focused {
                Style::default()
                    .bg(self.theme.tree_selected_bg)
                    .fg(self.theme.tree_selected_fg)
                    .add_modifier(Modifier::BOLD)
            } else if !item.is_active {
                Style::default()
                    .fg(self.theme.inactive_fg)
                    .add_modifier(Modifier::DIM)
            } else {
                match item.kind {
                    NodeKind::Institution => Style::default()
                        .fg(self.theme.institution_fg)
                        .add_modifier(Modifier::BOLD),
                    NodeKind::Department => Style::default().fg(self.theme.department_fg),
                }
            };

            let marker = if is_checked { "● " } else { "" };
            let display_name = if self.app.short_names && !item.short_name.is_empty() {
                &item.short_name
            } else {
                &item.name
            };
            let suffix = if item.is_active { "" } else { " (inactive)" };
            let line_content = format!(
                "{}{}{}{}{}{}",
                prefix, arrow, marker, indicator, display_name, suffix
            );
            let span = Span::styled(line_content, style);
            let line = Line::from(span);

            let line_area = Rect::new(inner_area.x, y, inner_area.width, 1);
            buf.set_line(line_area.x, line_area.y, &line, line_area.width);
        }
    }
}
