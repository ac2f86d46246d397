use ratatui::{
    layout::{Constraint, Direction, Layout},
    widgets::{Block, Borders},
    Frame,
};

use crate::app::App;
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree::TreeWidget;
use crate::org::node::NodeKind;

/// Render the application UI: the tree panel with a one-line status bar
/// underneath.
pub fn render(app: &mut App, frame: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    // Update scroll offset to keep selected item visible
    let visible_height = chunks[0].height.saturating_sub(2) as usize; // account for border
    app.update_scroll(visible_height);

    let title = app
        .payload_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "organizations".to_string());
    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(ratatui::style::Style::default().fg(app.theme.border_fg));

    let theme = app.theme.clone();
    let tree_widget = TreeWidget::new(app, &theme, app.use_icons).block(block);
    frame.render_widget(tree_widget, chunks[0]);

    render_status_bar(app, frame, chunks[1]);
}

fn render_status_bar(app: &App, frame: &mut Frame, area: ratatui::layout::Rect) {
    let stats = app.engine.forest_stats();
    let stats_str = format!(
        "{} units · {:.0}% active",
        stats.total_nodes, stats.active_percent
    );

    let selection = app.engine.selection();
    let selection_str = if selection.is_empty() {
        String::new()
    } else {
        let institutions = selection
            .iter()
            .filter(|k| k.kind() == NodeKind::Institution)
            .count();
        let departments = selection.len() - institutions;
        format!("sel: {institutions} org / {departments} dept")
    };

    let filter_str = if app.is_filtering {
        Some(format!("/{}", app.filter_query))
    } else {
        None
    };

    let detached = app.engine.detached().len();
    let detached_str = if detached > 0 {
        Some(format!("! {detached} orphaned"))
    } else {
        None
    };

    let mut widget = StatusBarWidget::new(&stats_str, &selection_str, &app.theme);

    if let Some((msg, _)) = &app.status_message {
        let is_error = msg.starts_with("Reload failed") || msg.starts_with("Export failed");
        widget = widget.status_message(msg, is_error);
    }
    if let Some(ref f) = filter_str {
        widget = widget.filter_info(f);
    }
    if let Some(ref d) = detached_str {
        widget = widget.detached_warning(d);
    }
    if app.watcher_active {
        widget = widget.watcher_status("⟳ watching");
    }

    frame.render_widget(widget, area);
}
