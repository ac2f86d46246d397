use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

/// Status bar widget that displays forest stats, selection info, key hints,
/// or transient status messages.
pub struct StatusBarWidget<'a> {
    stats_str: &'a str,
    selection_info: &'a str,
    theme: &'a ThemeColors,
    status_message: Option<&'a str>,
    is_error: bool,
    filter_info: Option<&'a str>,
    watcher_status: Option<&'a str>,
    detached_warning: Option<&'a str>,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(stats_str: &'a str, selection_info: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            stats_str,
            selection_info,
            theme,
            status_message: None,
            is_error: false,
            filter_info: None,
            watcher_status: None,
            detached_warning: None,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }

    pub fn filter_info(mut self, info: &'a str) -> Self {
        self.filter_info = Some(info);
        self
    }

    pub fn watcher_status(mut self, status: &'a str) -> Self {
        self.watcher_status = Some(status);
        self
    }

    pub fn detached_warning(mut self, warning: &'a str) -> Self {
        self.detached_warning = Some(warning);
        self
    }
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default()
                    .bg(self.theme.error_fg)
                    .fg(self.theme.status_fg)
            } else {
                Style::default().fg(self.theme.success_fg)
            };

            // Pad or truncate message to fill full width
            let display: String = if msg.chars().count() >= width {
                msg.chars().take(width).collect()
            } else {
                format!("{:<width$}", msg, width = width)
            };

            let line = Line::from(Span::styled(display, style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        // Normal bar: [stats] [selection] [filter] [watcher] [key hints]
        let key_hints = " space:sel  s:subtree  x:export  /:filter  r:reload ";
        let hints_len = key_hints.len();
        let remaining = width.saturating_sub(hints_len);

        let stats_style = Style::default().fg(self.theme.status_fg);
        let selection_style = Style::default().fg(self.theme.info_fg);
        let hints_style = Style::default()
            .fg(self.theme.dim_fg)
            .add_modifier(Modifier::DIM);

        let stats_display: String = self.stats_str.chars().take(remaining).collect();
        let selection_budget = remaining.saturating_sub(stats_display.chars().count() + 1);
        let selection_display: String = self
            .selection_info
            .chars()
            .take(selection_budget)
            .collect();

        let mut spans = vec![
            Span::styled(stats_display, stats_style),
            Span::raw(" "),
            Span::styled(selection_display, selection_style),
        ];

        if let Some(filter_str) = self.filter_info {
            let filter_style = Style::default()
                .fg(self.theme.accent_fg)
                .add_modifier(Modifier::BOLD);
            spans.push(Span::raw(" "));
            spans.push(Span::styled(filter_str.to_string(), filter_style));
        }

        if let Some(warning_str) = self.detached_warning {
            let warning_style = Style::default()
                .fg(self.theme.warning_fg)
                .add_modifier(Modifier::BOLD);
            spans.push(Span::raw(" "));
            spans.push(Span::styled(warning_str.to_string(), warning_style));
        }

        if let Some(watcher_str) = self.watcher_status {
            let watcher_style = Style::default().fg(self.theme.success_fg);
            spans.push(Span::raw(" "));
            spans.push(Span::styled(watcher_str.to_string(), watcher_style));
        }

        // Pad to fill remaining width if needed, then add hints
        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let pad = width.saturating_sub(used).saturating_sub(hints_len);
        if pad > 0 {
            spans.push(Span::raw(" ".repeat(pad)));
        }
        spans.push(Span::styled(key_hints, hints_style));

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
