use crate::error_surface::ViewMode;
use crate::types::{BranchInfo, FlashMessage};
use crate::ui::colors;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

pub struct StatusBarState<'a> {
    pub branch: &'a BranchInfo,
    pub view_mode: ViewMode,
    pub staged_count: usize,
    pub unstaged_count: usize,
    pub untracked_count: usize,
    pub selected_count: usize,
    /// Labels of operations still running.
    pub running: Vec<&'static str>,
    pub flash_message: Option<&'a FlashMessage>,
}

fn key_hint(key: &'static str, label: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(key, Style::default().fg(colors::CYAN)),
        Span::styled(label, Style::default().fg(colors::GRAY)),
    ]
}

pub fn draw(frame: &mut Frame, area: Rect, state: StatusBarState<'_>) {
    let line = if let Some(flash) = state.flash_message {
        let (prefix, color) = if flash.is_error {
            ("✗ ", colors::RED)
        } else {
            ("✓ ", colors::GREEN)
        };
        Line::from(vec![
            Span::raw(" "),
            Span::styled(prefix, Style::default().fg(color)),
            Span::styled(flash.text.as_str(), Style::default().fg(color)),
        ])
    } else {
        let mut spans = vec![
            Span::raw(" "),
            Span::styled(state.branch.to_string(), Style::default().fg(colors::CYAN)),
            Span::styled(format!(" [{}]", state.view_mode.label()), Style::default().fg(colors::MAGENTA)),
            Span::raw(" "),
            Span::styled("S:", Style::default().fg(colors::TEXT)),
            Span::styled(state.staged_count.to_string(), Style::default().fg(colors::GREEN)),
            Span::raw(" "),
            Span::styled("U:", Style::default().fg(colors::TEXT)),
            Span::styled(state.unstaged_count.to_string(), Style::default().fg(colors::YELLOW)),
            Span::raw(" "),
            Span::styled("?:", Style::default().fg(colors::TEXT)),
            Span::styled(state.untracked_count.to_string(), Style::default().fg(colors::GRAY)),
        ];
        if state.selected_count > 0 {
            spans.push(Span::styled(
                format!("  {} selected", state.selected_count),
                Style::default().fg(colors::BLUE),
            ));
        }
        if !state.running.is_empty() {
            spans.push(Span::styled(
                format!("  ⟳ {}", state.running.join(", ")),
                Style::default().fg(colors::YELLOW),
            ));
        }
        spans.push(Span::raw("  "));
        for (key, label) in [
            ("m", ":menu "),
            ("s", ":stage "),
            ("c", ":commit "),
            ("p", ":push "),
            ("Tab", ":log "),
            ("q", ":quit"),
        ] {
            spans.extend(key_hint(key, label));
        }
        Line::from(spans)
    };

    let paragraph = Paragraph::new(line).style(Style::default().bg(colors::SURFACE));
    frame.render_widget(paragraph, area);
}
