use crate::types::LogEntry;
use crate::ui::colors;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn draw(frame: &mut Frame, area: Rect, entries: &[LogEntry], loading: bool, scroll: usize) {
    let lines: Vec<Line> = if entries.is_empty() {
        let text = if loading { "Loading history…" } else { "No commits yet" };
        vec![
            Line::from(""),
            Line::from(Span::styled(text, Style::default().fg(colors::GRAY))),
        ]
    } else {
        entries
            .iter()
            .skip(scroll)
            .map(|entry| {
                Line::from(vec![
                    Span::styled(entry.short_sha().to_string(), Style::default().fg(colors::YELLOW)),
                    Span::raw(" "),
                    Span::styled(entry.summary.clone(), Style::default().fg(colors::TEXT)),
                    Span::styled(format!("  {}", entry.author), Style::default().fg(colors::GRAY)),
                ])
            })
            .collect()
    };

    let title = if loading { " Log (refreshing) " } else { " Log " };
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors::OVERLAY))
            .title(title),
    );
    frame.render_widget(paragraph, area);
}
