use crate::error_surface::ActiveError;
use crate::ui::colors;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

const MAX_MESSAGE_LINES: usize = 4;

/// Rows the banner needs: message, hint line and borders.
pub fn height(error: &ActiveError) -> u16 {
    let lines = error.message.lines().count().clamp(1, MAX_MESSAGE_LINES);
    (lines + 3) as u16
}

pub fn draw(frame: &mut Frame, area: Rect, error: &ActiveError) {
    let mut lines: Vec<Line> = error
        .message
        .lines()
        .take(MAX_MESSAGE_LINES)
        .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(colors::TEXT))))
        .collect();

    let mut hint = vec![
        Span::styled("x", Style::default().fg(colors::CYAN)),
        Span::styled(":dismiss", Style::default().fg(colors::GRAY)),
    ];
    if let Some(action) = &error.action {
        let label_style = if action.disabled {
            Style::default().fg(colors::OVERLAY)
        } else {
            Style::default().fg(colors::YELLOW).add_modifier(Modifier::BOLD)
        };
        hint.push(Span::raw("  "));
        hint.push(Span::styled("a", Style::default().fg(colors::CYAN)));
        hint.push(Span::styled(format!(":{}", action.label), label_style));
    }
    lines.push(Line::from(hint));

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors::ERROR_BORDER))
                .title(format!(" {} failed ", error.key)),
        );
    frame.render_widget(paragraph, area);
}
