use crate::types::ConfirmPrompt;
use crate::ui::colors;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

fn centered(bounds: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(bounds.width);
    let height = height.min(bounds.height);
    Rect::new(
        bounds.x + (bounds.width - width) / 2,
        bounds.y + (bounds.height - height) / 2,
        width,
        height,
    )
}

pub fn draw_confirm(frame: &mut Frame, prompt: &ConfirmPrompt) {
    let mut lines: Vec<Line> = prompt
        .message
        .lines()
        .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(colors::TEXT))))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("y", Style::default().fg(colors::RED).add_modifier(Modifier::BOLD)),
        Span::styled(":discard  ", Style::default().fg(colors::GRAY)),
        Span::styled("any other key", Style::default().fg(colors::CYAN)),
        Span::styled(":cancel", Style::default().fg(colors::GRAY)),
    ]));

    let width = lines.iter().map(Line::width).max().unwrap_or(0) as u16 + 4;
    let area = centered(frame.area(), width.max(40), lines.len() as u16 + 2);

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors::YELLOW))
                .title(" Confirm "),
        ),
        area,
    );
}

pub fn draw_commit(frame: &mut Frame, input: &str, committing: bool, generating: bool) {
    let status = if committing {
        "Committing…"
    } else if generating {
        "Generating message…"
    } else {
        ""
    };
    let lines = vec![
        Line::from(vec![
            Span::styled(input.to_string(), Style::default().fg(colors::TEXT)),
            Span::styled("▏", Style::default().fg(colors::CYAN)),
        ]),
        Line::from(Span::styled(status, Style::default().fg(colors::YELLOW))),
        Line::from(vec![
            Span::styled("Enter", Style::default().fg(colors::CYAN)),
            Span::styled(":commit  ", Style::default().fg(colors::GRAY)),
            Span::styled("Ctrl+G", Style::default().fg(colors::CYAN)),
            Span::styled(":generate  ", Style::default().fg(colors::GRAY)),
            Span::styled("Esc", Style::default().fg(colors::CYAN)),
            Span::styled(":cancel", Style::default().fg(colors::GRAY)),
        ]),
    ];

    let bounds = frame.area();
    let area = centered(bounds, bounds.width.saturating_sub(8).min(72), 5);

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors::BLUE))
                .title(" Commit message "),
        ),
        area,
    );
}
