use crate::types::{DiffContent, DiffLine, DiffLineKind, Section};
use crate::ui::colors;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn draw(
    frame: &mut Frame,
    area: Rect,
    diff: &DiffContent,
    previewed: Option<&(Section, String)>,
    scroll: usize,
) {
    let inner_height = area.height.saturating_sub(2) as usize;

    let lines = match diff {
        DiffContent::Empty => placeholder("Enter or click a file to preview it", colors::GRAY),
        DiffContent::Clean => placeholder("Working tree clean", colors::GRAY),
        DiffContent::Binary => placeholder("Binary file", colors::GRAY),
        DiffContent::InvalidUtf8 => {
            placeholder("File contains invalid UTF-8 encoding", colors::GRAY)
        }
        DiffContent::Text(diff_lines) => {
            render_diff_lines(diff_lines, area.width.saturating_sub(2) as usize)
        }
    };

    let scroll_offset = scroll.min(lines.len().saturating_sub(inner_height));
    let title = match previewed {
        Some((section, path)) => format!(" Diff · {} {} ", section.label().to_lowercase(), path),
        None => " Diff ".to_string(),
    };

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors::OVERLAY))
                .title(title),
        )
        .scroll((scroll_offset as u16, 0));

    frame.render_widget(paragraph, area);
}

fn placeholder(text: &'static str, color: Color) -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        Line::from(Span::styled(text, Style::default().fg(color))),
    ]
}

fn line_style(kind: DiffLineKind) -> (Style, &'static str) {
    match kind {
        DiffLineKind::Header | DiffLineKind::Hunk => (Style::default().fg(colors::CYAN), ""),
        DiffLineKind::Context => (Style::default().fg(colors::TEXT), " "),
        DiffLineKind::Added => (Style::default().fg(colors::GREEN), "+"),
        DiffLineKind::Deleted => (Style::default().fg(colors::RED), "-"),
    }
}

/// Renders diff lines with a line-number gutter, soft-wrapping to `width`.
fn render_diff_lines(diff_lines: &[DiffLine], width: usize) -> Vec<Line<'static>> {
    let number_width = diff_lines
        .iter()
        .filter_map(|l| l.new_line_number)
        .max()
        .unwrap_or(0)
        .to_string()
        .len()
        .max(3);
    let gutter_style = Style::default().fg(colors::GRAY);
    let blank_gutter = format!("{:>number_width$} │", "");
    let content_width = width.saturating_sub(number_width + 2);

    let mut out = Vec::new();
    for line in diff_lines {
        let (style, prefix) = line_style(line.kind);
        let number = match line.kind {
            DiffLineKind::Deleted => "-".to_string(),
            DiffLineKind::Context | DiffLineKind::Added => line
                .new_line_number
                .map(|n| n.to_string())
                .unwrap_or_default(),
            DiffLineKind::Header | DiffLineKind::Hunk => String::new(),
        };
        let gutter = format!("{number:>number_width$} │");

        let text = format!("{prefix}{}", line.content);
        let chars: Vec<char> = text.chars().collect();
        if content_width == 0 || chars.is_empty() {
            out.push(Line::from(vec![
                Span::styled(gutter, gutter_style),
                Span::styled(text, style),
            ]));
            continue;
        }
        for (i, chunk) in chars.chunks(content_width).enumerate() {
            let gutter = if i == 0 { gutter.clone() } else { blank_gutter.clone() };
            out.push(Line::from(vec![
                Span::styled(gutter, gutter_style),
                Span::styled(chunk.iter().collect::<String>(), style),
            ]));
        }
    }
    out
}

/// Maximum scroll offset for `diff` in a viewport of the given size.
pub fn max_scroll(diff: &DiffContent, viewport_height: usize, viewport_width: usize) -> usize {
    match diff {
        DiffContent::Text(lines) => render_diff_lines(lines, viewport_width)
            .len()
            .saturating_sub(viewport_height),
        _ => 0,
    }
}
