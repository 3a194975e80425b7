use crate::selection::SelectionState;
use crate::types::{ChangeRecord, ChangeStatus, Section};
use crate::ui::colors;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

pub struct FileListState<'a> {
    pub staged: &'a [ChangeRecord],
    pub unstaged: &'a [ChangeRecord],
    pub highlight_index: Option<usize>,
    pub selection: &'a SelectionState,
    pub previewed: Option<&'a (Section, String)>,
    pub scroll_offset: usize,
}

/// Screen row (headers included) of combined-list index `idx`.
pub fn visual_index(staged_len: usize, unstaged_len: usize, idx: usize) -> usize {
    let mut headers = 0;
    if staged_len > 0 {
        headers += 1;
    }
    if unstaged_len > 0 && idx >= staged_len {
        headers += 1;
    }
    idx + headers
}

/// Combined-list index shown on `visual_row`; `None` for section headers and
/// rows past the end.
pub fn row_at(staged_len: usize, unstaged_len: usize, visual_row: usize) -> Option<usize> {
    let mut row = visual_row;
    if staged_len > 0 {
        row = row.checked_sub(1)?;
        if row < staged_len {
            return Some(row);
        }
        row -= staged_len;
    }
    if unstaged_len > 0 {
        row = row.checked_sub(1)?;
        if row < unstaged_len {
            return Some(staged_len + row);
        }
    }
    None
}

pub fn draw(frame: &mut Frame, area: Rect, state: FileListState<'_>) {
    let mut items: Vec<ListItem> = Vec::new();
    let mut index = 0usize;

    for (section, records) in [
        (Section::Staged, state.staged),
        (Section::Unstaged, state.unstaged),
    ] {
        if records.is_empty() {
            continue;
        }
        items.push(section_header(section, records.len()));
        for record in records {
            let is_previewed = state
                .previewed
                .is_some_and(|(s, p)| *s == section && p == &record.path);
            items.push(file_item(
                record,
                state.highlight_index == Some(index),
                state.selection.is_selected(&record.path),
                is_previewed,
                area.width,
            ));
            index += 1;
        }
    }

    let visible_height = area.height.saturating_sub(2) as usize;
    let start = state.scroll_offset.min(items.len().saturating_sub(1));
    let visible_items: Vec<ListItem> = items.into_iter().skip(start).take(visible_height).collect();

    let title = match state.selection.len() {
        0 => " Changes ".to_string(),
        n => format!(" Changes · {n} selected "),
    };
    let list = List::new(visible_items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors::OVERLAY))
            .title(title),
    );

    frame.render_widget(list, area);
}

fn section_header(section: Section, count: usize) -> ListItem<'static> {
    ListItem::new(Line::from(vec![
        Span::styled(
            format!("[{}]", section.label()),
            Style::default().fg(colors::CYAN).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {count}"), Style::default().fg(colors::GRAY)),
    ]))
}

fn file_item(
    record: &ChangeRecord,
    is_highlighted: bool,
    is_selected: bool,
    is_previewed: bool,
    width: u16,
) -> ListItem<'static> {
    let cursor = if is_highlighted { ">" } else { " " };
    let marker = if is_selected { "● " } else { "  " };

    let label = match &record.old_path {
        Some(old) => format!("{old} → {}", record.path),
        None => record.path.clone(),
    };
    let counts = line_counts(record);

    let fixed_width = 3 + 2 + counts.chars().count() + 3;
    let available = (width as usize).saturating_sub(fixed_width);
    let label = truncate_front(&label, available);

    let mut base = Style::default();
    if is_highlighted {
        base = base.add_modifier(Modifier::BOLD);
    }
    if is_previewed {
        base = base.bg(colors::PREVIEW_BG);
    }

    let mut spans = vec![
        Span::styled(cursor, base.fg(colors::TEXT)),
        Span::styled(marker, base.fg(colors::SELECTION_MARK)),
        Span::styled(record.status.symbol(), base.fg(status_color(record.status))),
        Span::styled(" ", base),
        Span::styled(label, base.fg(colors::TEXT)),
    ];
    if !counts.is_empty() {
        spans.push(Span::styled(format!(" {counts}"), Style::default().fg(colors::GRAY)));
    }

    ListItem::new(Line::from(spans))
}

/// Keeps the tail of `text`, where the file name lives.
fn truncate_front(text: &str, max: usize) -> String {
    let len = text.chars().count();
    if len <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let tail: String = text.chars().skip(len - (max - 1)).collect();
    format!("…{tail}")
}

fn line_counts(record: &ChangeRecord) -> String {
    if record.is_binary {
        return "bin".to_string();
    }
    if record.additions == 0 && record.deletions == 0 {
        return String::new();
    }
    format!("+{}/-{}", record.additions, record.deletions)
}

fn status_color(status: ChangeStatus) -> ratatui::style::Color {
    match status {
        ChangeStatus::Added => colors::GREEN,
        ChangeStatus::Modified => colors::YELLOW,
        ChangeStatus::Deleted => colors::RED,
        ChangeStatus::Renamed => colors::BLUE,
        ChangeStatus::TypeChanged => colors::MAGENTA,
        ChangeStatus::Unknown => colors::GRAY,
    }
}

pub fn calculate_height(staged_count: usize, unstaged_count: usize, max_height: u16) -> u16 {
    let rows = visual_index(staged_count, unstaged_count, staged_count + unstaged_count);
    (rows as u16).saturating_add(2).min(max_height)
}
