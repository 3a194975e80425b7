use crate::app::MenuState;
use crate::ui::colors;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem},
    Frame,
};

/// Menu rectangle opened at `anchor`, shifted to stay inside `bounds`.
pub fn menu_rect(menu: &MenuState, bounds: Rect) -> Rect {
    let label_width = menu
        .items
        .iter()
        .map(|item| item.label.chars().count())
        .max()
        .unwrap_or(0);
    let width = ((label_width + 4) as u16).min(bounds.width);
    let height = ((menu.items.len() + 2) as u16).min(bounds.height);

    let (x, y) = menu.anchor;
    let x = x.min(bounds.x + bounds.width.saturating_sub(width)).max(bounds.x);
    let y = y.min(bounds.y + bounds.height.saturating_sub(height)).max(bounds.y);
    Rect::new(x, y, width, height)
}

pub fn draw(frame: &mut Frame, menu: &MenuState) -> Rect {
    let area = menu_rect(menu, frame.area());

    let items: Vec<ListItem> = menu
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let style = if i == menu.highlighted {
                Style::default().fg(colors::TEXT).bg(colors::SURFACE).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors::TEXT)
            };
            ListItem::new(Line::from(Span::styled(format!(" {} ", item.label), style)))
        })
        .collect();

    frame.render_widget(Clear, area);
    frame.render_widget(
        List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors::BLUE)),
        ),
        area,
    );
    area
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{FileAction, FileMenuItem};

    fn menu(anchor: (u16, u16)) -> MenuState {
        MenuState {
            items: vec![
                FileMenuItem {
                    label: "Stage file".into(),
                    action: FileAction::Stage(vec!["a.rs".into()]),
                },
                FileMenuItem {
                    label: "Discard change".into(),
                    action: FileAction::Discard(vec!["a.rs".into()]),
                },
            ],
            highlighted: 0,
            anchor,
        }
    }

    #[test]
    fn menu_opens_at_anchor() {
        let rect = menu_rect(&menu((5, 3)), Rect::new(0, 0, 80, 24));
        assert_eq!(rect, Rect::new(5, 3, 18, 4));
    }

    #[test]
    fn menu_is_pushed_inside_bounds() {
        let rect = menu_rect(&menu((78, 23)), Rect::new(0, 0, 80, 24));
        assert_eq!(rect, Rect::new(62, 20, 18, 4));
    }
}
