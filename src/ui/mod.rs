pub mod action_menu;
pub mod colors;
pub mod diff_panel;
pub mod error_banner;
pub mod file_list;
pub mod log_panel;
pub mod prompt;
pub mod status_bar;

use crate::app::App;
use crate::error_surface::ViewMode;
use crate::operations::OperationKind;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const MIN_WIDTH: u16 = 30;
const MIN_HEIGHT: u16 = 10;

const TRACKED_OPERATIONS: [OperationKind; 8] = [
    OperationKind::Commit,
    OperationKind::Push,
    OperationKind::Pull,
    OperationKind::Fetch,
    OperationKind::Sync,
    OperationKind::GenerateMessage,
    OperationKind::RootScan,
    OperationKind::Log,
];

pub fn draw(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        draw_too_small(frame, area);
        return;
    }

    let banner_height = app.active_error.as_ref().map_or(0, error_banner::height);
    let max_file_list_height = (area.height / 3).max(5);
    let file_list_height =
        file_list::calculate_height(app.staged.len(), app.unstaged.len(), max_file_list_height);
    app.file_list_height = file_list_height.saturating_sub(2) as usize;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(banner_height),
            Constraint::Length(file_list_height),
            Constraint::Min(5),
        ])
        .split(area);

    let running = TRACKED_OPERATIONS
        .iter()
        .filter(|kind| app.operations.is_loading(**kind))
        .map(|kind| kind.label())
        .collect();
    status_bar::draw(
        frame,
        chunks[0],
        status_bar::StatusBarState {
            branch: &app.branch,
            view_mode: app.view_mode,
            staged_count: app.staged.len(),
            unstaged_count: app.unstaged.len(),
            untracked_count: app.untracked_count,
            selected_count: app.selection.state().len(),
            running,
            flash_message: app.flash_message.as_ref(),
        },
    );

    if let Some(error) = &app.active_error {
        error_banner::draw(frame, chunks[1], error);
    }

    app.file_list_area = chunks[2];
    app.preview_area = chunks[3];

    file_list::draw(
        frame,
        chunks[2],
        file_list::FileListState {
            staged: &app.staged,
            unstaged: &app.unstaged,
            highlight_index: app.highlight_index,
            selection: app.selection.state(),
            previewed: app.previewed.as_ref(),
            scroll_offset: app.file_list_scroll,
        },
    );

    match app.view_mode {
        ViewMode::Log => log_panel::draw(
            frame,
            chunks[3],
            &app.log_entries,
            app.operations.is_loading(OperationKind::Log),
            app.preview_scroll,
        ),
        _ => diff_panel::draw(
            frame,
            chunks[3],
            &app.current_diff,
            app.previewed.as_ref(),
            app.preview_scroll,
        ),
    }

    app.menu_area = match &app.menu {
        Some(menu) => action_menu::draw(frame, menu),
        None => Rect::default(),
    };

    if let Some(confirm) = &app.confirm_prompt {
        prompt::draw_confirm(frame, confirm);
    } else if let Some(input) = &app.commit_input {
        prompt::draw_commit(
            frame,
            input,
            app.operations.is_loading(OperationKind::Commit),
            app.operations.is_loading(OperationKind::GenerateMessage),
        );
    }
}

fn draw_too_small(frame: &mut Frame, area: Rect) {
    let message = Paragraph::new(Line::from(Span::raw("Terminal too small")))
        .block(Block::default().borders(Borders::NONE))
        .style(Style::default().fg(colors::GRAY));
    frame.render_widget(message, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_surface::{ActiveError, ErrorAction, ErrorCommand};
    use crate::selection::{ClickModifiers, CombinedList, SelectionEngine};
    use crate::types::{ChangeRecord, ChangeStatus, ConfirmPrompt, DiffContent, LogEntry, Section};
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    fn record(path: &str, status: ChangeStatus, section: Section) -> ChangeRecord {
        ChangeRecord {
            additions: 5,
            deletions: 3,
            ..ChangeRecord::new(path, status, section)
        }
    }

    fn buffer_to_string(buffer: &Buffer) -> String {
        let area = buffer.area;
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render(width: u16, height: u16, f: impl FnOnce(&mut Frame)) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(f).unwrap();
        buffer_to_string(terminal.backend().buffer())
    }

    fn draw_list(staged: &[ChangeRecord], unstaged: &[ChangeRecord], engine: &SelectionEngine) -> String {
        render(80, 12, |frame| {
            file_list::draw(
                frame,
                frame.area(),
                file_list::FileListState {
                    staged,
                    unstaged,
                    highlight_index: Some(0),
                    selection: engine.state(),
                    previewed: None,
                    scroll_offset: 0,
                },
            )
        })
    }

    #[test]
    fn draw_too_small_shows_message() {
        let screen = render(20, 5, |frame| draw_too_small(frame, frame.area()));
        assert!(screen.contains("Terminal too small"));
    }

    #[test]
    fn file_list_shows_both_sections_and_counts() {
        let staged = vec![record("staged.rs", ChangeStatus::Added, Section::Staged)];
        let unstaged = vec![record("unstaged.rs", ChangeStatus::Modified, Section::Unstaged)];
        let screen = draw_list(&staged, &unstaged, &SelectionEngine::default());
        assert!(screen.contains("[STAGED] 1"));
        assert!(screen.contains("[UNSTAGED] 1"));
        assert!(screen.contains("+5/-3"));
        assert!(screen.contains(">"));
    }

    #[test]
    fn file_list_marks_every_selected_row() {
        let unstaged = vec![
            record("a.rs", ChangeStatus::Modified, Section::Unstaged),
            record("b.rs", ChangeStatus::Modified, Section::Unstaged),
            record("c.rs", ChangeStatus::Modified, Section::Unstaged),
        ];
        let mut engine = SelectionEngine::new(CombinedList::from_sections(&[], &unstaged));
        engine.handle_click("a.rs", ClickModifiers::PLAIN);
        engine.handle_click("c.rs", ClickModifiers::TOGGLE);

        let screen = draw_list(&[], &unstaged, &engine);

        assert_eq!(screen.matches('●').count(), 2);
        assert!(screen.contains("2 selected"));
    }

    #[test]
    fn file_list_shows_rename_arrow() {
        let mut entry = record("new.rs", ChangeStatus::Renamed, Section::Staged);
        entry.old_path = Some("old.rs".to_string());
        let screen = draw_list(&[entry], &[], &SelectionEngine::default());
        assert!(screen.contains("old.rs → new.rs"));
    }

    #[test]
    fn diff_panel_placeholders() {
        let cases = [
            (DiffContent::Empty, "preview"),
            (DiffContent::Clean, "Working tree clean"),
            (DiffContent::Binary, "Binary file"),
            (DiffContent::InvalidUtf8, "invalid UTF-8"),
        ];
        for (diff, expected) in cases {
            let screen = render(80, 20, |frame| {
                diff_panel::draw(frame, frame.area(), &diff, None, 0)
            });
            assert!(screen.contains(expected), "missing {expected:?}");
        }
    }

    #[test]
    fn diff_panel_title_names_previewed_file() {
        let previewed = (Section::Staged, "src/lib.rs".to_string());
        let screen = render(80, 10, |frame| {
            diff_panel::draw(frame, frame.area(), &DiffContent::Empty, Some(&previewed), 0)
        });
        assert!(screen.contains("Diff · staged src/lib.rs"));
    }

    #[test]
    fn error_banner_shows_message_and_action() {
        let error = ActiveError {
            key: "push".into(),
            message: "Remote has new commits.\n\nrejected".into(),
            signature: "ws:/r:diff:push:x".into(),
            action: Some(ErrorAction {
                label: "Sync (pull then push)".into(),
                command: ErrorCommand::Sync,
                disabled: false,
                loading: false,
            }),
        };
        assert_eq!(error_banner::height(&error), 6);
        let screen = render(80, 6, |frame| error_banner::draw(frame, frame.area(), &error));
        assert!(screen.contains("push failed"));
        assert!(screen.contains("rejected"));
        assert!(screen.contains("x:dismiss"));
        assert!(screen.contains("a:Sync (pull then push)"));
    }

    #[test]
    fn log_panel_lists_commits() {
        let entries = vec![LogEntry {
            sha: "0123456789abcdef".into(),
            summary: "Fix parser".into(),
            author: "Sam".into(),
        }];
        let screen = render(60, 6, |frame| {
            log_panel::draw(frame, frame.area(), &entries, false, 0)
        });
        assert!(screen.contains("0123456 Fix parser"));
        assert!(screen.contains("Sam"));

        let loading = render(60, 6, |frame| log_panel::draw(frame, frame.area(), &[], true, 0));
        assert!(loading.contains("Loading history"));
    }

    #[test]
    fn confirm_prompt_lists_paths() {
        let prompt = ConfirmPrompt {
            message: crate::actions::discard_prompt(&["a.rs".into(), "b.rs".into()]),
            paths: vec!["a.rs".into(), "b.rs".into()],
        };
        let screen = render(80, 20, |frame| prompt::draw_confirm(frame, &prompt));
        assert!(screen.contains("Discard changes in these files?"));
        assert!(screen.contains("b.rs"));
        assert!(screen.contains("y:discard"));
    }

    #[test]
    fn commit_prompt_shows_input() {
        let screen = render(80, 20, |frame| prompt::draw_commit(frame, "Fix typo", false, true));
        assert!(screen.contains("Commit message"));
        assert!(screen.contains("Fix typo"));
        assert!(screen.contains("Generating message"));
    }
}
