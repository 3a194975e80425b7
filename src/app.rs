use crate::actions::{self, FileAction, FileMenuItem};
use crate::config::ReviewConfig;
use crate::error_surface::{
    ActiveError, ErrorCommand, ErrorScope, ErrorSources, ErrorSurface, SyncOffer, ViewMode,
};
use crate::git;
use crate::operations::{OperationKind, OperationOutput, OperationRunner};
use crate::paths::{self, PathContext, PlatformKind};
use crate::platform;
use crate::selection::{ClickEffect, ClickModifiers, CombinedList, SelectionEngine};
use crate::types::{BranchInfo, ChangeRecord, ConfirmPrompt, DiffContent, FlashMessage, LogEntry, Section};
use crate::ui;
use crate::watcher::{RepoWatcher, WatcherEvent};
use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use git2::Repository;
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::io;
use std::path::Path;
use std::sync::mpsc::TryRecvError;
use std::time::{Duration, Instant};

/// Open row-action menu.
pub struct MenuState {
    pub items: Vec<FileMenuItem>,
    pub highlighted: usize,
    /// Screen cell the menu was opened from.
    pub anchor: (u16, u16),
}

/// Application state for the change review TUI.
pub struct App {
    repo: Option<Repository>,
    pub config: ReviewConfig,
    pub paths: PathContext,
    platform: PlatformKind,

    pub staged: Vec<ChangeRecord>,
    pub unstaged: Vec<ChangeRecord>,
    pub untracked_count: usize,
    pub branch: BranchInfo,

    pub selection: SelectionEngine,
    pub highlight_index: Option<usize>,
    pub previewed: Option<(Section, String)>,
    pub file_list_scroll: usize,
    pub file_list_height: usize,

    pub current_diff: DiffContent,
    pub preview_scroll: usize,
    pub view_mode: ViewMode,
    pub log_entries: Vec<LogEntry>,

    pub operations: OperationRunner,
    pub errors: ErrorSurface,
    pub active_error: Option<ActiveError>,
    git_error: Option<String>,

    pub menu: Option<MenuState>,
    pub confirm_prompt: Option<ConfirmPrompt>,
    pub commit_input: Option<String>,
    pub flash_message: Option<FlashMessage>,

    pub file_list_area: Rect,
    pub preview_area: Rect,
    pub menu_area: Rect,

    root_changed: bool,
}

impl App {
    pub fn new(workspace: &Path, config: ReviewConfig) -> Self {
        let workspace_path = paths::normalize_root(&workspace.to_string_lossy());
        let mut ctx = PathContext::new(workspace_path);
        ctx.repo_root = config.repo.root.clone();

        let mut app = Self {
            repo: None,
            config,
            paths: ctx,
            platform: PlatformKind::current(),
            staged: Vec::new(),
            unstaged: Vec::new(),
            untracked_count: 0,
            branch: BranchInfo::NoRepository,
            selection: SelectionEngine::default(),
            highlight_index: None,
            previewed: None,
            file_list_scroll: 0,
            file_list_height: 0,
            current_diff: DiffContent::Empty,
            preview_scroll: 0,
            view_mode: ViewMode::Diff,
            log_entries: Vec::new(),
            operations: OperationRunner::new(),
            errors: ErrorSurface::new(),
            active_error: None,
            git_error: None,
            menu: None,
            confirm_prompt: None,
            commit_input: None,
            flash_message: None,
            file_list_area: Rect::default(),
            preview_area: Rect::default(),
            menu_area: Rect::default(),
            root_changed: false,
        };

        app.open_repo();
        app.refresh();
        if app.config.repo.root.is_none() && !workspace.join(".git").exists() {
            app.scan_roots();
        }
        app.update_error_banner();
        app
    }

    /// Directory the repository is read from.
    pub fn repo_root(&self) -> String {
        self.paths.resolved_root()
    }

    fn open_repo(&mut self) {
        let root = self.repo_root();
        match git::get_repo(&root) {
            Ok(repo) => {
                tracing::info!(event = "repo.opened", %root);
                self.repo = Some(repo);
                self.git_error = None;
            }
            Err(e) => {
                tracing::warn!(event = "repo.open_failed", %root, error = %format!("{e:#}"));
                self.repo = None;
                self.git_error = Some(format!("{e:#}"));
            }
        }
    }

    pub fn refresh(&mut self) {
        let Some(repo) = self.repo.as_ref() else {
            self.branch = BranchInfo::NoRepository;
            self.apply_status(git::StatusResult {
                staged: Vec::new(),
                unstaged: Vec::new(),
                untracked_count: 0,
            });
            return;
        };
        self.branch = git::get_branch_info(repo);
        match git::get_status(repo) {
            Ok(status) => {
                self.git_error = None;
                self.apply_status(status);
            }
            Err(e) => {
                tracing::warn!(event = "status.failed", error = %format!("{e:#}"));
                self.git_error = Some(format!("{e:#}"));
            }
        }
    }

    fn apply_status(&mut self, status: git::StatusResult) {
        self.staged = status.staged;
        self.unstaged = status.unstaged;
        self.untracked_count = status.untracked_count;

        self.selection
            .update_list(CombinedList::from_sections(&self.staged, &self.unstaged));

        let len = self.selection.list().len();
        if len == 0 {
            self.highlight_index = None;
            self.previewed = None;
            self.current_diff = DiffContent::Clean;
            self.preview_scroll = 0;
            return;
        }
        self.highlight_index = Some(self.highlight_index.unwrap_or(0).min(len - 1));

        if self.previewed_record().is_some() {
            self.update_preview();
        } else {
            self.previewed = None;
            self.current_diff = DiffContent::Empty;
            self.preview_scroll = 0;
        }
        self.update_scroll_for_highlight();
    }

    fn previewed_record(&self) -> Option<&ChangeRecord> {
        let (section, path) = self.previewed.as_ref()?;
        let records = match section {
            Section::Staged => &self.staged,
            Section::Unstaged => &self.unstaged,
        };
        records.iter().find(|r| &r.path == path)
    }

    fn update_preview(&mut self) {
        let diff = match (self.repo.as_ref(), self.previewed_record()) {
            (Some(repo), Some(record)) => git::diff_for(repo, record),
            _ => DiffContent::Empty,
        };
        self.current_diff = diff;
    }

    fn highlighted_row(&self) -> Option<(Section, String)> {
        let idx = self.highlight_index?;
        self.selection
            .list()
            .get(idx)
            .map(|row| (row.section, row.path.clone()))
    }

    /// Routes a click on list row `index` through the selection engine.
    pub fn click_row(&mut self, index: usize, modifiers: ClickModifiers) {
        let Some(row) = self.selection.list().get(index).cloned() else {
            return;
        };
        self.highlight_index = Some(index);
        self.update_scroll_for_highlight();
        if let Some(ClickEffect::SelectForPreview(path)) =
            self.selection.handle_click(&row.path, modifiers)
        {
            self.previewed = Some((row.section, path));
            self.preview_scroll = 0;
            self.update_preview();
        }
    }

    pub fn open_menu_for_row(&mut self, index: usize, anchor: (u16, u16)) {
        let Some(row) = self.selection.list().get(index).cloned() else {
            return;
        };
        self.highlight_index = Some(index);
        let targets = self.selection.resolve_action_targets(&row.path);
        let items = actions::build_file_menu(&targets, self.selection.list(), &self.paths, self.platform);
        if items.is_empty() {
            return;
        }
        self.menu = Some(MenuState {
            items,
            highlighted: 0,
            anchor,
        });
    }

    fn action_targets(&mut self) -> Vec<String> {
        match self.highlighted_row() {
            Some((_, path)) => self.selection.resolve_action_targets(&path),
            None => Vec::new(),
        }
    }

    fn targets_in(&self, targets: &[String], section: Section) -> Vec<String> {
        targets
            .iter()
            .filter(|path| self.selection.list().in_section(path, section))
            .cloned()
            .collect()
    }

    pub fn stage_selected(&mut self) {
        let targets = self.action_targets();
        let paths = self.targets_in(&targets, Section::Unstaged);
        self.run_file_action(FileAction::Stage(paths));
    }

    pub fn unstage_selected(&mut self) {
        let targets = self.action_targets();
        let paths = self.targets_in(&targets, Section::Staged);
        self.run_file_action(FileAction::Unstage(paths));
    }

    pub fn discard_selected(&mut self) {
        let targets = self.action_targets();
        self.run_file_action(FileAction::Discard(targets));
    }

    pub fn run_file_action(&mut self, action: FileAction) {
        match action {
            FileAction::Stage(paths) | FileAction::Unstage(paths) if paths.is_empty() => {}
            FileAction::Discard(paths) if paths.is_empty() => {}
            FileAction::Stage(paths) => {
                let result = self.with_repo(|repo| git::stage_paths(repo, &paths));
                self.finish_index_change(result.map(|_| paths.len()), "Staged");
            }
            FileAction::Unstage(paths) => {
                let result = self.with_repo(|repo| git::unstage_paths(repo, &paths));
                self.finish_index_change(result.map(|_| paths.len()), "Unstaged");
            }
            FileAction::Discard(paths) => {
                let paths = self.with_rename_sources(paths);
                self.confirm_prompt = Some(ConfirmPrompt {
                    message: actions::discard_prompt(&paths),
                    paths,
                });
            }
            FileAction::Reveal {
                absolute_path,
                resolvable,
            } => {
                if !resolvable {
                    self.show_flash_error(format!(
                        "Couldn't show file in {}: Select a git root first.",
                        self.platform.file_manager_name()
                    ));
                    return;
                }
                if let Err(e) = platform::reveal_in_file_manager(&absolute_path) {
                    self.show_flash_error(format!("{e:#}"));
                }
            }
            FileAction::CopyFileName(text) | FileAction::CopyFilePath(text) => {
                match platform::copy_to_terminal_clipboard(&text) {
                    Ok(()) => self.show_flash_success(format!("Copied {text}")),
                    Err(e) => self.show_flash_error(format!("{e:#}")),
                }
            }
        }
    }

    /// Adds the old path of every staged rename in `paths`, so discarding the
    /// rename restores the original file too.
    fn with_rename_sources(&self, mut paths: Vec<String>) -> Vec<String> {
        for record in &self.staged {
            if let Some(old) = &record.old_path {
                if paths.contains(&record.path) && !paths.contains(old) {
                    paths.push(old.clone());
                }
            }
        }
        paths
    }

    fn with_repo<T>(&self, f: impl FnOnce(&Repository) -> Result<T>) -> Result<T> {
        match self.repo.as_ref() {
            Some(repo) => f(repo),
            None => anyhow::bail!("No git repository"),
        }
    }

    fn finish_index_change(&mut self, result: Result<usize>, verb: &str) {
        match result {
            Ok(count) => {
                self.refresh();
                self.show_flash_success(format!("{} {} file{}", verb, count, plural_s(count)));
            }
            Err(e) => self.show_flash_error(format!("Error: {e:#}")),
        }
    }

    pub fn handle_confirm(&mut self, confirmed: bool) {
        let Some(prompt) = self.confirm_prompt.take() else {
            return;
        };
        if !confirmed {
            return;
        }
        let result = self.with_repo(|repo| git::discard_paths(repo, &prompt.paths));
        self.finish_index_change(result, "Discarded");
    }

    pub fn run_menu_item(&mut self, index: usize) {
        let Some(menu) = self.menu.take() else {
            return;
        };
        if let Some(item) = menu.items.into_iter().nth(index) {
            self.run_file_action(item.action);
        }
    }

    pub fn open_commit_prompt(&mut self) {
        if self.commit_input.is_none() {
            self.commit_input = Some(String::new());
        }
    }

    fn remote_root(&mut self, kind: OperationKind) -> Option<String> {
        if self.repo.is_none() {
            self.operations.fail(kind, "No git repository");
            return None;
        }
        Some(self.repo_root())
    }

    pub fn start_commit(&mut self) {
        let Some(message) = self.commit_input.clone() else {
            return;
        };
        let Some(root) = self.remote_root(OperationKind::Commit) else {
            return;
        };
        self.operations.start(OperationKind::Commit, move || {
            let repo = git::get_repo(&root)?;
            git::commit(&repo, &message)?;
            Ok(OperationOutput::Done)
        });
    }

    pub fn start_generate_message(&mut self) {
        let staged = self.staged.clone();
        let unstaged = self.unstaged.clone();
        self.operations.start(OperationKind::GenerateMessage, move || {
            git::generate_commit_message(&staged, &unstaged).map(OperationOutput::CommitMessage)
        });
    }

    pub fn start_remote(&mut self, kind: OperationKind) {
        let op: fn(&str) -> Result<()> = match kind {
            OperationKind::Fetch => git::fetch,
            OperationKind::Pull => git::pull,
            OperationKind::Push => git::push,
            OperationKind::Sync => git::sync,
            _ => return,
        };
        let Some(root) = self.remote_root(kind) else {
            return;
        };
        self.operations.start(kind, move || {
            op(&root)?;
            Ok(OperationOutput::Done)
        });
    }

    pub fn start_log(&mut self) {
        let Some(root) = self.remote_root(OperationKind::Log) else {
            return;
        };
        let limit = self.config.display.log_limit;
        self.operations.start(OperationKind::Log, move || {
            let repo = git::get_repo(&root)?;
            git::log_entries(&repo, limit).map(OperationOutput::Log)
        });
    }

    pub fn scan_roots(&mut self) {
        let Some(workspace) = self.paths.workspace_path.clone() else {
            return;
        };
        let depth = self.config.repo.scan_depth;
        self.operations.start(OperationKind::RootScan, move || {
            git::scan_repo_roots(&paths::to_native(&workspace), depth)
                .map(OperationOutput::RootCandidates)
        });
    }

    /// Applies finished background operations.
    pub fn apply_operations(&mut self, finished: Vec<(OperationKind, OperationOutput)>) {
        for (kind, output) in finished {
            match output {
                OperationOutput::CommitMessage(message) => {
                    self.commit_input = Some(message);
                }
                OperationOutput::RootCandidates(candidates) => {
                    tracing::info!(event = "roots.scanned", count = candidates.len());
                    let before = self.repo_root();
                    self.paths.repo_root_candidates = candidates;
                    if self.repo_root() != before {
                        self.root_changed = true;
                        self.open_repo();
                        self.refresh();
                    }
                }
                OperationOutput::Log(entries) => {
                    self.log_entries = entries;
                }
                OperationOutput::Done => {
                    if kind == OperationKind::Commit {
                        self.commit_input = None;
                    }
                    self.refresh();
                    if self.view_mode == ViewMode::Log {
                        self.start_log();
                    }
                    self.show_flash_success(format!("{} finished", capitalize(kind.label())));
                }
            }
        }
    }

    pub fn take_root_change(&mut self) -> bool {
        std::mem::take(&mut self.root_changed)
    }

    pub fn toggle_view_mode(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Diff => ViewMode::Log,
            _ => ViewMode::Diff,
        };
        self.preview_scroll = 0;
        if self.view_mode == ViewMode::Log {
            self.start_log();
        }
    }

    pub fn error_sources(&self) -> ErrorSources {
        let ops = &self.operations;
        ErrorSources {
            push: ops.error(OperationKind::Push),
            pull: ops.error(OperationKind::Pull),
            fetch: ops.error(OperationKind::Fetch),
            commit: ops.error(OperationKind::Commit),
            sync: ops.error(OperationKind::Sync),
            commit_message: ops.error(OperationKind::GenerateMessage),
            git: self.git_error.clone(),
            worktree_apply: None,
            root_scan: ops.error(OperationKind::RootScan),
            log: ops.error(OperationKind::Log),
            issues: None,
            pull_requests: None,
            sync_offer: self.repo.as_ref().map(|_| SyncOffer {
                loading: ops.is_loading(OperationKind::Sync),
            }),
        }
    }

    /// Scoped by the resolved root even when it failed to open.
    pub fn error_scope(&self) -> ErrorScope {
        let root = self.repo_root();
        ErrorScope::new(
            self.paths.workspace_path.as_deref(),
            Some(root.as_str()),
            self.view_mode,
        )
    }

    pub fn update_error_banner(&mut self) {
        let scope = self.error_scope();
        let candidates = self.error_sources().candidates(self.view_mode);
        self.active_error = self.errors.recompute(&scope, &candidates);
    }

    pub fn dismiss_error(&mut self) {
        if let Some(active) = self.active_error.take() {
            self.errors.dismiss(active.signature);
            self.update_error_banner();
        }
    }

    pub fn run_error_action(&mut self) {
        let Some(action) = self.active_error.as_ref().and_then(|e| e.action.clone()) else {
            return;
        };
        if action.disabled {
            return;
        }
        match action.command {
            ErrorCommand::Sync => self.start_remote(OperationKind::Sync),
        }
    }

    pub fn show_flash_success(&mut self, text: impl Into<String>) {
        self.flash_message = Some(FlashMessage::success(text));
    }

    pub fn show_flash_error(&mut self, text: impl Into<String>) {
        self.flash_message = Some(FlashMessage::error(text));
    }

    pub fn check_flash_expiry(&mut self) {
        let timeout = Duration::from_secs(self.config.display.flash_timeout_secs);
        if self
            .flash_message
            .as_ref()
            .is_some_and(|flash| flash.is_expired(timeout))
        {
            self.flash_message = None;
        }
    }

    pub fn move_highlight(&mut self, delta: isize) {
        let len = self.selection.list().len();
        if len == 0 {
            return;
        }
        let current = self.highlight_index.unwrap_or(0) as isize;
        let new_idx = (current + delta).clamp(0, len as isize - 1) as usize;
        self.highlight_index = Some(new_idx);
        self.update_scroll_for_highlight();
    }

    fn update_scroll_for_highlight(&mut self) {
        let Some(idx) = self.highlight_index else {
            return;
        };
        let visual_idx = ui::file_list::visual_index(self.staged.len(), self.unstaged.len(), idx);
        if visual_idx < self.file_list_scroll {
            self.file_list_scroll = visual_idx;
        } else if self.file_list_height > 0
            && visual_idx >= self.file_list_scroll + self.file_list_height
        {
            self.file_list_scroll = visual_idx - self.file_list_height + 1;
        }
    }

    fn scroll_preview(&mut self, delta: isize) {
        let height = self.preview_area.height.saturating_sub(2) as usize;
        let width = self.preview_area.width.saturating_sub(2) as usize;
        let max_scroll = match self.view_mode {
            ViewMode::Diff => ui::diff_panel::max_scroll(&self.current_diff, height, width),
            _ => self.log_entries.len().saturating_sub(height),
        };
        let current = self.preview_scroll as isize;
        self.preview_scroll = (current + delta).clamp(0, max_scroll as isize) as usize;
    }

    /// List index under screen row `row`, or `None` for headers and empty space.
    fn list_index_at(&self, row: u16) -> Option<usize> {
        let area = self.file_list_area;
        if row <= area.y || row + 1 >= area.y + area.height {
            return None;
        }
        let visual_row = self.file_list_scroll + (row - area.y - 1) as usize;
        ui::file_list::row_at(self.staged.len(), self.unstaged.len(), visual_row)
    }

    /// Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.confirm_prompt.is_some() {
            let confirmed = matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y'));
            self.handle_confirm(confirmed);
            return false;
        }
        if self.commit_input.is_some() {
            self.handle_commit_key(key);
            return false;
        }
        if self.menu.is_some() {
            self.handle_menu_key(key);
            return false;
        }

        self.flash_message = None;
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Esc => {
                if self.selection.state().is_empty() {
                    return true;
                }
                self.selection.handle_list_background_click();
            }
            KeyCode::Down | KeyCode::Up => {
                self.move_highlight(if key.code == KeyCode::Down { 1 } else { -1 });
                if shift {
                    if let Some(idx) = self.highlight_index {
                        self.click_row(idx, ClickModifiers::RANGE);
                    }
                }
            }
            KeyCode::Enter => {
                if let Some(idx) = self.highlight_index {
                    self.click_row(idx, ClickModifiers::PLAIN);
                }
            }
            KeyCode::Char(' ') => {
                if let Some(idx) = self.highlight_index {
                    self.click_row(idx, ClickModifiers::TOGGLE);
                }
            }
            KeyCode::Char('m') => {
                if let Some(idx) = self.highlight_index {
                    let anchor = (self.file_list_area.x + 2, self.file_list_area.y + 1);
                    self.open_menu_for_row(idx, anchor);
                }
            }
            KeyCode::Char('s') => self.stage_selected(),
            KeyCode::Char('u') => self.unstage_selected(),
            KeyCode::Char('d') => self.discard_selected(),
            KeyCode::Char('c') => self.open_commit_prompt(),
            KeyCode::Char('f') => self.start_remote(OperationKind::Fetch),
            KeyCode::Char('p') => self.start_remote(OperationKind::Push),
            KeyCode::Char('l') => self.start_remote(OperationKind::Pull),
            KeyCode::Char('y') => self.start_remote(OperationKind::Sync),
            KeyCode::Char('x') => self.dismiss_error(),
            KeyCode::Char('a') => self.run_error_action(),
            KeyCode::Char('r') => self.scan_roots(),
            KeyCode::Tab => self.toggle_view_mode(),
            KeyCode::PageDown => {
                let page = self.preview_area.height.saturating_sub(2) as isize;
                self.scroll_preview(page);
            }
            KeyCode::PageUp => {
                let page = self.preview_area.height.saturating_sub(2) as isize;
                self.scroll_preview(-page);
            }
            _ => {}
        }
        false
    }

    fn handle_commit_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.commit_input = None,
            KeyCode::Enter => self.start_commit(),
            KeyCode::Char('g') if ctrl => self.start_generate_message(),
            KeyCode::Backspace => {
                if let Some(input) = self.commit_input.as_mut() {
                    input.pop();
                }
            }
            KeyCode::Char(c) if !ctrl => {
                if let Some(input) = self.commit_input.as_mut() {
                    input.push(c);
                }
            }
            _ => {}
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent) {
        let Some(menu) = self.menu.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.menu = None,
            KeyCode::Down => menu.highlighted = (menu.highlighted + 1).min(menu.items.len() - 1),
            KeyCode::Up => menu.highlighted = menu.highlighted.saturating_sub(1),
            KeyCode::Enter => {
                let index = menu.highlighted;
                self.run_menu_item(index);
            }
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let (col, row) = (mouse.column, mouse.row);
        let in_file_list = self.file_list_area.contains((col, row).into());
        let in_preview = self.preview_area.contains((col, row).into());

        if self.menu.is_some() {
            if let MouseEventKind::Down(_) = mouse.kind {
                let area = self.menu_area;
                if area.contains((col, row).into()) && row > area.y {
                    self.run_menu_item((row - area.y - 1) as usize);
                } else {
                    self.menu = None;
                }
            }
            return;
        }

        match mouse.kind {
            MouseEventKind::ScrollDown if in_file_list => self.move_highlight(3),
            MouseEventKind::ScrollUp if in_file_list => self.move_highlight(-3),
            MouseEventKind::ScrollDown if in_preview => self.scroll_preview(3),
            MouseEventKind::ScrollUp if in_preview => self.scroll_preview(-3),
            MouseEventKind::Down(MouseButton::Left) if in_file_list => {
                match self.list_index_at(row) {
                    Some(index) => self.click_row(index, click_modifiers(mouse.modifiers)),
                    None => self.selection.handle_list_background_click(),
                }
            }
            MouseEventKind::Down(MouseButton::Right) if in_file_list => {
                if let Some(index) = self.list_index_at(row) {
                    self.open_menu_for_row(index, (col, row));
                }
            }
            _ => {}
        }
    }
}

/// Ctrl, Alt and Super all act as the toggle modifier.
pub fn click_modifiers(modifiers: KeyModifiers) -> ClickModifiers {
    ClickModifiers {
        meta_or_ctrl: modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER),
        shift: modifiers.contains(KeyModifiers::SHIFT),
    }
}

fn plural_s(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn run(workspace: &Path, config: ReviewConfig) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, workspace, config);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn start_watcher(root: &str) -> Option<RepoWatcher> {
    match RepoWatcher::new(&paths::to_native(root)) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(event = "watcher.failed", error = %e, "falling back to polling");
            None
        }
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    workspace: &Path,
    config: ReviewConfig,
) -> Result<()> {
    let mut app = App::new(workspace, config);

    let mut watcher = start_watcher(&app.repo_root());
    let mut use_polling = watcher.is_none();

    let mut last_poll = Instant::now();
    let poll_interval = Duration::from_secs(2);
    let debounce_duration = Duration::from_millis(150);
    let mut pending_refresh: Option<Instant> = None;

    loop {
        app.update_error_banner();
        terminal.draw(|f| ui::draw(f, &mut app))?;

        let timeout = if pending_refresh.is_some() || app.operations.any_loading() {
            Duration::from_millis(10)
        } else {
            Duration::from_millis(100)
        };

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key) {
                        break;
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        let finished = app.operations.poll();
        if !finished.is_empty() {
            app.apply_operations(finished);
        }

        if app.take_root_change() {
            watcher = start_watcher(&app.repo_root());
            use_polling = watcher.is_none();
        }

        if let Some(ref w) = watcher {
            match w.receiver.try_recv() {
                Ok(WatcherEvent::Changed) => {
                    pending_refresh = Some(Instant::now());
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    if !use_polling {
                        tracing::warn!(event = "watcher.disconnected", "falling back to polling");
                    }
                    use_polling = true;
                }
            }

            while w.receiver.try_recv().is_ok() {
                pending_refresh = Some(Instant::now());
            }
        }

        if let Some(pending_time) = pending_refresh {
            if pending_time.elapsed() >= debounce_duration {
                app.refresh();
                pending_refresh = None;
            }
        }

        if use_polling && last_poll.elapsed() >= poll_interval {
            app.refresh();
            last_poll = Instant::now();
        }

        app.check_flash_expiry();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct Fixture {
        dir: TempDir,
        repo: Repository,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let repo = Repository::init(dir.path()).unwrap();
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
            Self { dir, repo }
        }

        fn write(&self, path: &str, content: &str) {
            let full = self.dir.path().join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(full, content).unwrap();
        }

        fn commit_all(&self, message: &str) {
            let mut index = self.repo.index().unwrap();
            index
                .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
                .unwrap();
            index.write().unwrap();
            let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();
            let sig = self.repo.signature().unwrap();
            let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
            let parents: Vec<&git2::Commit> = parent.iter().collect();
            self.repo
                .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
                .unwrap();
        }

        fn stage(&self, path: &str) {
            let mut index = self.repo.index().unwrap();
            index.add_path(Path::new(path)).unwrap();
            index.write().unwrap();
        }

        /// Three unstaged modifications: a.txt, b.txt, c.txt.
        fn with_three_changes() -> Self {
            let fx = Self::new();
            for name in ["a.txt", "b.txt", "c.txt"] {
                fx.write(name, "one\n");
            }
            fx.commit_all("initial");
            for name in ["a.txt", "b.txt", "c.txt"] {
                fx.write(name, "one\ntwo\n");
            }
            fx
        }

        fn app(&self) -> App {
            let mut app = App::new(self.dir.path(), ReviewConfig::default());
            app.file_list_area = Rect::new(0, 2, 60, 10);
            app.file_list_height = 8;
            app
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn click(button: MouseButton, row: u16, modifiers: KeyModifiers) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(button),
            column: 5,
            row,
            modifiers,
        }
    }

    fn selected(app: &App) -> Vec<&str> {
        app.selection
            .state()
            .selected
            .iter()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn opens_workspace_repository() {
        let fx = Fixture::with_three_changes();
        let app = fx.app();
        assert_eq!(app.unstaged.len(), 3);
        assert!(app.staged.is_empty());
        assert_eq!(app.highlight_index, Some(0));
        assert!(app.active_error.is_none());
    }

    #[test]
    fn mouse_clicks_drive_selection() {
        let fx = Fixture::with_three_changes();
        let mut app = fx.app();

        // Row 3 is the section header, rows 4..6 are the three files.
        app.handle_mouse(click(MouseButton::Left, 4, KeyModifiers::NONE));
        assert_eq!(selected(&app), vec!["a.txt"]);
        assert_eq!(app.previewed, Some((Section::Unstaged, "a.txt".to_string())));
        assert!(matches!(app.current_diff, DiffContent::Text(_)));

        app.handle_mouse(click(MouseButton::Left, 6, KeyModifiers::SHIFT));
        assert_eq!(selected(&app), vec!["a.txt", "b.txt", "c.txt"]);

        app.handle_mouse(click(MouseButton::Left, 5, KeyModifiers::CONTROL));
        assert_eq!(selected(&app), vec!["a.txt", "c.txt"]);
        assert_eq!(app.previewed, Some((Section::Unstaged, "a.txt".to_string())));

        app.handle_mouse(click(MouseButton::Left, 9, KeyModifiers::NONE));
        assert!(app.selection.state().is_empty());
    }

    #[test]
    fn header_click_clears_selection() {
        let fx = Fixture::with_three_changes();
        let mut app = fx.app();
        app.click_row(0, ClickModifiers::PLAIN);
        app.handle_mouse(click(MouseButton::Left, 3, KeyModifiers::NONE));
        assert!(app.selection.state().is_empty());
    }

    #[test]
    fn right_click_outside_selection_collapses_and_opens_menu() {
        let fx = Fixture::with_three_changes();
        let mut app = fx.app();
        app.click_row(0, ClickModifiers::PLAIN);
        app.click_row(1, ClickModifiers::TOGGLE);

        app.handle_mouse(click(MouseButton::Right, 6, KeyModifiers::NONE));

        assert_eq!(selected(&app), vec!["c.txt"]);
        let menu = app.menu.as_ref().expect("menu open");
        assert_eq!(menu.items[0].label, "Stage file");
        assert_eq!(menu.items.last().unwrap().label, "Discard change");
    }

    #[test]
    fn right_click_inside_selection_targets_all() {
        let fx = Fixture::with_three_changes();
        let mut app = fx.app();
        app.click_row(0, ClickModifiers::PLAIN);
        app.click_row(2, ClickModifiers::RANGE);

        app.handle_mouse(click(MouseButton::Right, 5, KeyModifiers::NONE));

        let menu = app.menu.as_ref().expect("menu open");
        let labels: Vec<&str> = menu.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["Stage files (3)", "Discard changes (3)"]);
    }

    #[test]
    fn staging_from_menu_moves_files_and_resets_selection() {
        let fx = Fixture::with_three_changes();
        let mut app = fx.app();
        app.click_row(0, ClickModifiers::PLAIN);
        app.click_row(1, ClickModifiers::RANGE);
        app.open_menu_for_row(0, (0, 0));
        app.run_menu_item(0);

        assert_eq!(app.staged.len(), 2);
        assert_eq!(app.unstaged.len(), 1);
        assert!(app.selection.state().is_empty());
        assert!(app.menu.is_none());
        assert_eq!(
            app.flash_message.as_ref().map(|f| f.text.as_str()),
            Some("Staged 2 files")
        );
    }

    #[test]
    fn keyboard_navigation_mirrors_clicks() {
        let fx = Fixture::with_three_changes();
        let mut app = fx.app();
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::SHIFT));
        assert_eq!(selected(&app), vec!["a.txt", "b.txt"]);

        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(selected(&app), vec!["a.txt"]);

        assert!(!app.handle_key(key(KeyCode::Esc)));
        assert!(app.selection.state().is_empty());
        assert!(app.handle_key(key(KeyCode::Esc)));
    }

    #[test]
    fn discard_requires_confirmation() {
        let fx = Fixture::with_three_changes();
        let mut app = fx.app();
        app.handle_key(key(KeyCode::Char('d')));
        let prompt = app.confirm_prompt.as_ref().expect("prompt");
        assert_eq!(prompt.paths, vec!["a.txt".to_string()]);

        app.handle_key(key(KeyCode::Char('n')));
        assert_eq!(app.unstaged.len(), 3);

        app.handle_key(key(KeyCode::Char('d')));
        app.handle_key(key(KeyCode::Char('y')));
        assert_eq!(app.unstaged.len(), 2);
        assert_eq!(fs::read_to_string(fx.dir.path().join("a.txt")).unwrap(), "one\n");
    }

    #[test]
    fn discarding_a_staged_rename_restores_the_original() {
        let fx = Fixture::new();
        fx.write("old.txt", "renamed content\n");
        fx.commit_all("initial");
        fs::rename(fx.dir.path().join("old.txt"), fx.dir.path().join("new.txt")).unwrap();
        let mut index = fx.repo.index().unwrap();
        index.remove_path(Path::new("old.txt")).unwrap();
        index.add_path(Path::new("new.txt")).unwrap();
        index.write().unwrap();

        let mut app = fx.app();
        assert_eq!(app.staged.len(), 1);
        app.handle_key(key(KeyCode::Char('d')));
        let prompt = app.confirm_prompt.as_ref().expect("prompt");
        assert_eq!(prompt.paths, vec!["new.txt".to_string(), "old.txt".to_string()]);

        app.handle_key(key(KeyCode::Char('y')));

        assert!(app.staged.is_empty());
        assert!(app.unstaged.is_empty());
        assert!(!fx.dir.path().join("new.txt").exists());
        assert_eq!(
            fs::read_to_string(fx.dir.path().join("old.txt")).unwrap(),
            "renamed content\n"
        );
        assert_eq!(
            app.flash_message.as_ref().map(|f| f.text.as_str()),
            Some("Discarded 2 files")
        );
    }

    #[test]
    fn reveal_without_root_asks_for_one() {
        let workspace = TempDir::new().unwrap();
        let mut app = App::new(workspace.path(), ReviewConfig::default());

        app.run_file_action(FileAction::Reveal {
            absolute_path: "c.txt".into(),
            resolvable: false,
        });

        let flash = app.flash_message.as_ref().expect("flash");
        assert!(flash.is_error);
        assert_eq!(
            flash.text,
            format!(
                "Couldn't show file in {}: Select a git root first.",
                PlatformKind::current().file_manager_name()
            )
        );
    }

    #[test]
    fn broken_root_keeps_its_own_error_scope() {
        let workspace = TempDir::new().unwrap();
        let mut config = ReviewConfig::default();
        config.repo.root = Some("missing".into());
        let app = App::new(workspace.path(), config);

        let scope = app.error_scope();

        assert!(!scope.as_str().contains("no-git-root"));
        assert!(scope.as_str().ends_with("/missing:diff"));
    }

    #[test]
    fn unstage_key_only_touches_staged_rows() {
        let fx = Fixture::with_three_changes();
        fx.stage("b.txt");
        let mut app = fx.app();
        assert_eq!(app.staged.len(), 1);

        app.handle_key(key(KeyCode::Char('u')));

        assert!(app.staged.is_empty());
        assert_eq!(app.unstaged.len(), 3);
    }

    #[test]
    fn push_failure_surfaces_with_sync_action() {
        let fx = Fixture::with_three_changes();
        let mut app = fx.app();
        app.operations.fail(
            OperationKind::Push,
            "! [rejected] main -> main (non-fast-forward)",
        );
        app.update_error_banner();

        let active = app.active_error.clone().expect("push error");
        assert_eq!(active.key, "push");
        assert!(active.message.starts_with("Remote has new commits."));
        let action = active.action.expect("sync offer");
        assert_eq!(action.label, "Sync (pull then push)");
    }

    #[test]
    fn dismissed_error_stays_hidden_until_it_changes() {
        let fx = Fixture::with_three_changes();
        let mut app = fx.app();
        app.operations.fail(OperationKind::Fetch, "could not resolve host");
        app.operations.fail(OperationKind::Pull, "connection reset");
        app.update_error_banner();
        assert_eq!(app.active_error.as_ref().map(|e| e.key.as_str()), Some("pull"));

        app.handle_key(key(KeyCode::Char('x')));
        assert_eq!(app.active_error.as_ref().map(|e| e.key.as_str()), Some("fetch"));

        app.operations.fail(OperationKind::Pull, "connection refused");
        app.update_error_banner();
        assert_eq!(app.active_error.as_ref().map(|e| e.message.as_str()), Some("connection refused"));
    }

    #[test]
    fn log_mode_uses_its_own_candidates() {
        let fx = Fixture::with_three_changes();
        let mut app = fx.app();
        app.operations.fail(OperationKind::Push, "denied");
        app.view_mode = ViewMode::Log;
        app.update_error_banner();
        assert!(app.active_error.is_none());
    }

    #[test]
    fn commit_flow_runs_in_background() {
        let fx = Fixture::with_three_changes();
        fx.stage("a.txt");
        let mut app = fx.app();

        app.handle_key(key(KeyCode::Char('c')));
        app.handle_key(KeyEvent::new(KeyCode::Char('g'), KeyModifiers::CONTROL));
        let finished = app.operations.wait(TIMEOUT);
        app.apply_operations(finished);
        assert_eq!(app.commit_input.as_deref(), Some("Update a.txt"));

        app.handle_key(key(KeyCode::Enter));
        let finished = app.operations.wait(TIMEOUT);
        app.apply_operations(finished);

        assert!(app.commit_input.is_none());
        assert!(app.staged.is_empty());
        let head = fx.repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.summary(), Some("Update a.txt"));
    }

    #[test]
    fn commit_without_staged_changes_reports_error() {
        let fx = Fixture::with_three_changes();
        let mut app = fx.app();
        app.commit_input = Some("empty".into());
        app.start_commit();
        let finished = app.operations.wait(TIMEOUT);
        app.apply_operations(finished);
        app.update_error_banner();
        assert_eq!(
            app.active_error.as_ref().map(|e| (e.key.as_str(), e.message.as_str())),
            Some(("commit", "Nothing to commit"))
        );
        assert_eq!(app.commit_input.as_deref(), Some("empty"));
    }

    #[test]
    fn nested_repository_found_by_scan() {
        let workspace = TempDir::new().unwrap();
        let nested = workspace.path().join("app");
        fs::create_dir_all(&nested).unwrap();
        Repository::init(&nested).unwrap();
        fs::write(nested.join("new.txt"), "hello\n").unwrap();

        let mut app = App::new(workspace.path(), ReviewConfig::default());
        assert!(app.operations.is_loading(OperationKind::RootScan));
        while app.operations.any_loading() {
            let finished = app.operations.wait(TIMEOUT);
            app.apply_operations(finished);
        }

        assert_eq!(app.paths.repo_root_candidates, vec!["app".to_string()]);
        assert!(app.repo_root().ends_with("/app"));
        assert_eq!(app.unstaged.len(), 1);
        assert!(app.take_root_change());
        app.update_error_banner();
        assert!(app.active_error.is_none());
    }

    #[test]
    fn missing_repository_is_a_git_error() {
        let workspace = TempDir::new().unwrap();
        let mut config = ReviewConfig::default();
        config.repo.root = Some("missing".into());
        let mut app = App::new(workspace.path(), config);
        app.update_error_banner();
        let active = app.active_error.expect("git error");
        assert_eq!(active.key, "git");
        assert!(active.message.starts_with("Not a git repository"));
    }

    #[test]
    fn click_modifier_mapping() {
        assert_eq!(click_modifiers(KeyModifiers::ALT), ClickModifiers::TOGGLE);
        assert_eq!(click_modifiers(KeyModifiers::SUPER), ClickModifiers::TOGGLE);
        assert_eq!(click_modifiers(KeyModifiers::SHIFT), ClickModifiers::RANGE);
        assert_eq!(click_modifiers(KeyModifiers::NONE), ClickModifiers::PLAIN);
    }
}
