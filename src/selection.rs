//! Multi-select state over the combined staged + unstaged change list.
//!
//! Selection is tracked by path, and range extension always re-resolves
//! positions against the current [`CombinedList`], never a cached index.

use crate::types::{ChangeRecord, Section};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub section: Section,
    pub path: String,
}

/// `[...staged, ...unstaged]` in the order the provider supplied them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedList {
    rows: Vec<ListRow>,
}

impl CombinedList {
    pub fn from_sections(staged: &[ChangeRecord], unstaged: &[ChangeRecord]) -> Self {
        let rows = staged
            .iter()
            .map(|record| ListRow {
                section: Section::Staged,
                path: record.path.clone(),
            })
            .chain(unstaged.iter().map(|record| ListRow {
                section: Section::Unstaged,
                path: record.path.clone(),
            }))
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[ListRow] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&ListRow> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First position of `path`; staged rows win when a path is in both sections.
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.path == path)
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.index_of(path).is_some()
    }

    pub fn in_section(&self, path: &str, section: Section) -> bool {
        self.rows
            .iter()
            .any(|row| row.section == section && row.path == path)
    }

    fn entries(&self) -> BTreeSet<(Section, &str)> {
        self.rows
            .iter()
            .map(|row| (row.section, row.path.as_str()))
            .collect()
    }

    /// True when both lists hold the same `(section, path)` entries, in any order.
    pub fn same_entries(&self, other: &CombinedList) -> bool {
        self.entries() == other.entries()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickModifiers {
    pub meta_or_ctrl: bool,
    pub shift: bool,
}

impl ClickModifiers {
    pub const PLAIN: Self = Self {
        meta_or_ctrl: false,
        shift: false,
    };
    pub const TOGGLE: Self = Self {
        meta_or_ctrl: true,
        shift: false,
    };
    pub const RANGE: Self = Self {
        meta_or_ctrl: false,
        shift: true,
    };
}

/// What a row click means once modifiers and anchor presence are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickIntent {
    Toggle,
    ExtendRange,
    Replace,
}

impl ClickIntent {
    pub fn decide(modifiers: ClickModifiers, has_anchor: bool) -> Self {
        match (modifiers.meta_or_ctrl, modifiers.shift, has_anchor) {
            (true, _, _) => ClickIntent::Toggle,
            (false, true, true) => ClickIntent::ExtendRange,
            (false, _, _) => ClickIntent::Replace,
        }
    }
}

/// Side effects the presentation layer must carry out after a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickEffect {
    SelectForPreview(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected: BTreeSet<String>,
    pub anchor: Option<String>,
}

impl SelectionState {
    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.selected.contains(path)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn apply_click(
        &mut self,
        list: &CombinedList,
        path: &str,
        modifiers: ClickModifiers,
    ) -> Option<ClickEffect> {
        if !list.contains_path(path) {
            return None;
        }
        match ClickIntent::decide(modifiers, self.anchor.is_some()) {
            ClickIntent::Toggle => {
                self.toggle(path);
                None
            }
            ClickIntent::ExtendRange => {
                self.extend_range(list, path);
                None
            }
            ClickIntent::Replace => {
                self.collapse_to(path);
                Some(ClickEffect::SelectForPreview(path.to_string()))
            }
        }
    }

    fn toggle(&mut self, path: &str) {
        if !self.selected.remove(path) {
            self.selected.insert(path.to_string());
        }
        self.anchor = Some(path.to_string());
    }

    // A stale anchor leaves the selection untouched.
    fn extend_range(&mut self, list: &CombinedList, path: &str) {
        let Some(anchor) = self.anchor.as_deref() else {
            return;
        };
        let (Some(from), Some(to)) = (list.index_of(anchor), list.index_of(path)) else {
            return;
        };
        let (start, end) = (from.min(to), from.max(to));
        for row in &list.rows()[start..=end] {
            self.selected.insert(row.path.clone());
        }
    }

    fn collapse_to(&mut self, path: &str) {
        self.selected.clear();
        self.selected.insert(path.to_string());
        self.anchor = Some(path.to_string());
    }
}

/// Owns the current [`CombinedList`] and the selection made over it.
#[derive(Debug, Default)]
pub struct SelectionEngine {
    list: CombinedList,
    state: SelectionState,
}

impl SelectionEngine {
    pub fn new(list: CombinedList) -> Self {
        Self {
            list,
            state: SelectionState::default(),
        }
    }

    pub fn list(&self) -> &CombinedList {
        &self.list
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.state.is_selected(path)
    }

    /// Installs a freshly computed list. Returns true when the selection was reset
    /// because entries were added, removed or moved between sections.
    pub fn update_list(&mut self, next: CombinedList) -> bool {
        let changed = !self.list.same_entries(&next);
        self.list = next;
        if changed {
            if !self.state.is_empty() {
                tracing::debug!(
                    event = "selection.reset",
                    dropped = self.state.len(),
                    "change list changed, clearing selection"
                );
            }
            self.state.clear();
        }
        changed
    }

    pub fn handle_click(&mut self, path: &str, modifiers: ClickModifiers) -> Option<ClickEffect> {
        self.state.apply_click(&self.list, path, modifiers)
    }

    pub fn handle_list_background_click(&mut self) {
        self.state.clear();
    }

    /// Paths a row action applies to. Acting on a row outside a multi-selection
    /// collapses the selection to that row.
    pub fn resolve_action_targets(&mut self, clicked: &str) -> Vec<String> {
        if self.state.is_selected(clicked) && self.state.len() > 1 {
            return self.state.selected.iter().cloned().collect();
        }
        self.state.collapse_to(clicked);
        vec![clicked.to_string()]
    }
}
