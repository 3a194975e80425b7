//! Row actions for one or more changed files.

use crate::paths::{self, PathContext, PlatformKind};
use crate::selection::CombinedList;
use crate::types::Section;

const DISCARD_PREVIEW_LIMIT: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    Stage(Vec<String>),
    Unstage(Vec<String>),
    /// `resolvable` is false when neither a root nor an absolute path is known.
    Reveal { absolute_path: String, resolvable: bool },
    CopyFileName(String),
    CopyFilePath(String),
    Discard(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMenuItem {
    pub label: String,
    pub action: FileAction,
}

fn counted(singular: &str, plural: &str, count: usize) -> String {
    if count > 1 {
        format!("{plural} ({count})")
    } else {
        singular.to_string()
    }
}

pub fn build_file_menu(
    targets: &[String],
    list: &CombinedList,
    ctx: &PathContext,
    platform: PlatformKind,
) -> Vec<FileMenuItem> {
    let in_section = |section: Section| -> Vec<String> {
        targets
            .iter()
            .filter(|path| list.in_section(path, section))
            .cloned()
            .collect()
    };
    let staged = in_section(Section::Staged);
    let unstaged = in_section(Section::Unstaged);

    let mut items = Vec::new();

    if !staged.is_empty() {
        items.push(FileMenuItem {
            label: counted("Unstage file", "Unstage files", staged.len()),
            action: FileAction::Unstage(staged),
        });
    }
    if !unstaged.is_empty() {
        items.push(FileMenuItem {
            label: counted("Stage file", "Stage files", unstaged.len()),
            action: FileAction::Stage(unstaged),
        });
    }

    if let [raw] = targets {
        items.push(FileMenuItem {
            label: format!("Show in {}", platform.file_manager_name()),
            action: FileAction::Reveal {
                absolute_path: ctx.absolute_path(raw),
                resolvable: ctx.can_reveal(raw),
            },
        });
        items.push(FileMenuItem {
            label: "Copy file name".to_string(),
            action: FileAction::CopyFileName(paths::file_name(raw).to_string()),
        });
        items.push(FileMenuItem {
            label: "Copy file path".to_string(),
            action: FileAction::CopyFilePath(ctx.display_path(raw)),
        });
    }

    if !targets.is_empty() {
        items.push(FileMenuItem {
            label: counted("Discard change", "Discard changes", targets.len()),
            action: FileAction::Discard(targets.to_vec()),
        });
    }

    items
}

pub fn discard_prompt(paths: &[String]) -> String {
    if let [only] = paths {
        return format!("Discard changes in:\n\n{only}\n\nThis cannot be undone.");
    }
    let preview = paths
        .iter()
        .take(DISCARD_PREVIEW_LIMIT)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");
    let more = if paths.len() > DISCARD_PREVIEW_LIMIT {
        format!("\n… and {} more", paths.len() - DISCARD_PREVIEW_LIMIT)
    } else {
        String::new()
    };
    format!("Discard changes in these files?\n\n{preview}{more}\n\nThis cannot be undone.")
}
