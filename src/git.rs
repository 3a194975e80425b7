use crate::types::{
    BranchInfo, ChangeRecord, ChangeStatus, DiffContent, DiffLine, DiffLineKind, LogEntry, Section,
};
use anyhow::{bail, Context, Result};
use git2::{DiffOptions, ErrorCode, Oid, Repository, Status, StatusOptions};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::process::Command;

const BINARY_SNIFF_BYTES: usize = 8000;
const SKIPPED_SCAN_DIRS: &[&str] = &["node_modules", "target", "dist", "build"];

pub fn get_repo(path: &str) -> Result<Repository> {
    let repo = Repository::open(path).context("Not a git repository")?;
    if repo.is_bare() {
        bail!("Repository has no working directory");
    }
    Ok(repo)
}

pub fn get_branch_info(repo: &Repository) -> BranchInfo {
    match repo.head() {
        Ok(head) if head.is_branch() => match head.shorthand() {
            Some(name) => BranchInfo::Branch(name.to_string()),
            None => BranchInfo::Detached("unknown".to_string()),
        },
        Ok(head) => match head.target() {
            Some(oid) => {
                let sha = oid.to_string();
                BranchInfo::Detached(sha[..7.min(sha.len())].to_string())
            }
            None => BranchInfo::Detached("unknown".to_string()),
        },
        Err(e) if e.code() == ErrorCode::UnbornBranch => unborn_branch_name(repo),
        Err(_) => BranchInfo::Detached("unknown".to_string()),
    }
}

fn unborn_branch_name(repo: &Repository) -> BranchInfo {
    repo.find_reference("HEAD")
        .ok()
        .and_then(|head| head.symbolic_target().map(str::to_string))
        .map(|target| BranchInfo::Branch(target.trim_start_matches("refs/heads/").to_string()))
        .unwrap_or_else(|| BranchInfo::Detached("unknown".to_string()))
}

pub struct StatusResult {
    pub staged: Vec<ChangeRecord>,
    pub unstaged: Vec<ChangeRecord>,
    pub untracked_count: usize,
}

pub fn get_status(repo: &Repository) -> Result<StatusResult> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .include_unmodified(false)
        .renames_head_to_index(true);

    let statuses = repo.statuses(Some(&mut opts))?;

    let mut staged = Vec::new();
    let mut unstaged = Vec::new();
    let mut untracked_count = 0;

    for entry in statuses.iter() {
        let status = entry.status();
        let Some(listed_path) = entry.path().map(str::to_string) else {
            continue;
        };
        // For index renames libgit2 lists the entry under its old name.
        let renamed_to = entry
            .head_to_index()
            .filter(|_| status.is_index_renamed())
            .and_then(|delta| delta.new_file().path().map(|p| p.to_string_lossy().into_owned()));
        let (path, old_path) = match renamed_to {
            Some(new_path) => (new_path, Some(listed_path)),
            None => (listed_path, None),
        };

        if status.is_conflicted() {
            unstaged.push(ChangeRecord::new(path, ChangeStatus::Unknown, Section::Unstaged));
            continue;
        }

        if status.is_wt_new() {
            untracked_count += 1;
            let (additions, is_binary) = untracked_line_count(repo, &path);
            unstaged.push(ChangeRecord {
                additions,
                is_binary,
                ..ChangeRecord::new(path, ChangeStatus::Added, Section::Unstaged)
            });
            continue;
        }

        if has_staged_changes(status) {
            let mut record = counted_record(repo, &path, Section::Staged, staged_status(status));
            record.old_path = old_path;
            staged.push(record);
        }

        if has_unstaged_changes(status) {
            unstaged.push(counted_record(repo, &path, Section::Unstaged, unstaged_status(status)));
        }
    }

    staged.sort_by(|a, b| a.path.cmp(&b.path));
    unstaged.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(StatusResult {
        staged,
        unstaged,
        untracked_count,
    })
}

fn has_staged_changes(status: Status) -> bool {
    status.is_index_new()
        || status.is_index_modified()
        || status.is_index_deleted()
        || status.is_index_renamed()
        || status.is_index_typechange()
}

fn has_unstaged_changes(status: Status) -> bool {
    status.is_wt_modified()
        || status.is_wt_deleted()
        || status.is_wt_renamed()
        || status.is_wt_typechange()
}

fn staged_status(status: Status) -> ChangeStatus {
    if status.is_index_new() {
        ChangeStatus::Added
    } else if status.is_index_deleted() {
        ChangeStatus::Deleted
    } else if status.is_index_renamed() {
        ChangeStatus::Renamed
    } else if status.is_index_typechange() {
        ChangeStatus::TypeChanged
    } else {
        ChangeStatus::Modified
    }
}

fn unstaged_status(status: Status) -> ChangeStatus {
    if status.is_wt_deleted() {
        ChangeStatus::Deleted
    } else if status.is_wt_renamed() {
        ChangeStatus::Renamed
    } else if status.is_wt_typechange() {
        ChangeStatus::TypeChanged
    } else {
        ChangeStatus::Modified
    }
}

fn section_diff<'r>(
    repo: &'r Repository,
    pathspecs: &[&str],
    section: Section,
) -> std::result::Result<git2::Diff<'r>, git2::Error> {
    let mut opts = DiffOptions::new();
    for spec in pathspecs {
        opts.pathspec(spec);
    }
    match section {
        Section::Staged => {
            let head_tree = repo.head().ok().and_then(|h| h.peel_to_tree().ok());
            repo.diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))
        }
        Section::Unstaged => repo.diff_index_to_workdir(None, Some(&mut opts)),
    }
}

fn counted_record(repo: &Repository, path: &str, section: Section, status: ChangeStatus) -> ChangeRecord {
    let mut record = ChangeRecord::new(path, status, section);
    let Ok(diff) = section_diff(repo, &[path], section) else {
        return record;
    };
    if diff.deltas().any(|delta| delta.flags().is_binary()) {
        record.is_binary = true;
        return record;
    }
    if let Ok(stats) = diff.stats() {
        record.additions = stats.insertions();
        record.deletions = stats.deletions();
    }
    record
}

fn untracked_line_count(repo: &Repository, path: &str) -> (usize, bool) {
    let Some(workdir) = repo.workdir() else {
        return (0, false);
    };
    match fs::read(workdir.join(path)) {
        Ok(bytes) if looks_binary(&bytes) => (0, true),
        Ok(bytes) => (String::from_utf8_lossy(&bytes).lines().count(), false),
        Err(_) => (0, false),
    }
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(BINARY_SNIFF_BYTES)].contains(&0)
}

pub fn get_diff(repo: &Repository, path: &str, old_path: Option<&str>, section: Section) -> DiffContent {
    let mut pathspecs = vec![path];
    if let Some(old) = old_path {
        pathspecs.push(old);
    }
    let Ok(diff) = section_diff(repo, &pathspecs, section) else {
        return DiffContent::Empty;
    };
    if diff.deltas().any(|delta| delta.flags().is_binary()) {
        return DiffContent::Binary;
    }

    let mut lines = Vec::new();
    let mut next_new_line: Option<usize> = None;
    let mut invalid_utf8 = false;

    let printed = diff.print(git2::DiffFormat::Patch, |_delta, hunk, line| {
        let Ok(raw) = std::str::from_utf8(line.content()) else {
            invalid_utf8 = true;
            return false;
        };
        let text = raw.trim_end_matches('\n').to_string();
        match line.origin() {
            'F' => lines.extend(raw.lines().map(|l| DiffLine {
                kind: if l.starts_with("@@") {
                    DiffLineKind::Hunk
                } else {
                    DiffLineKind::Header
                },
                content: l.to_string(),
                new_line_number: None,
            })),
            'H' => {
                next_new_line = hunk.map(|h| h.new_start() as usize);
                lines.push(DiffLine {
                    kind: DiffLineKind::Hunk,
                    content: text,
                    new_line_number: None,
                });
            }
            origin @ ('+' | ' ') => {
                let number = next_new_line;
                if let Some(n) = next_new_line.as_mut() {
                    *n += 1;
                }
                lines.push(DiffLine {
                    kind: if origin == '+' {
                        DiffLineKind::Added
                    } else {
                        DiffLineKind::Context
                    },
                    content: text,
                    new_line_number: number,
                });
            }
            '-' => lines.push(DiffLine {
                kind: DiffLineKind::Deleted,
                content: text,
                new_line_number: None,
            }),
            _ => lines.push(DiffLine {
                kind: DiffLineKind::Header,
                content: text,
                new_line_number: None,
            }),
        }
        true
    });

    if invalid_utf8 {
        return DiffContent::InvalidUtf8;
    }
    if printed.is_err() || lines.is_empty() {
        return DiffContent::Empty;
    }
    DiffContent::Text(lines)
}

pub fn get_untracked_diff(repo: &Repository, path: &str) -> DiffContent {
    let Some(workdir) = repo.workdir() else {
        return DiffContent::Empty;
    };
    let Ok(bytes) = fs::read(workdir.join(path)) else {
        return DiffContent::Empty;
    };
    if looks_binary(&bytes) {
        return DiffContent::Binary;
    }
    let Ok(text) = std::str::from_utf8(&bytes) else {
        return DiffContent::InvalidUtf8;
    };

    let header = |content: String| DiffLine {
        kind: DiffLineKind::Header,
        content,
        new_line_number: None,
    };
    let mut lines = vec![
        header(format!("diff --git a/{path} b/{path}")),
        header("new file".to_string()),
        header("--- /dev/null".to_string()),
        header(format!("+++ b/{path}")),
    ];

    let body: Vec<&str> = text.lines().collect();
    if !body.is_empty() {
        lines.push(DiffLine {
            kind: DiffLineKind::Hunk,
            content: format!("@@ -0,0 +1,{} @@", body.len()),
            new_line_number: None,
        });
        lines.extend(body.iter().enumerate().map(|(i, line)| DiffLine {
            kind: DiffLineKind::Added,
            content: line.to_string(),
            new_line_number: Some(i + 1),
        }));
    }

    DiffContent::Text(lines)
}

/// Diff for a record, choosing the untracked path for new unstaged files.
pub fn diff_for(repo: &Repository, record: &ChangeRecord) -> DiffContent {
    if record.is_binary {
        return DiffContent::Binary;
    }
    let untracked = record.section == Section::Unstaged
        && repo
            .status_file(Path::new(&record.path))
            .is_ok_and(|s| s.is_wt_new());
    if untracked {
        get_untracked_diff(repo, &record.path)
    } else {
        get_diff(repo, &record.path, record.old_path.as_deref(), record.section)
    }
}

pub fn stage_paths(repo: &Repository, paths: &[String]) -> Result<()> {
    let workdir = repo.workdir().context("Repository has no working directory")?;
    let mut index = repo.index()?;
    for path in paths {
        if workdir.join(path).exists() {
            index
                .add_path(Path::new(path))
                .with_context(|| format!("Failed to stage {path}"))?;
        } else {
            index
                .remove_path(Path::new(path))
                .with_context(|| format!("Failed to stage removal of {path}"))?;
        }
    }
    index.write()?;
    Ok(())
}

pub fn unstage_paths(repo: &Repository, paths: &[String]) -> Result<()> {
    match repo.head() {
        Ok(head) => {
            let target = head.peel(git2::ObjectType::Commit)?;
            repo.reset_default(Some(&target), paths.iter().map(String::as_str))
                .context("Failed to unstage")?;
        }
        Err(e) if e.code() == ErrorCode::UnbornBranch => {
            let mut index = repo.index()?;
            for path in paths {
                index.remove_path(Path::new(path))?;
            }
            index.write()?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Throws away staged and working tree changes so each path matches HEAD.
/// Files HEAD does not know about are deleted.
pub fn discard_paths(repo: &Repository, paths: &[String]) -> Result<usize> {
    let workdir = repo.workdir().context("Repository has no working directory")?;
    let mut discarded = 0;
    for path in paths {
        let status = repo.status_file(Path::new(path))?;
        if status.is_conflicted() {
            bail!("Cannot discard {path}: resolve conflicts first");
        }
        let status = if has_staged_changes(status) {
            unstage_paths(repo, std::slice::from_ref(path))
                .with_context(|| format!("Failed to discard {path}"))?;
            match repo.status_file(Path::new(path)) {
                Ok(status) => status,
                // Added to the index, then deleted from the working tree.
                Err(e) if e.code() == ErrorCode::NotFound => {
                    discarded += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            status
        };
        if status.is_wt_new() {
            fs::remove_file(workdir.join(path)).with_context(|| format!("Failed to delete {path}"))?;
        } else {
            let mut checkout = git2::build::CheckoutBuilder::new();
            checkout.force().path(path);
            repo.checkout_index(None, Some(&mut checkout))
                .with_context(|| format!("Failed to discard {path}"))?;
        }
        discarded += 1;
    }
    Ok(discarded)
}

pub fn commit(repo: &Repository, message: &str) -> Result<Oid> {
    let message = message.trim();
    if message.is_empty() {
        bail!("Commit message is empty");
    }
    let mut index = repo.index()?;
    let tree = repo.find_tree(index.write_tree()?)?;
    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(e) if e.code() == ErrorCode::UnbornBranch => None,
        Err(e) => return Err(e.into()),
    };
    if let Some(parent) = &parent {
        if parent.tree_id() == tree.id() {
            bail!("Nothing to commit");
        }
    }
    let signature = repo
        .signature()
        .context("Set user.name and user.email to commit")?;
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
    Ok(oid)
}

pub fn log_entries(repo: &Repository, limit: usize) -> Result<Vec<LogEntry>> {
    let mut walk = repo.revwalk()?;
    match walk.push_head() {
        Ok(()) => {}
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).context("Failed to read history"),
    }
    walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;

    let mut entries = Vec::new();
    for oid in walk.take(limit) {
        let commit = repo.find_commit(oid?)?;
        entries.push(LogEntry {
            sha: commit.id().to_string(),
            summary: commit.summary().unwrap_or("").to_string(),
            author: commit.author().name().unwrap_or("").to_string(),
        });
    }
    Ok(entries)
}

/// Runs the git CLI in `root`; a non-zero exit becomes an error carrying stderr.
fn run_git(root: &str, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(crate::paths::to_native(root))
        .args(args)
        .output()
        .context("Failed to run git")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        bail!("{}", if stderr.is_empty() { stdout } else { stderr });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub fn fetch(root: &str) -> Result<()> {
    run_git(root, &["fetch", "--prune"]).context("git fetch failed")?;
    Ok(())
}

pub fn pull(root: &str) -> Result<()> {
    run_git(root, &["pull", "--no-edit"]).context("git pull failed")?;
    Ok(())
}

pub fn push(root: &str) -> Result<()> {
    run_git(root, &["push"]).context("git push failed")?;
    Ok(())
}

pub fn sync(root: &str) -> Result<()> {
    pull(root)?;
    push(root)
}

/// Directories below `workspace` (at most `max_depth` levels) that hold a `.git`
/// entry, as `/`-separated relative paths.
pub fn scan_repo_roots(workspace: &Path, max_depth: usize) -> Result<Vec<String>> {
    let mut found = Vec::new();
    let mut queue = VecDeque::from([(workspace.to_path_buf(), 0usize)]);

    while let Some((dir, depth)) = queue.pop_front() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if depth == 0 => {
                return Err(e).with_context(|| format!("Failed to scan {}", dir.display()));
            }
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || SKIPPED_SCAN_DIRS.contains(&name.as_str()) {
                continue;
            }
            let path = entry.path();
            if path.join(".git").exists() {
                if let Ok(relative) = path.strip_prefix(workspace) {
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    found.push(parts.join("/"));
                }
            } else if depth + 1 < max_depth {
                queue.push_back((path, depth + 1));
            }
        }
    }

    found.sort();
    Ok(found)
}

fn verb_for(status: ChangeStatus) -> &'static str {
    match status {
        ChangeStatus::Added => "Add",
        ChangeStatus::Deleted => "Remove",
        ChangeStatus::Renamed => "Rename",
        _ => "Update",
    }
}

/// One-line summary of the pending change, staged files first.
pub fn generate_commit_message(staged: &[ChangeRecord], unstaged: &[ChangeRecord]) -> Result<String> {
    let records = if staged.is_empty() { unstaged } else { staged };
    let names: Vec<&str> = records
        .iter()
        .map(|r| crate::paths::file_name(&r.path))
        .collect();
    match records {
        [] => bail!("No changes to describe"),
        [only] => Ok(format!("{} {}", verb_for(only.status), names[0])),
        [first, second] if first.status == second.status => {
            Ok(format!("{} {} and {}", verb_for(first.status), names[0], names[1]))
        }
        [_, _] => Ok(format!("Update {} and {}", names[0], names[1])),
        _ => Ok(format!("Update {} files", records.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, status: ChangeStatus) -> ChangeRecord {
        ChangeRecord::new(path, status, Section::Staged)
    }

    #[test]
    fn message_for_single_file_uses_status_verb() {
        let staged = vec![record("src/new.rs", ChangeStatus::Added)];
        assert_eq!(generate_commit_message(&staged, &[]).unwrap(), "Add new.rs");
    }

    #[test]
    fn message_for_two_files() {
        let staged = vec![
            record("a.rs", ChangeStatus::Modified),
            record("b.rs", ChangeStatus::Modified),
        ];
        assert_eq!(generate_commit_message(&staged, &[]).unwrap(), "Update a.rs and b.rs");

        let mixed = vec![record("a.rs", ChangeStatus::Deleted), record("b.rs", ChangeStatus::Added)];
        assert_eq!(generate_commit_message(&mixed, &[]).unwrap(), "Update a.rs and b.rs");
    }

    #[test]
    fn message_for_many_files_counts_them() {
        let unstaged: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|p| ChangeRecord::new(*p, ChangeStatus::Modified, Section::Unstaged))
            .collect();
        assert_eq!(generate_commit_message(&[], &unstaged).unwrap(), "Update 3 files");
    }

    #[test]
    fn message_without_changes_fails() {
        assert!(generate_commit_message(&[], &[]).is_err());
    }

    #[test]
    fn binary_sniffing() {
        assert!(looks_binary(&[0x89, 0x50, 0x00, 0x47]));
        assert!(!looks_binary(b"plain text\n"));
    }
}
