use std::fmt;
use std::time::{Duration, Instant};

/// One changed file as reported by the change-list provider.
///
/// Identity is `(section, path)`: a path is unique within a section but may
/// appear in both when it has staged and unstaged edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub path: String,
    pub old_path: Option<String>,
    pub status: ChangeStatus,
    pub additions: usize,
    pub deletions: usize,
    pub is_binary: bool,
    pub section: Section,
}

impl ChangeRecord {
    pub fn new(path: impl Into<String>, status: ChangeStatus, section: Section) -> Self {
        Self {
            path: path.into(),
            old_path: None,
            status,
            additions: 0,
            deletions: 0,
            is_binary: false,
            section,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    TypeChanged,
    Unknown,
}

impl ChangeStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            ChangeStatus::Added => "A",
            ChangeStatus::Modified => "M",
            ChangeStatus::Deleted => "D",
            ChangeStatus::Renamed => "R",
            ChangeStatus::TypeChanged => "T",
            ChangeStatus::Unknown => "?",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Staged,
    Unstaged,
}

impl Section {
    pub fn label(&self) -> &'static str {
        match self {
            Section::Staged => "STAGED",
            Section::Unstaged => "UNSTAGED",
        }
    }
}

#[derive(Debug, Clone)]
pub enum BranchInfo {
    Branch(String),
    Detached(String),
    NoRepository,
}

impl fmt::Display for BranchInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchInfo::Branch(name) => write!(f, "{name}"),
            BranchInfo::Detached(hash) => write!(f, "HEAD@{hash}"),
            BranchInfo::NoRepository => write!(f, "no repository"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DiffContent {
    Empty,
    Clean,
    Text(Vec<DiffLine>),
    Binary,
    InvalidUtf8,
}

#[derive(Debug, Clone)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub content: String,
    pub new_line_number: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    Header,
    Hunk,
    Context,
    Added,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub sha: String,
    pub summary: String,
    pub author: String,
}

impl LogEntry {
    pub fn short_sha(&self) -> &str {
        &self.sha[..7.min(self.sha.len())]
    }
}

#[derive(Debug, Clone)]
pub struct FlashMessage {
    pub text: String,
    pub is_error: bool,
    created: Instant,
}

impl FlashMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
            created: Instant::now(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
            created: Instant::now(),
        }
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.created.elapsed() >= timeout
    }
}

/// A destructive action waiting for a y/N answer.
#[derive(Debug, Clone)]
pub struct ConfirmPrompt {
    pub message: String,
    pub paths: Vec<String>,
}
