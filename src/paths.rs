//! Platform-aware path helpers for workspace and repository roots.
//!
//! Everything here is pure string manipulation. Joined paths always use `/`;
//! conversion to native separators happens at the opener boundary via
//! [`to_native`].

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    Mac,
    Windows,
    Linux,
    Unknown,
}

impl PlatformKind {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            PlatformKind::Mac
        } else if cfg!(target_os = "windows") {
            PlatformKind::Windows
        } else if cfg!(target_os = "linux") {
            PlatformKind::Linux
        } else {
            PlatformKind::Unknown
        }
    }

    pub fn file_manager_name(self) -> &'static str {
        match self {
            PlatformKind::Mac => "Finder",
            PlatformKind::Windows => "Explorer",
            PlatformKind::Linux | PlatformKind::Unknown => "File Manager",
        }
    }

    pub fn reveal_label(self) -> &'static str {
        match self {
            PlatformKind::Mac => "Reveal in Finder",
            PlatformKind::Windows => "Show in Explorer",
            PlatformKind::Linux | PlatformKind::Unknown => "Reveal in File Manager",
        }
    }
}

fn has_drive_prefix(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

fn looks_like_windows_absolute(value: &str) -> bool {
    has_drive_prefix(value) || value.starts_with("\\\\") || value.starts_with("//")
}

fn looks_like_windows_path(value: &str) -> bool {
    let trimmed = value.trim();
    looks_like_windows_absolute(trimmed) || trimmed.contains('\\')
}

/// POSIX roots, home-relative paths, drive letters and UNC / extended-length
/// prefixes all count as absolute.
pub fn is_absolute(path: &str) -> bool {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.starts_with('/') || trimmed.starts_with("~/") || trimmed.starts_with("~\\") {
        return true;
    }
    looks_like_windows_absolute(trimmed)
}

/// Comparison form of a root: forward slashes, no trailing separator.
pub fn normalize_root(path: &str) -> String {
    path.replace('\\', "/").trim_end_matches('/').to_string()
}

pub fn join_root(root: &str, relative_path: &str) -> String {
    if root.is_empty() {
        return relative_path.to_string();
    }
    let relative = relative_path.trim_start_matches(['/', '\\']);
    format!("{}/{}", normalize_root(root), relative)
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

fn is_drive_segment(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn segments_match(a: &str, b: &str) -> bool {
    if is_drive_segment(a) && is_drive_segment(b) {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

/// Remainder of `target` below `base`, or `None` when `base` is not a prefix.
pub fn relative_within(base: &str, target: &str) -> Option<String> {
    if base.trim().is_empty() || target.trim().is_empty() {
        return None;
    }
    let base = normalize_root(base);
    let target = normalize_root(target);
    let base_segments = segments(&base);
    let target_segments = segments(&target);
    if base_segments.len() > target_segments.len() {
        return None;
    }
    let prefix_matches = base_segments
        .iter()
        .zip(&target_segments)
        .all(|(a, b)| segments_match(a, b));
    if !prefix_matches {
        return None;
    }
    Some(target_segments[base_segments.len()..].join("/"))
}

/// Absolute form of a candidate root; relative roots hang off the workspace.
pub fn resolve_root(candidate_root: &str, workspace_path: Option<&str>) -> String {
    let normalized = normalize_root(candidate_root.trim());
    if normalized.is_empty() {
        return String::new();
    }
    match workspace_path {
        Some(workspace) if !workspace.is_empty() && !is_absolute(&normalized) => {
            join_root(workspace, &normalized)
        }
        _ => normalized,
    }
}

/// True when both roots name the same directory after normalization.
pub fn roots_match(a: &str, b: &str) -> bool {
    relative_within(a, b).is_some_and(|rest| rest.is_empty())
}

pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(path)
}

/// Joins with the separator style of `base`. Absolute `path`s pass through.
pub fn join_workspace_path(base: &str, path: &str) -> String {
    let base = base.trim();
    let path = path.trim();
    if base.is_empty() || path.is_empty() || is_absolute(path) {
        return path.to_string();
    }
    let base_trimmed = base.trim_end_matches(['/', '\\']);
    let relative = path.trim_start_matches(['/', '\\']);
    if looks_like_windows_path(base) {
        format!("{}\\{}", base_trimmed, relative.replace('/', "\\"))
    } else {
        format!("{}/{}", base_trimmed, relative.replace('\\', "/"))
    }
}

/// Converts a `/`-joined path for the native opener.
pub fn to_native(path: &str) -> PathBuf {
    if looks_like_windows_path(path) || PlatformKind::current() == PlatformKind::Windows {
        PathBuf::from(path.replace('/', "\\"))
    } else {
        PathBuf::from(path)
    }
}

/// Workspace and repository roots known to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathContext {
    pub workspace_path: Option<String>,
    pub repo_root: Option<String>,
    pub repo_root_candidates: Vec<String>,
}

impl PathContext {
    pub fn new(workspace_path: impl Into<String>) -> Self {
        Self {
            workspace_path: Some(workspace_path.into()),
            ..Self::default()
        }
    }

    fn workspace(&self) -> Option<&str> {
        self.workspace_path.as_deref().filter(|w| !w.is_empty())
    }

    /// Configured root, else the single scan candidate, else the workspace.
    pub fn resolved_root(&self) -> String {
        let configured = resolve_root(self.repo_root.as_deref().unwrap_or(""), self.workspace());
        if !configured.is_empty() {
            return configured;
        }
        if let [only] = self.repo_root_candidates.as_slice() {
            let inferred = resolve_root(only, self.workspace());
            if !inferred.is_empty() {
                return inferred;
            }
        }
        normalize_root(self.workspace().unwrap_or(""))
    }

    pub fn absolute_path(&self, raw_path: &str) -> String {
        let root = self.resolved_root();
        if root.is_empty() {
            raw_path.to_string()
        } else {
            join_root(&root, raw_path)
        }
    }

    /// Path shown or copied for a file: relative to the workspace when the
    /// repository lives inside it, otherwise the repo-relative path.
    pub fn display_path(&self, raw_path: &str) -> String {
        let root = self.resolved_root();
        let relative_root = match self.workspace() {
            Some(workspace) if !root.is_empty() => relative_within(workspace, &root),
            _ => None,
        };
        match relative_root {
            Some(relative_root) => join_root(&relative_root, raw_path),
            None => raw_path.to_string(),
        }
    }

    /// Revealing needs either a resolved root or an already absolute path.
    pub fn can_reveal(&self, raw_path: &str) -> bool {
        !self.resolved_root().is_empty() || is_absolute(&self.absolute_path(raw_path))
    }

    pub fn is_active_root(&self, candidate: &str) -> bool {
        let Some(configured) = self.repo_root.as_deref().filter(|r| !r.trim().is_empty()) else {
            return false;
        };
        roots_match(
            &resolve_root(configured, self.workspace()),
            &resolve_root(candidate, self.workspace()),
        )
    }
}
