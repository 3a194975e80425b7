//! Picks the single operation error worth showing and remembers dismissals.
//!
//! Candidates arrive in priority order every cycle. A dismissal is keyed by
//! `scope:key:message`, and is forgotten as soon as that exact signature stops
//! being present, so a recurring failure surfaces again.

use std::collections::HashSet;
use std::fmt;

/// Substrings in a push failure that mean the remote has diverged.
pub const NEEDS_SYNC_PATTERNS: &[&str] = &[
    "non-fast-forward",
    "fetch first",
    "tip of your current branch is behind",
    "updates were rejected",
];

pub const NEEDS_SYNC_EXPLANATION: &str =
    "Remote has new commits. Sync (pull then push) before retrying.";

/// Heuristic over backend text; swap for a structured code if one appears.
pub fn push_needs_sync(message: &str) -> bool {
    let lower = message.to_lowercase();
    NEEDS_SYNC_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewMode {
    Diff,
    Log,
    Issues,
    PullRequests,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Diff => "diff",
            ViewMode::Log => "log",
            ViewMode::Issues => "issues",
            ViewMode::PullRequests => "prs",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Diff => "Diff",
            ViewMode::Log => "Log",
            ViewMode::Issues => "Issues",
            ViewMode::PullRequests => "PRs",
        }
    }
}

/// `(workspace, repository root, view mode)` namespace for candidates and dismissals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorScope(String);

impl ErrorScope {
    pub fn new(workspace_id: Option<&str>, repo_root: Option<&str>, mode: ViewMode) -> Self {
        let workspace = workspace_id
            .filter(|id| !id.is_empty())
            .unwrap_or("no-workspace");
        let root = crate::paths::normalize_root(repo_root.unwrap_or(""));
        let root = if root.is_empty() { "no-git-root" } else { root.as_str() };
        Self(format!("{}:{}:{}", workspace, root, mode.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn signature(&self, key: &str, message: &str) -> String {
        format!("{}:{}:{}", self.0, key, message)
    }
}

impl fmt::Display for ErrorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCommand {
    Sync,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorAction {
    pub label: String,
    pub command: ErrorCommand,
    pub disabled: bool,
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCandidate {
    pub key: String,
    pub message: Option<String>,
    pub action: Option<ErrorAction>,
}

impl ErrorCandidate {
    pub fn new(key: impl Into<String>, message: Option<impl Into<String>>) -> Self {
        Self {
            key: key.into(),
            message: message.map(Into::into),
            action: None,
        }
    }

    pub fn with_action(mut self, action: Option<ErrorAction>) -> Self {
        self.action = action;
        self
    }

    fn present_message(&self) -> Option<&str> {
        self.message.as_deref().filter(|message| !message.is_empty())
    }
}

/// The candidate chosen for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveError {
    pub key: String,
    pub message: String,
    pub signature: String,
    pub action: Option<ErrorAction>,
}

/// Whether a sync operation can be offered from a push failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOffer {
    pub loading: bool,
}

pub fn push_error_candidate(message: Option<&str>, sync: Option<SyncOffer>) -> ErrorCandidate {
    let Some(message) = message.filter(|m| !m.is_empty()) else {
        return ErrorCandidate::new("push", None::<String>);
    };
    if !push_needs_sync(message) {
        return ErrorCandidate::new("push", Some(message));
    }
    let action = sync.map(|offer| ErrorAction {
        label: if offer.loading {
            "Syncing...".to_string()
        } else {
            "Sync (pull then push)".to_string()
        },
        command: ErrorCommand::Sync,
        disabled: offer.loading,
        loading: offer.loading,
    });
    ErrorCandidate::new("push", Some(format!("{NEEDS_SYNC_EXPLANATION}\n\n{message}")))
        .with_action(action)
}

/// Latest failure text of every error source, as observed this cycle.
#[derive(Debug, Clone, Default)]
pub struct ErrorSources {
    pub push: Option<String>,
    pub pull: Option<String>,
    pub fetch: Option<String>,
    pub commit: Option<String>,
    pub sync: Option<String>,
    pub commit_message: Option<String>,
    pub git: Option<String>,
    pub worktree_apply: Option<String>,
    pub root_scan: Option<String>,
    pub log: Option<String>,
    pub issues: Option<String>,
    pub pull_requests: Option<String>,
    pub sync_offer: Option<SyncOffer>,
}

impl ErrorSources {
    /// Candidates for `mode`, highest priority first.
    pub fn candidates(&self, mode: ViewMode) -> Vec<ErrorCandidate> {
        match mode {
            ViewMode::Diff => vec![
                push_error_candidate(self.push.as_deref(), self.sync_offer),
                ErrorCandidate::new("pull", self.pull.clone()),
                ErrorCandidate::new("fetch", self.fetch.clone()),
                ErrorCandidate::new("commit", self.commit.clone()),
                ErrorCandidate::new("sync", self.sync.clone()),
                ErrorCandidate::new("commitMessage", self.commit_message.clone()),
                ErrorCandidate::new("git", self.git.clone()),
                ErrorCandidate::new("worktreeApply", self.worktree_apply.clone()),
                ErrorCandidate::new("gitRootScan", self.root_scan.clone()),
            ],
            ViewMode::Log => vec![ErrorCandidate::new("log", self.log.clone())],
            ViewMode::Issues => vec![ErrorCandidate::new("issues", self.issues.clone())],
            ViewMode::PullRequests => {
                vec![ErrorCandidate::new("pullRequests", self.pull_requests.clone())]
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ErrorSurface {
    dismissed: HashSet<String>,
}

impl ErrorSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn present_signatures(scope: &ErrorScope, candidates: &[ErrorCandidate]) -> HashSet<String> {
        candidates
            .iter()
            .filter_map(|candidate| {
                candidate
                    .present_message()
                    .map(|message| scope.signature(&candidate.key, message))
            })
            .collect()
    }

    pub fn active_error(&self, scope: &ErrorScope, candidates: &[ErrorCandidate]) -> Option<ActiveError> {
        candidates.iter().find_map(|candidate| {
            let message = candidate.present_message()?;
            let signature = scope.signature(&candidate.key, message);
            if self.dismissed.contains(&signature) {
                return None;
            }
            Some(ActiveError {
                key: candidate.key.clone(),
                message: message.to_string(),
                signature,
                action: candidate.action.clone(),
            })
        })
    }

    pub fn dismiss(&mut self, signature: impl Into<String>) {
        let signature = signature.into();
        if self.dismissed.insert(signature.clone()) {
            tracing::info!(event = "error.dismissed", %signature, "error dismissed");
        }
    }

    /// Forgets dismissals whose signature is no longer present.
    pub fn reconcile(&mut self, current_signatures: &HashSet<String>) {
        let before = self.dismissed.len();
        self.dismissed
            .retain(|signature| current_signatures.contains(signature));
        let pruned = before - self.dismissed.len();
        if pruned > 0 {
            tracing::debug!(event = "error.dismissals_pruned", pruned, "pruned stale dismissals");
        }
    }

    /// Reconciles against `candidates` and returns the error to display.
    pub fn recompute(&mut self, scope: &ErrorScope, candidates: &[ErrorCandidate]) -> Option<ActiveError> {
        self.reconcile(&Self::present_signatures(scope, candidates));
        self.active_error(scope, candidates)
    }

    pub fn is_dismissed(&self, signature: &str) -> bool {
        self.dismissed.contains(signature)
    }

    pub fn dismissed_count(&self) -> usize {
        self.dismissed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> ErrorScope {
        ErrorScope::new(Some("ws-1"), Some("C:\\repo\\"), ViewMode::Diff)
    }

    fn candidate(key: &str, message: &str) -> ErrorCandidate {
        ErrorCandidate::new(key, Some(message))
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn dismissal_is_logged_at_info() {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut surface = ErrorSurface::new();
        tracing::subscriber::with_default(subscriber, || {
            surface.dismiss(scope().signature("push", "rejected"));
            surface.dismiss(scope().signature("push", "rejected"));
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("INFO"));
        assert_eq!(output.matches("error.dismissed").count(), 1);
    }

    #[test]
    fn scope_string_includes_defaults() {
        assert_eq!(scope().as_str(), "ws-1:C:/repo:diff");
        assert_eq!(
            ErrorScope::new(None, None, ViewMode::PullRequests).as_str(),
            "no-workspace:no-git-root:prs"
        );
    }

    #[test]
    fn needs_sync_detection_is_case_insensitive() {
        assert!(push_needs_sync("! [rejected] main -> main (Non-Fast-Forward)"));
        assert!(push_needs_sync("Updates were rejected because the remote contains work"));
        assert!(push_needs_sync("hint: (e.g., 'git pull ...') ... FETCH FIRST"));
        assert!(push_needs_sync("the tip of your current branch is behind its remote"));
        assert!(!push_needs_sync("Authentication failed"));
    }

    #[test]
    fn push_candidate_gets_sync_prefix_and_action() {
        let candidate = push_error_candidate(
            Some("updates were rejected"),
            Some(SyncOffer { loading: false }),
        );
        assert_eq!(
            candidate.message.as_deref(),
            Some("Remote has new commits. Sync (pull then push) before retrying.\n\nupdates were rejected")
        );
        let action = candidate.action.expect("sync action");
        assert_eq!(action.label, "Sync (pull then push)");
        assert_eq!(action.command, ErrorCommand::Sync);
        assert!(!action.disabled);
    }

    #[test]
    fn push_candidate_without_sync_has_no_action() {
        let candidate = push_error_candidate(Some("non-fast-forward"), None);
        assert!(candidate.message.unwrap().starts_with(NEEDS_SYNC_EXPLANATION));
        assert!(candidate.action.is_none());
    }

    #[test]
    fn sync_action_disabled_while_syncing() {
        let candidate = push_error_candidate(Some("fetch first"), Some(SyncOffer { loading: true }));
        let action = candidate.action.unwrap();
        assert_eq!(action.label, "Syncing...");
        assert!(action.disabled);
        assert!(action.loading);
    }

    #[test]
    fn plain_push_failure_is_passed_through() {
        let candidate = push_error_candidate(Some("permission denied"), Some(SyncOffer { loading: false }));
        assert_eq!(candidate.message.as_deref(), Some("permission denied"));
        assert!(candidate.action.is_none());
    }

    #[test]
    fn first_present_candidate_wins() {
        let surface = ErrorSurface::new();
        let candidates = vec![
            ErrorCandidate::new("push", None::<String>),
            candidate("pull", ""),
            candidate("fetch", "could not resolve host"),
            candidate("commit", "nothing to commit"),
        ];
        let active = surface.active_error(&scope(), &candidates).unwrap();
        assert_eq!(active.key, "fetch");
        assert_eq!(active.signature, "ws-1:C:/repo:diff:fetch:could not resolve host");
    }

    #[test]
    fn no_candidates_means_no_error() {
        let surface = ErrorSurface::new();
        assert_eq!(surface.active_error(&scope(), &[]), None);
        assert_eq!(
            surface.active_error(&scope(), &[ErrorCandidate::new("pull", None::<String>)]),
            None
        );
    }

    #[test]
    fn dismiss_falls_through_then_resurfaces_after_prune() {
        let sources = ErrorSources {
            push: Some("updates were rejected".into()),
            pull: Some("timeout".into()),
            sync_offer: Some(SyncOffer { loading: false }),
            ..ErrorSources::default()
        };
        let scope = scope();
        let mut surface = ErrorSurface::new();

        let first = surface.recompute(&scope, &sources.candidates(ViewMode::Diff)).unwrap();
        assert_eq!(first.key, "push");
        assert!(first.action.is_some());

        surface.dismiss(first.signature.clone());
        let second = surface.recompute(&scope, &sources.candidates(ViewMode::Diff)).unwrap();
        assert_eq!(second.key, "pull");

        let resolved = ErrorSources {
            push: None,
            ..sources.clone()
        };
        surface.recompute(&scope, &resolved.candidates(ViewMode::Diff));
        assert!(!surface.is_dismissed(&first.signature));

        let again = surface.recompute(&scope, &sources.candidates(ViewMode::Diff)).unwrap();
        assert_eq!(again.key, "push");
    }

    #[test]
    fn dismiss_is_idempotent() {
        let mut surface = ErrorSurface::new();
        surface.dismiss("s:push:x");
        surface.dismiss("s:push:x");
        assert_eq!(surface.dismissed_count(), 1);
    }

    #[test]
    fn changed_message_is_a_new_signature() {
        let scope = scope();
        let mut surface = ErrorSurface::new();
        let first = surface.recompute(&scope, &[candidate("commit", "hook failed")]).unwrap();
        surface.dismiss(first.signature);

        assert_eq!(surface.recompute(&scope, &[candidate("commit", "hook failed")]), None);
        let changed = surface
            .recompute(&scope, &[candidate("commit", "hook failed again")])
            .unwrap();
        assert_eq!(changed.message, "hook failed again");
        assert_eq!(surface.dismissed_count(), 0);
    }

    #[test]
    fn dismissals_do_not_cross_scopes() {
        let diff_scope = scope();
        let other_root = ErrorScope::new(Some("ws-1"), Some("C:/other"), ViewMode::Diff);
        let mut surface = ErrorSurface::new();
        let candidates = [candidate("git", "not a repository")];

        let active = surface.active_error(&diff_scope, &candidates).unwrap();
        surface.dismiss(active.signature);

        assert_eq!(surface.active_error(&diff_scope, &candidates), None);
        assert!(surface.active_error(&other_root, &candidates).is_some());
    }

    #[test]
    fn flapping_error_reappears_after_dismissal() {
        let scope = scope();
        let mut surface = ErrorSurface::new();
        let failing = [candidate("fetch", "network unreachable")];
        let healthy = [ErrorCandidate::new("fetch", None::<String>)];

        let active = surface.recompute(&scope, &failing).unwrap();
        surface.dismiss(active.signature);
        assert_eq!(surface.recompute(&scope, &failing), None);

        surface.recompute(&scope, &healthy);
        assert!(surface.recompute(&scope, &failing).is_some());
    }

    #[test]
    fn reconcile_keeps_only_dismissed_and_present() {
        let scope = scope();
        let mut surface = ErrorSurface::new();
        surface.dismiss(scope.signature("pull", "a"));
        surface.dismiss(scope.signature("fetch", "b"));
        surface.dismiss(scope.signature("commit", "c"));

        let candidates = [candidate("pull", "a"), candidate("fetch", "b2"), candidate("sync", "d")];
        surface.reconcile(&ErrorSurface::present_signatures(&scope, &candidates));

        assert_eq!(surface.dismissed_count(), 1);
        assert!(surface.is_dismissed(&scope.signature("pull", "a")));
    }

    #[test]
    fn diff_mode_priority_order() {
        let keys: Vec<String> = ErrorSources::default()
            .candidates(ViewMode::Diff)
            .into_iter()
            .map(|c| c.key)
            .collect();
        assert_eq!(
            keys,
            vec![
                "push",
                "pull",
                "fetch",
                "commit",
                "sync",
                "commitMessage",
                "git",
                "worktreeApply",
                "gitRootScan"
            ]
        );
    }

    #[test]
    fn other_modes_have_single_candidate() {
        let sources = ErrorSources {
            push: Some("rejected".into()),
            log: Some("bad revision".into()),
            ..ErrorSources::default()
        };
        let log = sources.candidates(ViewMode::Log);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].key, "log");
        assert_eq!(sources.candidates(ViewMode::Issues)[0].key, "issues");
        assert_eq!(sources.candidates(ViewMode::PullRequests)[0].key, "pullRequests");

        let scope = ErrorScope::new(Some("ws"), None, ViewMode::Log);
        let active = ErrorSurface::new().active_error(&scope, &log).unwrap();
        assert_eq!(active.message, "bad revision");
    }
}
