use anyhow::Result;
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

pub enum WatcherEvent {
    Changed,
}

/// Watches a repository working tree plus its index and HEAD.
pub struct RepoWatcher {
    _watcher: RecommendedWatcher,
    pub receiver: Receiver<WatcherEvent>,
}

impl RepoWatcher {
    pub fn new(repo_root: &Path) -> Result<Self> {
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) if !touches_only_git_internals(&event) => {
                    let _ = tx.send(WatcherEvent::Changed);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(event = "watcher.error", error = %e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(repo_root, RecursiveMode::Recursive)?;
        tracing::info!(event = "watcher.started", root = %repo_root.display());

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }
}

/// Object and log writes under `.git` fire constantly during fetches; only the
/// index, HEAD and refs change what the review list shows.
fn touches_only_git_internals(event: &notify::Event) -> bool {
    !event.paths.is_empty()
        && event.paths.iter().all(|path| {
            let mut components = path.components().map(|c| c.as_os_str().to_string_lossy());
            let Some(_) = components.by_ref().find(|c| c == ".git") else {
                return false;
            };
            match components.next().as_deref() {
                Some("index") | Some("HEAD") | Some("refs") => false,
                _ => true,
            }
        })
}
