//! Background runner for slow git operations.
//!
//! Each operation runs on its own thread and reports back over a channel that
//! the UI loop drains. Per kind the runner keeps a `{message, loading}` status,
//! which is all the error surface ever sees.

use crate::types::LogEntry;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Commit,
    Push,
    Pull,
    Fetch,
    Sync,
    GenerateMessage,
    RootScan,
    Log,
}

impl OperationKind {
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Commit => "commit",
            OperationKind::Push => "push",
            OperationKind::Pull => "pull",
            OperationKind::Fetch => "fetch",
            OperationKind::Sync => "sync",
            OperationKind::GenerateMessage => "generate-message",
            OperationKind::RootScan => "root-scan",
            OperationKind::Log => "log",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutput {
    Done,
    CommitMessage(String),
    RootCandidates(Vec<String>),
    Log(Vec<LogEntry>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationStatus {
    pub message: Option<String>,
    pub loading: bool,
}

#[derive(Debug)]
struct OperationEvent {
    kind: OperationKind,
    result: std::result::Result<OperationOutput, String>,
}

pub struct OperationRunner {
    statuses: HashMap<OperationKind, OperationStatus>,
    tx: Sender<OperationEvent>,
    rx: Receiver<OperationEvent>,
}

impl Default for OperationRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationRunner {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            statuses: HashMap::new(),
            tx,
            rx,
        }
    }

    pub fn status(&self, kind: OperationKind) -> OperationStatus {
        self.statuses.get(&kind).cloned().unwrap_or_default()
    }

    pub fn error(&self, kind: OperationKind) -> Option<String> {
        self.statuses.get(&kind).and_then(|s| s.message.clone())
    }

    pub fn is_loading(&self, kind: OperationKind) -> bool {
        self.statuses.get(&kind).is_some_and(|s| s.loading)
    }

    pub fn any_loading(&self) -> bool {
        self.statuses.values().any(|s| s.loading)
    }

    /// Records a failure that happened before a job could be started.
    pub fn fail(&mut self, kind: OperationKind, message: impl Into<String>) {
        let status = self.statuses.entry(kind).or_default();
        status.loading = false;
        status.message = Some(message.into());
    }

    pub fn clear_error(&mut self, kind: OperationKind) {
        if let Some(status) = self.statuses.get_mut(&kind) {
            status.message = None;
        }
    }

    /// Spawns `job` unless the same kind is already running. Returns whether it started.
    pub fn start<F>(&mut self, kind: OperationKind, job: F) -> bool
    where
        F: FnOnce() -> Result<OperationOutput> + Send + 'static,
    {
        if self.is_loading(kind) {
            tracing::debug!(event = "operation.skipped", op = kind.label(), "already running");
            return false;
        }

        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("op-{}", kind.label()))
            .spawn(move || {
                let result = job().map_err(|e| format!("{e:#}"));
                let _ = tx.send(OperationEvent { kind, result });
            });

        match spawned {
            Ok(_) => {
                self.statuses.entry(kind).or_default().loading = true;
                tracing::info!(event = "operation.started", op = kind.label());
                true
            }
            Err(e) => {
                self.fail(kind, format!("Failed to start {}: {}", kind.label(), e));
                false
            }
        }
    }

    /// Drains finished operations without blocking and returns successful outputs.
    pub fn poll(&mut self) -> Vec<(OperationKind, OperationOutput)> {
        let mut finished = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            if let Some(output) = self.apply(event) {
                finished.push(output);
            }
        }
        finished
    }

    /// Blocks up to `timeout` for the next finished operation, then drains the rest.
    pub fn wait(&mut self, timeout: Duration) -> Vec<(OperationKind, OperationOutput)> {
        let mut finished = Vec::new();
        match self.rx.recv_timeout(timeout) {
            Ok(event) => {
                if let Some(output) = self.apply(event) {
                    finished.push(output);
                }
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                return finished;
            }
        }
        finished.extend(self.poll());
        finished
    }

    fn apply(&mut self, event: OperationEvent) -> Option<(OperationKind, OperationOutput)> {
        let status = self.statuses.entry(event.kind).or_default();
        status.loading = false;
        match event.result {
            Ok(output) => {
                status.message = None;
                tracing::info!(event = "operation.finished", op = event.kind.label());
                Some((event.kind, output))
            }
            Err(message) => {
                tracing::warn!(
                    event = "operation.failed",
                    op = event.kind.label(),
                    error = %message
                );
                status.message = Some(message);
                None
            }
        }
    }
}
