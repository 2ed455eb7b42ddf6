//! Actor Message Definitions
//!
//! Message types between stream workers, the orchestrator's supervisor and
//! the watcher.
//!
//! ```text
//! StreamWorker --WorkerMsg--> Orchestrator <--WatchMsg-- FsActor
//!      ^                          │
//!      └────── Ticket (oneshot) ──┘
//! ```

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::asset::OutputKind;
use crate::fetch::Ticket;
use crate::stream::Contribution;

// =============================================================================
// Worker -> Orchestrator
// =============================================================================

/// Messages from a stream worker to the supervisor.
#[derive(Debug)]
pub enum WorkerMsg {
    /// Ask the Download Cache about a `--force` URL
    Fetch {
        stream: String,
        url: String,
        reply: oneshot::Sender<Ticket>,
    },
    /// The worker holding the fetch ticket started the download
    Downloading { stream: String, url: String },
    /// The download finished (or failed)
    Downloaded { stream: String, url: String, ok: bool },
    /// References left out of the artifact (registry entries)
    Rendered { stream: String, refs: Vec<String> },
    /// The stream's build finished
    Done {
        stream: String,
        outcome: StreamOutcome,
    },
    /// The worker task is gone (always sent, even on abort or panic)
    Exited { stream: String },
}

/// Result of one stream's build.
#[derive(Debug, Clone)]
pub enum StreamOutcome {
    Built(StreamReport),
    Failed(String),
}

/// What a successful stream build produced.
#[derive(Debug, Clone, Serialize)]
pub struct StreamReport {
    pub kind: OutputKind,
    /// Files that contributed content, in artifact order
    pub files: Vec<PathBuf>,
    /// Byte range of every piece in the combined artifact
    pub contributions: Vec<Contribution>,
    /// Size of the combined artifact
    pub bytes: usize,
    /// Size of the minified variant; `None` if not produced or unavailable
    pub minified: Option<usize>,
}

// =============================================================================
// Worker link
// =============================================================================

/// A worker's handle on the supervisor channel.
#[derive(Clone)]
pub struct WorkerLink {
    stream: String,
    tx: mpsc::UnboundedSender<WorkerMsg>,
}

impl WorkerLink {
    pub fn new(stream: impl Into<String>, tx: mpsc::UnboundedSender<WorkerMsg>) -> Self {
        Self {
            stream: stream.into(),
            tx,
        }
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    // A closed channel means the run was stopped; nothing left to tell.
    fn send(&self, msg: WorkerMsg) {
        let _ = self.tx.send(msg);
    }

    /// Ask for a fetch ticket and wait for the answer.
    ///
    /// Answers [`Ticket::Failed`] if the supervisor is gone.
    pub async fn request_fetch(&self, url: &str) -> Ticket {
        let (reply, rx) = oneshot::channel();
        self.send(WorkerMsg::Fetch {
            stream: self.stream.clone(),
            url: url.to_string(),
            reply,
        });
        rx.await.unwrap_or(Ticket::Failed)
    }

    pub fn downloading(&self, url: &str) {
        self.send(WorkerMsg::Downloading {
            stream: self.stream.clone(),
            url: url.to_string(),
        });
    }

    pub fn downloaded(&self, url: &str, ok: bool) {
        self.send(WorkerMsg::Downloaded {
            stream: self.stream.clone(),
            url: url.to_string(),
            ok,
        });
    }

    pub fn rendered(&self, refs: Vec<String>) {
        self.send(WorkerMsg::Rendered {
            stream: self.stream.clone(),
            refs,
        });
    }

    pub fn done(&self, outcome: StreamOutcome) {
        self.send(WorkerMsg::Done {
            stream: self.stream.clone(),
            outcome,
        });
    }

    /// Guard that reports [`WorkerMsg::Exited`] when dropped.
    pub fn exit_guard(&self) -> ExitGuard {
        ExitGuard(self.clone())
    }
}

/// Sends `Exited` on drop, so an aborted or panicked worker never leaves
/// the supervisor waiting.
pub struct ExitGuard(WorkerLink);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let stream = self.0.stream.clone();
        self.0.send(WorkerMsg::Exited { stream });
    }
}

// =============================================================================
// FsActor -> Orchestrator
// =============================================================================

/// Messages from the watcher to the watch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchMsg {
    /// Restage and rebuild every stream
    FullRebuild { reason: String },
    /// Patch modified sources in place
    Patch(Vec<PathBuf>),
}
