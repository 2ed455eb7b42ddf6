//! Watch Session
//!
//! Wires the FsActor to the orchestrator:
//!
//! ```text
//! FsActor ──WatchMsg──> WatchSession ──> Orchestrator
//!    ^                      │      (patch, or full rebuild)
//!    └──── manifest (watch) ┘
//! ```
//!
//! Modified sources are patched in place; anything the patcher cannot
//! place (a file the staging tree does not have, a ledger that no longer
//! matches) escalates to a full rebuild.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};

use super::fs::FsActor;
use super::messages::WatchMsg;
use super::orchestrator::Orchestrator;
use crate::config::Manifest;
use crate::logger::{status_error, status_success, status_warning};
use crate::reload::PatchOutcome;
use crate::utils::path::{display_relative, normalize_path};
use crate::utils::plural_count;
use crate::{debug, log};

const CHANNEL_BUFFER: usize = 32;

pub struct WatchSession {
    orchestrator: Orchestrator,
    manifest_tx: watch::Sender<Arc<Manifest>>,
}

impl WatchSession {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let placeholder = placeholder_manifest(&orchestrator.settings().manifest_path);
        let (manifest_tx, _) = watch::channel(Arc::new(placeholder));
        Self {
            orchestrator,
            manifest_tx,
        }
    }

    /// Build once, then follow changes until `shutdown` flips.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let (session_tx, mut session_rx) = mpsc::channel(CHANNEL_BUFFER);
        let fs_actor = FsActor::new(self.manifest_tx.subscribe(), session_tx)
            .context("failed to start file watcher")?;
        let watcher = tokio::spawn(fs_actor.run());

        self.rebuild(false).await;
        log!("watch"; "watching for changes, Ctrl+C to stop");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                msg = session_rx.recv() => {
                    let Some(msg) = msg else { break };
                    self.handle(msg).await;
                }
            }
        }

        watcher.abort();
        let stopped = self.orchestrator.stop_workers();
        if stopped > 0 {
            debug!("watch"; "stopped {}", plural_count(stopped, "worker"));
        }
        Ok(())
    }

    async fn handle(&mut self, msg: WatchMsg) {
        match msg {
            WatchMsg::FullRebuild { reason } => {
                log!("watch"; "{reason}, rebuilding");
                self.rebuild(true).await;
            }
            WatchMsg::Patch(paths) => {
                for path in paths {
                    if self.patch(&path).await {
                        log!("watch"; "{} needs a full rebuild", path.display());
                        self.rebuild(true).await;
                        return;
                    }
                }
            }
        }
    }

    /// Patch one file; returns whether a full rebuild is needed.
    async fn patch(&mut self, path: &Path) -> bool {
        let outcomes = match self.orchestrator.on_file_change(path).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                status_error("patch failed", &format!("{e:#}"));
                return false;
            }
        };

        let root = self
            .orchestrator
            .manifest()
            .map(|m| m.root.clone())
            .unwrap_or_else(|| normalize_path(Path::new(".")));
        let file = display_relative(path, &root);

        if outcomes.is_empty() {
            debug!("watch"; "{file} belongs to no stream");
            return false;
        }

        let mut rebuild = false;
        for outcome in &outcomes {
            match outcome {
                PatchOutcome::Patched { stream, .. } => {
                    status_success(&format!("{stream} ← {file}"));
                }
                PatchOutcome::NotContributing { stream } => {
                    debug!("watch"; "{stream}: {file} refreshed, not in artifact");
                }
                PatchOutcome::NotStaged { stream } | PatchOutcome::Drifted { stream } => {
                    debug!("watch"; "{stream}: {outcome:?}");
                    rebuild = true;
                }
            }
        }
        rebuild
    }

    async fn rebuild(&mut self, restage: bool) {
        let result = if restage {
            self.orchestrator.run_full_build().await
        } else {
            self.orchestrator.run_build().await
        };

        match result {
            Ok(summary) => {
                let failed = summary.failed();
                if failed.is_empty() {
                    status_success(&format!("built {}", summary.line()));
                } else {
                    status_warning(&format!("built {}: {}", summary.line(), failed.join(", ")));
                }
            }
            Err(e) => status_error("build failed", &format!("{e:#}")),
        }

        if let Some(manifest) = self.orchestrator.manifest() {
            self.manifest_tx.send_replace(Arc::clone(manifest));
        }
    }
}

/// Stand-in until the manifest loads, so the manifest directory is watched
/// even when the first load fails.
fn placeholder_manifest(path: &Path) -> Manifest {
    let path = normalize_path(path);
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.clone());
    Manifest {
        path,
        root,
        ..Manifest::default()
    }
}
