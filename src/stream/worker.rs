//! Stream Worker.
//!
//! One tokio task per stream:
//!
//! ```text
//! Init (stage) ──> Build (resolve, write, minify) ──> Done
//! ```
//!
//! Init only runs when the orchestrator asks for a restage. Any error ends
//! the task with a `Failed` outcome; the exit guard reports `Exited` even
//! if the task is aborted, so the supervisor never waits on a dead stream.

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use super::{StreamJob, registry_refs, resolve, stage};
use crate::actor::messages::{StreamOutcome, StreamReport, WorkerLink};
use crate::asset::minify_async;
use crate::utils::blocking;
use crate::{debug, log};

/// Worker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Init,
    Build,
    Done,
}

impl WorkerState {
    pub const fn initial(restage: bool) -> Self {
        if restage { Self::Init } else { Self::Build }
    }
}

/// Spawn the worker task for `job`.
pub fn spawn_worker(
    job: Arc<StreamJob>,
    link: WorkerLink,
    http: reqwest::Client,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _exit = link.exit_guard();
        let outcome = match run(&job, &link, &http).await {
            Ok(report) => StreamOutcome::Built(report),
            Err(e) => {
                log!("error"; "{}: {e:#}", job.name);
                StreamOutcome::Failed(format!("{e:#}"))
            }
        };
        link.done(outcome);
    })
}

async fn run(
    job: &Arc<StreamJob>,
    link: &WorkerLink,
    http: &reqwest::Client,
) -> Result<StreamReport> {
    link.rendered(registry_refs(job));

    let mut state = WorkerState::initial(job.restage);
    let mut report = None;
    while state != WorkerState::Done {
        debug!("stream"; "{}: {state:?}", job.name);
        state = match state {
            WorkerState::Init => {
                stage(job, link, http).await?;
                WorkerState::Build
            }
            WorkerState::Build => {
                report = Some(build(job).await?);
                WorkerState::Done
            }
            WorkerState::Done => WorkerState::Done,
        };
    }
    report.context("stream finished without a build")
}

/// Resolve the staging directory, write the artifact, minify if enabled.
async fn build(job: &Arc<StreamJob>) -> Result<StreamReport> {
    let resolving = Arc::clone(job);
    let resolved = blocking(move || {
        resolve(&resolving.staging_dir, &resolving.resolve_options())
    })
    .await?;

    let bytes = resolved.content.len();
    let minified = if job.minify {
        let min = minify_async(job.kind, resolved.content.clone()).await;
        if min.is_empty() && bytes > 0 {
            log!("minify"; "{}: minification unavailable", job.name);
        }
        Some(min)
    } else {
        None
    };
    let minified_len = minified.as_ref().map(String::len).filter(|n| *n > 0);

    let writing = Arc::clone(job);
    let content = resolved.content;
    blocking(move || {
        if let Some(parent) = writing.artifact.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&writing.artifact, &content)
            .with_context(|| format!("failed to write {}", writing.artifact.display()))?;
        if let Some(min) = minified {
            fs::write(&writing.minified, min)
                .with_context(|| format!("failed to write {}", writing.minified.display()))?;
        }
        Ok(())
    })
    .await?;

    Ok(StreamReport {
        kind: job.kind,
        files: resolved.files,
        contributions: resolved.contributions,
        bytes,
        minified: minified_len,
    })
}
