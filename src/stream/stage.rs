//! Stream Stager (Init state).
//!
//! Recreates the stream's staging directory and materializes every embedded
//! entry into it under `<index:04>-<slug>`, so readdir order equals
//! declaration order. Entries are staged concurrently.

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinSet;

use super::StreamJob;
use crate::actor::messages::WorkerLink;
use crate::compiler::deposit_config;
use crate::config::{Entry, Source};
use crate::fetch::fetch_into;
use crate::utils::blocking;
use crate::utils::path::copy_tree;
use crate::{debug, log};

/// References the templating layer must emit directly for this stream:
/// `--ignore-build` entries and URLs without `--force`, in declaration order.
pub fn registry_refs(job: &StreamJob) -> Vec<String> {
    job.entries
        .iter()
        .filter(|e| !e.is_embedded())
        .map(|e| e.reference(&job.root))
        .collect()
}

/// Stage every embedded entry of `job`.
pub async fn stage(
    job: &Arc<StreamJob>,
    link: &WorkerLink,
    http: &reqwest::Client,
) -> Result<()> {
    let reset = Arc::clone(job);
    blocking(move || reset_outputs(&reset)).await?;

    let mut tasks = JoinSet::new();
    for (index, entry) in job.entries.iter().enumerate() {
        if !entry.is_embedded() {
            continue;
        }
        let dest = job.staging_dir.join(entry.staged_name(index));
        let what = format!("staging {}", dest.display());
        let job = Arc::clone(job);
        let entry = entry.clone();
        let link = link.clone();
        let http = http.clone();

        tasks.spawn(async move {
            match &entry.source {
                Source::Remote(url) => {
                    fetch_into(&link, &http, &job.deps_dir, url, dest, job.policy).await
                }
                Source::Local(_) => {
                    let copy = {
                        let job = Arc::clone(&job);
                        blocking(move || copy_entry(&job, &entry, &dest)).await
                    };
                    job.policy.recover("stage", what, copy)
                }
            }
        });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined.context("staging task failed").and_then(|r| r);
        if let Err(e) = result {
            log!("stage"; "{}: {e:#}", job.name);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Empty both artifacts and recreate the staging directory.
fn reset_outputs(job: &StreamJob) -> Result<()> {
    for artifact in [&job.artifact, &job.minified] {
        if let Some(parent) = artifact.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(artifact, "")
            .with_context(|| format!("failed to reset {}", artifact.display()))?;
    }

    // May not exist yet
    if let Err(e) = fs::remove_dir_all(&job.staging_dir) {
        debug!("stage"; "remove {}: {e}", job.staging_dir.display());
    }
    fs::create_dir_all(&job.staging_dir)
        .with_context(|| format!("failed to create {}", job.staging_dir.display()))
}

fn copy_entry(job: &StreamJob, entry: &Entry, dest: &std::path::Path) -> Result<()> {
    let source = entry
        .source_path(&job.root)
        .context("entry has no local source")?;
    let count = copy_tree(&source, dest)?;
    if entry.is_subproject() {
        deposit_config(dest, &job.compiler)?;
    }
    debug!("stage"; "{} -> {} ({count} files)", source.display(), dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::messages::WorkerMsg;
    use crate::config::{Env, Settings, test_manifest};
    use std::path::Path;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn job(root: &Path, json: &str) -> Arc<StreamJob> {
        let manifest = test_manifest(root, json);
        let settings = Settings::new(&manifest.path, Env::Dev);
        let name = manifest.streams.keys().next().unwrap().clone();
        Arc::new(StreamJob::new(&manifest, &name, &settings, true).unwrap())
    }

    #[test]
    fn test_registry_refs() {
        let job = job(
            Path::new("/site"),
            r#"{ "streams": { "main.js": { "files": [
                "a.js",
                "vendor/big.js --ignore-build",
                "https://cdn.example.com/ref.js",
                "https://cdn.example.com/embedded.js --force"
            ] } } }"#,
        );
        assert_eq!(
            registry_refs(&job),
            vec![
                "/site/vendor/big.js".to_string(),
                "https://cdn.example.com/ref.js".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_stage_copies_entries_in_declared_slots() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "static/js/a.js", "a");
        write(dir.path(), "static/js/sub/b.js", "b");
        write(dir.path(), "static/one.js", "one");
        write(dir.path(), "static/app/main.ts", "let x = 1;");
        write(dir.path(), "vendor/skip.js", "skip");
        write(dir.path(), "build/dir-main-js/stale.js", "stale");

        let job = job(
            dir.path(),
            r#"{ "streams": { "main.js": { "files": [
                "static/js/",
                "vendor/skip.js --ignore-build",
                "./static/one.js",
                "static/app/[ts]"
            ] } } }"#,
        );

        let (tx, _rx) = mpsc::unbounded_channel::<WorkerMsg>();
        let link = WorkerLink::new("main.js", tx);
        stage(&job, &link, &reqwest::Client::new()).await.unwrap();

        let staging = dir.path().join("build/dir-main-js");
        assert!(!staging.join("stale.js").exists());
        assert_eq!(
            fs::read_to_string(staging.join("0000-static_js/sub/b.js")).unwrap(),
            "b"
        );
        assert!(!staging.join("0001-vendor_skip.js").exists());
        assert_eq!(
            fs::read_to_string(staging.join("0002-static_one.js")).unwrap(),
            "one"
        );
        assert!(staging.join("0003-static_app_[ts]/main.ts").is_file());
        assert!(staging.join("0003-static_app_[ts]/tsconfig.json").is_file());
        assert_eq!(fs::read_to_string(dir.path().join("build/main.js")).unwrap(), "");
        assert!(dir.path().join("build/main.min.js").is_file());
    }

    #[tokio::test]
    async fn test_missing_local_entry_degrades() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.js", "a");
        let job = job(
            dir.path(),
            r#"{ "streams": { "main.js": { "files": ["a.js", "gone.js"] } } }"#,
        );

        let (tx, _rx) = mpsc::unbounded_channel::<WorkerMsg>();
        let link = WorkerLink::new("main.js", tx);
        stage(&job, &link, &reqwest::Client::new()).await.unwrap();
        assert!(dir.path().join("build/dir-main-js/0000-a.js").is_file());
    }
}
