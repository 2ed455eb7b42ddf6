//! Build Orchestrator
//!
//! Spawns one worker per stream and runs the supervisor loop, the only
//! owner of the Download Cache and the Rendered Build Registry.
//!
//! ```text
//!             ┌──> worker(main.js)  ──┐
//! run_build ──┼──> worker(site.css) ──┼──WorkerMsg──> supervisor ──> BuildSummary
//!             └──> worker(...)      ──┘                   │
//!                                          DownloadCache ─┤
//!                                       RenderedRegistry ─┘
//! ```
//!
//! State lives as long as the orchestrator: the Download Cache, the
//! contribution ledgers and the set of staged streams carry over between
//! runs, the registry is rebuilt from empty on every run.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use super::messages::{StreamOutcome, StreamReport, WorkerLink, WorkerMsg};
use crate::config::{ErrorPolicy, Manifest, Settings};
use crate::fetch::{DownloadCache, http_client};
use crate::logger::ProgressLine;
use crate::registry::RenderedRegistry;
use crate::reload::{ArtifactLedger, PatchOutcome, patch_file};
use crate::stream::{StreamJob, spawn_worker};
use crate::utils::path::normalize_path;
use crate::utils::{blocking, plural_count};
use crate::{debug, log};

// =============================================================================
// Stop handle
// =============================================================================

/// Aborts the live workers of the current run. Cheap to clone.
#[derive(Clone, Default)]
pub struct StopHandle(Arc<Mutex<Vec<AbortHandle>>>);

impl StopHandle {
    fn register(&self, handle: AbortHandle) {
        self.0.lock().push(handle);
    }

    fn clear(&self) {
        self.0.lock().clear();
    }

    /// Abort every worker still running. Returns how many were live.
    pub fn stop(&self) -> usize {
        let handles = std::mem::take(&mut *self.0.lock());
        let mut live = 0;
        for handle in handles {
            if !handle.is_finished() {
                handle.abort();
                live += 1;
            }
        }
        live
    }
}

// =============================================================================
// Build summary
// =============================================================================

/// Per-stream outcomes of one build run.
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub outcomes: BTreeMap<String, StreamOutcome>,
    pub elapsed: Duration,
}

impl BuildSummary {
    /// Names of the streams that failed.
    pub fn failed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, StreamOutcome::Failed(_)))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn built(&self) -> impl Iterator<Item = (&str, &StreamReport)> {
        self.outcomes.iter().filter_map(|(name, o)| match o {
            StreamOutcome::Built(report) => Some((name.as_str(), report)),
            StreamOutcome::Failed(_) => None,
        })
    }

    pub fn report(&self, stream: &str) -> Option<&StreamReport> {
        match self.outcomes.get(stream)? {
            StreamOutcome::Built(report) => Some(report),
            StreamOutcome::Failed(_) => None,
        }
    }

    /// One-line summary, e.g. `3 streams, 1 failed in 412ms`.
    pub fn line(&self) -> String {
        let mut line = plural_count(self.outcomes.len(), "stream");
        let failed = self.failed().len();
        if failed > 0 {
            line.push_str(&format!(", {failed} failed"));
        }
        line.push_str(&format!(" in {}ms", self.elapsed.as_millis()));
        line
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

pub struct Orchestrator {
    settings: Settings,
    http: reqwest::Client,
    downloads: DownloadCache,
    registry: RenderedRegistry,
    /// Contribution ledger per built stream
    ledgers: FxHashMap<String, ArtifactLedger>,
    /// Streams whose staging directory is current
    staged: FxHashSet<String>,
    /// Manifest of the last run that got past loading
    manifest: Option<Arc<Manifest>>,
    stop: StopHandle,
}

impl Orchestrator {
    pub fn new(settings: Settings) -> Result<Self> {
        Ok(Self::with_http_client(settings, http_client()?))
    }

    pub fn with_http_client(settings: Settings, http: reqwest::Client) -> Self {
        Self {
            settings,
            http,
            downloads: DownloadCache::new(),
            registry: RenderedRegistry::new(),
            ledgers: FxHashMap::default(),
            staged: FxHashSet::default(),
            manifest: None,
            stop: StopHandle::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &RenderedRegistry {
        &self.registry
    }

    pub fn manifest(&self) -> Option<&Arc<Manifest>> {
        self.manifest.as_ref()
    }

    pub fn downloads(&self) -> &DownloadCache {
        &self.downloads
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Abort every live worker of the current run.
    pub fn stop_workers(&self) -> usize {
        self.stop.stop()
    }

    /// Build every stream; only streams not staged yet run the stager.
    pub async fn run_build(&mut self) -> Result<BuildSummary> {
        self.run().await
    }

    /// Restage and build every stream.
    pub async fn run_full_build(&mut self) -> Result<BuildSummary> {
        self.staged.clear();
        self.run().await
    }

    async fn run(&mut self) -> Result<BuildSummary> {
        let started = Instant::now();
        let path = self.settings.manifest_path.clone();
        let manifest = blocking(move || Manifest::load(&path).map_err(anyhow::Error::from))
            .await
            .context("build aborted")?;
        let manifest = Arc::new(manifest);

        self.registry.clear();
        self.stop.clear();

        let progress = ProgressLine::new(&[("streams", manifest.streams.len())]);
        let mut outcomes = BTreeMap::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        for name in manifest.streams.keys() {
            let restage = !self.staged.contains(name);
            match StreamJob::new(&manifest, name, &self.settings, restage) {
                Ok(job) => {
                    let link = WorkerLink::new(name.clone(), tx.clone());
                    let handle = spawn_worker(Arc::new(job), link, self.http.clone());
                    self.stop.register(handle.abort_handle());
                }
                Err(e) => {
                    log!("error"; "{name}: {e:#}");
                    progress.inc("streams");
                    outcomes.insert(name.clone(), StreamOutcome::Failed(format!("{e:#}")));
                }
            }
        }
        // Workers hold the remaining senders; the loop ends when all exited
        drop(tx);

        while let Some(msg) = rx.recv().await {
            match msg {
                WorkerMsg::Fetch { stream, url, reply } => {
                    self.downloads.request(&stream, &url, reply);
                }
                WorkerMsg::Downloading { stream, url } => {
                    debug!("fetch"; "{stream}: downloading {url}");
                }
                WorkerMsg::Downloaded { stream, url, ok } => {
                    debug!("fetch"; "{stream}: {url} {}", if ok { "done" } else { "failed" });
                    self.downloads.complete(&url, ok);
                }
                WorkerMsg::Rendered { stream, refs } => {
                    self.registry.record(stream, refs);
                }
                WorkerMsg::Done { stream, outcome } => {
                    progress.inc("streams");
                    outcomes.insert(stream, outcome);
                }
                WorkerMsg::Exited { stream } => {
                    self.downloads.abandon(&stream);
                    outcomes.entry(stream).or_insert_with(|| {
                        progress.inc("streams");
                        StreamOutcome::Failed("worker stopped".to_string())
                    });
                }
            }
        }
        progress.finish();

        for (name, outcome) in &outcomes {
            match outcome {
                StreamOutcome::Built(report) => {
                    let ledger = ArtifactLedger::new(report.kind, report.contributions.clone());
                    self.ledgers.insert(name.clone(), ledger);
                    self.staged.insert(name.clone());
                }
                StreamOutcome::Failed(_) => {
                    self.ledgers.remove(name);
                    self.staged.remove(name);
                }
            }
        }
        // Streams dropped from the manifest
        self.ledgers.retain(|name, _| outcomes.contains_key(name));
        self.staged.retain(|name| outcomes.contains_key(name));

        let summary = BuildSummary {
            outcomes,
            elapsed: started.elapsed(),
        };
        let policy = self.settings.policy(&manifest);
        self.manifest = Some(manifest);

        log!("build"; "{}", summary.line());
        let failed = summary.failed();
        if policy == ErrorPolicy::FailFast && !failed.is_empty() {
            bail!("{} failed: {}", plural_count(failed.len(), "stream"), failed.join(", "));
        }
        Ok(summary)
    }

    /// Patch the artifacts containing `path` in place.
    ///
    /// Does nothing before the first successful manifest load. Outcomes that
    /// need a rebuild are returned, not acted on.
    pub async fn on_file_change(&mut self, path: &Path) -> Result<Vec<PatchOutcome>> {
        let Some(manifest) = self.manifest.clone() else {
            return Ok(Vec::new());
        };
        let settings = self.settings.clone();
        let changed = normalize_path(path);
        let mut ledgers = std::mem::take(&mut self.ledgers);

        let (ledgers, outcomes) = blocking(move || {
            let outcomes = patch_file(&manifest, &settings, &mut ledgers, &changed);
            Ok((ledgers, outcomes))
        })
        .await?;
        self.ledgers = ledgers;
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Env;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn orchestrator(root: &Path, manifest: &str, env: Env) -> Orchestrator {
        write(root, "build.json", manifest);
        let settings = Settings::new(root.join("build.json"), env);
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        Orchestrator::with_http_client(settings, http)
    }

    /// Serve `body` on a local port, counting requests.
    fn serve(body: &'static str) -> (String, Arc<AtomicUsize>) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                counter.fetch_add(1, Ordering::SeqCst);
                // Keep the download in flight while other streams ask for it
                std::thread::sleep(Duration::from_millis(100));
                let _ = request.respond(tiny_http::Response::from_string(body));
            }
        });
        (format!("http://{addr}"), hits)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_build_concatenates_and_records_registry() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "js/a.js", "var a = 1");
        write(dir.path(), "js/b.js", "var b = 2");
        write(dir.path(), "vendor/big.js", "var big");
        write(dir.path(), "css/site.css", "body{color:red}");

        let mut orch = orchestrator(
            dir.path(),
            r#"{
                // comments are fine
                "streams": {
                    "main.js": { "files": ["js/", "vendor/big.js --ignore-build"] },
                    "site.css": { "files": ["css/"] }
                }
            }"#,
            Env::Dev,
        );
        let summary = orch.run_build().await.unwrap();

        assert!(summary.failed().is_empty());
        assert_eq!(summary.built().count(), 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("build/main.js")).unwrap(),
            "var a = 1;\nvar b = 2;\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("build/site.css")).unwrap(),
            "body{color:red}\n"
        );

        let refs = orch.registry().get("main.js");
        assert_eq!(refs.len(), 1);
        assert!(refs[0].ends_with("vendor/big.js"));
        assert!(orch.registry().get("site.css").is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_registry_rebuilt_every_run() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.js", "a");
        let mut orch = orchestrator(
            dir.path(),
            r#"{ "streams": { "main.js": { "files": ["a.js", "https://cdn.example.com/x.js"] } } }"#,
            Env::Dev,
        );
        orch.run_build().await.unwrap();
        assert_eq!(orch.registry().get("main.js").len(), 1);

        write(
            dir.path(),
            "build.json",
            r#"{ "streams": { "main.js": { "files": ["a.js"] } } }"#,
        );
        orch.run_build().await.unwrap();
        assert!(orch.registry().get("main.js").is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_forced_url_fetched_once_across_streams() {
        let dir = TempDir::new().unwrap();
        let (base, hits) = serve("shared();");
        let manifest = format!(
            r#"{{ "streams": {{
                "one.js": {{ "files": ["{base}/lib.js --force"] }},
                "two.js": {{ "files": ["{base}/lib.js --force"] }},
                "three.js": {{ "files": ["{base}/lib.js --force"] }}
            }} }}"#
        );
        let mut orch = orchestrator(dir.path(), &manifest, Env::Dev);

        orch.run_build().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        for stream in ["one.js", "two.js", "three.js"] {
            assert_eq!(
                fs::read_to_string(dir.path().join("build").join(stream)).unwrap(),
                "shared();;\n"
            );
        }

        // The cache outlives the run
        orch.run_full_build().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(orch.downloads().is_downloaded(&format!("{base}/lib.js")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_manifest_error_aborts_without_artifacts() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(dir.path(), r#"{ "streams": { "main.js": "#, Env::Dev);

        assert!(orch.run_build().await.is_err());
        assert!(!dir.path().join("build").exists());
        assert!(orch.manifest().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fail_fast_fails_the_run() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app/[ts]/main.ts", "let x = 1;");
        let manifest = r#"{
            "strict": true,
            "compiler": ["sh", "-c", "exit 3"],
            "streams": { "main.js": { "files": ["app/[ts]"] } }
        }"#;

        let mut orch = orchestrator(dir.path(), manifest, Env::Dev);
        let err = orch.run_build().await.unwrap_err();
        assert!(err.to_string().contains("main.js"));

        // Same failure degrades to an empty contribution without --strict
        write(dir.path(), "build.json", &manifest.replace("\"strict\": true,", ""));
        let summary = orch.run_full_build().await.unwrap();
        assert!(summary.failed().is_empty());
        assert_eq!(summary.report("main.js").unwrap().bytes, ";\n".len());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_patch_after_build() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "js/a.js", "var a = 1");
        write(dir.path(), "js/b.js", "var b = 2");
        let mut orch = orchestrator(
            dir.path(),
            r#"{ "streams": { "main.js": { "files": ["js/"] } } }"#,
            Env::Prod,
        );
        orch.run_build().await.unwrap();

        write(dir.path(), "js/b.js", "var b = 3");
        let outcomes = orch
            .on_file_change(&dir.path().join("js/b.js"))
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], PatchOutcome::Patched { .. }));
        assert_eq!(
            fs::read_to_string(dir.path().join("build/main.js")).unwrap(),
            "var a = 1;\nvar b = 3;\n"
        );
        assert!(!fs::read_to_string(dir.path().join("build/main.min.js")).unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_handle_without_workers() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path(), "{}", Env::Dev);
        assert_eq!(orch.stop_handle().stop(), 0);
        assert_eq!(orch.stop_workers(), 0);
    }
}
