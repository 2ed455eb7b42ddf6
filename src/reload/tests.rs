use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tempfile::TempDir;
use tokio::sync::mpsc;

use super::{ArtifactLedger, PatchOutcome, Splice, patch_file};
use crate::actor::messages::{StreamOutcome, WorkerLink, WorkerMsg};
use crate::config::{Env, Manifest, Settings, test_manifest};
use crate::stream::{StreamJob, spawn_worker};
use crate::utils::path::normalize_path;

struct Site {
    _dir: TempDir,
    root: PathBuf,
    manifest: Manifest,
    settings: Settings,
    ledgers: FxHashMap<String, ArtifactLedger>,
}

impl Site {
    fn write(&self, rel: &str, content: &str) {
        write(&self.root, rel, content);
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root.join(rel)).unwrap()
    }

    fn patch(&mut self, rel: &str) -> Vec<PatchOutcome> {
        let changed = self.root.join(rel);
        patch_file(&self.manifest, &self.settings, &mut self.ledgers, &changed).unwrap()
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Lay out `files`, then build every stream of `json` the way a run does.
async fn build_site(files: &[(&str, &str)], json: &str, env: Env) -> Site {
    build_site_in("", files, json, env).await
}

/// Like [`build_site`], with the manifest in `manifest_dir` below the
/// temporary root. `files` and [`Site`] paths stay relative to that root.
async fn build_site_in(manifest_dir: &str, files: &[(&str, &str)], json: &str, env: Env) -> Site {
    let dir = TempDir::new().unwrap();
    let root = normalize_path(dir.path());
    for (rel, content) in files {
        write(&root, rel, content);
    }

    let manifest_root = if manifest_dir.is_empty() {
        root.clone()
    } else {
        fs::create_dir_all(root.join(manifest_dir)).unwrap();
        root.join(manifest_dir)
    };
    let manifest = test_manifest(&manifest_root, json);
    let settings = Settings::new(&manifest.path, env);
    let mut ledgers = FxHashMap::default();

    for name in manifest.streams.keys() {
        let job = Arc::new(StreamJob::new(&manifest, name, &settings, true).unwrap());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let link = WorkerLink::new(name.clone(), tx);
        spawn_worker(job, link, reqwest::Client::new()).await.unwrap();

        while let Some(msg) = rx.recv().await {
            if let WorkerMsg::Done {
                outcome: StreamOutcome::Built(report),
                ..
            } = msg
            {
                ledgers.insert(
                    name.clone(),
                    ArtifactLedger::new(report.kind, report.contributions),
                );
            }
        }
    }

    Site {
        _dir: dir,
        root,
        manifest,
        settings,
        ledgers,
    }
}

fn patched(outcomes: &[PatchOutcome], stream: &str) -> bool {
    outcomes
        .iter()
        .any(|o| matches!(o, PatchOutcome::Patched { stream: s, .. } if s == stream))
}

const SCRIPTS: &str = r#"{ "streams": { "main.js": { "ignore": ["skip.js"], "files": ["js/"] } } }"#;

#[tokio::test(flavor = "multi_thread")]
async fn test_patch_identical_content_by_range() {
    let mut site = build_site(
        &[("js/a.js", "same()"), ("js/b.js", "same()")],
        SCRIPTS,
        Env::Dev,
    )
    .await;
    assert_eq!(site.read("build/main.js"), "same();\nsame();\n");

    site.write("js/b.js", "changed()");
    let outcomes = site.patch("js/b.js");

    assert_eq!(
        outcomes,
        vec![PatchOutcome::Patched {
            stream: "main.js".into(),
            splice: Splice::ByRange
        }]
    );
    assert_eq!(site.read("build/main.js"), "same();\nchanged();\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_successive_patches_shift_ranges() {
    let mut site = build_site(
        &[("js/a.js", "a()"), ("js/b.js", "b()"), ("js/c.js", "c()")],
        SCRIPTS,
        Env::Dev,
    )
    .await;

    site.write("js/a.js", "a_grew_much_longer()");
    assert!(patched(&site.patch("js/a.js"), "main.js"));
    site.write("js/c.js", "");
    assert!(patched(&site.patch("js/c.js"), "main.js"));
    site.write("js/b.js", "b2()");
    assert!(patched(&site.patch("js/b.js"), "main.js"));

    assert_eq!(
        site.read("build/main.js"),
        "a_grew_much_longer();\nb2();\n;\n"
    );
    let ranges: Vec<_> = site.ledgers["main.js"]
        .contributions()
        .iter()
        .map(|c| (c.start, c.len))
        .collect();
    assert_eq!(ranges, vec![(0, 20), (22, 4), (28, 0)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_patch_refreshes_minified_variant() {
    let mut site = build_site(&[("js/a.js", "var first = 1")], SCRIPTS, Env::Prod).await;
    let before = site.read("build/main.min.js");

    site.write("js/a.js", "var second = 2");
    assert!(patched(&site.patch("js/a.js"), "main.js"));

    let after = site.read("build/main.min.js");
    assert_ne!(before, after);
    assert!(!after.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_new_file_is_not_staged() {
    let mut site = build_site(&[("js/a.js", "a()")], SCRIPTS, Env::Dev).await;

    site.write("js/new.js", "fresh()");
    let outcomes = site.patch("js/new.js");

    assert_eq!(
        outcomes,
        vec![PatchOutcome::NotStaged {
            stream: "main.js".into()
        }]
    );
    assert!(outcomes[0].needs_rebuild());
    assert_eq!(site.read("build/main.js"), "a();\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ignored_file_refreshes_staged_copy_only() {
    let mut site = build_site(
        &[("js/a.js", "a()"), ("js/skip.js", "skip()")],
        SCRIPTS,
        Env::Dev,
    )
    .await;

    site.write("js/skip.js", "skip2()");
    let outcomes = site.patch("js/skip.js");

    assert!(matches!(outcomes[..], [PatchOutcome::NotContributing { .. }]));
    assert_eq!(site.read("build/main.js"), "a();\n");
    assert_eq!(site.read("build/dir-main-js/0000-js/skip.js"), "skip2()");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_drifted_artifact_needs_rebuild() {
    let mut site = build_site(&[("js/a.js", "a()")], SCRIPTS, Env::Dev).await;
    site.write("build/main.js", "edited by hand");

    site.write("js/a.js", "a2()");
    let outcomes = site.patch("js/a.js");

    assert!(matches!(outcomes[..], [PatchOutcome::Drifted { .. }]));
    assert!(outcomes[0].needs_rebuild());
    assert_eq!(site.read("build/main.js"), "edited by hand");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unowned_file_patches_nothing() {
    let mut site = build_site(&[("js/a.js", "a()")], SCRIPTS, Env::Dev).await;
    site.write("other/x.js", "x()");
    assert!(site.patch("other/x.js").is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_style_source_recompiled() {
    let mut site = build_site(
        &[
            ("css/base.css", "body{margin:0}"),
            ("css/theme.scss", "$c: red; a { color: $c; }"),
        ],
        r#"{ "streams": { "site.css": { "files": ["css/"] } } }"#,
        Env::Dev,
    )
    .await;
    let before = site.read("build/site.css");
    assert!(before.starts_with("body{margin:0}\n"));
    assert!(before.contains("red"));

    site.write("css/theme.scss", "$c: blue; a { color: $c; }");
    assert!(patched(&site.patch("css/theme.scss"), "site.css"));

    let after = site.read("build/site.css");
    assert!(after.starts_with("body{margin:0}\n"));
    assert!(after.contains("blue"));
    assert!(!after.contains("red"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_one_file_in_two_streams() {
    let mut site = build_site(
        &[("shared/util.js", "util()"), ("js/a.js", "a()")],
        r#"{ "streams": {
            "one.js": { "files": ["shared/"] },
            "two.js": { "files": ["js/", "shared/util.js"] }
        } }"#,
        Env::Dev,
    )
    .await;

    site.write("shared/util.js", "util2()");
    let outcomes = site.patch("shared/util.js");

    assert!(patched(&outcomes, "one.js"));
    assert!(patched(&outcomes, "two.js"));
    assert_eq!(site.read("build/one.js"), "util2();\n");
    assert_eq!(site.read("build/two.js"), "a();\nutil2();\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_subproject_recompiled() {
    let mut site = build_site(
        &[("app/a.ts", "let a = 1;"), ("js/first.js", "first()")],
        r#"{
            "compiler": ["sh", "-c", "cat *.ts > index.js"],
            "streams": { "main.js": { "files": ["js/", "app/[ts]"] } }
        }"#,
        Env::Dev,
    )
    .await;
    assert_eq!(site.read("build/main.js"), "first();\nlet a = 1;;\n");

    site.write("app/a.ts", "let a = 2;");
    assert!(patched(&site.patch("app/a.ts"), "main.js"));
    assert_eq!(site.read("build/main.js"), "first();\nlet a = 2;;\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_parent_relative_entry_patched() {
    let mut site = build_site_in(
        "site",
        &[("shared/a.js", "var a = 1;"), ("site/js/b.js", "b()")],
        r#"{ "streams": { "main.js": { "files": ["../shared/", "js/"] } } }"#,
        Env::Dev,
    )
    .await;
    assert_eq!(site.read("site/build/main.js"), "var a = 1;;\nb();\n");
    assert!(
        site.manifest
            .watch_roots()
            .contains(&site.root.join("shared"))
    );

    site.write("shared/a.js", "var a = 2;");
    let outcomes = site.patch("shared/a.js");

    assert_eq!(
        outcomes,
        vec![PatchOutcome::Patched {
            stream: "main.js".into(),
            splice: Splice::ByRange
        }]
    );
    assert_eq!(site.read("site/build/main.js"), "var a = 2;;\nb();\n");
}
