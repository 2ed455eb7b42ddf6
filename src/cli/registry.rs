//! `registry`: build, then hand the templating layer what it needs.
//!
//! ```json
//! {
//!   "env": "prod",
//!   "registry": { "main.js": ["https://cdn.example.com/lib.js"] },
//!   "tags": {
//!     "main.js": [
//!       { "type": "script", "href": "https://cdn.example.com/lib.js" },
//!       { "type": "script", "href": "/build/main.min.js" }
//!     ]
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use super::BuildArgs;
use crate::actor::{BuildSummary, Orchestrator};
use crate::asset::{AssetTag, TagInputs, tag_plan};
use crate::config::{Env, Manifest};
use crate::core::register_stop_handle;
use crate::registry::RenderedRegistry;

#[derive(Debug, Serialize)]
pub struct RegistryView<'a> {
    pub env: Env,
    pub registry: BTreeMap<&'a str, &'a [String]>,
    pub tags: BTreeMap<&'a str, Vec<AssetTag>>,
}

pub async fn registry(
    args: &BuildArgs,
    stream: Option<&str>,
    html: bool,
    output: Option<&Path>,
) -> Result<()> {
    let mut orchestrator = Orchestrator::new(args.settings()?)?;
    register_stop_handle(orchestrator.stop_handle());

    let summary = orchestrator.run_full_build().await?;
    let manifest = orchestrator
        .manifest()
        .context("build finished without a manifest")?;
    if let Some(name) = stream
        && manifest.stream(name).is_none()
    {
        bail!("unknown stream `{name}`");
    }

    let view = build_view(
        manifest,
        orchestrator.registry(),
        &summary,
        args.env,
        stream,
    );
    let rendered = if html {
        render_html(&view)
    } else {
        serde_json::to_string_pretty(&view)? + "\n"
    };

    match output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{rendered}");
            Ok(())
        }
    }
}

/// Registry entries and tag plans of every built stream, or only `only`.
pub fn build_view<'a>(
    manifest: &'a Manifest,
    registry: &'a RenderedRegistry,
    summary: &'a BuildSummary,
    env: Env,
    only: Option<&str>,
) -> RegistryView<'a> {
    let paths = manifest.paths();
    let wanted = |name: &str| only.is_none_or(|o| o == name);

    let registry: BTreeMap<_, _> = registry.iter().filter(|&(name, _)| wanted(name)).collect();

    let mut tags = BTreeMap::new();
    for (name, report) in summary.built().filter(|&(name, _)| wanted(name)) {
        let artifact = paths.artifact(name);
        let minified = paths.minified(name);
        let inputs = TagInputs {
            kind: report.kind,
            refs: registry.get(name).copied().unwrap_or(&[]),
            files: &report.files,
            artifact: &artifact,
            minified: report.minified.is_some().then_some(minified.as_path()),
        };
        tags.insert(name, tag_plan(env, &inputs, &manifest.root));
    }

    RegistryView {
        env,
        registry,
        tags,
    }
}

fn render_html(view: &RegistryView<'_>) -> String {
    let mut out = String::new();
    for (name, tags) in &view.tags {
        out.push_str(&format!("<!-- {name} -->\n"));
        for tag in tags {
            out.push_str(&tag.to_html());
            out.push('\n');
        }
    }
    out
}
