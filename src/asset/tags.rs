//! Asset tag plan for the templating layer.
//!
//! ```text
//! dev   registry refs, then one tag per contributing file
//! test  registry refs, then the combined artifact
//! prod  registry refs, then the minified artifact (combined if unavailable)
//! ```

use std::path::Path;

use serde::Serialize;

use super::OutputKind;
use crate::config::Env;
use crate::utils::path::display_relative;

/// One `<script>` or `<link>` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "href", rename_all = "lowercase")]
pub enum AssetTag {
    Script(String),
    Stylesheet(String),
}

impl AssetTag {
    pub fn new(kind: OutputKind, href: String) -> Self {
        match kind {
            OutputKind::Script => Self::Script(href),
            OutputKind::Stylesheet => Self::Stylesheet(href),
        }
    }

    pub fn href(&self) -> &str {
        match self {
            Self::Script(href) | Self::Stylesheet(href) => href,
        }
    }

    pub fn to_html(&self) -> String {
        let href = escape_attr(self.href());
        match self {
            Self::Script(_) => format!(r#"<script src="{href}"></script>"#),
            Self::Stylesheet(_) => format!(r#"<link rel="stylesheet" href="{href}">"#),
        }
    }
}

/// What the plan for one stream is built from.
pub struct TagInputs<'a> {
    pub kind: OutputKind,
    /// Registry references of the stream
    pub refs: &'a [String],
    /// Contributing files of the last build
    pub files: &'a [std::path::PathBuf],
    pub artifact: &'a Path,
    /// Minified artifact, if one is available
    pub minified: Option<&'a Path>,
}

/// Ordered tags for one stream. Local paths become root-relative hrefs.
pub fn tag_plan(env: Env, inputs: &TagInputs<'_>, root: &Path) -> Vec<AssetTag> {
    let href = |reference: &str| {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else {
            format!("/{}", display_relative(Path::new(reference), root).trim_start_matches('/'))
        }
    };
    let path_href = |path: &Path| href(&path.to_string_lossy());

    let mut tags: Vec<AssetTag> = inputs
        .refs
        .iter()
        .map(|r| AssetTag::new(inputs.kind, href(r)))
        .collect();

    match env {
        Env::Dev => tags.extend(
            inputs
                .files
                .iter()
                .map(|f| AssetTag::new(inputs.kind, path_href(f))),
        ),
        Env::Test => tags.push(AssetTag::new(inputs.kind, path_href(inputs.artifact))),
        Env::Prod => {
            let artifact = inputs.minified.unwrap_or(inputs.artifact);
            tags.push(AssetTag::new(inputs.kind, path_href(artifact)));
        }
    }
    tags
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
