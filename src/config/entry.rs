//! `files` entry grammar.
//!
//! ```text
//! static/js/page.js                     plain file
//! static/js/                            directory (copied recursively)
//! static/vendor/big.js --ignore-build   referenced directly, never concatenated
//! https://cdn.example.com/lib.js        referenced directly, never concatenated
//! https://cdn.example.com/lib.js --force  fetched and concatenated
//! static/js/app/[ts]                    compiler sub-project
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::error::EntryError;
use super::util::resolve_manifest_path;
use crate::fetch::url_slug;

pub const IGNORE_BUILD: &str = "--ignore-build";
pub const FORCE: &str = "--force";
pub const SUBPROJECT_MARKER: &str = "[ts]";

/// Where an entry's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Path relative to the manifest directory, marker included as declared.
    Local(String),
    Remote(String),
}

/// One parsed `files` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub source: Source,
    pub ignore_build: bool,
    pub force: bool,
}

impl FromStr for Entry {
    type Err = EntryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut rest = raw.trim();
        let mut ignore_build = false;
        let mut force = false;

        // Directives are trailing and may appear in any order
        loop {
            if let Some(stripped) = rest.strip_suffix(IGNORE_BUILD) {
                ignore_build = true;
                rest = stripped.trim_end();
            } else if let Some(stripped) = rest.strip_suffix(FORCE) {
                force = true;
                rest = stripped.trim_end();
            } else {
                break;
            }
        }

        if rest.is_empty() {
            return Err(EntryError::Empty);
        }

        let source = if is_url(rest) {
            Source::Remote(rest.to_string())
        } else {
            if force {
                return Err(EntryError::ForceOnLocal(rest.to_string()));
            }
            Source::Local(rest.to_string())
        };

        Ok(Self {
            source,
            ignore_build,
            force,
        })
    }
}

impl Entry {
    /// Whether the entry marks a compiler sub-project.
    pub fn is_subproject(&self) -> bool {
        matches!(&self.source, Source::Local(p) if p.contains(SUBPROJECT_MARKER))
    }

    /// Whether the entry's bytes end up in the combined artifact.
    pub fn is_embedded(&self) -> bool {
        match &self.source {
            _ if self.ignore_build => false,
            Source::Local(_) => true,
            Source::Remote(_) => self.force,
        }
    }

    /// Absolute source path of a local entry, marker removed.
    pub fn source_path(&self, root: &Path) -> Option<PathBuf> {
        match &self.source {
            Source::Local(path) => Some(resolve_manifest_path(
                root,
                &path.replace(SUBPROJECT_MARKER, ""),
            )),
            Source::Remote(_) => None,
        }
    }

    /// Name of this entry inside the stream's staging directory.
    ///
    /// The zero-padded index keeps readdir order equal to declaration
    /// order. Local paths keep the sub-project marker so the resolver can
    /// recognize the staged copy.
    pub fn staged_name(&self, index: usize) -> String {
        let slug = match &self.source {
            Source::Local(path) => {
                let path = path.trim_start_matches("./");
                path.trim_end_matches(['/', '\\']).replace(['/', '\\'], "_")
            }
            Source::Remote(url) => url_slug(url),
        };
        format!("{index:04}-{slug}")
    }

    /// Reference recorded in the Rendered Build Registry for entries that are
    /// not embedded: the URL itself, or the absolute local path.
    pub fn reference(&self, root: &Path) -> String {
        match &self.source {
            Source::Remote(url) => url.clone(),
            Source::Local(_) => self
                .source_path(root)
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }
}

fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}
