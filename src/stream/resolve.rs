//! Source Resolver.
//!
//! Walks a staged directory depth-first and turns it into one ordered
//! buffer. The walk (plan) is sequential and deterministic; rendering the
//! planned pieces runs in parallel and is collected back in plan order, so
//! read completion order never leaks into the artifact.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::asset::{OutputKind, is_style_source};
use crate::compiler::{CompilerConfig, compile_subproject, render_style};
use crate::config::{ErrorPolicy, SUBPROJECT_MARKER};
use crate::debug;

const SKIPPED_DIRS: &[&str] = &[".git", "node_modules"];

/// Byte range one piece occupies in a combined artifact (delimiter excluded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contribution {
    /// Rendered file: the file itself, a style source's `.css` sibling, or
    /// a sub-project's output file
    pub path: PathBuf,
    pub start: usize,
    pub len: usize,
}

impl Contribution {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Result of resolving one staged directory.
#[derive(Debug, Default)]
pub struct Resolved {
    pub content: String,
    /// Contributing files, in order
    pub files: Vec<PathBuf>,
    pub contributions: Vec<Contribution>,
}

pub struct ResolveOptions<'a> {
    pub kind: OutputKind,
    /// File and directory names to skip
    pub ignore: &'a [String],
    /// Names visited first in every directory, in this order
    pub priority: &'a [String],
    pub compiler: &'a CompilerConfig,
    pub policy: ErrorPolicy,
}

/// One unit of content found by the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    /// Read as-is
    File(PathBuf),
    /// Preprocessed stylesheet source
    Style(PathBuf),
    /// Compiler sub-project directory
    Subproject(PathBuf),
}

impl Piece {
    pub fn path(&self) -> &Path {
        match self {
            Self::File(p) | Self::Style(p) | Self::Subproject(p) => p,
        }
    }

    /// Render the piece; returns the contributing path and its text.
    pub fn render(&self, compiler: &CompilerConfig) -> Result<(PathBuf, String)> {
        match self {
            Self::File(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Ok((path.clone(), text))
            }
            Self::Style(path) => render_style(path),
            Self::Subproject(dir) => compile_subproject(dir, compiler),
        }
    }
}

/// Resolve the staged directory `dir` into combined content.
pub fn resolve(dir: &Path, opts: &ResolveOptions<'_>) -> Result<Resolved> {
    let pieces = plan(dir, opts)?;
    debug!("resolve"; "{}: {} pieces", dir.display(), pieces.len());

    let rendered: Vec<_> = pieces
        .par_iter()
        .map(|piece| piece.render(opts.compiler))
        .collect();

    let mut resolved = Resolved::default();
    let delimiter = opts.kind.delimiter();

    for (piece, result) in pieces.into_iter().zip(rendered) {
        let what = format!("rendering {}", piece.path().display());
        let (path, text) = opts
            .policy
            .recover("resolve", what, result.map(Some))?
            .unwrap_or_else(|| (piece.path().to_path_buf(), String::new()));

        let start = resolved.content.len();
        resolved.content.push_str(&text);
        resolved.contributions.push(Contribution {
            path: path.clone(),
            start,
            len: text.len(),
        });
        resolved.content.push_str(delimiter);
        resolved.files.push(path);
    }

    Ok(resolved)
}

/// Walk `dir` and list the pieces it contributes, in artifact order.
pub fn plan(dir: &Path, opts: &ResolveOptions<'_>) -> Result<Vec<Piece>> {
    let mut pieces = Vec::new();
    walk(dir, opts, &mut pieces)?;
    Ok(pieces)
}

fn walk(dir: &Path, opts: &ResolveOptions<'_>, out: &mut Vec<Piece>) -> Result<()> {
    let listing = read_sorted(dir, opts.priority);
    let what = format!("reading {}", dir.display());
    let Some(children) = opts.policy.recover("resolve", what, listing.map(Some))? else {
        return Ok(());
    };

    for path in children {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if SKIPPED_DIRS.contains(&name) || opts.ignore.iter().any(|i| i == name) {
            continue;
        }

        if path.is_dir() {
            if name.contains(SUBPROJECT_MARKER) {
                // Sub-projects compile to scripts only
                if opts.kind == OutputKind::Script {
                    out.push(Piece::Subproject(path));
                }
            } else {
                walk(&path, opts, out)?;
            }
            continue;
        }

        if is_style_source(&path) {
            if opts.kind == OutputKind::Stylesheet {
                out.push(Piece::Style(path));
            }
            continue;
        }

        let matches_kind = path
            .extension()
            .is_some_and(|e| e == opts.kind.extension());
        if !matches_kind {
            continue;
        }
        if opts.kind == OutputKind::Stylesheet && has_style_source(&path) {
            continue;
        }
        out.push(Piece::File(path));
    }

    Ok(())
}

/// Whether a `.scss` or `.sass` file shares this `.css` file's stem.
fn has_style_source(css: &Path) -> bool {
    ["scss", "sass"]
        .iter()
        .any(|ext| css.with_extension(ext).is_file())
}

/// Directory children: `priority` names first in list order, then the rest
/// alphabetically.
fn read_sorted(dir: &Path, priority: &[String]) -> Result<Vec<PathBuf>> {
    let mut children: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();

    let rank = |path: &Path| {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        priority
            .iter()
            .position(|p| p == name)
            .unwrap_or(priority.len())
    };
    children.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)));
    Ok(children)
}
