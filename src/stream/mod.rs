//! Stream pipeline: stage, resolve, combine, minify.
//!
//! ```text
//! StreamJob ──> stage (Init) ──> resolve (Build) ──> artifact + .min
//!                   │                  │
//!                   │                  └── rayon: render pieces, join in order
//!                   └── JoinSet: copy entries / fetch --force URLs
//! ```
//!
//! - `stage` - isolated staging directory per stream
//! - `resolve` - directory walk and ordered concatenation
//! - `worker` - per-stream task and its state machine

mod resolve;
mod stage;
mod worker;

pub use resolve::{Contribution, Piece, ResolveOptions, resolve};
pub use stage::{registry_refs, stage};
pub use worker::spawn_worker;

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::asset::OutputKind;
use crate::compiler::CompilerConfig;
use crate::config::{Entry, ErrorPolicy, Manifest, Settings};

/// Everything one stream worker needs, detached from the manifest.
#[derive(Debug, Clone)]
pub struct StreamJob {
    pub name: String,
    pub kind: OutputKind,
    /// Manifest directory
    pub root: PathBuf,
    pub entries: Vec<Entry>,
    /// Global and per-stream ignore lists, merged
    pub ignore: Vec<String>,
    pub priority: Vec<String>,
    pub staging_dir: PathBuf,
    pub artifact: PathBuf,
    pub minified: PathBuf,
    pub deps_dir: PathBuf,
    pub compiler: CompilerConfig,
    pub minify: bool,
    pub policy: ErrorPolicy,
    /// Run the Init state (stage) before building
    pub restage: bool,
}

impl StreamJob {
    pub fn new(manifest: &Manifest, name: &str, settings: &Settings, restage: bool) -> Result<Self> {
        let spec = manifest
            .stream(name)
            .with_context(|| format!("unknown stream `{name}`"))?;
        let kind = OutputKind::from_stream_name(name)
            .with_context(|| format!("stream `{name}` has no output kind"))?;
        let entries = spec
            .entries()
            .with_context(|| format!("invalid entry in stream `{name}`"))?;
        let paths = manifest.paths();

        Ok(Self {
            name: name.to_string(),
            kind,
            root: manifest.root.clone(),
            entries,
            ignore: manifest.ignore_for(spec),
            priority: spec.priority.clone(),
            staging_dir: paths.staging_dir(name),
            artifact: paths.artifact(name),
            minified: paths.minified(name),
            deps_dir: paths.dependencies_dir(),
            compiler: CompilerConfig::from_manifest(manifest),
            minify: settings.minifies(manifest),
            policy: settings.policy(manifest),
            restage,
        })
    }

    pub fn resolve_options(&self) -> ResolveOptions<'_> {
        ResolveOptions {
            kind: self.kind,
            ignore: &self.ignore,
            priority: &self.priority,
            compiler: &self.compiler,
            policy: self.policy,
        }
    }
}
