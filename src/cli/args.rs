//! Command-line interface definitions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ColorChoice, Parser, Subcommand};

use crate::config::{Env, Settings, find_manifest};
use crate::utils::path::normalize_path;

/// Manifest looked up from the current directory upward.
pub const DEFAULT_MANIFEST: &str = "build.json";

/// Combine, compile and minify asset streams
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Print debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build every stream once
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Build, then patch artifacts in place as sources change
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Build, then print the rendered build registry and tag plan as JSON
    #[command(visible_alias = "r")]
    Registry {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Only print this stream
        #[arg(short, long)]
        stream: Option<String>,

        /// Print HTML tags instead of JSON
        #[arg(long)]
        html: bool,

        /// Write to this file instead of stdout
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
}

/// Arguments shared by every command that runs a build.
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Build manifest (default: nearest build.json, searching upward)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub manifest: Option<PathBuf>,

    /// Environment tag; test and prod minify
    #[arg(short, long, value_enum, default_value_t = Env::Dev)]
    pub env: Env,

    /// Fail the run on any file, compiler or network error
    #[arg(long)]
    pub strict: bool,
}

impl BuildArgs {
    /// Resolve the manifest path and merge the flags into [`Settings`].
    pub fn settings(&self) -> Result<Settings> {
        let path = match &self.manifest {
            Some(path) => normalize_path(path),
            None => find_manifest(Path::new(DEFAULT_MANIFEST)).with_context(|| {
                format!("no {DEFAULT_MANIFEST} found in this directory or any parent")
            })?,
        };
        Ok(Settings::new(path, self.env).with_strict(self.strict))
    }
}
