//! Compiler and preprocessor adapters.
//!
//! - `subproject` - external type-aware compiler, run inside a staged
//!   `[ts]` sub-project; its single output file is one virtual file
//! - `style` - in-process scss/sass preprocessing
//!
//! Both are synchronous and run on the blocking pool.

pub mod style;
pub mod subproject;

use std::path::PathBuf;

use crate::config::Manifest;

pub use style::{compile_style, css_sibling, render_style};
pub use subproject::{compile_subproject, deposit_config, output_file};

/// How staged sub-projects are compiled.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Command array, run with the sub-project as working directory
    pub command: Vec<String>,
    /// Configuration deposited into each sub-project; `None` uses the
    /// embedded default
    pub tsconfig: Option<PathBuf>,
}

impl CompilerConfig {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            command: manifest.compiler.clone(),
            tsconfig: manifest.compiler_config(),
        }
    }
}
