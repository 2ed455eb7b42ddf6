//! Runtime settings: CLI flags merged over the manifest.

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use super::Manifest;
use crate::log;

/// Environment tag of a build run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    #[default]
    Dev,
    Test,
    Prod,
}

impl Env {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Prod => "prod",
        }
    }

    /// Whether this environment ships combined artifacts (and so wants them minified).
    pub const fn is_combined(self) -> bool {
        !matches!(self, Self::Dev)
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with file, subprocess and network failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Log and continue with empty content.
    #[default]
    Degrade,
    /// Fail the stream (and the run).
    FailFast,
}

impl ErrorPolicy {
    /// Apply the policy to a contained failure.
    ///
    /// Under `Degrade` the error is logged under `scope` and `T::default()`
    /// is returned; under `FailFast` it is propagated with `what` as context.
    pub fn recover<T: Default>(
        self,
        scope: &str,
        what: impl fmt::Display,
        result: Result<T>,
    ) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => match self {
                Self::Degrade => {
                    log!(scope; "{what}: {e:#}");
                    Ok(T::default())
                }
                Self::FailFast => Err(e.context(what.to_string())),
            },
        }
    }
}

/// Settings for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct Settings {
    pub manifest_path: PathBuf,
    pub env: Env,
    /// `--strict` from the command line.
    pub strict: bool,
}

impl Settings {
    pub fn new(manifest_path: impl Into<PathBuf>, env: Env) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            env,
            strict: false,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Error policy for a run over `manifest`.
    pub fn policy(&self, manifest: &Manifest) -> ErrorPolicy {
        if self.strict || manifest.strict {
            ErrorPolicy::FailFast
        } else {
            ErrorPolicy::Degrade
        }
    }

    /// Whether artifacts of `manifest` get a minified variant in this run.
    pub fn minifies(&self, manifest: &Manifest) -> bool {
        manifest.minify && self.env.is_combined()
    }
}
