//! Manifest error types.

use owo_colors::OwoColorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that make a build run impossible.
///
/// Every variant is fatal: without a readable, valid manifest there is
/// nothing to build.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid JSON in manifest `{}`", .0.display())]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("invalid TOML in manifest `{}`", .0.display())]
    Toml(PathBuf, #[source] toml::de::Error),

    // No #[source]: the diagnostics render themselves
    #[error("{0}")]
    Invalid(ManifestDiagnostics),
}

/// A grammar error in a single `files` entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("empty file entry")]
    Empty,

    #[error("`--force` only applies to URLs, found it on `{0}`")]
    ForceOnLocal(String),
}

/// Validation problems collected over the whole manifest.
#[derive(Debug, Default)]
pub struct ManifestDiagnostics {
    path: PathBuf,
    problems: Vec<(String, String)>,
}

impl ManifestDiagnostics {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            problems: Vec::new(),
        }
    }

    /// Record a problem under a field path such as `streams.main.js.files[2]`.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.problems.push((field.into(), message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    /// Turn collected problems into an error, if any.
    pub fn into_result(self) -> Result<(), ManifestError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ManifestError::Invalid(self))
        }
    }
}

impl fmt::Display for ManifestDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "manifest `{}` has {} problem{}",
            self.path.display(),
            self.problems.len(),
            if self.problems.len() == 1 { "" } else { "s" }
        )?;
        for (field, message) in &self.problems {
            write!(
                f,
                "\n{}{}{} {} {}",
                "[".dimmed(),
                field.cyan(),
                "]".dimmed(),
                "→".red(),
                message
            )?;
        }
        Ok(())
    }
}
