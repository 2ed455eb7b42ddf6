//! Compiler sub-projects.
//!
//! A staged sub-project is compiled standalone: a compiler configuration is
//! deposited next to its sources, the compiler runs with the sub-project as
//! working directory, and the file named by `compilerOptions.outFile` is
//! read back as the sub-project's single contribution.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::CompilerConfig;
use crate::config::read_commented_json;
use crate::debug;
use crate::embed::compiler::{TSCONFIG_JSON, TsconfigVars};
use crate::utils::exec::{Cmd, FilterRule};
use crate::utils::path::join_clean;

pub const CONFIG_FILE: &str = "tsconfig.json";

/// Compiler filter: skip banner and summary lines.
pub const TSC_FILTER: FilterRule = FilterRule::new(&["Version ", "Found 0 errors"]);

/// Write the compiler configuration into a staged sub-project.
pub fn deposit_config(dir: &Path, config: &CompilerConfig) -> Result<()> {
    let dest = dir.join(CONFIG_FILE);
    match &config.tsconfig {
        Some(custom) => {
            fs::copy(custom, &dest).with_context(|| {
                format!("failed to copy {} -> {}", custom.display(), dest.display())
            })?;
        }
        None => {
            fs::write(&dest, TSCONFIG_JSON.render(&TsconfigVars::default()))
                .with_context(|| format!("failed to write {}", dest.display()))?;
        }
    }
    Ok(())
}

/// Path of the sub-project's single output file, from its configuration.
pub fn output_file(dir: &Path) -> Result<PathBuf> {
    let config = read_commented_json(&dir.join(CONFIG_FILE))?;
    let out_file = config["compilerOptions"]["outFile"]
        .as_str()
        .with_context(|| {
            format!(
                "{} declares no compilerOptions.outFile",
                dir.join(CONFIG_FILE).display()
            )
        })?;
    Ok(join_clean(dir, Path::new(out_file)))
}

/// Compile the sub-project at `dir`.
///
/// Returns the output file path and its content. A missing compiler, a
/// non-zero exit or an unreadable output file are errors; the caller's
/// error policy decides whether they become empty content.
pub fn compile_subproject(dir: &Path, config: &CompilerConfig) -> Result<(PathBuf, String)> {
    let program = config
        .command
        .first()
        .context("compiler command is empty")?;
    which::which(program).with_context(|| format!("compiler `{program}` not found on PATH"))?;

    debug!("compile"; "{} in {}", config.command.join(" "), dir.display());
    Cmd::from_slice(&config.command)
        .cwd(dir)
        .filter(&TSC_FILTER)
        .run()?;

    let out = output_file(dir)?;
    let content =
        fs::read_to_string(&out).with_context(|| format!("failed to read {}", out.display()))?;
    Ok((out, content))
}
