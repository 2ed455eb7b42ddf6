//! `build`: one full build run.

use anyhow::{Result, bail};

use super::BuildArgs;
use crate::actor::{BuildSummary, Orchestrator};
use crate::actor::messages::StreamOutcome;
use crate::core::{is_shutdown, register_stop_handle};
use crate::log;
use crate::utils::plural_count;

/// Restage and build every stream of the manifest.
pub async fn build(args: &BuildArgs) -> Result<()> {
    let mut orchestrator = Orchestrator::new(args.settings()?)?;
    register_stop_handle(orchestrator.stop_handle());

    let summary = orchestrator.run_full_build().await?;
    if is_shutdown() {
        bail!("interrupted");
    }
    log_report(&summary);
    Ok(())
}

/// One line per stream: contributing files, artifact and minified sizes.
pub fn log_report(summary: &BuildSummary) {
    for (name, outcome) in &summary.outcomes {
        match outcome {
            StreamOutcome::Built(report) => {
                let minified = match report.minified {
                    Some(bytes) => format!(" → {}", format_size(bytes)),
                    None => String::new(),
                };
                log!(
                    "build";
                    "{name}: {}, {}{minified}",
                    plural_count(report.files.len(), "file"),
                    format_size(report.bytes)
                );
            }
            StreamOutcome::Failed(message) => log!("error"; "{name}: {message}"),
        }
    }
}

/// `512 B`, `12.4 KB`, `1.3 MB`.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}
