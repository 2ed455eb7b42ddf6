//! Incremental Patcher
//!
//! Re-renders one changed source and splices the result into every
//! artifact that contains it, then refreshes the minified variants.
//!
//! ```text
//! changed file ──owners──> staged copy ──re-render──> splice by ledger ──> artifact (+ .min)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;

use super::classify::{Owner, owners, subproject_root};
use super::ledger::{ArtifactLedger, Splice};
use crate::asset::{OutputKind, SourceKind, minify};
use crate::compiler::{CompilerConfig, css_sibling, output_file};
use crate::config::{Manifest, Settings};
use crate::debug;
use crate::stream::Piece;
use crate::utils::path::copy_tree;

/// Result of patching one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Artifact updated in place
    Patched { stream: String, splice: Splice },
    /// Staged copy refreshed; the file does not contribute to the artifact
    NotContributing { stream: String },
    /// No staged copy or ledger (file created after the last full build)
    NotStaged { stream: String },
    /// The ledger no longer matches the artifact
    Drifted { stream: String },
}

impl PatchOutcome {
    pub fn stream(&self) -> &str {
        match self {
            Self::Patched { stream, .. }
            | Self::NotContributing { stream }
            | Self::NotStaged { stream }
            | Self::Drifted { stream } => stream,
        }
    }

    /// Whether only a full rebuild can bring the artifact up to date.
    pub const fn needs_rebuild(&self) -> bool {
        matches!(self, Self::NotStaged { .. } | Self::Drifted { .. })
    }
}

/// Patch every stream that owns `changed`.
///
/// An empty result means the file belongs to no stream.
pub fn patch_file(
    manifest: &Manifest,
    settings: &Settings,
    ledgers: &mut FxHashMap<String, ArtifactLedger>,
    changed: &Path,
) -> Result<Vec<PatchOutcome>> {
    let compiler = CompilerConfig::from_manifest(manifest);
    let minifies = settings.minifies(manifest);
    let policy = settings.policy(manifest);

    let mut outcomes = Vec::new();
    for owner in owners(manifest, changed) {
        let outcome = patch_stream(
            manifest,
            &owner,
            ledgers.get_mut(&owner.stream),
            &compiler,
            changed,
            minifies,
        );
        let outcome = policy.recover(
            "patch",
            format!("{} in {}", changed.display(), owner.stream),
            outcome.map(Some),
        )?;
        if let Some(outcome) = outcome {
            outcomes.push(outcome);
        }
    }
    Ok(outcomes)
}

fn patch_stream(
    manifest: &Manifest,
    owner: &Owner,
    ledger: Option<&mut ArtifactLedger>,
    compiler: &CompilerConfig,
    changed: &Path,
    minifies: bool,
) -> Result<PatchOutcome> {
    let stream = owner.stream.clone();
    let paths = manifest.paths();
    let (slot, staged) = owner.staged_target(&paths.staging_dir(&stream), changed);

    let Some(ledger) = ledger else {
        return Ok(PatchOutcome::NotStaged { stream });
    };
    if !slot.exists() || !staged.exists() {
        return Ok(PatchOutcome::NotStaged { stream });
    }

    let Some(piece) = classify_piece(manifest, owner, &slot, &staged) else {
        copy_tree(changed, &staged)?;
        return Ok(PatchOutcome::NotContributing { stream });
    };

    // Rendered text before the change: the artifact holds exactly this
    let before = rendered_path(&piece)?;
    let old = fs::read_to_string(&before).unwrap_or_default();

    copy_tree(changed, &staged)?;
    let (after, new) = piece.render(compiler)?;

    let Some(index) = ledger.position(&[after.as_path(), before.as_path(), piece.path()]) else {
        return Ok(PatchOutcome::Drifted { stream });
    };

    let artifact_path = paths.artifact(&stream);
    let mut artifact = fs::read_to_string(&artifact_path)
        .with_context(|| format!("failed to read {}", artifact_path.display()))?;

    let splice = ledger.splice(&mut artifact, index, &old, &new);
    if !splice.applied() {
        return Ok(PatchOutcome::Drifted { stream });
    }
    debug!("patch"; "{stream}: {} ({splice:?})", after.display());

    fs::write(&artifact_path, &artifact)
        .with_context(|| format!("failed to write {}", artifact_path.display()))?;
    if minifies {
        let min_path = paths.minified(&stream);
        fs::write(&min_path, minify(owner.kind, &artifact))
            .with_context(|| format!("failed to write {}", min_path.display()))?;
    }

    Ok(PatchOutcome::Patched { stream, splice })
}

/// How the staged copy of a changed file renders, if it contributes at all.
fn classify_piece(
    manifest: &Manifest,
    owner: &Owner,
    slot: &Path,
    staged: &Path,
) -> Option<Piece> {
    if owner.kind == OutputKind::Script
        && let Some(dir) = subproject_root(staged, slot)
    {
        return Some(Piece::Subproject(dir));
    }

    let name = staged.file_name()?.to_str()?;
    let spec = manifest.stream(&owner.stream)?;
    if manifest.ignore_for(spec).iter().any(|i| i == name) {
        return None;
    }

    match (SourceKind::from_path(staged)?, owner.kind) {
        (SourceKind::Style, OutputKind::Stylesheet) => Some(Piece::Style(staged.to_path_buf())),
        (SourceKind::Script, OutputKind::Script) => Some(Piece::File(staged.to_path_buf())),
        (SourceKind::Stylesheet, OutputKind::Stylesheet) => {
            let shadowed = ["scss", "sass"]
                .iter()
                .any(|ext| staged.with_extension(ext).is_file());
            (!shadowed).then(|| Piece::File(staged.to_path_buf()))
        }
        _ => None,
    }
}

/// File whose content a piece contributed on the last build.
fn rendered_path(piece: &Piece) -> Result<PathBuf> {
    match piece {
        Piece::File(path) => Ok(path.clone()),
        Piece::Style(path) => Ok(css_sibling(path)),
        Piece::Subproject(dir) => output_file(dir),
    }
}
