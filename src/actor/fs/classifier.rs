use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use super::types::{ChangeKind, DebouncedEvents};
use crate::asset::SourceKind;
use crate::config::Manifest;

/// Directory names never watched for sources.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules"];

/// Turns raw debounced changes into the events the watch loop acts on.
///
/// Pipeline: correct_by_existence → filter_watched
pub(super) struct EventClassifier;

impl EventClassifier {
    pub(super) fn classify(
        raw: FxHashMap<PathBuf, ChangeKind>,
        manifest: &Manifest,
    ) -> Option<DebouncedEvents> {
        let mut changes = raw;

        Self::correct_by_existence(&mut changes);
        Self::filter_watched(&mut changes, manifest);

        if changes.is_empty() {
            return None;
        }
        let mut events: Vec<_> = changes.into_iter().collect();
        events.sort();
        Some(DebouncedEvents(events))
    }

    /// Reconcile event kinds with what is on disk now.
    ///
    /// Atomic saves (write temp, rename over) often arrive as a removal of a
    /// file that still exists.
    pub(super) fn correct_by_existence(changes: &mut FxHashMap<PathBuf, ChangeKind>) {
        changes.retain(|path, kind| {
            let exists = path.exists();
            match *kind {
                ChangeKind::Created if !exists => false,
                ChangeKind::Modified if !exists => {
                    *kind = ChangeKind::Removed;
                    true
                }
                ChangeKind::Removed if exists => {
                    crate::debug!("watch"; "still exists, modified: {}", path.display());
                    *kind = ChangeKind::Modified;
                    true
                }
                _ => true,
            }
        });
    }

    /// Keep the manifest and sources on the extension allow-list, outside
    /// the output directory.
    pub(super) fn filter_watched(changes: &mut FxHashMap<PathBuf, ChangeKind>, manifest: &Manifest) {
        let output = manifest.paths().output_dir();
        changes.retain(|path, _| path == &manifest.path || is_watched_source(path, &output));
    }
}

pub(super) fn is_watched_source(path: &Path, output_dir: &Path) -> bool {
    if path.starts_with(output_dir) {
        return false;
    }
    if path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
    }) {
        return false;
    }
    SourceKind::from_path(path).is_some()
}
