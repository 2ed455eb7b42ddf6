use std::path::PathBuf;

use super::types::DebouncedEvents;
use crate::actor::messages::WatchMsg;
use crate::asset::SourceKind;
use crate::config::Manifest;
use crate::utils::path::display_relative;

pub(super) fn log_events(events: &DebouncedEvents) {
    for (path, kind) in &events.0 {
        crate::debug!("watch"; "{}: {}", kind.label(), path.display());
    }
}

/// Route classified events to watch messages.
///
/// The manifest, the compiler configuration and any created or removed
/// source change what gets staged, so they rebuild everything; modified
/// sources are patched.
pub(super) fn events_to_messages(events: DebouncedEvents, manifest: &Manifest) -> Vec<WatchMsg> {
    let compiler_config = manifest.compiler_config();
    let mut modified: Vec<PathBuf> = Vec::new();

    for (path, kind) in events.0 {
        let relative = display_relative(&path, &manifest.root);
        if path == manifest.path {
            return vec![WatchMsg::FullRebuild {
                reason: format!("{relative} changed"),
            }];
        }
        if compiler_config.as_ref() == Some(&path) {
            return vec![WatchMsg::FullRebuild {
                reason: format!("compiler configuration {relative} changed"),
            }];
        }
        // Other JSON never renders into an artifact
        if SourceKind::from_path(&path) == Some(SourceKind::Json) {
            continue;
        }
        if kind.changes_layout() {
            return vec![WatchMsg::FullRebuild {
                reason: format!("{relative} {}", kind.label()),
            }];
        }
        modified.push(path);
    }

    if modified.is_empty() {
        Vec::new()
    } else {
        vec![WatchMsg::Patch(modified)]
    }
}
