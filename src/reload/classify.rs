//! Change Classification
//!
//! Pure functions mapping a changed source path to the streams and staged
//! locations it affects. No side effects.

use std::path::{Path, PathBuf};

use crate::asset::{OutputKind, SourceKind};
use crate::config::{Entry, Manifest, SUBPROJECT_MARKER, Source};

/// A manifest entry that owns a changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub stream: String,
    pub kind: OutputKind,
    /// Declaration index (names the staged slot)
    pub index: usize,
    pub entry: Entry,
    /// Entry's absolute source path
    pub source: PathBuf,
}

impl Owner {
    /// Staged slot of the entry and the staged copy of `changed` inside it.
    pub fn staged_target(&self, staging_dir: &Path, changed: &Path) -> (PathBuf, PathBuf) {
        let slot = staging_dir.join(self.entry.staged_name(self.index));
        let file = match changed.strip_prefix(&self.source) {
            Ok(rel) if !rel.as_os_str().is_empty() => slot.join(rel),
            _ => slot.clone(),
        };
        (slot, file)
    }
}

/// Every stream entry whose source contains `changed`.
///
/// Only streams of the kind the file renders into qualify; `--ignore-build`
/// entries and URLs never own local files.
pub fn owners(manifest: &Manifest, changed: &Path) -> Vec<Owner> {
    let Some(kind) = SourceKind::from_path(changed).and_then(SourceKind::rendered) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for (name, spec) in &manifest.streams {
        if OutputKind::from_stream_name(name) != Some(kind) {
            continue;
        }
        for (index, raw) in spec.files.iter().enumerate() {
            let Ok(entry) = raw.parse::<Entry>() else {
                continue;
            };
            if entry.ignore_build || matches!(entry.source, Source::Remote(_)) {
                continue;
            }
            let Some(source) = entry.source_path(&manifest.root) else {
                continue;
            };
            if changed.starts_with(&source) {
                found.push(Owner {
                    stream: name.clone(),
                    kind,
                    index,
                    entry,
                    source,
                });
            }
        }
    }
    found
}

/// Nearest staged sub-project containing `file`, not looking above `slot`.
pub fn subproject_root(file: &Path, slot: &Path) -> Option<PathBuf> {
    file.ancestors()
        .skip(1)
        .take_while(|dir| dir.starts_with(slot))
        .find(|dir| {
            dir.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(SUBPROJECT_MARKER))
        })
        .map(Path::to_path_buf)
}
