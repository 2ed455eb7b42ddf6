use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::types::ChangeKind;
use crate::utils::path::normalize_path;

/// Quiet period after the last event before changes are released.
pub(super) const DEBOUNCE_MS: u64 = 300;
/// Minimum gap between two released batches.
pub(super) const REBUILD_COOLDOWN_MS: u64 = 800;

/// Collects notify events per path and releases them in quiet batches.
///
/// Timing and coalescing only; what a change means is decided later.
pub(super) struct Debouncer {
    pub(super) changes: FxHashMap<PathBuf, ChangeKind>,
    pub(super) last_event: Option<Instant>,
    pub(super) last_release: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            last_release: None,
        }
    }

    /// Record a notify event.
    ///
    /// Coalescing per path:
    /// - removed, then created or modified: the file came back, keep the new kind
    /// - modified, then removed: removed
    /// - created, then removed: nothing happened
    /// - anything else: the first kind wins
    pub(super) fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;
        use notify::event::ModifyKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            // mtime/chmod noise
            EventKind::Modify(ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => ChangeKind::Modified,
            _ => return,
        };

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            let path = normalize_path(path);

            match self.changes.get(&path).copied() {
                None => {
                    crate::debug!("watch"; "{}: {}", kind.label(), path.display());
                    self.changes.insert(path, kind);
                }
                Some(ChangeKind::Removed) if kind != ChangeKind::Removed => {
                    self.changes.insert(path, kind);
                }
                Some(ChangeKind::Modified) if kind == ChangeKind::Removed => {
                    self.changes.insert(path, ChangeKind::Removed);
                }
                Some(ChangeKind::Created) if kind == ChangeKind::Removed => {
                    crate::debug!("watch"; "transient: {}", path.display());
                    self.changes.remove(&path);
                }
                Some(_) => continue,
            }
            self.last_event = Some(Instant::now());
        }
    }

    /// Take the collected changes once the quiet period and cooldown passed.
    pub(super) fn take_if_ready(&mut self) -> Option<FxHashMap<PathBuf, ChangeKind>> {
        if !self.is_ready() {
            return None;
        }

        let changes = std::mem::take(&mut self.changes);
        self.last_event = None;
        self.last_release = Some(Instant::now());
        Some(changes)
    }

    pub(super) fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };

        if last_event.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return false;
        }

        if let Some(last_release) = self.last_release
            && last_release.elapsed() < Duration::from_millis(REBUILD_COOLDOWN_MS)
        {
            return false;
        }

        !self.changes.is_empty()
    }

    /// How long the event loop may sleep before the next batch can be ready.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        let debounce = Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed());
        let cooldown = self
            .last_release
            .map(|t| Duration::from_millis(REBUILD_COOLDOWN_MS).saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        debounce.max(cooldown).max(Duration::from_millis(1))
    }
}

/// Editor swap, backup and hidden files.
pub(super) fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
