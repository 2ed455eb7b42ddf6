use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

/// Keeps the watcher attached to every source root.
///
/// A root deleted and recreated (a `git checkout`, an `rm -r` of a vendor
/// directory) silently loses its inotify watch; `maintain` re-attaches it.
pub(super) struct WatchRoots {
    desired: Vec<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    pub(super) fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            desired: paths,
            attached: FxHashSet::default(),
        }
    }

    /// Attach the roots that exist now; missing ones wait for `maintain`.
    pub(super) fn attach_existing(&mut self, watcher: &mut RecommendedWatcher) -> notify::Result<()> {
        for path in self.desired.iter().filter(|p| p.exists()) {
            watcher.watch(path, RecursiveMode::Recursive)?;
            self.attached.insert(path.clone());
        }
        Ok(())
    }

    pub(super) fn maintain(&mut self, watcher: &mut RecommendedWatcher) {
        self.attached.retain(|path| path.exists());

        for path in &self.desired {
            if self.attached.contains(path) || !path.exists() {
                continue;
            }
            if watcher.watch(path, RecursiveMode::Recursive).is_ok() {
                crate::debug!("watch"; "re-attached {}", path.display());
                self.attached.insert(path.clone());
            }
        }
    }

    /// Switch to a new set of roots, detaching the ones no longer wanted.
    pub(super) fn retarget(&mut self, paths: Vec<PathBuf>, watcher: &mut RecommendedWatcher) {
        for stale in self.attached.iter().filter(|p| !paths.contains(p)) {
            let _ = watcher.unwatch(stale);
        }
        self.attached.retain(|p| paths.contains(p));
        self.desired = paths;
        self.maintain(watcher);
    }

    pub(super) fn attached(&self) -> usize {
        self.attached.len()
    }
}
