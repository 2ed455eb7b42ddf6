//! FileSystem Actor
//!
//! Watches the manifest directory (and local sources outside it) and sends
//! debounced [`WatchMsg`]s to the watch session.
//!
//! ```text
//! notify → Debouncer (timing) → EventClassifier (allow-list) → router → WatchMsg
//! ```
//!
//! The watcher starts before the initial build, so changes made while it
//! runs are buffered instead of lost.

use std::path::PathBuf;
use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::sync::{mpsc, watch};

use super::messages::WatchMsg;
use crate::config::Manifest;

// Allow-list and existence checks (raw changes -> actionable events).
mod classifier;
// Pure timing and coalescing.
mod debouncer;
// Actionable events -> WatchMsg.
mod router;
mod types;
// Watch root attach/re-attach lifecycle.
mod watch_roots;


use classifier::EventClassifier;
use debouncer::Debouncer;
use router::{events_to_messages, log_events};
use watch_roots::WatchRoots;

pub struct FsActor {
    /// notify's callback side (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Must stay alive for events to flow
    watcher: RecommendedWatcher,
    watch_roots: WatchRoots,
    session_tx: mpsc::Sender<WatchMsg>,
    /// Latest loaded manifest; watch roots follow it
    manifest_rx: watch::Receiver<Arc<Manifest>>,
    debouncer: Debouncer,
}

impl FsActor {
    /// Start watching the roots of the current manifest immediately.
    pub fn new(
        manifest_rx: watch::Receiver<Arc<Manifest>>,
        session_tx: mpsc::Sender<WatchMsg>,
    ) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let roots = manifest_rx.borrow().watch_roots();
        let mut watch_roots = WatchRoots::new(roots);
        watch_roots.attach_existing(&mut watcher)?;
        crate::debug!("watch"; "watching {} roots", watch_roots.attached());

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            session_tx,
            manifest_rx,
            debouncer: Debouncer::new(),
        })
    }

    /// Run until the session hangs up.
    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut watch_roots,
            session_tx,
            mut manifest_rx,
            mut debouncer,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {e}"),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => debouncer.add_event(&event),
                changed = manifest_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let roots: Vec<PathBuf> = manifest_rx.borrow_and_update().watch_roots();
                    watch_roots.retarget(roots, &mut watcher);
                }
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    watch_roots.maintain(&mut watcher);
                    let manifest = Arc::clone(&manifest_rx.borrow());
                    if process_changes(&mut debouncer, &session_tx, &manifest).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

/// Classify and route a ready batch.
///
/// Returns `Err(())` once the session is gone.
async fn process_changes(
    debouncer: &mut Debouncer,
    session_tx: &mpsc::Sender<WatchMsg>,
    manifest: &Manifest,
) -> Result<(), ()> {
    let Some(raw) = debouncer.take_if_ready() else {
        return Ok(());
    };
    let Some(events) = EventClassifier::classify(raw, manifest) else {
        return Ok(());
    };

    log_events(&events);
    for msg in events_to_messages(events, manifest) {
        session_tx.send(msg).await.map_err(|_| ())?;
    }
    Ok(())
}
