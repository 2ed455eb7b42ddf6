//! Shutdown state.
//!
//! - `SHUTDOWN`: Ctrl+C was received
//! - `STOP`: the orchestrator whose workers Ctrl+C aborts
//! - `SHUTDOWN_TX`: wakes the watch loop
//!
//! A second Ctrl+C, or one arriving while nothing is registered, exits
//! immediately.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, const_mutex};
use tokio::sync::watch;

use crate::actor::StopHandle;
use crate::utils::plural_count;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

static STOP: Mutex<Option<StopHandle>> = const_mutex(None);

static SHUTDOWN_TX: OnceLock<watch::Sender<bool>> = OnceLock::new();

/// Exit status of a process interrupted by SIGINT.
const INTERRUPTED: i32 = 130;

/// Whether Ctrl+C has been received.
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

/// Let Ctrl+C abort the workers behind `handle`.
pub fn register_stop_handle(handle: StopHandle) {
    *STOP.lock() = Some(handle);
}

/// Receiver that flips to `true` on Ctrl+C.
pub fn shutdown_signal() -> watch::Receiver<bool> {
    SHUTDOWN_TX
        .get_or_init(|| watch::channel(false).0)
        .subscribe()
}

/// Install the global Ctrl+C handler. Call once at program start.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        let first = !SHUTDOWN.swap(true, Ordering::SeqCst);

        let stopped = STOP.lock().as_ref().map(StopHandle::stop);
        if let Some(count) = stopped
            && count > 0
        {
            crate::log!("build"; "stopped {}", plural_count(count, "worker"));
        }

        let listening = SHUTDOWN_TX.get().is_some_and(|tx| tx.send(true).is_ok());
        if !first || (stopped.is_none() && !listening) {
            std::process::exit(INTERRUPTED);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))
}
