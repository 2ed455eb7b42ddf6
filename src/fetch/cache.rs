//! Single-flight Download Cache.
//!
//! One entry per URL, three states:
//!
//! ```text
//! absent ──request──> in-flight(owner, waiters) ──complete(ok)──> done
//!                            │
//!                            └──complete(err) / abandon(owner)──> absent
//! ```
//!
//! The first requester gets [`Ticket::Fetch`] and becomes the only fetcher.
//! Requests that arrive while the URL is in flight are parked and answered
//! when it completes, so concurrent first requesters never download twice.

use rustc_hash::FxHashMap;
use tokio::sync::oneshot;

/// Reply to a fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ticket {
    /// The file is in the download cache; read it from disk.
    Cached,
    /// Caller owns the download and must report completion.
    Fetch,
    /// The in-flight download this caller waited on failed.
    Failed,
}

enum Slot {
    InFlight {
        owner: String,
        waiters: Vec<oneshot::Sender<Ticket>>,
    },
    Done,
}

/// URL -> download state. Owned by the orchestrator's supervisor loop.
#[derive(Default)]
pub struct DownloadCache {
    slots: FxHashMap<String, Slot>,
}

impl DownloadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer a request for `url` from `stream`.
    pub fn request(&mut self, stream: &str, url: &str, reply: oneshot::Sender<Ticket>) {
        match self.slots.get_mut(url) {
            Some(Slot::Done) => {
                let _ = reply.send(Ticket::Cached);
            }
            Some(Slot::InFlight { waiters, .. }) => waiters.push(reply),
            None => {
                self.slots.insert(
                    url.to_string(),
                    Slot::InFlight {
                        owner: stream.to_string(),
                        waiters: Vec::new(),
                    },
                );
                let _ = reply.send(Ticket::Fetch);
            }
        }
    }

    /// Record the end of the download of `url`, releasing its waiters.
    ///
    /// A failed download leaves the URL absent so a later build retries it.
    pub fn complete(&mut self, url: &str, ok: bool) {
        let waiters = match self.slots.remove(url) {
            Some(Slot::InFlight { waiters, .. }) => waiters,
            Some(Slot::Done) | None => Vec::new(),
        };

        let ticket = if ok {
            self.slots.insert(url.to_string(), Slot::Done);
            Ticket::Cached
        } else {
            Ticket::Failed
        };

        for waiter in waiters {
            let _ = waiter.send(ticket);
        }
    }

    /// Fail every download owned by `stream` (its worker exited early).
    pub fn abandon(&mut self, stream: &str) {
        let orphaned: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::InFlight { owner, .. } if owner == stream))
            .map(|(url, _)| url.clone())
            .collect();

        for url in orphaned {
            self.complete(&url, false);
        }
    }

    pub fn is_downloaded(&self, url: &str) -> bool {
        matches!(self.slots.get(url), Some(Slot::Done))
    }

    pub fn in_flight(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s, Slot::InFlight { .. }))
            .count()
    }
}
