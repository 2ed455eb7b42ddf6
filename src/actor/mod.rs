//! Actor System
//!
//! Message-passing concurrency for builds and watch mode:
//!
//! ```text
//! FsActor --WatchMsg--> WatchSession --> Orchestrator <--WorkerMsg-- stream workers
//! (notify)                (patch/rebuild)   (supervisor)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types between actors
//! - `orchestrator` - Spawns stream workers, owns the shared caches
//! - `fs` - File system watcher with debouncing
//! - `session` - Watch loop wiring the watcher to the orchestrator

pub mod fs;
pub mod messages;
pub mod orchestrator;
pub mod session;

pub use orchestrator::{BuildSummary, Orchestrator, StopHandle};
pub use session::WatchSession;
