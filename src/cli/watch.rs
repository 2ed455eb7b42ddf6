//! `watch`: build, then patch artifacts as sources change.

use anyhow::Result;

use super::BuildArgs;
use crate::actor::{Orchestrator, WatchSession};
use crate::core::{register_stop_handle, shutdown_signal};

pub async fn watch(args: &BuildArgs) -> Result<()> {
    let orchestrator = Orchestrator::new(args.settings()?)?;
    register_stop_handle(orchestrator.stop_handle());

    let shutdown = shutdown_signal();
    WatchSession::new(orchestrator).run(shutdown).await
}
