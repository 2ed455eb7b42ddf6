//! Incremental Reload
//!
//! Patches combined artifacts in place while watching, instead of
//! rebuilding whole streams.
//!
//! # Modules
//!
//! - `classify` - which streams and staged slots a changed file belongs to
//! - `ledger` - byte ranges of every contribution in an artifact
//! - `patch` - re-render one file and splice it into its artifacts

pub mod classify;
pub mod ledger;
pub mod patch;

#[cfg(test)]
mod tests;

pub use ledger::{ArtifactLedger, Splice};
pub use patch::{PatchOutcome, patch_file};
