//! Command-line interface module.

mod args;
pub mod build;
pub mod registry;
pub mod watch;

pub use args::{BuildArgs, Cli, Commands, DEFAULT_MANIFEST};
