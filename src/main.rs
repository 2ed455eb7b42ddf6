//! streamweld - combine, compile and minify asset streams.

mod actor;
mod asset;
mod cli;
mod compiler;
mod config;
mod core;
mod embed;
mod fetch;
mod logger;
mod registry;
mod reload;
mod stream;
mod utils;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Before any worker exists
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async {
        match &cli.command {
            Commands::Build { build_args } => cli::build::build(build_args).await,
            Commands::Watch { build_args } => cli::watch::watch(build_args).await,
            Commands::Registry {
                build_args,
                stream,
                html,
                output,
            } => {
                cli::registry::registry(build_args, stream.as_deref(), *html, output.as_deref())
                    .await
            }
        }
    })
}
