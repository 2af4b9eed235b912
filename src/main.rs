//! Comic Minder - comic archive metadata tagging.
//!
//! Reads comic archives (CBZ), identifies them from their file names and
//! any tags they already carry, queries comic metadata providers, merges the
//! answers under a precedence policy and embeds the result back into the
//! archive. Optionally renames archives into a collection layout.

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod matcher;
pub mod metadata;
pub mod model;
pub mod organizer;
pub mod pipeline;
pub mod providers;
pub mod reconciler;
pub mod scanner;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging; RUST_LOG wins over --debug
    let directive = if args.debug {
        "comic_minder=debug"
    } else {
        "comic_minder=info"
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directive))?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    cli::run_command(&args)
}
