//! Command-line interface for comic-minder.
//!
//! This module provides CLI commands for tagging, identifying and inspecting
//! comic archives.

mod commands;

pub use commands::{Cli, Commands, run_command};
