//! Command line interface for the package builder.
//!
//! This module provides argument parsing, command execution, and colored
//! user feedback.

mod args;
pub mod commands;
mod output;

pub use args::{Args, RuntimeConfig};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run(args: Args) -> Result<i32> {
    execute_command(args).await
}
