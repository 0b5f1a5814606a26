//! Command-line interface for the tsukiji index.
//!
//! The `stress` command drives random add, update and remove traffic through
//! the concurrent mutation pipeline and verifies the resulting index.

mod commands;
mod fvecs;

pub use commands::{Cli, CliError, Command, StressCommand, StressSummary, render_summary, run_cli};
pub use fvecs::{FvecsError, read_fvecs, read_fvecs_path};

#[cfg(test)]
mod tests;
