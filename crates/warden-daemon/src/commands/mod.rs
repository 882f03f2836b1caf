//! Operator command handlers.
//!
//! Each submodule implements one group of CLI subcommands. Handlers return
//! the lines to print.

pub mod jobs;
pub mod lookup;
pub mod moderation;

/// Lines of command output.
pub type Output = anyhow::Result<Vec<String>>;
