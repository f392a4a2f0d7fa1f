//! CLI module organization:
//! - args: argument structures
//! - commands: command execution and exit-code mapping

pub mod args;
pub mod commands;

pub use args::*;
pub use commands::*;
