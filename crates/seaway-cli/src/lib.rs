//! Seaway CLI library.
//!
//! Subcommand handlers, output formatting and logging setup for the `seaway`
//! binary. The binary itself only parses arguments and dispatches here.

pub mod commands;
pub mod logging;
pub mod output;
