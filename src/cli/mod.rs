//! CLI module for xmlstore
//!
//! Read-only inspection of finished databases, plus `drop`:
//! - info: metadata as JSON
//! - inspect: node records as JSON lines
//! - verify: table checksum check
//! - drop: remove a database directory

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{drop_database, info, inspect, run, run_command, verify};
pub use errors::{CliError, CliErrorCode, CliResult};
