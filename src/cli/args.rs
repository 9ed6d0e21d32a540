//! CLI argument definitions using clap
//!
//! Commands:
//! - xmlstore info    --config <path> <name>
//! - xmlstore inspect --config <path> <name> [--start N] [--count N]
//! - xmlstore verify  --config <path> <name>
//! - xmlstore drop    --config <path> <name>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// xmlstore - node tables of a native XML database
#[derive(Parser, Debug)]
#[command(name = "xmlstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the metadata of a database
    Info {
        /// Path to configuration file
        #[arg(long, default_value = "./xmlstore.json")]
        config: PathBuf,
        /// Database name
        name: String,
    },

    /// Print node records as JSON lines
    Inspect {
        /// Path to configuration file
        #[arg(long, default_value = "./xmlstore.json")]
        config: PathBuf,
        /// Database name
        name: String,
        /// First rank to print
        #[arg(long, default_value_t = 0)]
        start: u32,
        /// Number of records to print
        #[arg(long)]
        count: Option<u32>,
    },

    /// Check the node table against its stored checksum
    Verify {
        /// Path to configuration file
        #[arg(long, default_value = "./xmlstore.json")]
        config: PathBuf,
        /// Database name
        name: String,
    },

    /// Remove a database directory
    Drop {
        /// Path to configuration file
        #[arg(long, default_value = "./xmlstore.json")]
        config: PathBuf,
        /// Database name
        name: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
