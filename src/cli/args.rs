//! CLI argument definitions using clap
//!
//! Commands:
//! - stratakv --config <path> init
//! - stratakv --config <path> create-table --uri <uri> [--value-format <fmt>]
//! - stratakv --config <path> put --uri <uri> --key <key> --value <value> [--ts <ts>]
//! - stratakv --config <path> delete --uri <uri> --key <key> [--ts <ts>]
//! - stratakv --config <path> versions --uri <uri> --key <key>
//! - stratakv --config <path> checkpoint

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// stratakv - a key-value store that remembers every version
#[derive(Parser, Debug)]
#[command(name = "stratakv")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./stratakv.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new data directory
    Init,

    /// Create a table
    CreateTable {
        /// Table URI, `table:<name>`
        #[arg(long)]
        uri: String,

        /// Value format recorded in the catalog
        #[arg(long, default_value = "u")]
        value_format: String,
    },

    /// Write a value
    Put {
        #[arg(long)]
        uri: String,
        #[arg(long)]
        key: String,
        #[arg(long)]
        value: String,
        /// Commit timestamp
        #[arg(long)]
        ts: Option<u64>,
    },

    /// Remove a key
    Delete {
        #[arg(long)]
        uri: String,
        #[arg(long)]
        key: String,
        /// Commit timestamp
        #[arg(long)]
        ts: Option<u64>,
    },

    /// Print every version of a key, newest first, one JSON object per line
    Versions {
        #[arg(long)]
        uri: String,
        #[arg(long)]
        key: String,
    },

    /// Reconcile every table
    Checkpoint,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
