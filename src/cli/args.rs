//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "exdb")]
#[command(author, version, about = "Inspect table databases built by isolated scripts", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: SubCommand,

    /// Output format as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (enables debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum SubCommand {
    /// Open a database and read the value at a key path
    Get {
        /// Path to the database script
        script: PathBuf,

        /// Key path to follow; integer-looking segments index sequences
        #[arg(value_name = "KEY")]
        path: Vec<String>,
    },

    /// Open a database and report the sequence length at a key path
    Len {
        /// Path to the database script
        script: PathBuf,

        /// Key path to the table to measure
        #[arg(value_name = "KEY")]
        path: Vec<String>,
    },

    /// Open a database and print it whole
    Dump {
        /// Path to the database script
        script: PathBuf,
    },

    /// Parse and validate a script without executing it
    Check {
        /// Path to the database script
        script: PathBuf,

        /// Maximum table nesting depth allowed
        #[arg(long, default_value = "10")]
        max_depth: usize,
    },

    /// Inspect a database interactively
    Repl {
        /// Path to the database script
        script: PathBuf,
    },
}
