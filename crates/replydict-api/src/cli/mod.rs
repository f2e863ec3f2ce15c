//! CLI command definitions and dispatch for the `rdict` binary.
//!
//! Uses clap derive macros for argument parsing. Commands are grouped by
//! store: `rdict kw ...` for the keyword dictionary, `rdict doc ...` for
//! sequenced document collections.

pub mod document;
pub mod keyword;
pub mod status;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Keyword reply dictionary and sequenced document collections.
#[derive(Parser)]
#[command(name = "rdict", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log filter implied by `--quiet` and `-v`.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,replydict_core=debug,replydict_infra=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Keyword dictionary (add, reply, search, rank, delete, stats).
    Kw {
        #[command(subcommand)]
        action: keyword::KeywordCommand,
    },

    /// Sequenced document collections (insert, find, counter, drop).
    Doc {
        #[command(subcommand)]
        action: document::DocumentCommand,
    },

    /// Show configuration and store status.
    Status,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
