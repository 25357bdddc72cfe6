//! CLI argument definitions using clap
//!
//! Commands:
//! - annota validate --dataset <path> --mode <mode>
//! - annota import --dataset <path> --rows <path> [--take <n>]

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Annota - record validation and hub import for annotation datasets
#[derive(Parser, Debug)]
#[command(name = "annota")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate one JSON request read from stdin against a dataset
    Validate {
        /// Path to the dataset definition (JSON)
        #[arg(long)]
        dataset: PathBuf,

        /// Kind of request read from stdin
        #[arg(long, value_enum)]
        mode: ValidateMode,
    },

    /// Import rows from a JSON Lines export into a dataset
    Import {
        /// Path to the dataset definition (JSON)
        #[arg(long)]
        dataset: PathBuf,

        /// Path to the rows file (one JSON object per line)
        #[arg(long)]
        rows: PathBuf,

        /// Import only the first N rows
        #[arg(long)]
        take: Option<usize>,
    },
}

/// Request shapes accepted by `validate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValidateMode {
    Create,
    Update,
    BulkCreate,
    BulkUpsert,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
