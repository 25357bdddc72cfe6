//! CLI module for annota
//!
//! Provides command-line interface for:
//! - validate: check one record request (stdin) against a dataset definition
//! - import: load a rows file into a dataset through the bulk upsert path

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, ValidateMode};
pub use commands::{import, load_dataset, run, run_command, validate, validate_request};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_request, write_error_to, write_response, write_response_to};
