//! CLI module for docbatch
//!
//! Provides command-line interface for:
//! - explain: Print merged pipelines without executing them
//! - load: One-shot batch load against a JSON data file
//! - serve: Line-by-line batch loading until stdin closes

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    explain, explain_requests, load, resolve, run, run_command, serve, BatchRequest, Config,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{
    read_request, read_request_from, read_requests, requests_from, write_envelope, write_error,
    write_response, Response,
};
