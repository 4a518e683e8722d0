//! CLI argument definitions using clap
//!
//! Commands:
//! - docbatch explain --config <path>
//! - docbatch load --config <path>
//! - docbatch serve --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docbatch - batched aggregation-pipeline loading for document stores
#[derive(Parser, Debug)]
#[command(name = "docbatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the merged pipeline for one batch request read from stdin
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./docbatch.json")]
        config: PathBuf,
    },

    /// Load one batch request read from stdin and exit
    Load {
        /// Path to configuration file
        #[arg(long, default_value = "./docbatch.json")]
        config: PathBuf,
    },

    /// Load one batch request per stdin line until EOF
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./docbatch.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
