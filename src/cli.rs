// src/cli.rs

//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// A utility to manage all your processes in a development environment.
#[derive(Debug, Parser)]
#[command(name = "composer", version, about)]
pub struct CliArgs {
    /// Increase the diagnostic level to debug.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start all configured processes.
    Start {
        /// Configuration file.
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print version information.
    Version,
}

/// Human-readable version string for the `version` subcommand.
///
/// The revision is stamped by CI through `COMPOSER_BUILD_REVISION` at
/// compile time; local builds report `none`.
pub fn version() -> String {
    let revision = option_env!("COMPOSER_BUILD_REVISION").unwrap_or("none");
    format!("{} (revision {revision})", env!("CARGO_PKG_VERSION"))
}
