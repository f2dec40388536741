// src/exec/mod.rs

//! Command execution layer.
//!
//! This module is the shell-execution collaborator consumed by the process
//! lifecycle: it turns a configured command line into a running child via
//! `tokio::process::Command` and forwards its output to the log sink.
//!
//! - [`environment`] builds the layered environment and expands `$VAR`,
//!   `${VAR}` and `~` references.
//! - [`runner`] owns a single execution: spawn, stream forwarding, waiting,
//!   and cooperative cancellation.

pub mod environment;
pub mod runner;

pub use runner::{run_command, CommandSpec, OutputContext};

use crate::errors::{ComposerError, Result};

/// Split a command line into POSIX-style words.
///
/// A malformed line (unbalanced quoting, trailing escape) or an empty one
/// becomes this process's run-error rather than a fatal condition.
pub fn parse_command(command: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(command)
        .map_err(|err| ComposerError::CommandParse(format!("{command:?}: {err}")))?;

    if argv.is_empty() {
        return Err(ComposerError::CommandParse(format!(
            "{command:?}: empty command line"
        )));
    }

    Ok(argv)
}
