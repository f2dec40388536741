// src/logging.rs

//! Logging setup and the child-output sink.
//!
//! Two separate concerns live here:
//!
//! - [`init_logging`] installs the `tracing` subscriber for composer's own
//!   diagnostics. Priority for the level: the `--verbose` CLI flag, then
//!   the `COMPOSER_LOG` environment variable, then `info`. Diagnostics go
//!   to stderr so service output can own stdout.
//! - [`LogSink`] is the explicit handle every process writes its child
//!   output through: one line at a time, tagged with a padded name prefix
//!   (cyan for stdout, yellow for stderr), optionally trimmed through the
//!   service's `log_trim_pattern` first.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use owo_colors::OwoColorize;
use regex::Regex;
use tracing_subscriber::{fmt, EnvFilter};

/// Conventional null path; writing child output there must not touch the
/// real filesystem.
#[cfg(windows)]
pub const NULL_DEVICE: &str = "NUL";
#[cfg(not(windows))]
pub const NULL_DEVICE: &str = "/dev/null";

/// Initialise the global tracing subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("COMPOSER_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Which child stream a line came from. Selects the prefix color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Destination for multiplexed child output.
///
/// All processes share one sink so their lines interleave whole; the inner
/// writer is stdout by default, an append-mode file when the settings block
/// overrides the destination, or a discard sink for the null path.
pub struct LogSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl LogSink {
    pub fn stdout() -> Self {
        Self::from_writer(Box::new(io::stdout()))
    }

    /// Open the sink for an optional destination override.
    pub fn open(destination: Option<&Path>) -> io::Result<Self> {
        let writer: Box<dyn Write + Send> = match destination {
            None => Box::new(io::stdout()),
            Some(path) if path == Path::new(NULL_DEVICE) => Box::new(Discard),
            Some(path) => Box::new(OpenOptions::new().create(true).append(true).open(path)?),
        };
        Ok(Self::from_writer(writer))
    }

    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(writer),
        }
    }

    /// Forward one line of child output.
    ///
    /// The trim transform applies first: a match forwards only the named
    /// `message` capture; a non-match is forwarded with a `[!]` marker so
    /// unrecognized formatting stays visible.
    pub fn write_line(&self, prefix: &str, stream: StreamKind, trim: Option<&Regex>, line: &str) {
        let message = extract_message(trim, line);
        let tagged = match stream {
            StreamKind::Stdout => format!("{} | {message}", prefix.cyan()),
            StreamKind::Stderr => format!("{} | {message}", prefix.yellow()),
        };

        let mut out = self.out.lock().unwrap();
        let _ = writeln!(out, "{tagged}");
        let _ = out.flush();
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink").finish_non_exhaustive()
    }
}

fn extract_message(trim: Option<&Regex>, line: &str) -> String {
    let Some(trim) = trim else {
        return line.to_string();
    };

    match trim.captures(line).and_then(|c| c.name("message")) {
        Some(message) => message.as_str().to_string(),
        None => format!("[!] {line}"),
    }
}

/// In-process stand-in for the null device.
struct Discard;

impl Write for Discard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
