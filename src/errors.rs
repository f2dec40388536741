// src/errors.rs

//! Crate-wide error type and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("command parse error: {0}")]
    CommandParse(String),

    #[error("command exited with status {0}")]
    ExitStatus(i32),

    #[error("execution canceled")]
    Canceled,

    #[error("file watch error: {0}")]
    Watch(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ComposerError {
    /// Whether this error is a plain cancellation signal.
    ///
    /// Cancellation is how cooperative stops surface out of a running
    /// command; it must never escalate to a global shutdown on its own.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ComposerError::Canceled)
    }
}

impl From<notify::Error> for ComposerError {
    fn from(err: notify::Error) -> Self {
        ComposerError::Watch(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ComposerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_detected() {
        assert!(ComposerError::Canceled.is_cancellation());
        assert!(!ComposerError::ExitStatus(1).is_cancellation());
        assert!(!ComposerError::Config("x".into()).is_cancellation());
    }
}
