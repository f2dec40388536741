// src/watch.rs

//! Live-reload file watching.
//!
//! A [`ReloadWatcher`] observes a process's working directory recursively
//! and yields changed paths, with ignore-style patterns compiled to a
//! `globset` filter so that matched (ignored) paths never surface. Patterns
//! match gitignore-like: a bare name matches that path component anywhere
//! in the tree.
//!
//! Failure to establish the underlying watch is a construction-time error;
//! the owning process surfaces it through the same path as a command
//! failure.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::{ComposerError, Result};

/// Source of qualifying change notifications for one process.
///
/// The underlying `notify` watcher lives as long as this value; dropping it
/// stops file watching.
pub struct ReloadWatcher {
    rx: mpsc::UnboundedReceiver<PathBuf>,
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for ReloadWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadWatcher").finish_non_exhaustive()
    }
}

impl ReloadWatcher {
    /// Watch `root` recursively, filtering out paths matched by
    /// `ignore_patterns`.
    pub fn new(root: impl Into<PathBuf>, ignore_patterns: &[String]) -> Result<Self> {
        let root = root.into();
        // Canonicalize once so event paths strip against a stable base.
        let root = root.canonicalize().unwrap_or(root);

        let ignore = compile_ignore(ignore_patterns)?;
        let (tx, rx) = mpsc::unbounded_channel();

        // Called synchronously by notify from its own thread; forward into
        // the async world over the channel.
        let callback_root = root.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for path in event.paths {
                        if is_ignored(&ignore, &callback_root, &path) {
                            continue;
                        }
                        let _ = tx.send(path);
                    }
                }
                Err(err) => {
                    // No tracing from the notify thread; stderr is the
                    // fallback.
                    eprintln!("composer: file watch error: {err}");
                }
            },
            Config::default(),
        )?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        debug!(root = %root.display(), "reload watcher started");

        Ok(Self {
            rx,
            _inner: watcher,
        })
    }

    /// Next qualifying change, or `None` if the watcher backend went away.
    pub async fn changed(&mut self) -> Option<PathBuf> {
        self.rx.recv().await
    }
}

/// Compile ignore-style patterns.
///
/// Each pattern also matches as a path component (`log` ignores `log`,
/// `log/...` and `a/b/log/...`), mirroring how ignore files are usually
/// written.
fn compile_ignore(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let trimmed = pattern.trim_end_matches('/');
        let variants = [
            trimmed.to_string(),
            format!("{trimmed}/**"),
            format!("**/{trimmed}"),
            format!("**/{trimmed}/**"),
        ];
        for variant in variants {
            let glob = Glob::new(&variant).map_err(|err| {
                ComposerError::Watch(format!("invalid reload pattern {pattern:?}: {err}"))
            })?;
            builder.add(glob);
        }
    }

    builder
        .build()
        .map_err(|err| ComposerError::Watch(err.to_string()))
}

fn is_ignored(ignore: &GlobSet, root: &Path, path: &Path) -> bool {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let rel = rel.to_string_lossy().replace('\\', "/");
    ignore.is_match(rel.as_str())
}
