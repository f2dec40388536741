// src/processor.rs

//! Top-level scheduler.
//!
//! [`Processor::perform`] spawns one task per ready process and two
//! long-lived coordination loops:
//!
//! - the **error handler** receives process run-errors; the first one that
//!   is not a plain cancellation triggers [`Processor::shutdown`] exactly
//!   once, later errors are discarded;
//! - the **terminator** receives batches of kill-hook names and realizes
//!   the cascade: a still-ready process moves straight to `stopped`, a
//!   running one is stopped cooperatively, a stopped one is left alone.
//!
//! Individual process failures stay local unless propagated; a global
//! teardown happens at most once, whether triggered by a propagated error
//! or an external interrupt, and every other process gets a cooperative
//! stop via context cancellation rather than a forced kill.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::{ComposerError, Result};
use crate::registry::Registry;
use crate::status::Status;

pub struct Processor {
    registry: Arc<Registry>,
    termination: Mutex<bool>,
    first_error: Mutex<Option<ComposerError>>,
}

impl Processor {
    pub fn new(registry: Arc<Registry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            termination: Mutex::new(false),
            first_error: Mutex::new(None),
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Drive every registered process to termination.
    ///
    /// Returns once all per-process tasks have finished and both
    /// coordination loops have drained. The first propagated error, if
    /// any, becomes the return value so the caller can exit non-zero.
    pub async fn perform(self: Arc<Self>, ctx: CancellationToken) -> Result<()> {
        let processes = self.registry.ready_processes();

        // Uniform prefix width from the longest name; cosmetic only.
        let width = self
            .registry
            .processes()
            .iter()
            .map(|p| p.name().len())
            .max()
            .unwrap_or(0);
        for process in self.registry.processes() {
            process.set_padding(width);
        }

        let capacity = processes.len().max(1);
        let (error_tx, error_rx) = mpsc::channel(capacity);
        let (terminate_tx, terminate_rx) = mpsc::channel(capacity);

        let error_handler = tokio::spawn(self.clone().handle_errors(error_rx));
        let terminator = tokio::spawn(self.clone().terminator(terminate_rx));

        let mut tasks = JoinSet::new();
        for process in processes {
            let registry = self.registry.clone();
            let error_tx = error_tx.clone();
            let terminate_tx = terminate_tx.clone();
            let ctx = ctx.child_token();

            tasks.spawn(async move {
                process.wait().await;

                // A process force-stopped while still waiting never runs.
                if !process.is_killed() {
                    registry.update_status(&process, Status::Running);

                    if let Err(err) = process.run(&ctx).await {
                        let swallow = process.ignore_error()
                            || registry.is_allowed_to_be_killed(process.name());
                        if swallow {
                            debug!(
                                process = %process.name(),
                                error = %err,
                                "run error swallowed"
                            );
                        } else {
                            let _ = error_tx.send(err).await;
                        }
                    }
                }

                // Unconditional: completion, final transition, kill cascade.
                process.mark_done();
                registry.update_status(&process, Status::Stopped);
                let _ = terminate_tx.send(process.kill_hooks().to_vec()).await;
            });
        }

        // The coordination loops end once every task-held sender is gone.
        drop(error_tx);
        drop(terminate_tx);

        while tasks.join_next().await.is_some() {}

        let _ = error_handler.await;
        let _ = terminator.await;

        match self.first_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Execute the teardown sequence exactly once; concurrent callers
    /// (signal handler, error handler) after the first are no-ops.
    ///
    /// Returns whether this call performed the teardown.
    pub fn shutdown(&self) -> bool {
        let mut termination = self.termination.lock().unwrap();
        if *termination {
            return false;
        }
        *termination = true;

        info!("gracefully shutting down composer");

        for process in self.registry.ready_processes() {
            process.stop();
            self.registry.update_status(&process, Status::Stopped);
        }
        for process in self.registry.running_processes() {
            process.stop();
            self.registry.update_status(&process, Status::Stopped);
        }

        self.registry.shutdown();
        true
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.termination.lock().unwrap()
    }

    async fn handle_errors(self: Arc<Self>, mut errors: mpsc::Receiver<ComposerError>) {
        let mut termination = false;

        while let Some(err) = errors.recv().await {
            if termination || err.is_cancellation() {
                continue;
            }

            error!(error = %err, details = ?err, "process failed; shutting composer down");
            *self.first_error.lock().unwrap() = Some(err);
            self.shutdown();
            termination = true;
        }
    }

    async fn terminator(self: Arc<Self>, mut terminate: mpsc::Receiver<Vec<String>>) {
        while let Some(names) = terminate.recv().await {
            self.stop_all_named(&names);
        }
    }

    fn stop_all_named(&self, names: &[String]) {
        for name in names {
            let (process, status) = self.registry.get_process(name);
            match status {
                Status::Ready => {
                    warn!(process = %name, "kill hook fired before start");
                    process.stop();
                    self.registry.update_status(&process, Status::Stopped);
                }
                Status::Running => {
                    warn!(process = %name, "kill hook fired");
                    process.stop();
                    self.registry.update_status(&process, Status::Stopped);
                }
                Status::Stopped => {
                    // Nothing left to do.
                }
            }
        }
    }
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("shutting_down", &self.is_shutting_down())
            .finish_non_exhaustive()
    }
}
