// src/process.rs

//! One configured service and its execution lifecycle.
//!
//! A [`Process`] owns its dependency gate, its completion signal and the
//! cancellation handle of whichever execution generation is currently
//! active. Lifecycle: `NotStarted → (Waiting, if wait hooks are present) →
//! Running → Terminated`, where `Terminated` is reached exactly once.
//!
//! Dependency satisfaction is reactive: the registry publishes a status
//! snapshot after every transition, [`Process::update`] prunes this
//! process's wait list against the `stopped` names, and the gate releases
//! once the list empties. There is no dependency graph anywhere.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::errors::{ComposerError, Result};
use crate::exec::{self, environment, CommandSpec, OutputContext};
use crate::logging::LogSink;
use crate::status::{StatusObserver, StatusSnapshot};
use crate::watch::ReloadWatcher;

pub struct Process {
    name: String,
    command: String,
    pwd: Option<String>,
    environment: BTreeMap<String, String>,
    wait_hooks: Mutex<Vec<String>>,
    kill_hooks: Vec<String>,
    reload: Vec<String>,
    log_trim: Option<Regex>,
    ignore_error: bool,
    root_dir: PathBuf,
    sink: Arc<LogSink>,
    padding: OnceLock<usize>,

    /// Dependency gate; released (cancelled) once the wait list is empty.
    gate: CancellationToken,
    /// Completion signal; closed exactly once when the run concludes.
    done: CancellationToken,
    /// Set by [`Process::stop`]; unblocks a waiting process so it can
    /// terminate without ever starting.
    killed: CancellationToken,
    /// Cancellation handle of the active execution generation. Guarded by
    /// the same mutex `stop` takes, so stopping races safely against a
    /// fresh generation being armed.
    current: Mutex<Option<CancellationToken>>,
}

impl Process {
    pub fn new(
        name: impl Into<String>,
        config: ServiceConfig,
        root_dir: PathBuf,
        sink: Arc<LogSink>,
    ) -> Result<Self> {
        let name = name.into();

        let log_trim = config
            .log_trim_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|err| {
                ComposerError::Config(format!(
                    "service '{name}' has an invalid `log_trim_pattern`: {err}"
                ))
            })?;

        let gate = CancellationToken::new();
        if config.hooks.wait.is_empty() {
            // Nothing to wait for; the gate starts released.
            gate.cancel();
        }

        Ok(Self {
            name,
            command: config.command,
            pwd: config.pwd,
            environment: config.environment,
            wait_hooks: Mutex::new(config.hooks.wait),
            kill_hooks: config.hooks.kill,
            reload: config.reload,
            log_trim,
            ignore_error: config.ignore_error,
            root_dir,
            sink,
            padding: OnceLock::new(),
            gate,
            done: CancellationToken::new(),
            killed: CancellationToken::new(),
            current: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names to force-stop when this process stops.
    pub fn kill_hooks(&self) -> &[String] {
        &self.kill_hooks
    }

    pub fn ignore_error(&self) -> bool {
        self.ignore_error
    }

    /// Uniform display width for aligned log prefixes; set once by the
    /// processor before scheduling. Cosmetic only.
    pub fn set_padding(&self, width: usize) {
        let _ = self.padding.set(width);
    }

    pub fn padded_name(&self) -> String {
        let width = self.padding.get().copied().unwrap_or(0);
        format!("{:>width$}", self.name)
    }

    /// Observer half of the status bus: prune stopped prerequisites from
    /// the wait list, releasing the gate once it empties. Releasing an
    /// already-released gate is a no-op, and a stopped name is never
    /// re-added, so satisfaction is monotonic.
    pub fn update(&self, status: &StatusSnapshot) {
        let mut wait = self.wait_hooks.lock().unwrap();
        if wait.is_empty() {
            return;
        }

        wait.retain(|name| !status.stopped.contains(name));
        if wait.is_empty() {
            debug!(process = %self.name, "all prerequisites stopped; releasing gate");
            self.gate.cancel();
        }
    }

    /// Block until the dependency gate releases, or until this process is
    /// force-stopped while still waiting (in which case it must never run).
    pub async fn wait(&self) {
        tokio::select! {
            _ = self.gate.cancelled() => {}
            _ = self.killed.cancelled() => {}
        }
    }

    /// Whether [`Process::stop`] has been called.
    pub fn is_killed(&self) -> bool {
        self.killed.is_cancelled()
    }

    /// Close the completion signal. Idempotent; called by the supervising
    /// task when the run concludes. Reload restarts never touch this.
    pub fn mark_done(&self) {
        self.done.cancel();
    }

    pub fn is_terminated(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Cancel the active execution exactly once; repeated calls are safe
    /// no-ops. Does not update registry state — that is the caller's job.
    pub fn stop(&self) {
        let mut current = self.current.lock().unwrap();
        if self.killed.is_cancelled() {
            return;
        }
        self.killed.cancel();
        if let Some(generation) = current.take() {
            generation.cancel();
        }
        warn!(process = %self.name, "stopped by composer");
    }

    /// Run the configured command under `ctx`.
    ///
    /// With reload patterns configured, each qualifying filesystem change
    /// cancels the current execution generation and starts a fresh one
    /// derived from `ctx`, until a generation finishes un-superseded or
    /// `ctx` itself is cancelled. The process stays logically `running`
    /// across any number of generations.
    pub async fn run(&self, ctx: &CancellationToken) -> Result<()> {
        let env = environment::layered(&self.environment);
        let dir = self.resolve_workdir(&env);
        let command = environment::expand(&self.command, &env);
        let argv: Vec<String> = exec::parse_command(&command)?
            .into_iter()
            .map(|word| environment::expand_tilde(&word))
            .collect();

        let spec = CommandSpec { argv, dir, env };
        let output = OutputContext {
            sink: self.sink.clone(),
            prefix: self.padded_name(),
            trim: self.log_trim.clone(),
        };

        if self.reload.is_empty() {
            let generation = ctx.child_token();
            self.arm(generation.clone());
            return exec::run_command(spec, generation, output).await;
        }

        let mut watcher = ReloadWatcher::new(&spec.dir, &self.reload)?;

        loop {
            if ctx.is_cancelled() {
                return Err(ComposerError::Canceled);
            }

            let generation = ctx.child_token();
            self.arm(generation.clone());

            let mut execution =
                Box::pin(exec::run_command(spec.clone(), generation.clone(), output.clone()));

            tokio::select! {
                res = &mut execution => {
                    // Finished without being superseded (includes the case
                    // where `ctx` was cancelled underneath us).
                    return res;
                }
                changed = watcher.changed() => {
                    let Some(path) = changed else {
                        // Watch backend went away; run this generation out.
                        return execution.await;
                    };
                    debug!(
                        process = %self.name,
                        path = %path.display(),
                        "reload triggered; restarting"
                    );
                    generation.cancel();
                    // Let the superseded generation wind down; its outcome
                    // is irrelevant.
                    let _ = execution.await;
                }
            }
        }
    }

    fn arm(&self, generation: CancellationToken) {
        let mut current = self.current.lock().unwrap();
        if self.killed.is_cancelled() {
            // Raced with stop(); the new generation must not survive it.
            generation.cancel();
        }
        *current = Some(generation);
    }

    fn resolve_workdir(&self, env: &BTreeMap<String, String>) -> PathBuf {
        match &self.pwd {
            Some(pwd) => {
                let expanded = environment::expand_tilde(&environment::expand(pwd, env));
                let path = PathBuf::from(expanded);
                if path.is_relative() {
                    self.root_dir.join(path)
                } else {
                    path
                }
            }
            None => self.root_dir.clone(),
        }
    }
}

impl StatusObserver for Process {
    fn notify(&self, status: &StatusSnapshot) {
        self.update(status);
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("name", &self.name)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}
