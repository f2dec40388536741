// src/registry.rs

//! Authoritative store of every process's lifecycle state.
//!
//! Processes live in exactly one of three partitions — `ready`, `running`,
//! `stopped` — and only ever move forward (`ready → running → stopped`).
//! Every transition publishes a [`StatusSnapshot`] on the status bus,
//! which is how dependents learn that a prerequisite finished.
//!
//! Locking discipline: one reader/writer lock guards the partitions; the
//! snapshot is published *after* the lock is released, so observer
//! callbacks never run under it and may safely call back into the
//! registry.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::process::Process;
use crate::status::{Status, StatusBus, StatusSnapshot};

#[derive(Default)]
struct Partitions {
    ready: HashMap<String, Arc<Process>>,
    running: HashMap<String, Arc<Process>>,
    stopped: HashMap<String, Arc<Process>>,
}

#[derive(Default)]
pub struct Registry {
    bus: StatusBus,
    state: RwLock<Partitions>,
    /// Union of every name appearing in any `kill` hook list. Computed at
    /// registration time, immutable afterwards.
    license_to_kill: HashSet<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a process: subscribe it to status updates, place it in
    /// `ready`, and fold its kill hooks into the license-to-kill set.
    ///
    /// Registration happens before the registry is shared and scheduling
    /// begins; there is no re-registration.
    pub fn register(&mut self, process: Arc<Process>) {
        self.bus.attach(process.clone());

        self.license_to_kill
            .extend(process.kill_hooks().iter().cloned());

        let mut state = self.state.write().unwrap();
        state.ready.insert(process.name().to_string(), process);
    }

    /// Move a process into `running` or `stopped` and publish the
    /// resulting snapshot.
    ///
    /// Transitions are monotonic: marking `running` only applies to a
    /// process still in `ready` (a force-stopped process stays stopped),
    /// and marking an already-stopped process `stopped` again is a silent
    /// no-op. Nothing is ever moved back to `ready` — it is the
    /// registration state, not a transition target.
    pub fn update_status(&self, process: &Arc<Process>, status: Status) {
        let moved = {
            let mut state = self.state.write().unwrap();
            match status {
                Status::Running => state.promote_to_running(process),
                Status::Stopped => state.demote_to_stopped(process),
                Status::Ready => {
                    unreachable!("ready is the registration state, not a transition target")
                }
            }
        };

        if moved {
            self.bus.publish(&self.snapshot());
        }
    }

    /// O(1) membership test against the license-to-kill set.
    pub fn is_allowed_to_be_killed(&self, name: &str) -> bool {
        self.license_to_kill.contains(name)
    }

    /// Look up a process and the partition it currently occupies.
    ///
    /// Unknown names are rejected at configuration load time, so a miss
    /// here is a broken invariant, not a runtime condition.
    pub fn get_process(&self, name: &str) -> (Arc<Process>, Status) {
        let state = self.state.read().unwrap();
        if let Some(process) = state.ready.get(name) {
            return (process.clone(), Status::Ready);
        }
        if let Some(process) = state.running.get(name) {
            return (process.clone(), Status::Running);
        }
        if let Some(process) = state.stopped.get(name) {
            return (process.clone(), Status::Stopped);
        }
        panic!("unknown process '{name}' in registry");
    }

    /// Point-in-time snapshot of all partitions.
    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.state.read().unwrap();

        let collect = |partition: &HashMap<String, Arc<Process>>| {
            let mut names: Vec<String> = partition.keys().cloned().collect();
            names.sort();
            names
        };

        let mut license_to_kill: Vec<String> = self.license_to_kill.iter().cloned().collect();
        license_to_kill.sort();

        StatusSnapshot {
            ready: collect(&state.ready),
            running: collect(&state.running),
            stopped: collect(&state.stopped),
            license_to_kill,
        }
    }

    /// Finalize: atomically empty `ready` so nothing further can start,
    /// then stop everything still running. Idempotent in effect.
    pub fn shutdown(&self) {
        let running: Vec<Arc<Process>> = {
            let mut state = self.state.write().unwrap();

            let ready: Vec<String> = state.ready.keys().cloned().collect();
            for name in ready {
                if let Some(process) = state.ready.remove(&name) {
                    state.stopped.insert(name, process);
                }
            }

            state.running.values().cloned().collect()
        };

        for process in &running {
            process.stop();
        }

        self.bus.publish(&self.snapshot());
    }

    pub fn ready_processes(&self) -> Vec<Arc<Process>> {
        self.state.read().unwrap().ready.values().cloned().collect()
    }

    pub fn running_processes(&self) -> Vec<Arc<Process>> {
        self.state
            .read()
            .unwrap()
            .running
            .values()
            .cloned()
            .collect()
    }

    pub fn stopped_processes(&self) -> Vec<Arc<Process>> {
        self.state
            .read()
            .unwrap()
            .stopped
            .values()
            .cloned()
            .collect()
    }

    /// Every registered process, regardless of partition.
    pub fn processes(&self) -> Vec<Arc<Process>> {
        let mut all = self.ready_processes();
        all.extend(self.running_processes());
        all.extend(self.stopped_processes());
        all
    }

    /// Attach an additional observer (beyond the registered processes).
    /// Must happen before scheduling starts, like registration itself.
    pub fn attach_observer(&mut self, observer: Arc<dyn crate::status::StatusObserver>) {
        self.bus.attach(observer);
    }
}

impl Partitions {
    fn promote_to_running(&mut self, process: &Arc<Process>) -> bool {
        match self.ready.remove(process.name()) {
            Some(process) => {
                self.running.insert(process.name().to_string(), process);
                true
            }
            None => false,
        }
    }

    fn demote_to_stopped(&mut self, process: &Arc<Process>) -> bool {
        let name = process.name();
        if self.stopped.contains_key(name) {
            return false;
        }

        let entry = self
            .ready
            .remove(name)
            .or_else(|| self.running.remove(name))
            .unwrap_or_else(|| process.clone());
        self.stopped.insert(name.to_string(), entry);
        true
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("status", &self.snapshot())
            .finish()
    }
}
