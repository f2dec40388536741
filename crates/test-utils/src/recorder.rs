#![allow(dead_code)]

//! Status-bus observer that records every published snapshot, for
//! asserting on transition ordering in integration tests.

use std::sync::Mutex;
use std::time::Instant;

use composer::status::{StatusObserver, StatusSnapshot};

#[derive(Default)]
pub struct SnapshotRecorder {
    seen: Mutex<Vec<(Instant, StatusSnapshot)>>,
}

impl SnapshotRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<StatusSnapshot> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(_, s)| s.clone())
            .collect()
    }

    /// Instant of the first snapshot where `name` appeared as running.
    pub fn first_running(&self, name: &str) -> Option<Instant> {
        self.first_where(|s| s.running.iter().any(|n| n == name))
    }

    /// Instant of the first snapshot where `name` appeared as stopped.
    pub fn first_stopped(&self, name: &str) -> Option<Instant> {
        self.first_where(|s| s.stopped.iter().any(|n| n == name))
    }

    /// Whether `name` was ever observed in the running partition.
    pub fn ever_ran(&self, name: &str) -> bool {
        self.first_running(name).is_some()
    }

    /// The first published snapshot in which `name` appears as running.
    ///
    /// Snapshot contents are authoritative for ordering assertions: a
    /// snapshot is generated from registry state after the triggering
    /// transition committed, so whatever it lists as stopped had already
    /// stopped when `name` started.
    pub fn first_running_snapshot(&self, name: &str) -> Option<StatusSnapshot> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .find(|(_, s)| s.running.iter().any(|n| n == name))
            .map(|(_, s)| s.clone())
    }

    fn first_where(&self, pred: impl Fn(&StatusSnapshot) -> bool) -> Option<Instant> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .find(|(_, s)| pred(s))
            .map(|(at, _)| *at)
    }
}

impl StatusObserver for SnapshotRecorder {
    fn notify(&self, status: &StatusSnapshot) {
        self.seen
            .lock()
            .unwrap()
            .push((Instant::now(), status.clone()));
    }
}
