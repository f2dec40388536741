// src/status.rs

//! Status snapshots and the synchronous status bus.
//!
//! The bus is a minimal fan-out primitive: the registry publishes a
//! [`StatusSnapshot`] after every state transition and every attached
//! observer is invoked synchronously, in attachment order, with the same
//! value. There is no queueing and no replay for late subscribers; the
//! observer list is populated during registration and read-only afterwards.
//!
//! Observers must not block and must not call back into the publisher from
//! inside `notify` (the registry releases its lock before publishing, so
//! calling *registry* methods is fine — re-entering the bus itself is not).

use std::fmt;
use std::sync::Arc;

/// Lifecycle partition a process currently occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Running,
    Stopped,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready => write!(f, "ready"),
            Status::Running => write!(f, "running"),
            Status::Stopped => write!(f, "stopped"),
        }
    }
}

/// Immutable view of the registry published on every state transition.
///
/// Name lists are sorted so snapshots compare deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub ready: Vec<String>,
    pub running: Vec<String>,
    pub stopped: Vec<String>,
    pub license_to_kill: Vec<String>,
}

/// A subscriber to registry state transitions.
pub trait StatusObserver: Send + Sync {
    fn notify(&self, status: &StatusSnapshot);
}

/// Fan-out publisher for [`StatusSnapshot`]s.
#[derive(Default)]
pub struct StatusBus {
    observers: Vec<Arc<dyn StatusObserver>>,
}

impl StatusBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Registration order is delivery order.
    pub fn attach(&mut self, observer: Arc<dyn StatusObserver>) {
        self.observers.push(observer);
    }

    /// Deliver `status` to every observer, synchronously and in order.
    pub fn publish(&self, status: &StatusSnapshot) {
        for observer in &self.observers {
            observer.notify(status);
        }
    }
}

impl fmt::Debug for StatusBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        id: usize,
        seen: Arc<Mutex<Vec<(usize, StatusSnapshot)>>>,
    }

    impl StatusObserver for Recorder {
        fn notify(&self, status: &StatusSnapshot) {
            self.seen.lock().unwrap().push((self.id, status.clone()));
        }
    }

    #[test]
    fn publish_delivers_to_all_in_attachment_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = StatusBus::new();
        for id in 0..3 {
            bus.attach(Arc::new(Recorder {
                id,
                seen: seen.clone(),
            }));
        }

        let snapshot = StatusSnapshot {
            stopped: vec!["db".to_string()],
            ..Default::default()
        };
        bus.publish(&snapshot);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        for (expected_id, (id, status)) in seen.iter().enumerate() {
            assert_eq!(*id, expected_id);
            assert_eq!(status, &snapshot);
        }
    }

    #[test]
    fn publish_without_observers_is_a_noop() {
        let bus = StatusBus::new();
        bus.publish(&StatusSnapshot::default());
    }
}
