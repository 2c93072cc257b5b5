//! In-process lock controller for CI testing without a physical backend.
//!
//! [`SimBackend`] serves a fixed door map, records every write it receives
//! and counts calls per verb so tests can assert that the backend was (or
//! was not) touched.
//!
//! # Example
//!
//! ```rust
//! use las_hal::{LockBackend, SimBackend};
//!
//! let backend = SimBackend::new().with_door("front", 200, Some(1_700_000_000.0));
//!
//! assert!(backend.unlock("front"));
//! assert_eq!(backend.unlock_calls(), 1);
//! assert!(!backend.lock("unknown-door"));
//! ```

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use las_types::{DoorMap, LasError, LockSnapshot, LockStatus};
use tracing::debug;

use crate::backend::{DoorCommand, LockBackend};

/// A simulated controller. Writes succeed for known doors while online.
#[derive(Default)]
pub struct SimBackend {
    doors: Option<DoorMap>,
    offline: AtomicBool,
    reject_writes: AtomicBool,
    status_calls: AtomicUsize,
    lock_calls: AtomicUsize,
    unlock_calls: AtomicUsize,
    commands: Mutex<Vec<(DoorCommand, String)>>,
}

impl SimBackend {
    /// A backend that answers with an empty (`null`) door map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a door to the served status map.
    pub fn with_door(mut self, name: impl Into<String>, status: i32, last_seen: Option<f64>) -> Self {
        self.doors
            .get_or_insert_with(DoorMap::new)
            .insert(name.into(), LockStatus { status, last_seen });
        self
    }

    /// Serve an explicitly empty door map instead of none at all.
    pub fn with_empty_doors(mut self) -> Self {
        self.doors.get_or_insert_with(DoorMap::new);
        self
    }

    /// Make every call fail as if the controller were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make lock/unlock return `false` while status still answers.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn lock_calls(&self) -> usize {
        self.lock_calls.load(Ordering::SeqCst)
    }

    pub fn unlock_calls(&self) -> usize {
        self.unlock_calls.load(Ordering::SeqCst)
    }

    /// Total calls across all verbs.
    pub fn total_calls(&self) -> usize {
        self.status_calls() + self.lock_calls() + self.unlock_calls()
    }

    /// Every write received, in order.
    pub fn commands(&self) -> Vec<(DoorCommand, String)> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl LockBackend for SimBackend {
    fn status(&self) -> Result<LockSnapshot, LasError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(LasError::BackendUnavailable("simulated backend is offline".into()));
        }
        Ok(LockSnapshot {
            doors: self.doors.clone(),
        })
    }

    fn execute(&self, command: DoorCommand, door_id: &str) -> bool {
        match command {
            DoorCommand::Lock => self.lock_calls.fetch_add(1, Ordering::SeqCst),
            DoorCommand::Unlock => self.unlock_calls.fetch_add(1, Ordering::SeqCst),
        };
        if let Ok(mut commands) = self.commands.lock() {
            commands.push((command, door_id.to_string()));
        }

        let known = self
            .doors
            .as_ref()
            .is_some_and(|doors| doors.contains_key(door_id));
        let accepted = known
            && !self.offline.load(Ordering::SeqCst)
            && !self.reject_writes.load(Ordering::SeqCst);
        debug!(door = door_id, %command, accepted, "Simulated door command");
        accepted
    }
}
