//! The `LockBackend` trait implemented by every door-lock controller driver.

use std::fmt;

use las_types::{LasError, LockSnapshot};

/// Write verbs understood by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorCommand {
    Lock,
    Unlock,
}

impl DoorCommand {
    /// Path segment used by the controller's REST API.
    pub fn as_str(&self) -> &'static str {
        match self {
            DoorCommand::Lock => "lock",
            DoorCommand::Unlock => "unlock",
        }
    }
}

impl fmt::Display for DoorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A door-lock controller.
///
/// # Contract
///
/// * `status` – fetch a fresh snapshot of every door. Any transport or
///   decoding problem is reported as [`LasError::BackendUnavailable`]; a
///   partial result is never returned.
///
/// * `lock` / `unlock` – issue a single write. `true` iff the controller
///   acknowledged it; transport errors and rejections both yield `false`.
///   Calls are attempted exactly once.
pub trait LockBackend: Send + Sync {
    fn status(&self) -> Result<LockSnapshot, LasError>;

    fn lock(&self, door_id: &str) -> bool {
        self.execute(DoorCommand::Lock, door_id)
    }

    fn unlock(&self, door_id: &str) -> bool {
        self.execute(DoorCommand::Unlock, door_id)
    }

    /// Send `command` to `door_id`.
    fn execute(&self, command: DoorCommand, door_id: &str) -> bool;
}
