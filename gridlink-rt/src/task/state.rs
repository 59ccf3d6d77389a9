//! Task lifecycle states.

// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Lifecycle of a cooperative task.
///
/// `Busy` is transient: the drive step parks the previous state there while
/// a step function runs, and restores it on exit unless the step moved the
/// task elsewhere, so a step that forgets to restore state cannot wedge the
/// task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
    Paused,
    Destroying,
    Busy,
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Created => "created",
            TaskStatus::Starting => "starting",
            TaskStatus::Running => "running",
            TaskStatus::Stopping => "stopping",
            TaskStatus::Stopped => "stopped",
            TaskStatus::Paused => "paused",
            TaskStatus::Destroying => "destroying",
            TaskStatus::Busy => "busy",
        };
        f.write_str(name)
    }
}
