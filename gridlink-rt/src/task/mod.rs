//! Cooperative tasks: state machine, control block and the drive step.

pub mod state;
pub mod traits;

pub use state::TaskStatus;
pub use traits::{drive_task, task_own_address, Task, TaskControl, DEFAULT_STEP_TIMESLICE};
