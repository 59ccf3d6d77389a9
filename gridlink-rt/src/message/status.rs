//! Protocol status codes.
//!
//! One integer space is shared by dispatch verdicts and response statuses:
//! `OK` is 1, every negative value is an error, and the remaining positive
//! values are non-terminal dispatch outcomes (keep scanning, task required,
//! ownership deferred). The codes travel inside `Response` events and are
//! what remote peers see, so they are plain integers rather than a closed
//! Rust enum.

// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Wire-level status code carried by responses and returned by handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub i32);

impl StatusCode {
    /// Request handled successfully.
    pub const OK: StatusCode = StatusCode(1);
    /// Request accepted, result will arrive later.
    pub const WAITING: StatusCode = StatusCode(2);
    /// Handler is not concerned with this message, keep scanning.
    pub const PASS: StatusCode = StatusCode(3);
    /// Unknown sub-command for this handler, keep scanning.
    pub const UNKNOWN_MSG: StatusCode = StatusCode(4);
    /// Handling this command requires spawning a new task.
    pub const TASK_REQUIRED: StatusCode = StatusCode(5);
    /// Ownership of the response has been deferred (message parked).
    pub const FORWARDED: StatusCode = StatusCode(6);

    /// Caller-visible parameter error.
    pub const WRONG_PARAMS: StatusCode = StatusCode(-2);
    /// Destination node is not known to any gate.
    pub const UNKNOWN_NODE: StatusCode = StatusCode(-3);
    /// Address resolved to nothing and no fallback was available.
    pub const UNKNOWN_RECEIVER: StatusCode = StatusCode(-4);
    /// Receiver named a task that does not exist.
    pub const UNKNOWN_TASK: StatusCode = StatusCode(-5);
    /// Request or delivery deadline elapsed.
    pub const TIMEOUT: StatusCode = StatusCode(-6);
    /// Cancelled on user request.
    pub const USR_ABORT: StatusCode = StatusCode(-7);
    /// Transport failed to move the envelope.
    pub const TRANSMIT_ERROR: StatusCode = StatusCode(-8);
    /// Handler failed with an internal error.
    pub const EXCEPTION: StatusCode = StatusCode(-9);
    /// Queue size limit reached.
    pub const OVERFLOW: StatusCode = StatusCode(-10);
    /// Operation requires a request id and none was given.
    pub const MSG_ID_REQUIRED: StatusCode = StatusCode(-11);

    /// Negative codes are errors.
    pub fn is_error(self) -> bool {
        self.0 < 0
    }

    /// Raw integer value.
    pub fn code(self) -> i32 {
        self.0
    }

    /// Symbolic name for logging; unknown codes render as `status(<n>)`.
    pub fn name(self) -> &'static str {
        match self {
            StatusCode::OK => "ok",
            StatusCode::WAITING => "waiting",
            StatusCode::PASS => "pass",
            StatusCode::UNKNOWN_MSG => "unknown_msg",
            StatusCode::TASK_REQUIRED => "task_required",
            StatusCode::FORWARDED => "forwarded",
            StatusCode::WRONG_PARAMS => "wrong_params",
            StatusCode::UNKNOWN_NODE => "unknown_node",
            StatusCode::UNKNOWN_RECEIVER => "unknown_receiver",
            StatusCode::UNKNOWN_TASK => "unknown_task",
            StatusCode::TIMEOUT => "timeout",
            StatusCode::USR_ABORT => "usr_abort",
            StatusCode::TRANSMIT_ERROR => "transmit_error",
            StatusCode::EXCEPTION => "exception",
            StatusCode::OVERFLOW => "overflow",
            StatusCode::MSG_ID_REQUIRED => "msg_id_required",
            _ => "status",
        }
    }
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}
