//! The `Module` trait: stateless command handlers.

// Layer 1: Standard library imports
use std::error::Error;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::message::{Envelope, MessagePayload, ResponsePayload, StatusCode};
use crate::scheduler::SchedulerContext;
use crate::task::Task;

/// Error a message/response/step handler may surface. The dispatcher
/// converts it into an Exception-status error envelope toward the sender.
pub type HandlerError = Box<dyn Error + Send + Sync + 'static>;

/// A stateless command handler bound to one or more interface names.
///
/// `handle_message` answers with a dispatch verdict: `OK` when the response
/// is filled, `PASS`/`UNKNOWN_MSG` to keep the scan going, `TASK_REQUIRED`
/// when the command needs a new task (the scheduler then calls
/// `prepare_task` and adds the result), `FORWARDED` when ownership of the
/// response was deferred, or a negative status for caller-visible errors.
pub trait Module {
    /// Interface names this module serves (first token of a command).
    fn interfaces(&self) -> &[&'static str];

    fn supports_interface(&self, name: &str) -> bool {
        self.interfaces().contains(&name)
    }

    fn handle_message(
        &mut self,
        ctx: &mut SchedulerContext,
        envelope: &Envelope,
        response: &mut ResponsePayload,
    ) -> Result<StatusCode, HandlerError>;

    /// Build the task a `TASK_REQUIRED` verdict asked for; `None` when the
    /// message cannot produce one after all.
    fn prepare_task(
        &mut self,
        _ctx: &mut SchedulerContext,
        _message: &MessagePayload,
    ) -> Result<Option<Box<dyn Task>>, HandlerError> {
        Ok(None)
    }
}
