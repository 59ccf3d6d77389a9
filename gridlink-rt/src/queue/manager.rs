//! Queue manager task.
//!
//! One manager per queue; its task name is the queue name, so the queue is
//! addressable as `node#<queue>`. Inbound messages are parked in the shared
//! queue core (`FORWARDED`); the periodic step runs variant-specific work:
//! multicast distribution, or the durable validation pass (contact, result
//! and store timeouts).

// Layer 1: Standard library imports
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::config::QueueKind;
use super::core::QueueCore;
use crate::message::{Envelope, ResponsePayload, StatusCode};
use crate::module::HandlerError;
use crate::scheduler::SchedulerContext;
use crate::task::{Task, TaskControl, TaskStatus};

/// Pause between durable validation passes.
const VALIDATE_DELAY: Duration = Duration::from_millis(50);

/// Task owning one queue's shared core.
pub struct ManagerTask {
    control: TaskControl,
    core: Rc<RefCell<QueueCore>>,
}

impl ManagerTask {
    /// The manager is named after the queue it owns.
    pub fn new(core: Rc<RefCell<QueueCore>>) -> Self {
        let name = core.borrow().name().to_owned();
        Self {
            control: TaskControl::new(name),
            core,
        }
    }

    pub fn core(&self) -> Rc<RefCell<QueueCore>> {
        Rc::clone(&self.core)
    }
}

impl Task for ManagerTask {
    fn control(&self) -> &TaskControl {
        &self.control
    }

    fn control_mut(&mut self) -> &mut TaskControl {
        &mut self.control
    }

    fn handle_message(
        &mut self,
        _ctx: &mut SchedulerContext,
        envelope: &Envelope,
        _response: &mut ResponsePayload,
    ) -> Result<StatusCode, HandlerError> {
        let verdict = self.core.borrow_mut().handle_incoming(envelope)?;
        Ok(verdict)
    }

    fn run_step(&mut self, ctx: &mut SchedulerContext) -> Result<u32, HandlerError> {
        let kind = self.core.borrow().kind();
        match kind {
            QueueKind::Multicast => Ok(self.core.borrow_mut().run_multicast()),
            QueueKind::RoundRobin | QueueKind::HighAvail => {
                self.core.borrow_mut().validate(ctx);
                self.control.sleep_for(VALIDATE_DELAY);
                Ok(0)
            }
            _ => Ok(0),
        }
    }

    fn needs_run(&self) -> bool {
        match self.control.status() {
            TaskStatus::Busy => false,
            TaskStatus::Running => {
                let core = self.core.borrow();
                match core.kind() {
                    QueueKind::Multicast => !core.is_empty() && core.reader_count() > 0,
                    QueueKind::RoundRobin | QueueKind::HighAvail => !self.control.is_sleeping(),
                    _ => false,
                }
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::message::{Address, Event, Params};
    use crate::queue::config::QueueConfig;
    use crate::registry::LocalNodeRegistry;
    use crate::scheduler::{SchedulerConfig, SchedulerStatus};
    use std::sync::Arc;

    fn ctx() -> SchedulerContext {
        let local = Arc::new(LocalNodeRegistry::new());
        let mut ctx = SchedulerContext::new(SchedulerConfig::named("q"), local);
        ctx.set_status(SchedulerStatus::Running);
        ctx
    }

    fn manager(kind: QueueKind) -> ManagerTask {
        let core = Rc::new(RefCell::new(QueueCore::new(
            "Q",
            QueueConfig {
                kind,
                ..QueueConfig::default()
            },
        )));
        ManagerTask::new(core)
    }

    fn work(request_id: u32) -> Envelope {
        Envelope::new(
            Address::parse("client"),
            Address::parse("q#Q"),
            Event::message("job.run", Some(Params::new()), request_id),
        )
    }

    #[test]
    fn test_manager_named_after_queue() {
        let task = manager(QueueKind::RoundRobin);
        assert_eq!(task.control().name(), "Q");
    }

    #[test]
    fn test_incoming_message_is_parked() {
        let mut ctx = ctx();
        let mut task = manager(QueueKind::RoundRobin);
        let envelope = work(9);
        let mut response = ResponsePayload::new(StatusCode::OK, 9);

        let verdict = task.handle_message(&mut ctx, &envelope, &mut response);
        assert_eq!(verdict.unwrap(), StatusCode::FORWARDED);
        assert_eq!(task.core().borrow().waiting_count(), 1);
    }

    #[test]
    fn test_multicast_needs_run_only_with_readers() {
        let mut ctx = ctx();
        let mut task = manager(QueueKind::Multicast);
        task.control_mut().set_status(TaskStatus::Running);

        let mut response = ResponsePayload::new(StatusCode::OK, 0);
        task.handle_message(&mut ctx, &work(0), &mut response)
            .unwrap();
        assert!(!task.needs_run());

        task.core().borrow_mut().add_reader("r1", "w1").unwrap();
        assert!(task.needs_run());
    }

    #[test]
    fn test_durable_step_sleeps_between_validations() {
        let mut ctx = ctx();
        let mut task = manager(QueueKind::RoundRobin);
        task.control_mut().set_status(TaskStatus::Running);

        assert!(task.needs_run());
        task.run_step(&mut ctx).unwrap();
        assert!(!task.needs_run());
    }
}
