//! The `Task` trait and its control block.
//!
//! A task is a cooperatively scheduled state machine owned by exactly one
//! scheduler. Tasks never hold a reference back to their scheduler; every
//! step receives the scheduler context as an argument, and cross-task links
//! go through names or shared queue state.

// Layer 1: Standard library imports
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use tracing::error;

// Layer 3: Internal module imports
use super::state::TaskStatus;
use crate::message::{Envelope, MessagePayload, Params, ResponsePayload, StatusCode};
use crate::module::HandlerError;
use crate::scheduler::SchedulerContext;

/// Default per-step timeslice before priority scaling.
pub const DEFAULT_STEP_TIMESLICE: Duration = Duration::from_millis(20);

/// Name, status, priority and timing bookkeeping common to every task.
#[derive(Debug, Clone)]
pub struct TaskControl {
    name: String,
    status: TaskStatus,
    /// Timeslice scale; 0 disables slicing (single step per tick).
    priority: u32,
    step_timeslice: Duration,
    slice_start: Instant,
    sleep_until: Option<Instant>,
    daemon: bool,
}

impl TaskControl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TaskStatus::Created,
            priority: 0,
            step_timeslice: DEFAULT_STEP_TIMESLICE,
            slice_start: Instant::now(),
            sleep_until: None,
            daemon: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: u32) {
        self.priority = priority;
    }

    pub fn daemon(&self) -> bool {
        self.daemon
    }

    pub fn set_daemon(&mut self, daemon: bool) {
        self.daemon = daemon;
    }

    /// Move toward Stopping from any live state.
    pub fn request_stop(&mut self) {
        match self.status {
            TaskStatus::Created
            | TaskStatus::Starting
            | TaskStatus::Running
            | TaskStatus::Busy => self.status = TaskStatus::Stopping,
            _ => {}
        }
    }

    /// Suspend stepping until the deadline passes.
    pub fn sleep_for(&mut self, period: Duration) {
        self.sleep_until = Some(Instant::now() + period);
    }

    pub fn stop_sleep(&mut self) {
        self.sleep_until = None;
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleep_until.is_some_and(|until| Instant::now() < until)
    }

    pub fn start_timeslice(&mut self) {
        self.slice_start = Instant::now();
    }

    /// Timeslice budget is `step_timeslice * 10 / priority`, at least 1 ms.
    pub fn is_end_of_timeslice(&self) -> bool {
        if self.priority == 0 || self.step_timeslice.is_zero() {
            return false;
        }
        let mut budget = self.step_timeslice * 10 / self.priority;
        if budget < Duration::from_millis(1) {
            budget = Duration::from_millis(1);
        }
        self.slice_start.elapsed() >= budget
    }
}

/// A stateful cooperative worker.
///
/// Implementations override the hooks they need; the defaults give a task
/// that starts, idles and stops cleanly. Step functions return how much
/// work they performed; a positive return requests another slice within the
/// same tick, subject to the timeslice budget.
pub trait Task {
    fn control(&self) -> &TaskControl;
    fn control_mut(&mut self) -> &mut TaskControl;

    /// Handle a message addressed to this task.
    fn handle_message(
        &mut self,
        _ctx: &mut SchedulerContext,
        _envelope: &Envelope,
        _response: &mut ResponsePayload,
    ) -> Result<StatusCode, HandlerError> {
        Ok(StatusCode::UNKNOWN_MSG)
    }

    /// Handle the response to a request this task posted. `message` is the
    /// original outbound message.
    fn handle_response(
        &mut self,
        _ctx: &mut SchedulerContext,
        _message: &MessagePayload,
        _response: &ResponsePayload,
    ) -> Result<StatusCode, HandlerError> {
        Ok(StatusCode::UNKNOWN_MSG)
    }

    /// Whether this task volunteers for an unaddressed command.
    fn accepts_message(&self, _command: &str, _params: &Params) -> bool {
        false
    }

    /// First step after creation; the default moves straight to Running.
    fn run_starting(&mut self, _ctx: &mut SchedulerContext) -> Result<u32, HandlerError> {
        self.control_mut().set_status(TaskStatus::Running);
        Ok(0)
    }

    /// One unit of work while Running.
    fn run_step(&mut self, _ctx: &mut SchedulerContext) -> Result<u32, HandlerError> {
        Ok(0)
    }

    /// Teardown step; the default moves to Stopped immediately.
    fn run_stopping(&mut self, _ctx: &mut SchedulerContext) -> Result<u32, HandlerError> {
        self.control_mut().set_status(TaskStatus::Stopped);
        Ok(0)
    }

    /// Daemon tasks keep the scheduler alive while they run.
    fn is_daemon(&self) -> bool {
        self.control().daemon()
    }

    fn needs_run(&self) -> bool {
        match self.control().status() {
            TaskStatus::Running => !self.control().is_sleeping(),
            TaskStatus::Busy => false,
            _ => true,
        }
    }
}

/// This task's own address: the scheduler address with the task name set.
pub fn task_own_address(ctx: &SchedulerContext, task: &dyn Task, protocol: &str) -> crate::message::Address {
    let mut address = ctx.own_address(protocol);
    address.set_task(task.control().name());
    address
}

/// Drive one scheduler tick's worth of a task's state machine.
///
/// While a step runs, the status is parked at Busy and restored afterwards
/// unless the step moved the task elsewhere. A failing Starting/Running
/// step requests a stop; a failing Stopping step is logged only. Reaching
/// Stopped converts to Destroying, which tells the owner to drop the task.
pub fn drive_task(task: &mut dyn Task, ctx: &mut SchedulerContext) -> u32 {
    let mut work = 0;
    match task.control().status() {
        TaskStatus::Starting => {
            task.control_mut().set_status(TaskStatus::Busy);
            let result = task.run_starting(ctx);
            if task.control().status() == TaskStatus::Busy {
                task.control_mut().set_status(TaskStatus::Starting);
            }
            match result {
                Ok(n) => work = n,
                Err(e) => {
                    error!(task = task.control().name(), error = %e, "task start failed");
                    task.control_mut().request_stop();
                }
            }
        }
        TaskStatus::Running => {
            task.control_mut().set_status(TaskStatus::Busy);
            let result = run_by_timeslice(task, ctx);
            if task.control().status() == TaskStatus::Busy {
                task.control_mut().set_status(TaskStatus::Running);
            }
            match result {
                Ok(n) => work = n,
                Err(e) => {
                    error!(task = task.control().name(), error = %e, "task step failed");
                    task.control_mut().request_stop();
                }
            }
        }
        TaskStatus::Stopping => {
            if let Err(e) = task.run_stopping(ctx) {
                error!(task = task.control().name(), error = %e, "error during task stop");
            }
        }
        _ => {}
    }

    if task.control().status() == TaskStatus::Stopped {
        task.control_mut().set_status(TaskStatus::Destroying);
    }
    work
}

fn run_by_timeslice(task: &mut dyn Task, ctx: &mut SchedulerContext) -> Result<u32, HandlerError> {
    let priority = task.control().priority();
    if priority > 0 {
        task.control_mut().start_timeslice();
    }
    let mut total = 0;
    loop {
        let step = task.run_step(ctx)?;
        total += step;
        if step == 0 || priority == 0 || task.control().is_end_of_timeslice() {
            break;
        }
    }
    Ok(total)
}
