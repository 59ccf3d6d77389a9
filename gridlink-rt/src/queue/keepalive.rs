//! Keep-alive jobs.
//!
//! One task per node carries a list of keep-alive jobs. Each job
//! periodically re-announces a reader to a remote queue with
//! `squeue.mark_alive`; when the remote side stops answering the job can
//! re-issue `squeue.listen_at` to re-register the reader. A job retires
//! once its message or error budget is spent.

// Layer 1: Standard library imports
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use tracing::{debug, warn};

// Layer 3: Internal module imports
use crate::message::{Address, Envelope, Event, MessagePayload, Params, ResponsePayload, StatusCode};
use crate::module::HandlerError;
use crate::scheduler::SchedulerContext;
#[cfg(test)]
use crate::task::TaskStatus;
use crate::task::{Task, TaskControl};

/// Fallback pause between keep-alive scans when no job is due.
const DEFAULT_SCAN_DELAY: Duration = Duration::from_millis(50);

/// One keep-alive assignment.
#[derive(Debug, Clone)]
pub struct KeepAliveJob {
    /// Remote queue manager address.
    pub address: String,
    pub queue_name: String,
    /// Stop after this many mark_alive messages; 0 means unlimited.
    pub message_limit: u32,
    /// Pause between announcements.
    pub delay: Duration,
    /// Give up after this many errors; 0 disables error tracking.
    pub error_limit: u32,
    /// Extra back-off after an error.
    pub error_delay: Duration,
    /// Re-issue `listen_at` while in error state.
    pub retry_listen: bool,
    /// Reader target passed through to `listen_at`; empty means
    /// self-addressing.
    pub target_address: String,

    message_count: u32,
    error_count: u32,
    error_status: bool,
    last_request_id: u32,
    /// `None` forces an immediate first announcement.
    last_contact: Option<Instant>,
}

impl KeepAliveJob {
    pub fn new(address: impl Into<String>, queue_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            queue_name: queue_name.into(),
            message_limit: 1,
            delay: Duration::from_millis(500),
            error_limit: 0,
            error_delay: Duration::ZERO,
            retry_listen: false,
            target_address: String::new(),
            message_count: 0,
            error_count: 0,
            error_status: false,
            last_request_id: 0,
            last_contact: None,
        }
    }

    pub fn message_count(&self) -> u32 {
        self.message_count
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn is_error_status(&self) -> bool {
        self.error_status
    }

    pub fn last_request_id(&self) -> u32 {
        self.last_request_id
    }

    /// Time until the next announcement is due.
    pub fn time_left(&self) -> Duration {
        match self.last_contact {
            None => Duration::ZERO,
            Some(last) => {
                let due = last + self.delay;
                due.saturating_duration_since(Instant::now())
            }
        }
    }

    /// A job stays valid while both budgets hold.
    pub fn is_valid(&self) -> bool {
        if self.message_limit > 0 && self.message_count >= self.message_limit {
            return false;
        }
        if self.error_limit > 0 && self.error_count >= self.error_limit {
            return false;
        }
        true
    }

    /// Waiting for a response to the previous announcement.
    pub fn is_waiting(&self) -> bool {
        self.last_request_id != 0 && self.time_left() > Duration::ZERO
    }

    /// Whether announcements should carry a request id.
    pub fn needs_result(&self) -> bool {
        self.error_limit > 0 || self.retry_listen
    }

    /// A due job still holding a request id never got its answer: flag the
    /// error and release the id.
    pub fn check_timeout(&mut self) {
        if !self.error_status && self.last_request_id != 0 && self.time_left() == Duration::ZERO {
            self.error_status = true;
            self.last_request_id = 0;
        }
    }

    pub fn on_sent(&mut self) {
        self.message_count += 1;
        self.last_contact = Some(Instant::now());
        self.error_status = false;
    }

    pub fn on_success(&mut self) {
        self.last_contact = Some(Instant::now());
        self.error_status = false;
        self.last_request_id = 0;
    }

    pub fn on_error(&mut self) {
        self.error_count += 1;
        // defer the next attempt by the extra error back-off
        self.last_contact = Some(Instant::now() + self.error_delay);
        self.error_status = true;
    }

    fn set_last_request_id(&mut self, request_id: u32) {
        self.last_request_id = request_id;
    }

    fn clear_last_request_id(&mut self) {
        self.last_request_id = 0;
    }
}

/// Shared job list; the owning module adds jobs, the task works them.
pub type KeepAliveJobs = Rc<RefCell<Vec<KeepAliveJob>>>;

/// The per-node keep-alive worker.
pub struct KeepAliveTask {
    control: TaskControl,
    jobs: KeepAliveJobs,
}

impl KeepAliveTask {
    /// Well-known task name; one keep-alive task per node.
    pub const TASK_NAME: &'static str = "squeue_keepalive";

    pub fn new(jobs: KeepAliveJobs) -> Self {
        Self {
            control: TaskControl::new(Self::TASK_NAME),
            jobs,
        }
    }

    fn send_mark_alive(
        control: &TaskControl,
        ctx: &mut SchedulerContext,
        job: &mut KeepAliveJob,
    ) {
        let resolved = ctx.evaluate_address(&job.address);
        let protocol = Address::parse(&resolved).protocol().to_owned();
        let source = ctx.own_address(&protocol).to_string();
        let params = Params::new()
            .with("queue_name", job.queue_name.clone())
            .with("source_name", source);

        debug!(queue = %job.queue_name, address = %job.address, "sending mark_alive");
        let posted = if job.needs_result() {
            let request_id = ctx.next_request_id();
            job.set_last_request_id(request_id);
            let mut sender = ctx.own_address(&protocol);
            sender.set_task(control.name());
            let envelope = Envelope::new(
                sender,
                Address::parse(&job.address),
                Event::message("squeue.mark_alive", Some(params), request_id),
            );
            ctx.post_envelope(envelope, None)
        } else {
            ctx.post_message(&job.address, "squeue.mark_alive", Some(params), 0, None)
        };

        match posted {
            Ok(()) => job.on_sent(),
            Err(e) => {
                warn!(queue = %job.queue_name, error = %e, "mark_alive undeliverable");
                job.clear_last_request_id();
                job.on_error();
            }
        }
    }

    fn send_listen(ctx: &mut SchedulerContext, job: &KeepAliveJob) {
        let mut params = Params::new()
            .with("queue_name", job.queue_name.clone())
            .with("exec_at_addr", job.address.clone());
        if !job.target_address.is_empty() {
            params.push("target_addr", job.target_address.clone());
        }
        debug!(queue = %job.queue_name, "queue contact lost, re-issuing listen");
        let own = ctx.own_address("").to_string();
        if let Err(e) = ctx.post_message(&own, "squeue.listen_at", Some(params), 0, None) {
            warn!(queue = %job.queue_name, error = %e, "listen_at undeliverable");
        }
    }
}

impl Task for KeepAliveTask {
    fn control(&self) -> &TaskControl {
        &self.control
    }

    fn control_mut(&mut self) -> &mut TaskControl {
        &mut self.control
    }

    fn run_step(&mut self, ctx: &mut SchedulerContext) -> Result<u32, HandlerError> {
        let jobs = Rc::clone(&self.jobs);
        let mut jobs = jobs.borrow_mut();
        let mut processed = 0;

        for job in jobs.iter_mut() {
            if !job.is_valid() || job.is_waiting() || job.time_left() > Duration::ZERO {
                continue;
            }
            job.check_timeout();
            let reissue_listen = job.is_error_status() && job.retry_listen;
            if reissue_listen {
                job.clear_last_request_id();
                Self::send_listen(ctx, job);
            }
            Self::send_mark_alive(&self.control, ctx, job);
            processed += 1;
        }

        jobs.retain(KeepAliveJob::is_valid);

        let next_due = jobs.iter().map(KeepAliveJob::time_left).min();
        drop(jobs);
        let delay = next_due.unwrap_or(DEFAULT_SCAN_DELAY);
        if !delay.is_zero() {
            self.control.sleep_for(delay);
        }
        Ok(processed)
    }

    fn handle_response(
        &mut self,
        _ctx: &mut SchedulerContext,
        _message: &MessagePayload,
        response: &ResponsePayload,
    ) -> Result<StatusCode, HandlerError> {
        if response.request_id == 0 {
            return Ok(StatusCode::UNKNOWN_MSG);
        }
        let mut jobs = self.jobs.borrow_mut();
        let Some(job) = jobs
            .iter_mut()
            .find(|j| j.last_request_id() == response.request_id)
        else {
            return Ok(StatusCode::UNKNOWN_MSG);
        };
        if response.is_error() {
            job.on_error();
        } else {
            job.on_success();
        }
        Ok(StatusCode::OK)
    }
}
