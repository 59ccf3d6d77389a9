//! The `squeue` module: queue lifecycle commands.
//!
//! Managed commands: `init`, `listen`, `listen_at`, `close`, `clear`,
//! `get_status`, `list_readers`, `mark_alive`, `keep_alive`. Queue
//! creation and reader binding go through the task-required path: the
//! module answers `TASK_REQUIRED` and builds the manager/reader task when
//! the scheduler asks.

// Layer 1: Standard library imports
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tracing::info;

// Layer 3: Internal module imports
use super::config::QueueConfig;
use super::core::QueueCore;
use super::keepalive::{KeepAliveJob, KeepAliveJobs, KeepAliveTask};
use super::manager::ManagerTask;
use super::reader::ReaderTask;
use crate::message::{
    Address, Envelope, MessagePayload, ParamValue, Params, ResponsePayload, StatusCode,
};
use crate::module::{HandlerError, Module};
use crate::queue::config::QueueKind;
use crate::scheduler::SchedulerContext;
use crate::task::Task;

/// Module serving the `squeue` interface.
pub struct QueueModule {
    queues: HashMap<String, Rc<RefCell<QueueCore>>>,
    keepalive_jobs: KeepAliveJobs,
    keepalive_started: bool,
}

impl QueueModule {
    pub fn new() -> Self {
        Self {
            queues: HashMap::new(),
            keepalive_jobs: Rc::new(RefCell::new(Vec::new())),
            keepalive_started: false,
        }
    }

    fn queue_name(params: &Params) -> Option<String> {
        params
            .get_named_or_at("name", 0)
            .and_then(ParamValue::as_text)
            .filter(|name| !name.is_empty())
            .or_else(|| {
                params
                    .get_string("queue_name")
                    .filter(|name| !name.is_empty())
            })
    }

    fn unknown_queue(response: &mut ResponsePayload, name: &str) -> StatusCode {
        response.set_error_text(format!("Unknown queue: [{name}]"));
        StatusCode::WRONG_PARAMS
    }

    fn manager_address(ctx: &SchedulerContext, name: &str) -> String {
        let mut address = ctx.own_address("");
        address.set_task(name);
        address.to_string()
    }

    fn handle_init(
        &mut self,
        ctx: &mut SchedulerContext,
        message: &MessagePayload,
        response: &mut ResponsePayload,
    ) -> StatusCode {
        let Some(name) = Self::queue_name(&message.params) else {
            return StatusCode::WRONG_PARAMS;
        };
        response.set_result(Params::new().with("address", Self::manager_address(ctx, &name)));
        if self.queues.contains_key(&name) {
            StatusCode::OK
        } else {
            StatusCode::TASK_REQUIRED
        }
    }

    fn handle_listen(
        &mut self,
        message: &MessagePayload,
        response: &mut ResponsePayload,
    ) -> StatusCode {
        let params = &message.params;
        let Some(name) = params
            .get_string("queue_name")
            .or_else(|| params.string_at(0))
            .filter(|n| !n.is_empty())
        else {
            return StatusCode::WRONG_PARAMS;
        };
        let Some(queue) = self.queues.get(&name) else {
            return Self::unknown_queue(response, &name);
        };
        let Some(target) = params
            .get_string("target_name")
            .or_else(|| params.string_at(1))
            .filter(|t| !t.is_empty())
        else {
            return StatusCode::WRONG_PARAMS;
        };
        if queue.borrow().has_reader_target(&target) {
            StatusCode::OK
        } else {
            StatusCode::TASK_REQUIRED
        }
    }

    fn handle_listen_at(
        &mut self,
        ctx: &mut SchedulerContext,
        message: &MessagePayload,
    ) -> Result<StatusCode, HandlerError> {
        let params = &message.params;
        let (Some(exec_at), Some(queue_name)) = (
            params.get_string("exec_at_addr").filter(|a| !a.is_empty()),
            params.get_string("queue_name").filter(|n| !n.is_empty()),
        ) else {
            return Ok(StatusCode::WRONG_PARAMS);
        };

        // self-addressing: without an explicit target the reader forwards
        // back to this node
        let target = match params.get_string("target_addr").filter(|t| !t.is_empty()) {
            Some(target) => target,
            None => {
                let resolved = ctx.evaluate_address(&exec_at);
                let protocol = Address::parse(&resolved).protocol().to_owned();
                ctx.own_address(&protocol).to_string()
            }
        };

        let fwd = Params::new()
            .with("queue_name", queue_name)
            .with("target_name", target);
        ctx.post_message(&exec_at, "squeue.listen", Some(fwd), 0, None)?;
        Ok(StatusCode::OK)
    }

    fn handle_mark_alive(
        &mut self,
        ctx: &mut SchedulerContext,
        message: &MessagePayload,
        response: &mut ResponsePayload,
    ) -> Result<StatusCode, HandlerError> {
        let params = &message.params;
        let Some(queue_name) = params.get_string("queue_name").filter(|n| !n.is_empty()) else {
            return Ok(StatusCode::WRONG_PARAMS);
        };

        if let Some(exec_at) = params.get_string("exec_at_addr").filter(|a| !a.is_empty()) {
            let exec_addr = Address::parse(&exec_at);
            let source = ctx.own_address(exec_addr.protocol()).to_string();
            let fwd = Params::new()
                .with("queue_name", queue_name)
                .with("source_name", source);
            ctx.post_message(&exec_at, "squeue.mark_alive", Some(fwd), 0, None)?;
            return Ok(StatusCode::OK);
        }

        let Some(source) = params.get_string("source_name").filter(|s| !s.is_empty()) else {
            return Ok(StatusCode::WRONG_PARAMS);
        };
        match self.queues.get(&queue_name) {
            Some(queue) if queue.borrow_mut().mark_reader_alive(&source) => Ok(StatusCode::OK),
            Some(_) => {
                response.set_error_text(format!(
                    "No reader [{source}] at queue [{queue_name}]"
                ));
                Ok(StatusCode::WRONG_PARAMS)
            }
            None => Ok(Self::unknown_queue(response, &queue_name)),
        }
    }

    fn handle_get_status(
        &self,
        message: &MessagePayload,
        response: &mut ResponsePayload,
    ) -> StatusCode {
        let Some(name) = Self::queue_name(&message.params) else {
            return StatusCode::WRONG_PARAMS;
        };
        match self.queues.get(&name) {
            Some(queue) => {
                response.set_result(Params::new().with("text", queue.borrow().status_text()));
                StatusCode::OK
            }
            None => Self::unknown_queue(response, &name),
        }
    }

    fn handle_clear(
        &mut self,
        message: &MessagePayload,
        response: &mut ResponsePayload,
    ) -> StatusCode {
        let Some(name) = Self::queue_name(&message.params) else {
            return StatusCode::WRONG_PARAMS;
        };
        match self.queues.get(&name) {
            Some(queue) => {
                queue.borrow_mut().clear();
                StatusCode::OK
            }
            None => Self::unknown_queue(response, &name),
        }
    }

    fn handle_close(
        &mut self,
        ctx: &mut SchedulerContext,
        message: &MessagePayload,
        response: &mut ResponsePayload,
    ) -> StatusCode {
        let Some(name) = Self::queue_name(&message.params) else {
            return StatusCode::WRONG_PARAMS;
        };
        let Some(queue) = self.queues.remove(&name) else {
            return Self::unknown_queue(response, &name);
        };
        {
            let mut core = queue.borrow_mut();
            for reader in core.reader_task_names() {
                ctx.remove_task(reader);
            }
            core.clear();
        }
        // the manager task carries the queue name
        ctx.remove_task(&name);
        info!(queue = %name, "queue closed");
        StatusCode::OK
    }

    fn handle_list_readers(
        &self,
        message: &MessagePayload,
        response: &mut ResponsePayload,
    ) -> StatusCode {
        let Some(name) = Self::queue_name(&message.params) else {
            return StatusCode::WRONG_PARAMS;
        };
        match self.queues.get(&name) {
            Some(queue) => {
                info!(queue = %name, "readers listening:");
                let mut listing = Params::new();
                for target in queue.borrow().reader_targets() {
                    info!(queue = %name, reader = %target);
                    listing.push_unnamed(target);
                }
                response.set_result(listing);
                StatusCode::OK
            }
            None => Self::unknown_queue(response, &name),
        }
    }

    fn handle_keep_alive(&mut self, message: &MessagePayload) -> StatusCode {
        let params = &message.params;
        let has_required = params.get_string("address").is_some_and(|a| !a.is_empty())
            && params
                .get_string("queue_name")
                .is_some_and(|n| !n.is_empty());
        if !has_required {
            return StatusCode::WRONG_PARAMS;
        }
        if self.keepalive_started {
            self.keepalive_jobs
                .borrow_mut()
                .push(Self::job_from_params(params));
            StatusCode::OK
        } else {
            StatusCode::TASK_REQUIRED
        }
    }

    fn job_from_params(params: &Params) -> KeepAliveJob {
        let mut job = KeepAliveJob::new(
            params.string_or("address", ""),
            params.string_or("queue_name", ""),
        );
        job.message_limit = params.uint_or("msg_limit", 0) as u32;
        job.delay = Duration::from_millis(params.uint_or("delay", 30_000));
        job.error_limit = params.uint_or("error_limit", 3) as u32;
        job.error_delay = Duration::from_millis(params.uint_or("error_delay", 3_000));
        job.retry_listen = params.bool_or("retry_listen", true);
        job.target_address = params.string_or("target_address", "");
        job
    }

    fn prepare_manager(
        &mut self,
        ctx: &mut SchedulerContext,
        message: &MessagePayload,
    ) -> Result<Option<Box<dyn Task>>, HandlerError> {
        let Some(name) = Self::queue_name(&message.params) else {
            return Ok(None);
        };
        if self.queues.contains_key(&name) {
            return Ok(None);
        }
        let config = QueueConfig::from_params(&message.params)?;
        let forward_to = config.forward_to.clone();
        let kind = config.kind;
        let core = Rc::new(RefCell::new(QueueCore::new(name.clone(), config)));
        self.queues.insert(name.clone(), Rc::clone(&core));

        // forward queues come with their built-in reader
        if kind == QueueKind::Forward {
            let reader = ReaderTask::new(Rc::downgrade(&core), forward_to);
            ctx.spawn_task(Box::new(reader));
        }

        info!(queue = %name, ?kind, "queue created");
        Ok(Some(Box::new(ManagerTask::new(core))))
    }

    fn prepare_reader(
        &mut self,
        message: &MessagePayload,
    ) -> Result<Option<Box<dyn Task>>, HandlerError> {
        let params = &message.params;
        let name = params
            .get_string("queue_name")
            .or_else(|| params.string_at(0))
            .unwrap_or_default();
        let target = params
            .get_string("target_name")
            .or_else(|| params.string_at(1))
            .unwrap_or_default();
        let Some(queue) = self.queues.get(&name) else {
            return Ok(None);
        };
        if target.is_empty() {
            return Ok(None);
        }
        let reader = ReaderTask::new(Rc::downgrade(queue), target);
        Ok(Some(Box::new(reader)))
    }

    fn prepare_keepalive(
        &mut self,
        message: &MessagePayload,
    ) -> Result<Option<Box<dyn Task>>, HandlerError> {
        let job = Self::job_from_params(&message.params);
        self.keepalive_jobs.borrow_mut().push(job);
        if self.keepalive_started {
            return Ok(None);
        }
        self.keepalive_started = true;
        Ok(Some(Box::new(KeepAliveTask::new(Rc::clone(
            &self.keepalive_jobs,
        )))))
    }
}

impl Default for QueueModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for QueueModule {
    fn interfaces(&self) -> &[&'static str] {
        &["squeue"]
    }

    fn handle_message(
        &mut self,
        ctx: &mut SchedulerContext,
        envelope: &Envelope,
        response: &mut ResponsePayload,
    ) -> Result<StatusCode, HandlerError> {
        let Some(message) = envelope.event.as_message() else {
            return Ok(StatusCode::UNKNOWN_MSG);
        };
        if message.interface() != "squeue" {
            return Ok(StatusCode::UNKNOWN_MSG);
        }
        match message.core_command() {
            "init" => Ok(self.handle_init(ctx, message, response)),
            "listen" => Ok(self.handle_listen(message, response)),
            "listen_at" => self.handle_listen_at(ctx, message),
            "mark_alive" => self.handle_mark_alive(ctx, message, response),
            "get_status" => Ok(self.handle_get_status(message, response)),
            "clear" => Ok(self.handle_clear(message, response)),
            "close" => Ok(self.handle_close(ctx, message, response)),
            "list_readers" => Ok(self.handle_list_readers(message, response)),
            "keep_alive" => Ok(self.handle_keep_alive(message)),
            _ => Ok(StatusCode::UNKNOWN_MSG),
        }
    }

    fn prepare_task(
        &mut self,
        ctx: &mut SchedulerContext,
        message: &MessagePayload,
    ) -> Result<Option<Box<dyn Task>>, HandlerError> {
        if message.interface() != "squeue" {
            return Ok(None);
        }
        match message.core_command() {
            "init" => self.prepare_manager(ctx, message),
            "listen" => self.prepare_reader(message),
            "keep_alive" => self.prepare_keepalive(message),
            _ => Ok(None),
        }
    }
}
