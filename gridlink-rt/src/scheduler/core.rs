//! The scheduler: gates, modules, tasks and the tick loop.
//!
//! One tick drains the gates, dispatches every inbound envelope (messages
//! to tasks first, then modules; responses to their waiting entries),
//! synthesizes timeout responses and gives each runnable task one drive
//! step. Everything runs on the owning thread; handlers receive the
//! [`SchedulerContext`] and queue structural changes that are applied once
//! they return.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tracing::{debug, error, info, warn};

// Layer 3: Internal module imports
use super::config::SchedulerConfig;
use super::context::{SchedulerContext, SchedulerStatus, TaskAction};
use super::error::SchedulerError;
use crate::message::{
    Envelope, Event, MessagePayload, Params, RequestId, ResponsePayload, StatusCode,
};
use crate::module::{HandlerError, Module};
use crate::registry::{LocalNodeRegistry, RegisterOptions};
use crate::scheduler::request::HandlerRef;
use crate::task::{drive_task, Task, TaskStatus};

/// Counts reported by [`Scheduler::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub task_count: usize,
    pub module_count: usize,
    pub gate_count: usize,
    pub non_daemon_task_count: usize,
}

/// A single-threaded cooperative message router.
pub struct Scheduler {
    ctx: SchedulerContext,
    tasks: Vec<Box<dyn Task>>,
    modules: Vec<Box<dyn Module>>,
}

impl Scheduler {
    /// Build a scheduler with the default in-process gates. Call
    /// [`Scheduler::init`] before ticking it.
    pub fn new(config: SchedulerConfig, local: Arc<LocalNodeRegistry>) -> Self {
        Self {
            ctx: SchedulerContext::new(config, local),
            tasks: Vec::new(),
            modules: Vec::new(),
        }
    }

    /// Register self-addresses and enter the Running state.
    pub fn init(&mut self) -> Result<(), SchedulerError> {
        let own = self.ctx.own_address("").to_string();
        self.ctx
            .register_node_as("@this", &own, RegisterOptions::default())?;
        let registration_id = self.ctx.registration_id().to_owned();
        self.ctx
            .register_node_as(&registration_id, &own, RegisterOptions::default())?;
        self.ctx.set_status(SchedulerStatus::Running);
        Ok(())
    }

    // --- properties ---

    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    pub fn status(&self) -> SchedulerStatus {
        self.ctx.status()
    }

    pub fn context(&self) -> &SchedulerContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SchedulerContext {
        &mut self.ctx
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            task_count: self.tasks.len(),
            module_count: self.modules.len(),
            gate_count: self.ctx.gate_count(),
            non_daemon_task_count: self.tasks.iter().filter(|t| !t.is_daemon()).count(),
        }
    }

    // --- architecture ---

    pub fn add_module(&mut self, module: Box<dyn Module>) -> Result<(), SchedulerError> {
        self.guard_live("add_module")?;
        self.modules.push(module);
        Ok(())
    }

    /// Add a task, assigning a fresh `A<n>` name when the task has none or
    /// its name is taken. Returns the effective name.
    pub fn add_task(&mut self, task: Box<dyn Task>) -> Result<String, SchedulerError> {
        self.guard_live("add_task")?;
        self.add_task_internal(task)
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.find_task(name).is_some()
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks
            .iter()
            .map(|t| t.control().name().to_owned())
            .collect()
    }

    /// First task volunteering for a command, by name.
    pub fn find_task_for_message(&self, command: &str, params: &Params) -> Option<String> {
        self.tasks
            .iter()
            .find(|t| t.accepts_message(command, params))
            .map(|t| t.control().name().to_owned())
    }

    // --- posting (delegated to the context) ---

    pub fn post_message(
        &mut self,
        address: &str,
        command: &str,
        params: Option<Params>,
        request_id: RequestId,
        handler: Option<HandlerRef>,
    ) -> Result<(), SchedulerError> {
        self.ctx
            .post_message(address, command, params, request_id, handler)
    }

    pub fn post_envelope(
        &mut self,
        envelope: Envelope,
        handler: Option<HandlerRef>,
    ) -> Result<(), SchedulerError> {
        self.ctx.post_envelope(envelope, handler)
    }

    pub fn cancel_request(&mut self, request_id: RequestId) -> bool {
        self.ctx.cancel_request(request_id)
    }

    pub fn register_node_as(
        &mut self,
        source: &str,
        target: &str,
        options: RegisterOptions,
    ) -> Result<String, SchedulerError> {
        self.ctx.register_node_as(source, target, options)
    }

    pub fn register_command_map(
        &mut self,
        pattern: &str,
        target: &str,
        priority: i32,
    ) -> Result<(), SchedulerError> {
        self.ctx.register_command_map(pattern, target, priority)
    }

    pub fn evaluate_address(&self, virtual_addr: &str) -> String {
        self.ctx.evaluate_address(virtual_addr)
    }

    // --- execution ---

    /// One tick: cleanup, gates, messages, timeouts, tasks, close check.
    pub fn tick(&mut self) {
        if matches!(
            self.ctx.status(),
            SchedulerStatus::Running | SchedulerStatus::Stopping
        ) {
            self.ctx.check_cleanup();
            self.ctx.run_gates();
            self.run_messages();
            self.ctx.check_timeouts();
            self.run_tasks();
        }
        self.check_close();
    }

    /// Whether another tick would find work.
    pub fn needs_run(&self) -> bool {
        !self.ctx.gates_empty() || self.tasks.iter().any(|t| t.needs_run())
    }

    /// Drain input gates and dispatch synchronously until empty.
    pub fn flush_events(&mut self) {
        self.run_messages();
    }

    /// Ask every task to stop; the scheduler reaches Stopped once the task
    /// list drains.
    pub fn request_stop(&mut self) {
        match self.ctx.status() {
            SchedulerStatus::Running | SchedulerStatus::Created => {
                self.ctx.set_status(SchedulerStatus::Stopping);
                for task in &mut self.tasks {
                    task.control_mut().request_stop();
                }
                if self.tasks.is_empty() {
                    self.ctx.set_status(SchedulerStatus::Stopped);
                }
            }
            _ => {}
        }
    }

    // --- internals ---

    fn guard_live(&self, operation: &str) -> Result<(), SchedulerError> {
        if self.ctx.status() == SchedulerStatus::Stopped {
            return Err(SchedulerError::InvalidState {
                status: self.ctx.status().to_string(),
                operation: operation.to_owned(),
            });
        }
        Ok(())
    }

    fn add_task_internal(&mut self, mut task: Box<dyn Task>) -> Result<String, SchedulerError> {
        let mut name = task.control().name().to_owned();
        if name.is_empty() || self.find_task(&name).is_some() {
            loop {
                let candidate = format!("A{}", self.ctx.next_task_id());
                if self.find_task(&candidate).is_none() {
                    name = candidate;
                    break;
                }
            }
            task.control_mut().set_name(name.clone());
        }
        if task.control().status() == TaskStatus::Created {
            task.control_mut().set_status(TaskStatus::Starting);
        }
        debug!(node = self.ctx.name(), task = %name, "task added");
        self.tasks.push(task);
        Ok(name)
    }

    fn find_task(&self, name: &str) -> Option<usize> {
        self.tasks
            .iter()
            .position(|t| t.control().name() == name)
    }

    fn check_close(&mut self) {
        if self.ctx.status() == SchedulerStatus::Stopping && self.tasks.is_empty() {
            self.ctx.set_status(SchedulerStatus::Stopped);
        }
    }

    fn run_messages(&mut self) {
        for gate in 0..self.ctx.input_gate_count() {
            while let Some(envelope) = self.ctx.take_input(gate) {
                self.ctx.log_envelope("arrived", &envelope);
                if envelope.is_response() {
                    self.handle_response(envelope);
                } else {
                    self.dispatch_message(envelope);
                }
            }
        }
    }

    fn run_tasks(&mut self) {
        // tasks can appear and disappear while running, so iterate a
        // snapshot of names
        let names = self.task_names();
        for name in names {
            let Some(index) = self.find_task(&name) else {
                continue;
            };
            if !self.tasks[index].needs_run() {
                continue;
            }
            let mut task = self.tasks.swap_remove(index);
            drive_task(task.as_mut(), &mut self.ctx);
            if task.control().status() == TaskStatus::Destroying {
                debug!(node = self.ctx.name(), task = %name, "task destroyed");
            } else {
                self.tasks.push(task);
            }
            self.apply_pending();
        }
    }

    fn apply_pending(&mut self) {
        loop {
            let actions = self.ctx.take_pending();
            if actions.is_empty() {
                break;
            }
            for action in actions {
                match action {
                    TaskAction::Spawn(task) => {
                        if let Err(e) = self.add_task_internal(task) {
                            warn!(error = %e, "spawned task rejected");
                        }
                    }
                    TaskAction::Remove(name) => {
                        if let Some(index) = self.find_task(&name) {
                            self.tasks.swap_remove(index);
                            debug!(task = %name, "task removed");
                        }
                    }
                    TaskAction::Stop(name) => {
                        if let Some(index) = self.find_task(&name) {
                            self.tasks[index].control_mut().request_stop();
                        }
                    }
                }
            }
        }
    }

    // --- message dispatch ---

    fn dispatch_message(&mut self, envelope: Envelope) {
        let outcome = self.dispatch_inner(&envelope);
        self.apply_pending();
        match outcome {
            Ok((status, _))
                if status == StatusCode::OK
                    || status == StatusCode::PASS
                    || status == StatusCode::FORWARDED => {}
            Ok((status, response)) => self.handle_dispatch_error(status, &envelope, response),
            Err(e) => {
                error!(node = self.ctx.name(), error = %e, "message dispatch failed");
                if envelope.request_id() != 0 && !envelope.is_response() {
                    let response = envelope.error_response(
                        format!("msg dispatch error - [{e}]"),
                        StatusCode::EXCEPTION,
                    );
                    if let Err(post_err) = self.ctx.post_envelope(response, None) {
                        warn!(error = %post_err, "error response undeliverable");
                    }
                }
            }
        }
    }

    fn dispatch_inner(
        &mut self,
        envelope: &Envelope,
    ) -> Result<(StatusCode, Option<ResponsePayload>), HandlerError> {
        let (status, response) = self.dispatch_for_tasks(envelope)?;
        if status == StatusCode::PASS || status == StatusCode::UNKNOWN_MSG {
            return self.dispatch_for_modules(envelope);
        }
        Ok((status, response))
    }

    fn dispatch_for_tasks(
        &mut self,
        envelope: &Envelope,
    ) -> Result<(StatusCode, Option<ResponsePayload>), HandlerError> {
        let mut task_name = envelope.receiver.task().to_owned();
        if task_name.is_empty() {
            return Ok((StatusCode::UNKNOWN_MSG, None));
        }

        if self.find_task(&task_name).is_none() {
            // the task component may be a registered alias for a local task
            let resolved = self.ctx.evaluate_address(&envelope.receiver.to_string());
            let resolved = crate::message::Address::parse(&resolved);
            if self.ctx.is_own_address_skip_task(&resolved) && !resolved.task().is_empty() {
                task_name = resolved.task().to_owned();
            }
        }

        let Some(index) = self.find_task(&task_name) else {
            return Ok((StatusCode::UNKNOWN_TASK, None));
        };

        let mut response = match envelope.event.as_message() {
            Some(message) => ResponsePayload::init_for(message),
            None => ResponsePayload::new(StatusCode::OK, envelope.request_id()),
        };
        let mut task = self.tasks.swap_remove(index);
        let result = task.handle_message(&mut self.ctx, envelope, &mut response);
        self.tasks.push(task);
        self.apply_pending();

        let status = result?;
        response.status = status;
        if status == StatusCode::OK {
            self.check_post_response(envelope, &response);
            Ok((status, None))
        } else {
            Ok((status, Some(response)))
        }
    }

    fn dispatch_for_modules(
        &mut self,
        envelope: &Envelope,
    ) -> Result<(StatusCode, Option<ResponsePayload>), HandlerError> {
        let Some(message) = envelope.event.as_message().cloned() else {
            return Ok((StatusCode::UNKNOWN_MSG, None));
        };

        let mut modules = std::mem::take(&mut self.modules);
        let interface = message.interface().to_owned();

        let mut outcome = Ok((StatusCode::UNKNOWN_MSG, None));
        if !interface.is_empty() {
            outcome = self.scan_modules(&mut modules, envelope, &message, Some(&interface));
        }
        if matches!(
            outcome,
            Ok((StatusCode::PASS, _)) | Ok((StatusCode::UNKNOWN_MSG, _))
        ) {
            outcome = self.scan_modules(&mut modules, envelope, &message, None);
        }
        self.modules = modules;
        outcome
    }

    /// Scan modules in registration order; the first verdict that is not
    /// PASS/UNKNOWN_MSG wins. `TASK_REQUIRED` asks the module to build the
    /// task and counts as OK when it does.
    fn scan_modules(
        &mut self,
        modules: &mut [Box<dyn Module>],
        envelope: &Envelope,
        message: &MessagePayload,
        interface: Option<&str>,
    ) -> Result<(StatusCode, Option<ResponsePayload>), HandlerError> {
        for module in modules.iter_mut() {
            if let Some(interface) = interface {
                if !module.supports_interface(interface) {
                    continue;
                }
            }
            let mut response = ResponsePayload::init_for(message);
            let mut status = module.handle_message(&mut self.ctx, envelope, &mut response)?;

            if status == StatusCode::TASK_REQUIRED {
                if let Some(task) = module.prepare_task(&mut self.ctx, message)? {
                    self.add_task_internal(task)
                        .map_err(Box::<dyn std::error::Error + Send + Sync>::from)?;
                    self.apply_pending();
                    status = StatusCode::OK;
                }
            }
            response.status = status;

            if status == StatusCode::PASS || status == StatusCode::UNKNOWN_MSG {
                continue;
            }
            if status == StatusCode::OK {
                self.check_post_response(envelope, &response);
                return Ok((status, None));
            }
            return Ok((status, Some(response)));
        }
        Ok((StatusCode::UNKNOWN_MSG, None))
    }

    /// Post a handler's response back to the sender, if one was requested.
    fn check_post_response(&mut self, envelope: &Envelope, response: &ResponsePayload) {
        let Some(message) = envelope.event.as_message() else {
            return;
        };
        if message.request_id == 0 {
            return;
        }
        let mut payload = response.clone();
        payload.request_id = message.request_id;
        let reply = Envelope::new(
            envelope.receiver.clone(),
            envelope.sender.clone(),
            Event::Response(payload),
        );
        if let Err(e) = self.ctx.post_envelope(reply, None) {
            warn!(node = self.ctx.name(), error = %e, "response undeliverable");
        }
    }

    fn handle_dispatch_error(
        &mut self,
        status: StatusCode,
        envelope: &Envelope,
        response: Option<ResponsePayload>,
    ) {
        if envelope.is_response() {
            warn!(
                node = self.ctx.name(),
                receiver = %envelope.receiver,
                "unknown receiver for response"
            );
            return;
        }
        let command = envelope
            .event
            .as_message()
            .map(|m| m.command.clone())
            .unwrap_or_default();
        if envelope.request_id() == 0 {
            debug!(node = self.ctx.name(), command = %command, %status, "unanswerable dispatch failure");
            return;
        }

        // prefer the handler's own error payload over a synthesized one
        let reply = match response {
            Some(mut payload) if payload.error.is_some() => {
                payload.status = status;
                payload.request_id = envelope.request_id();
                Envelope::new(
                    envelope.receiver.clone(),
                    envelope.sender.clone(),
                    Event::Response(payload),
                )
            }
            _ => envelope.error_response(
                format!("Dispatch error for: {command}, status: {}", status.code()),
                status,
            ),
        };
        if let Err(e) = self.ctx.post_envelope(reply, None) {
            warn!(node = self.ctx.name(), error = %e, "dispatch error response undeliverable");
        }
    }

    fn handle_response(&mut self, envelope: Envelope) {
        let request_id = envelope.request_id();
        let item = if request_id != 0 {
            self.ctx.take_waiting(request_id)
        } else {
            None
        };
        let Some(item) = item else {
            warn!(
                node = self.ctx.name(),
                request_id, "response with no matching request dropped"
            );
            return;
        };

        if self.ctx.log_proc_time_enabled() {
            info!(
                node = self.ctx.name(),
                request_id,
                elapsed_ms = item.started().elapsed().as_millis() as u64,
                "request handled"
            );
        }

        let Some(response) = envelope.event.as_response().cloned() else {
            return;
        };
        let original = item
            .envelope
            .event
            .as_message()
            .cloned()
            .unwrap_or_else(|| MessagePayload::new("", None, request_id));

        // a response addressed at one of our tasks goes to that task;
        // otherwise the stored handler is invoked
        let task_name = envelope.receiver.task().to_owned();
        if !task_name.is_empty() {
            if let Some(index) = self.find_task(&task_name) {
                let mut task = self.tasks.swap_remove(index);
                let result = task.handle_response(&mut self.ctx, &original, &response);
                self.tasks.push(task);
                self.apply_pending();
                if let Err(e) = result {
                    error!(node = self.ctx.name(), task = %task_name, error = %e,
                        "response handling failed");
                }
                return;
            }
        }

        if let Some(handler) = item.handler.clone() {
            if response.is_error() {
                handler.on_error(&mut self.ctx, &original, &response);
            } else {
                handler.on_result(&mut self.ctx, &original, &response);
            }
        } else {
            debug!(
                node = self.ctx.name(),
                request_id, "response resolved without handler"
            );
        }
        self.apply_pending();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::module::CoreModule;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::scheduler::request::RequestHandler;

    struct Collect {
        seen: Rc<RefCell<Vec<ResponsePayload>>>,
    }

    impl RequestHandler for Collect {
        fn on_result(
            &self,
            _ctx: &mut SchedulerContext,
            _message: &MessagePayload,
            response: &ResponsePayload,
        ) {
            self.seen.borrow_mut().push(response.clone());
        }

        fn on_error(
            &self,
            _ctx: &mut SchedulerContext,
            _message: &MessagePayload,
            response: &ResponsePayload,
        ) {
            self.seen.borrow_mut().push(response.clone());
        }
    }

    fn scheduler(name: &str) -> Scheduler {
        let local = Arc::new(LocalNodeRegistry::new());
        let mut s = Scheduler::new(SchedulerConfig::named(name), local);
        s.add_module(Box::new(CoreModule::new())).unwrap();
        s.init().unwrap();
        s
    }

    #[test]
    fn test_echo_roundtrip() {
        let mut s = scheduler("alpha");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let handler: HandlerRef = Rc::new(Collect {
            seen: Rc::clone(&seen),
        });

        s.post_message("@this", "core.echo", None, 1, Some(handler))
            .unwrap();
        for _ in 0..4 {
            s.tick();
        }

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].status, StatusCode::OK);
        assert_eq!(seen[0].request_id, 1);
        assert!(seen[0].result.is_none());
    }

    #[test]
    fn test_unknown_command_yields_error_response() {
        let mut s = scheduler("alpha");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let handler: HandlerRef = Rc::new(Collect {
            seen: Rc::clone(&seen),
        });

        s.post_message("alpha", "nosuch.cmd", None, 2, Some(handler))
            .unwrap();
        for _ in 0..4 {
            s.tick();
        }

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_error());
    }

    #[test]
    fn test_request_stop_without_tasks_stops() {
        let mut s = scheduler("alpha");
        assert_eq!(s.status(), SchedulerStatus::Running);
        s.request_stop();
        assert_eq!(s.status(), SchedulerStatus::Stopped);
        assert!(s.add_module(Box::new(CoreModule::new())).is_err());
    }

    #[test]
    fn test_stats_counts() {
        let s = scheduler("alpha");
        let stats = s.stats();
        assert_eq!(stats.module_count, 1);
        assert_eq!(stats.task_count, 0);
        assert_eq!(stats.gate_count, 2);
    }
}
