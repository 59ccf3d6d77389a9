//! Scheduler context: the shared state handed to every handler.
//!
//! The context owns everything a module, task or response handler may need
//! while the scheduler has it on the stack: gates, the node registry, the
//! command map, the waiting-request table and the id counters. Tasks and
//! modules themselves live outside the context (in the scheduler proper),
//! which is what lets a running handler borrow the context mutably without
//! aliasing the collection it was taken from. Structural changes to the
//! task set are queued as [`TaskAction`]s and applied by the scheduler
//! after the handler returns.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use tracing::{debug, info, warn};

// Layer 3: Internal module imports
use super::config::SchedulerConfig;
use super::error::SchedulerError;
use super::request::{HandlerRef, RequestItem};
use super::resolve::ResolveHandler;
use crate::gate::{Gate, InprocInGate, InprocOutGate};
use crate::message::{
    Address, AddressFormat, Envelope, Event, Params, StatusCode, THIS_ROLE,
};
use crate::registry::{
    CommandMap, EntryKey, LocalNodeRegistry, NodeRegistry, RegisterOptions, ResolveOutcome,
};
use crate::task::Task;
use crate::util::gen_registration_id;

/// Lifecycle of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStatus {
    Created,
    Running,
    Stopping,
    Stopped,
}

impl Display for SchedulerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerStatus::Created => "created",
            SchedulerStatus::Running => "running",
            SchedulerStatus::Stopping => "stopping",
            SchedulerStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Structural task change requested from inside a handler.
pub enum TaskAction {
    /// Add a task to the scheduler.
    Spawn(Box<dyn Task>),
    /// Drop a task without running its stop sequence.
    Remove(String),
    /// Ask a task to stop cooperatively.
    Stop(String),
}

/// Shared scheduler state; see module docs.
pub struct SchedulerContext {
    name: String,
    registration_id: String,
    status: SchedulerStatus,
    directory_addr: Option<String>,
    dispatcher: Option<String>,
    log_messages: bool,
    log_proc_time: bool,
    cleanup_period: Duration,
    last_cleanup: Option<Instant>,
    input_gates: Vec<Box<dyn Gate>>,
    output_gates: Vec<Box<dyn Gate>>,
    registry: NodeRegistry,
    command_map: CommandMap,
    waiting: HashMap<u32, RequestItem>,
    pending: Vec<TaskAction>,
    local: Arc<LocalNodeRegistry>,
    next_request_id: u32,
    next_task_id: u32,
}

impl SchedulerContext {
    /// Build the context with the default in-process gate pair, registering
    /// this node's inbox in the shared local registry.
    pub fn new(config: SchedulerConfig, local: Arc<LocalNodeRegistry>) -> Self {
        let inbox = local.register(config.name.clone());
        let input: Box<dyn Gate> = Box::new(InprocInGate::new(config.name.clone(), inbox));
        let output: Box<dyn Gate> = Box::new(InprocOutGate::new(config.name.clone(), Arc::clone(&local)));
        Self {
            registration_id: config.effective_registration_id(),
            name: config.name,
            status: SchedulerStatus::Created,
            directory_addr: config.directory_addr,
            dispatcher: config.dispatcher,
            log_messages: config.log_messages,
            log_proc_time: config.log_proc_time,
            cleanup_period: config.cleanup_period,
            last_cleanup: None,
            input_gates: vec![input],
            output_gates: vec![output],
            registry: NodeRegistry::new(),
            command_map: CommandMap::new(),
            waiting: HashMap::new(),
            pending: Vec::new(),
            local,
            next_request_id: 1,
            next_task_id: 1,
        }
    }

    // --- properties ---

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registration_id(&self) -> &str {
        &self.registration_id
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: SchedulerStatus) {
        self.status = status;
    }

    pub fn directory_addr(&self) -> Option<&str> {
        self.directory_addr.as_deref()
    }

    pub fn set_directory_addr(&mut self, address: impl Into<String>) {
        self.directory_addr = Some(address.into());
    }

    pub fn set_dispatcher(&mut self, address: impl Into<String>) {
        self.dispatcher = Some(address.into());
    }

    pub fn log_messages_enabled(&self) -> bool {
        self.log_messages
    }

    pub fn log_proc_time_enabled(&self) -> bool {
        self.log_proc_time
    }

    pub fn local_registry(&self) -> &Arc<LocalNodeRegistry> {
        &self.local
    }

    // --- ids ---

    /// Next request id; wraps at `u32::MAX` and never hands out an id that
    /// is still waiting for its response.
    pub fn next_request_id(&mut self) -> u32 {
        loop {
            let id = self.next_request_id;
            self.next_request_id = if id == u32::MAX { 1 } else { id + 1 };
            if !self.waiting.contains_key(&id) {
                return id;
            }
        }
    }

    pub(crate) fn next_task_id(&mut self) -> u32 {
        let id = self.next_task_id;
        self.next_task_id += 1;
        id
    }

    // --- addressing ---

    /// The address under which this scheduler is reachable for a protocol.
    pub fn own_address(&self, protocol: &str) -> Address {
        for gate in &self.input_gates {
            if gate.supports_protocol(protocol) {
                if let Some(address) = gate.own_address(protocol) {
                    return address;
                }
            }
        }
        Address::virtual_path(self.name.clone())
    }

    pub fn is_own_address(&self, address: &Address) -> bool {
        if address.format() == AddressFormat::Role && address.role_name() == THIS_ROLE {
            return true;
        }
        if address.host().is_empty() && address.node_name() == self.name {
            return true;
        }
        self.own_address(address.protocol()).to_string() == address.to_string()
    }

    /// Own-address check ignoring the task component.
    pub fn is_own_address_skip_task(&self, address: &Address) -> bool {
        if address.format() == AddressFormat::Role && address.role_name() == THIS_ROLE {
            return true;
        }
        if address.host().is_empty() && address.node_name() == self.name {
            return true;
        }
        let own = self.own_address(address.protocol()).without_task();
        own.to_string() == address.without_task().to_string()
    }

    /// Resolve an address string to its concrete candidates. Indirect
    /// addresses (`ownnode#@role`) resolve the role against the local
    /// registry.
    pub fn addr_list(&self, address: &str) -> ResolveOutcome {
        if address.is_empty() {
            return ResolveOutcome::default();
        }
        let parsed = Address::parse(address);
        if parsed.is_indirect() && self.is_own_address_skip_task(&parsed) {
            self.registry.resolve(&Address::parse(parsed.task()))
        } else {
            self.registry.resolve(&parsed)
        }
    }

    /// Resolve to the first concrete address, or return the input
    /// unchanged.
    pub fn evaluate_address(&self, virtual_addr: &str) -> String {
        let outcome = self.addr_list(virtual_addr);
        if outcome.unknown_alias || outcome.targets.is_empty() {
            virtual_addr.to_owned()
        } else {
            outcome.targets[0].clone()
        }
    }

    // --- registry ---

    /// Register a symbolic source for a target address. An empty source
    /// synthesizes a fresh role id, registers it and (when a directory is
    /// configured) pushes the new role to the directory via
    /// `core.reg_node`; the generated name is returned.
    pub fn register_node_as(
        &mut self,
        source: &str,
        target: &str,
        options: RegisterOptions,
    ) -> Result<String, SchedulerError> {
        if source.is_empty() {
            let new_name = gen_registration_id();
            self.registry
                .register(EntryKey::Role(new_name.clone()), target, options);
            if let Some(dir) = self.directory_addr.clone() {
                let dir_addr = Address::parse(&dir);
                let mut dir_target = self.own_address(dir_addr.protocol());
                dir_target.set_task(format!("@{new_name}"));
                let mut params = Params::new()
                    .with("source", format!("@{new_name}"))
                    .with("target", dir_target.to_string())
                    .with("public", true)
                    .with("direct_contact", false);
                if let Some(share) = options.share_time {
                    params.push("share_time", share.as_millis() as u64);
                }
                self.post_message(&dir, "core.reg_node", Some(params), 0, None)?;
            }
            return Ok(new_name);
        }

        let src = Address::parse(source);
        let key = NodeRegistry::key_for(&src).ok_or_else(|| SchedulerError::InvalidSource {
            address: source.to_owned(),
        })?;
        self.registry.register(key, target, options);
        Ok(String::new())
    }

    pub fn has_node(&self, source: &str) -> bool {
        self.registry.is_registered(source)
    }

    pub fn register_command_map(
        &mut self,
        pattern: &str,
        target: &str,
        priority: i32,
    ) -> Result<(), SchedulerError> {
        self.command_map.register(pattern, target, priority)?;
        Ok(())
    }

    /// Advertisable entries for a role: `(address, share_time)` pairs,
    /// deduplicated, filtered by protocol compatibility. An entry whose
    /// target is the bare role name denotes a local task role and comes
    /// back as this node's address with an indirect task component.
    pub fn advertise_entries(
        &self,
        protocol: &str,
        role: &str,
        public_only: bool,
    ) -> Vec<(String, Option<Duration>)> {
        let mut out: Vec<(String, Option<Duration>)> = Vec::new();
        for (target, share_time) in self.registry.entries_for_role(role, public_only) {
            let address = if target == role {
                let mut own = self.own_address(protocol);
                own.set_task(format!("@{role}"));
                own.to_string()
            } else {
                let parsed = Address::parse(&target);
                if protocol.is_empty() || Address::is_same_protocol(parsed.protocol(), protocol) {
                    target
                } else {
                    continue;
                }
            };
            if !out.iter().any(|(seen, _)| *seen == address) {
                out.push((address, share_time));
            }
        }
        out
    }

    // --- posting ---

    /// Resolve `address` (via the registry and, for an empty address, the
    /// command map), build the envelope and enqueue it. A non-zero
    /// `request_id` registers a waiting entry per resolved target; the
    /// entry's handler receives exactly one outcome.
    pub fn post_message(
        &mut self,
        address: &str,
        command: &str,
        params: Option<Params>,
        request_id: u32,
        handler: Option<HandlerRef>,
    ) -> Result<(), SchedulerError> {
        if handler.is_some() && request_id == 0 {
            return Err(SchedulerError::RequestIdRequired);
        }

        let mut real_address = address.to_owned();
        if real_address.is_empty() {
            if let Some(target) = self.command_map.find_target(command) {
                real_address = target.to_owned();
            }
        }

        let outcome = self.addr_list(&real_address);
        if outcome.unknown_alias || outcome.targets.is_empty() {
            if self.directory_addr.is_some()
                && self.resolve_dest(
                    &real_address,
                    command,
                    params.clone(),
                    request_id,
                    handler.clone(),
                )?
            {
                return Ok(());
            }
            if self.try_forward(&real_address, command, params.as_ref(), request_id, handler)? {
                return Ok(());
            }
            return Err(SchedulerError::UnknownReceiver {
                address: real_address,
            });
        }

        if request_id != 0 && handler.is_none() {
            return Err(SchedulerError::HandlerRequired { request_id });
        }
        for target in outcome.targets {
            self.post_message_for_address(&target, command, params.clone(), request_id, handler.clone())?;
        }
        Ok(())
    }

    /// Post a pre-built envelope. Fans out (cloning the envelope) when the
    /// receiver resolves to several addresses.
    pub fn post_envelope(
        &mut self,
        mut envelope: Envelope,
        handler: Option<HandlerRef>,
    ) -> Result<(), SchedulerError> {
        if envelope.receiver.is_empty() && !envelope.is_response() {
            let target = envelope
                .event
                .as_message()
                .and_then(|m| self.command_map.find_target(&m.command))
                .map(str::to_owned);
            if let Some(target) = target {
                envelope.receiver = Address::parse(&target);
            }
        }

        let outcome = self.addr_list(&envelope.receiver.to_string());
        if outcome.unknown_alias || outcome.targets.is_empty() {
            let address = envelope.receiver.to_string();
            if self.forward_envelope(&envelope, handler)? {
                return Ok(());
            }
            return Err(SchedulerError::UnknownReceiver { address });
        }

        if outcome.targets.len() > 1 {
            for target in &outcome.targets {
                self.post_envelope_for_address(target, envelope.clone(), handler.clone())?;
            }
            Ok(())
        } else {
            self.post_envelope_for_address(&outcome.targets[0], envelope, handler)
        }
    }

    /// Drop an envelope straight into this scheduler's own inbox.
    pub fn post_envelope_for_this(&mut self, envelope: Envelope) {
        self.log_envelope("enqueue", &envelope);
        self.input_gates[0].put(envelope);
    }

    /// Re-post through the configured dispatcher as a `core.forward`.
    pub fn forward_message(
        &mut self,
        address: &str,
        command: &str,
        params: Option<&Params>,
        request_id: u32,
        handler: Option<HandlerRef>,
    ) -> Result<(), SchedulerError> {
        if self.try_forward(address, command, params, request_id, handler)? {
            Ok(())
        } else {
            Err(SchedulerError::NoDispatcher)
        }
    }

    /// Remove a waiting entry; no response will ever be delivered for it.
    pub fn cancel_request(&mut self, request_id: u32) -> bool {
        self.waiting.remove(&request_id).is_some()
    }

    pub(crate) fn take_waiting(&mut self, request_id: u32) -> Option<RequestItem> {
        self.waiting.remove(&request_id)
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    // --- task actions ---

    /// Queue a task for addition; applied by the scheduler after the
    /// current handler returns.
    pub fn spawn_task(&mut self, task: Box<dyn Task>) {
        self.pending.push(TaskAction::Spawn(task));
    }

    /// Queue a hard task removal (no stop sequence).
    pub fn remove_task(&mut self, name: impl Into<String>) {
        self.pending.push(TaskAction::Remove(name.into()));
    }

    /// Queue a cooperative stop request for a task.
    pub fn stop_task(&mut self, name: impl Into<String>) {
        self.pending.push(TaskAction::Stop(name.into()));
    }

    pub(crate) fn take_pending(&mut self) -> Vec<TaskAction> {
        std::mem::take(&mut self.pending)
    }

    // --- tick helpers ---

    pub(crate) fn check_cleanup(&mut self) {
        match self.last_cleanup {
            None => self.last_cleanup = Some(Instant::now()),
            Some(last) if last.elapsed() >= self.cleanup_period => {
                self.registry.validate_entries();
                self.last_cleanup = Some(Instant::now());
            }
            Some(_) => {}
        }
    }

    /// Add an extra input gate (for transports beyond the built-in
    /// in-process pair).
    pub fn add_input_gate(&mut self, gate: Box<dyn Gate>) {
        self.input_gates.push(gate);
    }

    /// Add an extra output gate.
    pub fn add_output_gate(&mut self, gate: Box<dyn Gate>) {
        self.output_gates.push(gate);
    }

    pub(crate) fn run_gates(&mut self) {
        for gate in &mut self.input_gates {
            gate.run();
        }
        for gate in &mut self.output_gates {
            gate.run();
        }
    }

    pub fn gates_empty(&self) -> bool {
        self.input_gates.iter().all(|g| g.is_empty())
            && self.output_gates.iter().all(|g| g.is_empty())
    }

    pub(crate) fn input_gate_count(&self) -> usize {
        self.input_gates.len()
    }

    pub(crate) fn take_input(&mut self, index: usize) -> Option<Envelope> {
        self.input_gates[index].take()
    }

    pub fn gate_count(&self) -> usize {
        self.input_gates.len() + self.output_gates.len()
    }

    /// Synthesize Timeout responses for expired waiting entries and deliver
    /// them through the own input gate. The entry stays (flagged) until the
    /// synthesized response is dispatched, so its handler still sees
    /// exactly one outcome.
    pub(crate) fn check_timeouts(&mut self) {
        let mut expired = Vec::new();
        for (id, item) in self.waiting.iter_mut() {
            if item.timeout_posted {
                continue;
            }
            let Some(timeout) = item.envelope.timeout else {
                continue;
            };
            if item.started().elapsed() >= timeout {
                warn!(request_id = id, ?timeout, "request timed out");
                expired.push(item.envelope.error_response(
                    format!("Timeout for message [{id}]"),
                    StatusCode::TIMEOUT,
                ));
                item.timeout_posted = true;
            }
        }
        for envelope in expired {
            self.post_envelope_for_this(envelope);
        }
    }

    pub(crate) fn log_envelope(&self, stage: &str, envelope: &Envelope) {
        if !self.log_messages {
            return;
        }
        match crate::codec::json::envelope_to_json(envelope) {
            Ok(text) => info!(node = %self.name, stage, envelope = %text, "envelope"),
            Err(e) => debug!(node = %self.name, stage, error = %e, "envelope not serializable"),
        }
    }

    // --- internals ---

    fn resolve_dest(
        &mut self,
        address: &str,
        command: &str,
        params: Option<Params>,
        request_id: u32,
        handler: Option<HandlerRef>,
    ) -> Result<bool, SchedulerError> {
        let Some(dir) = self.directory_addr.clone() else {
            return Ok(false);
        };
        if address == dir {
            return Ok(false);
        }
        let role = Address::parse(address).role_name().to_owned();
        let resolve_handler: HandlerRef = Rc::new(ResolveHandler::new(
            address, command, params, request_id, handler,
        ));
        let resolve_id = self.next_request_id();
        let advertise = Params::new().with("role_name", role);
        self.post_message(&dir, "core.advertise", Some(advertise), resolve_id, Some(resolve_handler))?;
        Ok(true)
    }

    fn try_forward(
        &mut self,
        address: &str,
        command: &str,
        params: Option<&Params>,
        request_id: u32,
        handler: Option<HandlerRef>,
    ) -> Result<bool, SchedulerError> {
        let Some(dispatcher) = self.dispatcher.clone() else {
            return Ok(false);
        };
        let mut fwd = Params::new()
            .with("address", address)
            .with("fwd_command", command);
        if let Some(params) = params {
            fwd.push("fwd_params", params.clone());
        }
        debug!(address, command, dispatcher = %dispatcher, "forwarding through dispatcher");
        self.post_message(&dispatcher, "core.forward", Some(fwd), request_id, handler)?;
        Ok(true)
    }

    fn forward_envelope(
        &mut self,
        envelope: &Envelope,
        handler: Option<HandlerRef>,
    ) -> Result<bool, SchedulerError> {
        if envelope.is_response() {
            return Ok(false);
        }
        let Some(message) = envelope.event.as_message() else {
            return Ok(false);
        };
        let address = envelope.receiver.to_string();
        let command = message.command.clone();
        let params = if message.has_params() {
            Some(message.params.clone())
        } else {
            None
        };
        let request_id = message.request_id;
        self.try_forward(&address, &command, params.as_ref(), request_id, handler)
    }

    fn post_message_for_address(
        &mut self,
        target: &str,
        command: &str,
        params: Option<Params>,
        request_id: u32,
        handler: Option<HandlerRef>,
    ) -> Result<(), SchedulerError> {
        let receiver = Address::parse(target);
        let sender = self.own_address(receiver.protocol());
        let envelope = Envelope::new(
            sender,
            receiver.clone(),
            Event::message(command, params, request_id),
        );
        if request_id != 0 {
            self.waiting
                .insert(request_id, RequestItem::new(envelope.clone(), handler));
        }
        self.send_out(receiver, envelope)
    }

    fn post_envelope_for_address(
        &mut self,
        target: &str,
        mut envelope: Envelope,
        handler: Option<HandlerRef>,
    ) -> Result<(), SchedulerError> {
        let receiver = Address::parse(target);
        if envelope.sender.is_empty()
            || !Address::is_same_protocol(envelope.sender.protocol(), receiver.protocol())
        {
            envelope.sender = self.own_address(receiver.protocol());
        }
        envelope.receiver = receiver.clone();

        let request_id = envelope.request_id();
        if handler.is_some() && request_id == 0 {
            return Err(SchedulerError::RequestIdRequired);
        }
        if request_id != 0 && !envelope.is_response() {
            self.waiting
                .insert(request_id, RequestItem::new(envelope.clone(), handler));
        }
        self.send_out(receiver, envelope)
    }

    fn send_out(&mut self, receiver: Address, envelope: Envelope) -> Result<(), SchedulerError> {
        if self.is_own_address(&receiver) {
            self.post_envelope_for_this(envelope);
            return Ok(());
        }
        self.log_envelope("send", &envelope);
        let gate = self
            .output_gates
            .iter_mut()
            .find(|g| g.supports_protocol(receiver.protocol()))
            .ok_or_else(|| SchedulerError::NoGateForProtocol {
                protocol: receiver.protocol().to_owned(),
            })?;
        gate.put(envelope);
        Ok(())
    }
}

impl Drop for SchedulerContext {
    fn drop(&mut self) {
        self.local.remove(&self.name);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn ctx() -> SchedulerContext {
        let local = Arc::new(LocalNodeRegistry::new());
        let mut ctx = SchedulerContext::new(SchedulerConfig::named("alpha"), local);
        ctx.set_status(SchedulerStatus::Running);
        ctx
    }

    #[test]
    fn test_own_address_uses_gate() {
        let ctx = ctx();
        assert_eq!(ctx.own_address("").to_string(), "alpha");
    }

    #[test]
    fn test_is_own_address_variants() {
        let ctx = ctx();
        assert!(ctx.is_own_address(&Address::parse("@this")));
        assert!(ctx.is_own_address(&Address::parse("alpha")));
        assert!(!ctx.is_own_address(&Address::parse("beta")));
        // task-qualified own addresses still deliver locally
        assert!(ctx.is_own_address(&Address::parse("alpha#T")));
        assert!(ctx.is_own_address_skip_task(&Address::parse("alpha#T")));
        assert!(!ctx.is_own_address_skip_task(&Address::parse("beta#T")));
    }

    #[test]
    fn test_post_message_to_self_lands_in_inbox() {
        let mut ctx = ctx();
        ctx.post_message("alpha", "core.echo", None, 0, None)
            .unwrap();
        assert!(!ctx.gates_empty());
        assert!(ctx.take_input(0).is_some());
    }

    #[test]
    fn test_post_message_unknown_receiver_fails() {
        let mut ctx = ctx();
        let result = ctx.post_message("@nobody", "job.run", None, 0, None);
        assert!(matches!(result, Err(SchedulerError::UnknownReceiver { .. })));
    }

    #[test]
    fn test_post_message_handler_needs_request_id() {
        let mut ctx = ctx();
        struct Nop;
        impl super::super::request::RequestHandler for Nop {
            fn on_result(&self, _: &mut SchedulerContext, _: &crate::message::MessagePayload, _: &crate::message::ResponsePayload) {}
            fn on_error(&self, _: &mut SchedulerContext, _: &crate::message::MessagePayload, _: &crate::message::ResponsePayload) {}
        }
        let result = ctx.post_message("alpha", "core.echo", None, 0, Some(Rc::new(Nop)));
        assert!(matches!(result, Err(SchedulerError::RequestIdRequired)));
    }

    #[test]
    fn test_request_id_without_handler_rejected() {
        let mut ctx = ctx();
        let result = ctx.post_message("alpha", "core.echo", None, 9, None);
        assert!(matches!(result, Err(SchedulerError::HandlerRequired { request_id: 9 })));
    }

    #[test]
    fn test_forward_without_dispatcher_fails() {
        let mut ctx = ctx();
        let result = ctx.forward_message("ghost", "job.run", None, 0, None);
        assert!(matches!(result, Err(SchedulerError::NoDispatcher)));
    }

    #[test]
    fn test_cancel_request_removes_entry() {
        let mut ctx = ctx();
        let envelope = Envelope::new(
            Address::parse("alpha"),
            Address::parse("alpha"),
            Event::message("core.echo", None, 3),
        );
        ctx.post_envelope(envelope, None).unwrap();
        assert_eq!(ctx.waiting_count(), 1);
        assert!(ctx.cancel_request(3));
        assert!(!ctx.cancel_request(3));
    }

    #[test]
    fn test_evaluate_address_resolves_roles() {
        let mut ctx = ctx();
        ctx.register_node_as("@pool", "beta#W", RegisterOptions::default())
            .unwrap();
        assert_eq!(ctx.evaluate_address("@pool"), "beta#W");
        assert_eq!(ctx.evaluate_address("@other"), "@other");
    }

    #[test]
    fn test_register_node_as_generates_role_id() {
        let mut ctx = ctx();
        let name = ctx
            .register_node_as("", "beta", RegisterOptions::default())
            .unwrap();
        assert!(!name.is_empty());
        assert!(ctx.has_node(&format!("@{name}")));
    }

    #[test]
    fn test_next_request_id_skips_waiting_ids() {
        let mut ctx = ctx();
        let first = ctx.next_request_id();
        assert_eq!(first, 1);
        let envelope = Envelope::new(
            Address::parse("alpha"),
            Address::parse("alpha"),
            Event::message("core.echo", None, 2),
        );
        ctx.post_envelope(envelope, None).unwrap();
        // id 2 is waiting, so it must be skipped
        assert_eq!(ctx.next_request_id(), 3);
    }

    #[test]
    fn test_check_timeouts_posts_once() {
        let mut ctx = ctx();
        let envelope = Envelope::new(
            Address::parse("alpha"),
            Address::parse("alpha"),
            Event::message("job.slow", None, 5),
        )
        .with_timeout(Duration::from_millis(0));
        ctx.post_envelope(envelope, None).unwrap();
        // drain the original message
        while ctx.take_input(0).is_some() {}

        ctx.check_timeouts();
        ctx.check_timeouts();

        let mut responses = 0;
        while let Some(env) = ctx.take_input(0) {
            assert!(env.is_response());
            responses += 1;
        }
        assert_eq!(responses, 1);
        // entry remains until the response is dispatched
        assert_eq!(ctx.waiting_count(), 1);
    }
}
