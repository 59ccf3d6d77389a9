//! Built-in `core` interface.
//!
//! Commands: `echo` (liveness probe), `forward` (re-post as if locally
//! originated), `reg_node` / `reg_node_at` (registry pushes), `advertise`
//! (directory lookup) and `flush_events` (handled synchronously by front
//! ends; answered as a no-op here so queued copies stay harmless).

// Layer 1: Standard library imports
use std::rc::Rc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tracing::warn;

// Layer 3: Internal module imports
use super::traits::{HandlerError, Module};
use crate::message::{
    Address, Envelope, Event, MessagePayload, ParamValue, Params, ResponsePayload, StatusCode,
};
use crate::registry::RegisterOptions;
use crate::scheduler::{HandlerRef, RequestHandler, SchedulerContext};

/// Relays the response of a forwarded command back to the sender that asked
/// for the forward, restoring their request id.
struct ForwardRelayHandler {
    original_sender: Address,
    original_request_id: u32,
}

impl ForwardRelayHandler {
    fn relay(&self, ctx: &mut SchedulerContext, response: &ResponsePayload) {
        let mut payload = response.clone();
        payload.request_id = self.original_request_id;
        let envelope = Envelope::new(
            ctx.own_address(self.original_sender.protocol()),
            self.original_sender.clone(),
            Event::Response(payload),
        );
        if let Err(e) = ctx.post_envelope(envelope, None) {
            warn!(error = %e, "forwarded response undeliverable");
        }
    }
}

impl RequestHandler for ForwardRelayHandler {
    fn on_result(
        &self,
        ctx: &mut SchedulerContext,
        _message: &MessagePayload,
        response: &ResponsePayload,
    ) {
        self.relay(ctx, response);
    }

    fn on_error(
        &self,
        ctx: &mut SchedulerContext,
        _message: &MessagePayload,
        response: &ResponsePayload,
    ) {
        self.relay(ctx, response);
    }
}

/// The mandatory `core` module.
#[derive(Debug, Default)]
pub struct CoreModule;

impl CoreModule {
    pub fn new() -> Self {
        Self
    }

    fn handle_echo(&self) -> Result<StatusCode, HandlerError> {
        Ok(StatusCode::OK)
    }

    fn handle_forward(
        &self,
        ctx: &mut SchedulerContext,
        envelope: &Envelope,
        message: &MessagePayload,
    ) -> Result<StatusCode, HandlerError> {
        let params = &message.params;
        let Some(address) = params.get_string("address") else {
            return Ok(StatusCode::WRONG_PARAMS);
        };
        let Some(command) = params.get_string("fwd_command") else {
            return Ok(StatusCode::WRONG_PARAMS);
        };
        let fwd_params = params.node("fwd_params").cloned();

        if message.has_request_id() {
            let relay: HandlerRef = Rc::new(ForwardRelayHandler {
                original_sender: envelope.sender.clone(),
                original_request_id: message.request_id,
            });
            let request_id = ctx.next_request_id();
            ctx.post_message(&address, &command, fwd_params, request_id, Some(relay))?;
            Ok(StatusCode::FORWARDED)
        } else {
            ctx.post_message(&address, &command, fwd_params, 0, None)?;
            Ok(StatusCode::OK)
        }
    }

    fn handle_reg_node(
        &self,
        ctx: &mut SchedulerContext,
        message: &MessagePayload,
        response: &mut ResponsePayload,
    ) -> Result<StatusCode, HandlerError> {
        let params = &message.params;
        let Some(target) = params.get_string("target") else {
            return Ok(StatusCode::WRONG_PARAMS);
        };
        let source = params.string_or("source", "");
        let options = RegisterOptions {
            public: params.bool_or("public", false),
            direct_mode: params.bool_or("direct_contact", false),
            share_time: params
                .get("share_time")
                .and_then(ParamValue::as_u64)
                .map(Duration::from_millis),
            end_time: None,
        };
        let new_name = ctx.register_node_as(&source, &target, options)?;
        if !new_name.is_empty() {
            response.set_result(Params::new().with("name", new_name));
        }
        Ok(StatusCode::OK)
    }

    fn handle_reg_node_at(
        &self,
        ctx: &mut SchedulerContext,
        message: &MessagePayload,
    ) -> Result<StatusCode, HandlerError> {
        let params = &message.params;
        let Some(exec_at) = params.get_string("exec_at_addr") else {
            return Ok(StatusCode::WRONG_PARAMS);
        };
        let source = params.string_or("source_name", "");
        let exec_addr = Address::parse(&exec_at);
        let target = ctx.own_address(exec_addr.protocol()).to_string();

        let fwd = Params::new().with("source", source).with("target", target);
        ctx.post_message(&exec_at, "core.reg_node", Some(fwd), 0, None)?;
        Ok(StatusCode::OK)
    }

    fn handle_advertise(
        &self,
        ctx: &mut SchedulerContext,
        envelope: &Envelope,
        message: &MessagePayload,
        response: &mut ResponsePayload,
    ) -> Result<StatusCode, HandlerError> {
        let Some(role) = message.params.get_string("role_name") else {
            return Ok(StatusCode::WRONG_PARAMS);
        };
        let protocol = envelope.sender.protocol().to_owned();
        let mut listing = Params::new();
        for (address, share_time) in ctx.advertise_entries(&protocol, &role, true) {
            let mut entry = Params::new().with("address", address);
            if let Some(share) = share_time {
                entry.push("share_time", share.as_millis() as u64);
            }
            listing.push_unnamed(entry);
        }
        response.set_result(listing);
        Ok(StatusCode::OK)
    }
}

impl Module for CoreModule {
    fn interfaces(&self) -> &[&'static str] {
        &["core"]
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
        if message.interface() != "core" {
            return Ok(StatusCode::UNKNOWN_MSG);
        }
        match message.core_command() {
            "echo" => self.handle_echo(),
            "forward" => self.handle_forward(ctx, envelope, message),
            "reg_node" => self.handle_reg_node(ctx, message, response),
            "reg_node_at" => self.handle_reg_node_at(ctx, message),
            "advertise" => self.handle_advertise(ctx, envelope, message, response),
            "flush_events" => Ok(StatusCode::OK),
            _ => Ok(StatusCode::UNKNOWN_MSG),
        }
    }
}
