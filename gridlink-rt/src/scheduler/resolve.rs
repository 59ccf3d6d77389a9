//! Response handler for `core.advertise` lookups.
//!
//! When a posted message has an unresolvable role address and a directory
//! is configured, the scheduler sends `core.advertise` with this handler
//! attached. On success the discovered mapping is cached in the local
//! registry (with the advertised share time as its TTL) and the original
//! message is re-posted; on failure the message falls back to the
//! dispatcher, or the original handler's error path is taken.

// Layer 1: Standard library imports
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use rand::Rng;
use tracing::{debug, error};

// Layer 3: Internal module imports
use super::context::SchedulerContext;
use super::request::{HandlerRef, RequestHandler};
use crate::message::{MessagePayload, ParamValue, Params, ResponsePayload, StatusCode};
use crate::registry::RegisterOptions;

/// Re-posts an original message once its role address has been advertised.
pub struct ResolveHandler {
    address: String,
    command: String,
    params: Option<Params>,
    request_id: u32,
    handler: Option<HandlerRef>,
}

impl ResolveHandler {
    pub fn new(
        address: &str,
        command: &str,
        params: Option<Params>,
        request_id: u32,
        handler: Option<HandlerRef>,
    ) -> Self {
        Self {
            address: address.to_owned(),
            command: command.to_owned(),
            params,
            request_id,
            handler,
        }
    }

    /// Entries advertised by the directory: `(address, share_time)`.
    fn parse_entries(response: &ResponsePayload) -> Vec<(String, Option<Duration>)> {
        let Some(ParamValue::Node(list)) = &response.result else {
            return Vec::new();
        };
        list.entries()
            .iter()
            .filter_map(|entry| entry.value.as_node())
            .filter_map(|node| {
                node.get_string("address").map(|address| {
                    let share = node
                        .get("share_time")
                        .and_then(ParamValue::as_u64)
                        .map(Duration::from_millis);
                    (address, share)
                })
            })
            .collect()
    }

    fn handle_failed(&self, ctx: &mut SchedulerContext, reason: &str) {
        debug!(address = %self.address, reason, "role resolution failed");
        let forwarded = ctx.forward_message(
            &self.address,
            &self.command,
            self.params.as_ref(),
            self.request_id,
            self.handler.clone(),
        );
        if forwarded.is_ok() {
            return;
        }
        error!(address = %self.address, "unknown receiver");
        if let Some(handler) = &self.handler {
            let original =
                MessagePayload::new(self.command.clone(), self.params.clone(), self.request_id);
            let mut response = ResponsePayload::new(StatusCode::UNKNOWN_RECEIVER, self.request_id);
            response.set_error_text(format!("Error - unknown receiver: [{}]", self.address));
            handler.on_error(ctx, &original, &response);
        }
    }
}

impl RequestHandler for ResolveHandler {
    fn on_result(
        &self,
        ctx: &mut SchedulerContext,
        _message: &MessagePayload,
        response: &ResponsePayload,
    ) {
        let entries = Self::parse_entries(response);
        if entries.is_empty() {
            self.handle_failed(ctx, "directory returned no entries");
            return;
        }

        // Uniform random pick; share time never biases selection.
        let pick = rand::thread_rng().gen_range(0..entries.len());
        let (target, share_time) = entries[pick].clone();

        let options = RegisterOptions {
            public: false,
            direct_mode: false,
            share_time,
            end_time: share_time.map(|share| Instant::now() + share),
        };
        if let Err(e) = ctx.register_node_as(&self.address, &target, options) {
            error!(address = %self.address, error = %e, "caching resolved role failed");
        }

        if let Err(e) = ctx.post_message(
            &self.address,
            &self.command,
            self.params.clone(),
            self.request_id,
            self.handler.clone(),
        ) {
            error!(address = %self.address, error = %e, "re-post after resolve failed");
            self.handle_failed(ctx, "re-post failed");
        }
    }

    fn on_error(
        &self,
        ctx: &mut SchedulerContext,
        _message: &MessagePayload,
        _response: &ResponsePayload,
    ) {
        self.handle_failed(ctx, "directory lookup error");
    }
}
