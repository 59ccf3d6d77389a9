//! Waiting-request bookkeeping.
//!
//! Every posted message with a request id leaves a [`RequestItem`] behind:
//! a copy of the envelope, the optional response handler and the start
//! time. Exactly one of {matching response, synthesized timeout, explicit
//! cancel} resolves the entry. Handlers are `Rc`-shared so one handler can
//! back several entries when a post fans out to multiple receivers.

// Layer 1: Standard library imports
use std::rc::Rc;
use std::time::Instant;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::context::SchedulerContext;
use crate::message::{Envelope, MessagePayload, ResponsePayload};

/// Receives the outcome of a request.
///
/// Called at most once per waiting entry, with the original outbound
/// message and the response (a synthesized Timeout response looks like any
/// other error). Implementations needing state use interior mutability;
/// everything runs on the scheduler thread.
pub trait RequestHandler {
    fn on_result(
        &self,
        ctx: &mut SchedulerContext,
        message: &MessagePayload,
        response: &ResponsePayload,
    );

    fn on_error(
        &self,
        ctx: &mut SchedulerContext,
        message: &MessagePayload,
        response: &ResponsePayload,
    );
}

/// Shared handle to a request handler.
pub type HandlerRef = Rc<dyn RequestHandler>;

/// One waiting request.
pub struct RequestItem {
    pub envelope: Envelope,
    pub handler: Option<HandlerRef>,
    started: Instant,
    /// Set once a timeout response has been synthesized, so the check does
    /// not fire again while the response sits in the inbox.
    pub timeout_posted: bool,
}

impl RequestItem {
    pub fn new(envelope: Envelope, handler: Option<HandlerRef>) -> Self {
        Self {
            envelope,
            handler,
            started: Instant::now(),
            timeout_posted: false,
        }
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn request_id(&self) -> u32 {
        self.envelope.request_id()
    }
}
