//! Envelopes: event + addressing + optional delivery deadline.
//!
//! An envelope owns exactly one event. Envelopes are uniquely owned and
//! move between gates, the scheduler and waiting-request entries; they are
//! cloned only for fan-out to multiple receivers and for the waiting-entry
//! copy kept while a response is outstanding.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::address::Address;
use super::event::{Event, ResponsePayload};
use super::params::Params;
use super::status::StatusCode;

/// One in-flight message or response with its addressing.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub sender: Address,
    pub receiver: Address,
    pub event: Event,
    /// Per-request deadline; `None` means wait forever.
    pub timeout: Option<Duration>,
}

impl Envelope {
    pub fn new(sender: Address, receiver: Address, event: Event) -> Self {
        Self {
            sender,
            receiver,
            event,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn request_id(&self) -> u32 {
        self.event.request_id()
    }

    pub fn is_response(&self) -> bool {
        self.event.is_response()
    }

    /// Build the error response envelope for this envelope: addressed back
    /// to the sender, carrying the same request id and a `text` error
    /// payload.
    pub fn error_response(&self, text: impl Into<String>, status: StatusCode) -> Envelope {
        let mut payload = ResponsePayload::new(status, self.event.request_id());
        payload.set_error(Params::new().with("text", text.into()));
        Envelope::new(
            self.receiver.clone(),
            self.sender.clone(),
            Event::Response(payload),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::event::MessagePayload;

    fn sample() -> Envelope {
        Envelope::new(
            Address::parse("alpha"),
            Address::parse("beta#Q"),
            Event::Message(MessagePayload::new("job.run", None, 12)),
        )
    }

    #[test]
    fn test_envelope_carries_request_id() {
        let env = sample();
        assert_eq!(env.request_id(), 12);
        assert!(!env.is_response());
        assert!(env.timeout.is_none());
    }

    #[test]
    fn test_with_timeout() {
        let env = sample().with_timeout(Duration::from_millis(100));
        assert_eq!(env.timeout, Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_error_response_swaps_addresses() {
        let env = sample();
        let resp = env.error_response("no such task", StatusCode::UNKNOWN_TASK);

        assert_eq!(resp.sender, env.receiver);
        assert_eq!(resp.receiver, env.sender);
        assert_eq!(resp.request_id(), 12);

        let payload = resp.event.as_response().map(ResponsePayload::clone);
        let payload = payload.filter(|p| p.is_error());
        assert_eq!(
            payload.and_then(|p| p.error_text()).as_deref(),
            Some("no such task")
        );
    }
}
