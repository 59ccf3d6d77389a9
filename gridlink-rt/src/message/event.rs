//! Message and response events.
//!
//! An envelope owns exactly one event: either a command [`MessagePayload`]
//! or a [`ResponsePayload`]. Both shapes share the numeric request-id field
//! (0 means "no id"). Commands are written `interface.core_command` and
//! split on the first dot.

// Layer 1: Standard library imports
use std::fmt::Debug;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::params::{ParamValue, Params};
use super::status::StatusCode;

/// Request id; 0 means no response is expected.
pub type RequestId = u32;

/// Sentinel for "no request id".
pub const REQUEST_ID_NONE: RequestId = 0;

/// A command sent to a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub command: String,
    pub params: Params,
    pub request_id: RequestId,
}

impl MessagePayload {
    pub fn new(command: impl Into<String>, params: Option<Params>, request_id: RequestId) -> Self {
        Self {
            command: command.into(),
            params: params.unwrap_or_default(),
            request_id,
        }
    }

    /// Interface part of the command (`squeue` in `squeue.init`); empty for
    /// commands without a dot.
    pub fn interface(&self) -> &str {
        match self.command.split_once('.') {
            Some((interface, _)) => interface,
            None => "",
        }
    }

    /// Command part without the interface (`init` in `squeue.init`).
    pub fn core_command(&self) -> &str {
        match self.command.split_once('.') {
            Some((_, core)) => core,
            None => &self.command,
        }
    }

    pub fn has_request_id(&self) -> bool {
        self.request_id != REQUEST_ID_NONE
    }

    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }
}

/// The answer to a message: a status and at most one of result or error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub status: StatusCode,
    pub request_id: RequestId,
    pub result: Option<ParamValue>,
    pub error: Option<ParamValue>,
}

impl ResponsePayload {
    pub fn new(status: StatusCode, request_id: RequestId) -> Self {
        Self {
            status,
            request_id,
            result: None,
            error: None,
        }
    }

    /// Blank response pre-keyed for answering `message`.
    pub fn init_for(message: &MessagePayload) -> Self {
        Self::new(StatusCode::OK, message.request_id)
    }

    pub fn is_error(&self) -> bool {
        self.status.is_error() || self.error.is_some()
    }

    pub fn set_result(&mut self, result: impl Into<ParamValue>) {
        self.result = Some(result.into());
        self.error = None;
    }

    pub fn set_error(&mut self, error: impl Into<ParamValue>) {
        self.error = Some(error.into());
        self.result = None;
    }

    /// Set an error payload with a single `text` child, the conventional
    /// shape for human-readable failures.
    pub fn set_error_text(&mut self, text: impl Into<String>) {
        self.set_error(Params::new().with("text", text.into()));
    }

    /// The `text` child of the error payload, if present.
    pub fn error_text(&self) -> Option<String> {
        self.error
            .as_ref()
            .and_then(ParamValue::as_node)
            .and_then(|node| node.get_string("text"))
    }
}

/// Either shape an envelope may carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Message(MessagePayload),
    Response(ResponsePayload),
}

impl Event {
    pub fn message(command: impl Into<String>, params: Option<Params>, request_id: RequestId) -> Self {
        Event::Message(MessagePayload::new(command, params, request_id))
    }

    pub fn response(payload: ResponsePayload) -> Self {
        Event::Response(payload)
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Event::Response(_))
    }

    pub fn request_id(&self) -> RequestId {
        match self {
            Event::Message(m) => m.request_id,
            Event::Response(r) => r.request_id,
        }
    }

    pub fn set_request_id(&mut self, request_id: RequestId) {
        match self {
            Event::Message(m) => m.request_id = request_id,
            Event::Response(r) => r.request_id = request_id,
        }
    }

    pub fn as_message(&self) -> Option<&MessagePayload> {
        match self {
            Event::Message(m) => Some(m),
            Event::Response(_) => None,
        }
    }

    pub fn as_response(&self) -> Option<&ResponsePayload> {
        match self {
            Event::Message(_) => None,
            Event::Response(r) => Some(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_split() {
        let msg = MessagePayload::new("squeue.init", None, 1);
        assert_eq!(msg.interface(), "squeue");
        assert_eq!(msg.core_command(), "init");
    }

    #[test]
    fn test_command_without_interface() {
        let msg = MessagePayload::new("ping", None, 0);
        assert_eq!(msg.interface(), "");
        assert_eq!(msg.core_command(), "ping");
        assert!(!msg.has_request_id());
    }

    #[test]
    fn test_response_error_detection() {
        let mut resp = ResponsePayload::new(StatusCode::OK, 5);
        assert!(!resp.is_error());

        resp.set_error_text("boom");
        assert!(resp.is_error());
        assert_eq!(resp.error_text().as_deref(), Some("boom"));

        let negative = ResponsePayload::new(StatusCode::TIMEOUT, 5);
        assert!(negative.is_error());
    }

    #[test]
    fn test_result_and_error_are_exclusive() {
        let mut resp = ResponsePayload::new(StatusCode::OK, 1);
        resp.set_result(Params::new().with("text", "fine"));
        assert!(resp.result.is_some());

        resp.set_error_text("broken");
        assert!(resp.result.is_none());
        assert!(resp.error.is_some());
    }

    #[test]
    fn test_event_request_id_roundtrip() {
        let mut event = Event::message("job.run", None, 7);
        assert_eq!(event.request_id(), 7);
        event.set_request_id(9);
        assert_eq!(event.request_id(), 9);
        assert!(!event.is_response());
    }

    #[test]
    fn test_init_for_copies_request_id() {
        let msg = MessagePayload::new("core.echo", None, 42);
        let resp = ResponsePayload::init_for(&msg);
        assert_eq!(resp.request_id, 42);
        assert_eq!(resp.status, StatusCode::OK);
    }
}
