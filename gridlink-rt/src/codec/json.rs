//! JSON envelope codec.
//!
//! Wire layout: a top-level object with `sender`, `receiver`, an optional
//! `timeout` (milliseconds) and an `event` object. Responses carry
//! `is_response: true`, `status` and one of `result`/`error`; messages
//! carry `command` and `params`. A `request_id` of 0 is omitted.
//!
//! Parameter trees map onto JSON values: nodes whose children are all
//! named become objects, other nodes become arrays, scalars map to their
//! JSON counterparts. Binary leaves are base64 strings and date-times are
//! RFC 3339 strings; both decode back as plain strings, so the mapping is
//! not fully type-preserving.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Map, Value};

// Layer 3: Internal module imports
use super::error::CodecError;
use crate::message::{
    Address, Envelope, Event, MessagePayload, ParamValue, Params, ResponsePayload, StatusCode,
};

/// Marshal one envelope to its JSON string form.
pub fn envelope_to_json(envelope: &Envelope) -> Result<String, CodecError> {
    let mut root = Map::new();
    root.insert("sender".into(), json!(envelope.sender.to_string()));
    root.insert("receiver".into(), json!(envelope.receiver.to_string()));
    if let Some(timeout) = envelope.timeout {
        root.insert("timeout".into(), json!(timeout.as_millis() as u64));
    }

    let mut event = Map::new();
    if envelope.event.request_id() != 0 {
        event.insert("request_id".into(), json!(envelope.event.request_id()));
    }
    match &envelope.event {
        Event::Response(response) => {
            event.insert("is_response".into(), json!(true));
            event.insert("status".into(), json!(response.status.code()));
            if let Some(error) = &response.error {
                event.insert("error".into(), value_to_json(error));
            } else if let Some(result) = &response.result {
                event.insert("result".into(), value_to_json(result));
            }
        }
        Event::Message(message) => {
            event.insert("command".into(), json!(message.command));
            event.insert("params".into(), params_to_json(&message.params));
        }
    }
    root.insert("event".into(), Value::Object(event));

    Ok(serde_json::to_string(&Value::Object(root))?)
}

/// Unmarshal an envelope from its JSON string form.
pub fn envelope_from_json(input: &str) -> Result<Envelope, CodecError> {
    let root: Value = serde_json::from_str(input)?;
    let object = root.as_object().ok_or_else(|| CodecError::InvalidEnvelope {
        reason: "top level is not an object".into(),
    })?;

    let sender = Address::parse(object.get("sender").and_then(Value::as_str).unwrap_or(""));
    let receiver = Address::parse(object.get("receiver").and_then(Value::as_str).unwrap_or(""));
    let timeout = object
        .get("timeout")
        .and_then(Value::as_u64)
        .map(Duration::from_millis);

    let event = object
        .get("event")
        .and_then(Value::as_object)
        .ok_or_else(|| CodecError::InvalidEnvelope {
            reason: "missing event".into(),
        })?;
    let request_id = event.get("request_id").and_then(Value::as_u64).unwrap_or(0) as u32;

    let event = if event
        .get("is_response")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        let status = StatusCode(
            event
                .get("status")
                .and_then(Value::as_i64)
                .unwrap_or_else(|| i64::from(StatusCode::OK.code())) as i32,
        );
        let mut response = ResponsePayload::new(status, request_id);
        if let Some(error) = event.get("error") {
            response.error = Some(json_to_value(error));
        } else if let Some(result) = event.get("result") {
            response.result = Some(json_to_value(result));
        }
        Event::Response(response)
    } else {
        let command = event
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| CodecError::InvalidEnvelope {
                reason: "message without command".into(),
            })?;
        let params = match event.get("params") {
            Some(value) => json_to_params(value),
            None => Params::new(),
        };
        Event::Message(MessagePayload::new(command, Some(params), request_id))
    };

    let mut envelope = Envelope::new(sender, receiver, event);
    envelope.timeout = timeout;
    Ok(envelope)
}

fn params_to_json(params: &Params) -> Value {
    if params.is_empty() {
        return Value::Null;
    }
    if params.entries().iter().all(|e| e.name.is_some()) {
        let mut object = Map::new();
        for entry in params.entries() {
            let key = entry.name.clone().unwrap_or_default();
            object.insert(key, value_to_json(&entry.value));
        }
        Value::Object(object)
    } else {
        Value::Array(params.entries().iter().map(|e| value_to_json(&e.value)).collect())
    }
}

fn value_to_json(value: &ParamValue) -> Value {
    match value {
        ParamValue::Null => Value::Null,
        ParamValue::Bool(v) => json!(v),
        ParamValue::Int(v) => json!(v),
        ParamValue::UInt(v) => json!(v),
        ParamValue::Float(v) => json!(v),
        ParamValue::Str(v) => json!(v),
        ParamValue::Binary(bytes) => json!(BASE64.encode(bytes)),
        ParamValue::DateTime(v) => json!(v.to_rfc3339()),
        ParamValue::Node(node) => params_to_json(node),
    }
}

fn json_to_params(value: &Value) -> Params {
    let mut params = Params::new();
    match value {
        Value::Object(object) => {
            for (key, value) in object {
                params.push(key.clone(), json_to_value(value));
            }
        }
        Value::Array(items) => {
            for item in items {
                params.push_unnamed(json_to_value(item));
            }
        }
        Value::Null => {}
        other => params.push_unnamed(json_to_value(other)),
    }
    params
}

fn json_to_value(value: &Value) -> ParamValue {
    match value {
        Value::Null => ParamValue::Null,
        Value::Bool(v) => ParamValue::Bool(*v),
        Value::Number(number) => {
            if let Some(v) = number.as_i64() {
                ParamValue::Int(v)
            } else if let Some(v) = number.as_u64() {
                ParamValue::UInt(v)
            } else {
                ParamValue::Float(number.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(v) => ParamValue::Str(v.clone()),
        Value::Array(_) | Value::Object(_) => ParamValue::Node(json_to_params(value)),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_message_roundtrip() {
        let envelope = Envelope::new(
            Address::parse("alpha"),
            Address::parse("beta#Q"),
            Event::message(
                "job.run",
                Some(Params::new().with("n", 42u64).with("label", "x")),
                7,
            ),
        )
        .with_timeout(Duration::from_millis(250));

        let text = envelope_to_json(&envelope).unwrap();
        let back = envelope_from_json(&text).unwrap();

        assert_eq!(back.sender.to_string(), "alpha");
        assert_eq!(back.receiver.to_string(), "beta#Q");
        assert_eq!(back.timeout, Some(Duration::from_millis(250)));
        let message = back.event.as_message().cloned().expect("message event");
        assert_eq!(message.command, "job.run");
        assert_eq!(message.request_id, 7);
        assert_eq!(message.params.get("n").and_then(ParamValue::as_u64), Some(42));
        assert_eq!(message.params.get_string("label").as_deref(), Some("x"));
    }

    #[test]
    fn test_error_response_roundtrip() {
        let mut payload = ResponsePayload::new(StatusCode::TIMEOUT, 9);
        payload.set_error_text("too slow");
        let envelope = Envelope::new(
            Address::parse("beta"),
            Address::parse("alpha"),
            Event::Response(payload),
        );

        let text = envelope_to_json(&envelope).unwrap();
        assert!(text.contains("\"is_response\":true"));
        let back = envelope_from_json(&text).unwrap();
        let response = back.event.as_response().cloned().expect("response event");
        assert_eq!(response.status, StatusCode::TIMEOUT);
        assert_eq!(response.request_id, 9);
        assert!(response.is_error());
        assert_eq!(response.error_text().as_deref(), Some("too slow"));
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let envelope = Envelope::new(
            Address::parse("alpha"),
            Address::parse("beta"),
            Event::message("core.echo", None, 0),
        );
        let text = envelope_to_json(&envelope).unwrap();
        assert!(!text.contains("timeout"));
        assert!(!text.contains("request_id"));
        assert!(text.contains("\"params\":null"));
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        assert!(envelope_from_json("not json").is_err());
        assert!(envelope_from_json("{\"sender\":\"a\"}").is_err());
    }
}
