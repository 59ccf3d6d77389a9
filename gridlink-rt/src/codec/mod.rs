//! Envelope codecs for transports and message logging.

pub mod error;
pub mod json;

pub use error::CodecError;
pub use json::{envelope_from_json, envelope_to_json};
