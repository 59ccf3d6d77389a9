//! Message model: addresses, parameter trees, events, envelopes, statuses.

pub mod address;
pub mod envelope;
pub mod event;
pub mod params;
pub mod status;

// Re-export commonly used types
pub use address::{Address, AddressFormat, PROTOCOL_INPROC, THIS_ROLE};
pub use envelope::Envelope;
pub use event::{Event, MessagePayload, RequestId, ResponsePayload, REQUEST_ID_NONE};
pub use params::{ParamEntry, ParamValue, Params};
pub use status::StatusCode;
