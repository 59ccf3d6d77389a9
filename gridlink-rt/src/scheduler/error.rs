//! Scheduler error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::registry::CommandMapError;

/// Errors surfaced by scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Address resolved to nothing and no directory or dispatcher could
    /// take the message.
    #[error("Unknown receiver: [{address}]")]
    UnknownReceiver { address: String },

    /// Forwarding was requested but no dispatcher is configured.
    #[error("No dispatcher configured")]
    NoDispatcher,

    /// No output gate accepts the protocol.
    #[error("No gate found for protocol: [{protocol}]")]
    NoGateForProtocol { protocol: String },

    /// A request id was supplied without a handler to receive the outcome.
    #[error("No handler provided for request {request_id}")]
    HandlerRequired { request_id: u32 },

    /// A handler was supplied without a request id to key it by.
    #[error("Request id required for handler")]
    RequestIdRequired,

    /// The source address cannot key a registry entry.
    #[error("Invalid registry source address: [{address}]")]
    InvalidSource { address: String },

    /// Operation rejected in the current scheduler state.
    #[error("Scheduler is {status}; cannot {operation}")]
    InvalidState { status: String, operation: String },

    /// Invalid command-map pattern.
    #[error(transparent)]
    CommandMap(#[from] CommandMapError),
}
