//! Queue error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors surfaced by the simple-queue subsystem.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Unknown queue: [{name}]")]
    UnknownQueue { name: String },

    #[error("Queue already exists: [{name}]")]
    QueueExists { name: String },

    #[error("Unknown queue type: {kind}")]
    UnknownQueueType { kind: String },

    /// Pull queues have no readers; consumers fetch explicitly.
    #[error("Wrong type of queue for readers: [{queue}]")]
    ReadersNotSupported { queue: String },

    #[error("Request already in queue: {request_id} (queue [{queue}])")]
    DuplicateRequest { request_id: u32, queue: String },

    /// Forward queues need a `forward_to` address at creation.
    #[error("Forward queue requires a forward_to address")]
    ForwardTargetRequired,
}
