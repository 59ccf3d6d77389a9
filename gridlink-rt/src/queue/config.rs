//! Queue variants and per-queue policy.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::error::QueueError;
use crate::message::Params;

/// Queue type names accepted by `squeue.init`.
pub const QUEUE_TYPE_ROUND_ROBIN: &str = "rrobin";
pub const QUEUE_TYPE_PULL: &str = "pull";
pub const QUEUE_TYPE_MULTICAST: &str = "mcast";
pub const QUEUE_TYPE_NULL_SINK: &str = "null_dev";
pub const QUEUE_TYPE_FORWARD: &str = "forward";
pub const QUEUE_TYPE_HIGH_AVAIL: &str = "highav";

/// Dispatch discipline of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// Accept and discard everything.
    NullSink,
    /// No automatic delivery; consumers fetch explicitly.
    Pull,
    /// Every waiting envelope goes to every accepting reader.
    Multicast,
    /// Next envelope goes to the next reader that was not served last.
    RoundRobin,
    /// First reader in the list gets everything; the rest are standbys.
    HighAvail,
    /// Round-robin with one built-in reader bound to a fixed address.
    Forward,
}

impl QueueKind {
    /// Parse a type name; the empty string means round-robin.
    pub fn parse(text: &str) -> Result<Self, QueueError> {
        match text {
            "" | QUEUE_TYPE_ROUND_ROBIN => Ok(QueueKind::RoundRobin),
            QUEUE_TYPE_PULL => Ok(QueueKind::Pull),
            QUEUE_TYPE_MULTICAST => Ok(QueueKind::Multicast),
            QUEUE_TYPE_NULL_SINK => Ok(QueueKind::NullSink),
            QUEUE_TYPE_FORWARD => Ok(QueueKind::Forward),
            QUEUE_TYPE_HIGH_AVAIL => Ok(QueueKind::HighAvail),
            other => Err(QueueError::UnknownQueueType {
                kind: other.to_owned(),
            }),
        }
    }

    /// Round-robin and high-availability queues keep per-request
    /// bookkeeping (for durable retry and the timeout ladder).
    pub fn uses_request_map(self) -> bool {
        matches!(self, QueueKind::RoundRobin | QueueKind::HighAvail)
    }
}

/// Per-queue policy from `squeue.init` parameters.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub kind: QueueKind,
    /// Retry failed deliveries before surfacing the error.
    pub durable: bool,
    /// Allow a reader whose target equals the message sender.
    pub allow_sender_as_reader: bool,
    /// Built-in reader target for forward queues.
    pub forward_to: String,
    /// Waiting-envelope cap; 0 means unlimited.
    pub limit: usize,
    /// Failed-delivery budget; 0 means retry forever.
    pub retry_limit: u32,
    /// Wait between retries of one request.
    pub retry_delay: Duration,
    /// Reader silence cutoff; 0 disables.
    pub contact_timeout: Duration,
    /// Response deadline after handing an envelope to a reader; 0 disables.
    pub result_timeout: Duration,
    /// How long an undelivered envelope may sit in the queue; 0 disables.
    pub store_timeout: Duration,
}

impl QueueConfig {
    pub fn from_params(params: &Params) -> Result<Self, QueueError> {
        let kind = QueueKind::parse(&params.string_or("type", ""))?;
        let forward_to = params.string_or("forward_to", "");
        if kind == QueueKind::Forward && forward_to.is_empty() {
            return Err(QueueError::ForwardTargetRequired);
        }
        Ok(Self {
            kind,
            durable: params.bool_or("durable", false),
            allow_sender_as_reader: params.bool_or("duplex", false),
            forward_to,
            limit: params.uint_or("limit", 0) as usize,
            retry_limit: params.uint_or("retry_limit", 0) as u32,
            retry_delay: Duration::from_millis(params.uint_or("retry_delay", 0)),
            contact_timeout: Duration::from_millis(params.uint_or("contact_timeout", 0)),
            result_timeout: Duration::from_millis(params.uint_or("result_timeout", 0)),
            store_timeout: Duration::from_millis(params.uint_or("store_timeout", 0)),
        })
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            kind: QueueKind::RoundRobin,
            durable: false,
            allow_sender_as_reader: false,
            forward_to: String::new(),
            limit: 0,
            retry_limit: 0,
            retry_delay: Duration::ZERO,
            contact_timeout: Duration::ZERO,
            result_timeout: Duration::ZERO,
            store_timeout: Duration::ZERO,
        }
    }
}
