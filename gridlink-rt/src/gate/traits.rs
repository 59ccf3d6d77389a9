//! Transport adapter seam.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::message::{Address, Envelope};

/// A transport adapter owning inbound and/or outbound envelope queues for
/// one protocol.
///
/// Gates never block. `run` gives the gate a slice of the scheduler tick to
/// move envelopes (an output gate delivers its backlog, an input gate may
/// poll its transport) and returns how many envelopes it moved.
pub trait Gate {
    /// Whether this gate carries the given protocol. The empty protocol
    /// means the default in-process transport.
    fn supports_protocol(&self, protocol: &str) -> bool;

    /// The address under which the owner is reachable through this gate.
    fn own_address(&self, protocol: &str) -> Option<Address>;

    /// Enqueue an envelope for this gate.
    fn put(&mut self, envelope: Envelope);

    /// Dequeue the next envelope, if any.
    fn take(&mut self) -> Option<Envelope>;

    fn is_empty(&self) -> bool;

    /// Move envelopes for one tick; returns the number moved.
    fn run(&mut self) -> usize;
}
