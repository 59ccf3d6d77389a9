//! In-process gates.
//!
//! The input gate is a view over the node's shared inbox, which peers (and
//! the node itself) fill directly. The output gate buffers outbound
//! envelopes and, on each tick, hands them to the destination node's inbox
//! through the local-node registry; unroutable messages are answered with
//! an UnknownNode error posted back to the owner's inbox.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tracing::warn;

// Layer 3: Internal module imports
use super::traits::Gate;
use crate::message::{Address, Envelope, StatusCode, PROTOCOL_INPROC};
use crate::registry::{LocalNodeRegistry, NodeInbox};

fn is_inproc(protocol: &str) -> bool {
    protocol.is_empty() || protocol == PROTOCOL_INPROC
}

/// Input side of the in-process transport.
#[derive(Debug)]
pub struct InprocInGate {
    owner: String,
    inbox: NodeInbox,
}

impl InprocInGate {
    pub fn new(owner: impl Into<String>, inbox: NodeInbox) -> Self {
        Self {
            owner: owner.into(),
            inbox,
        }
    }
}

impl Gate for InprocInGate {
    fn supports_protocol(&self, protocol: &str) -> bool {
        is_inproc(protocol)
    }

    fn own_address(&self, protocol: &str) -> Option<Address> {
        if !is_inproc(protocol) {
            return None;
        }
        let mut address = Address::node(self.owner.clone());
        address.set_protocol(protocol);
        Some(address)
    }

    fn put(&mut self, envelope: Envelope) {
        self.inbox.put(envelope);
    }

    fn take(&mut self) -> Option<Envelope> {
        self.inbox.try_get()
    }

    fn is_empty(&self) -> bool {
        self.inbox.is_empty()
    }

    fn run(&mut self) -> usize {
        // Inbound envelopes arrive through the shared inbox; nothing to do.
        0
    }
}

/// Output side of the in-process transport.
pub struct InprocOutGate {
    owner: String,
    outbox: VecDeque<Envelope>,
    local: Arc<LocalNodeRegistry>,
}

impl InprocOutGate {
    pub fn new(owner: impl Into<String>, local: Arc<LocalNodeRegistry>) -> Self {
        Self {
            owner: owner.into(),
            outbox: VecDeque::new(),
            local,
        }
    }

    fn handle_unknown_receiver(&self, envelope: Envelope) {
        if envelope.is_response() {
            warn!(
                receiver = %envelope.receiver,
                "dropping response for unknown node"
            );
            return;
        }
        let error = envelope.error_response(
            format!("Unknown node: [{}]", envelope.receiver.node_name()),
            StatusCode::UNKNOWN_NODE,
        );
        if self.local.deliver(&self.owner, error).is_err() {
            warn!(owner = %self.owner, "own inbox missing, error response lost");
        }
    }
}

impl Gate for InprocOutGate {
    fn supports_protocol(&self, protocol: &str) -> bool {
        is_inproc(protocol)
    }

    fn own_address(&self, protocol: &str) -> Option<Address> {
        if !is_inproc(protocol) {
            return None;
        }
        let mut address = Address::node(self.owner.clone());
        address.set_protocol(protocol);
        Some(address)
    }

    fn put(&mut self, envelope: Envelope) {
        self.outbox.push_back(envelope);
    }

    fn take(&mut self) -> Option<Envelope> {
        self.outbox.pop_front()
    }

    fn is_empty(&self) -> bool {
        self.outbox.is_empty()
    }

    fn run(&mut self) -> usize {
        let mut moved = 0;
        while let Some(envelope) = self.outbox.pop_front() {
            moved += 1;
            let node = envelope.receiver.node_name().to_owned();
            match self.local.deliver(&node, envelope) {
                Ok(()) => {}
                Err(envelope) => self.handle_unknown_receiver(envelope),
            }
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Event;

    fn envelope(receiver: &str, request_id: u32) -> Envelope {
        Envelope::new(
            Address::parse("alpha"),
            Address::parse(receiver),
            Event::message("job.run", None, request_id),
        )
    }

    #[test]
    fn test_out_gate_delivers_to_peer_inbox() {
        let local = Arc::new(LocalNodeRegistry::new());
        let beta_inbox = local.register("beta");
        let mut gate = InprocOutGate::new("alpha", Arc::clone(&local));

        gate.put(envelope("beta#T", 1));
        assert!(!gate.is_empty());
        assert_eq!(gate.run(), 1);
        assert!(gate.is_empty());
        assert_eq!(beta_inbox.len(), 1);
    }

    #[test]
    fn test_out_gate_answers_unknown_node() {
        let local = Arc::new(LocalNodeRegistry::new());
        let alpha_inbox = local.register("alpha");
        let mut gate = InprocOutGate::new("alpha", Arc::clone(&local));

        gate.put(envelope("ghost", 7));
        gate.run();

        let error = alpha_inbox.try_get();
        let response = error.as_ref().and_then(|e| e.event.as_response());
        assert_eq!(response.map(|r| r.status), Some(StatusCode::UNKNOWN_NODE));
        assert_eq!(response.map(|r| r.request_id), Some(7));
    }

    #[test]
    fn test_in_gate_reads_shared_inbox() {
        let local = Arc::new(LocalNodeRegistry::new());
        let inbox = local.register("alpha");
        let mut gate = InprocInGate::new("alpha", Arc::clone(&inbox));

        inbox.put(envelope("alpha", 0));
        assert!(!gate.is_empty());
        assert!(gate.take().is_some());
        assert!(gate.take().is_none());
    }

    #[test]
    fn test_own_address_has_node_name() {
        let local = Arc::new(LocalNodeRegistry::new());
        let inbox = local.register("alpha");
        let gate = InprocInGate::new("alpha", inbox);

        let addr = gate.own_address("");
        assert_eq!(addr.map(|a| a.to_string()).as_deref(), Some("alpha"));
        assert!(gate.own_address("tcp").is_none());
    }
}
