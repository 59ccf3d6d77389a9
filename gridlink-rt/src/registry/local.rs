//! Local-node registry: the shared address space of one node group.
//!
//! Schedulers in the same process (possibly on different threads) register
//! their inbox here under their node name. In-process output gates look the
//! destination up by name and push envelopes straight into its inbox; the
//! synchronized FIFO makes the hop thread-safe.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
use crate::message::Envelope;
use crate::util::SyncFifo;

/// A node's inbox as seen by peer gates.
pub type NodeInbox = Arc<SyncFifo<Envelope>>;

/// Process-wide map of node name to inbox.
#[derive(Debug, Default)]
pub struct LocalNodeRegistry {
    inboxes: DashMap<String, NodeInbox>,
}

impl LocalNodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node and return its inbox handle. Re-registering a name
    /// returns a fresh inbox and orphans the old one.
    pub fn register(&self, name: impl Into<String>) -> NodeInbox {
        let inbox: NodeInbox = Arc::new(SyncFifo::new());
        self.inboxes.insert(name.into(), Arc::clone(&inbox));
        inbox
    }

    pub fn find(&self, name: &str) -> Option<NodeInbox> {
        self.inboxes.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, name: &str) {
        self.inboxes.remove(name);
    }

    /// Deliver an envelope to the named node. The envelope comes back when
    /// the node is unknown, so the caller can answer the sender.
    pub fn deliver(&self, name: &str, envelope: Envelope) -> Result<(), Envelope> {
        match self.find(name) {
            Some(inbox) => {
                inbox.put(envelope);
                Ok(())
            }
            None => Err(envelope),
        }
    }

    pub fn len(&self) -> usize {
        self.inboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inboxes.is_empty()
    }
}
