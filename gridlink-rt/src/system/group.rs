//! Node groups.
//!
//! A [`NodeGroup`] owns the shared local-node registry of one in-process
//! address space and builds ready-to-run schedulers into it: default
//! in-process gates, the `core` and `squeue` modules, and self
//! registration. There is no global factory; groups are plain values that
//! can be created per test, per thread pool, or per application.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::module::CoreModule;
use crate::queue::QueueModule;
use crate::registry::LocalNodeRegistry;
use crate::scheduler::{Scheduler, SchedulerConfig, SchedulerError};

/// Builder for schedulers sharing one in-process address space.
#[derive(Debug, Clone, Default)]
pub struct NodeGroup {
    local: Arc<LocalNodeRegistry>,
}

impl NodeGroup {
    pub fn new() -> Self {
        Self {
            local: Arc::new(LocalNodeRegistry::new()),
        }
    }

    /// The shared local-node registry; hand it to custom gates.
    pub fn local_registry(&self) -> Arc<LocalNodeRegistry> {
        Arc::clone(&self.local)
    }

    /// Build an initialized scheduler with the built-in modules.
    pub fn build_node(&self, config: SchedulerConfig) -> Result<Scheduler, SchedulerError> {
        let mut scheduler = Scheduler::new(config, Arc::clone(&self.local));
        scheduler.add_module(Box::new(CoreModule::new()))?;
        scheduler.add_module(Box::new(QueueModule::new()))?;
        scheduler.init()?;
        Ok(scheduler)
    }

    /// Build a bare scheduler without modules, for callers wiring their
    /// own.
    pub fn build_bare_node(&self, config: SchedulerConfig) -> Result<Scheduler, SchedulerError> {
        let mut scheduler = Scheduler::new(config, Arc::clone(&self.local));
        scheduler.init()?;
        Ok(scheduler)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::scheduler::SchedulerStatus;

    #[test]
    fn test_build_node_is_running_with_modules() {
        let group = NodeGroup::new();
        let node = group.build_node(SchedulerConfig::named("alpha")).unwrap();
        assert_eq!(node.status(), SchedulerStatus::Running);
        assert_eq!(node.stats().module_count, 2);
        assert!(group.local_registry().find("alpha").is_some());
    }

    #[test]
    fn test_nodes_share_the_address_space() {
        let group = NodeGroup::new();
        let _a = group.build_node(SchedulerConfig::named("alpha"));
        let _b = group.build_node(SchedulerConfig::named("beta"));
        assert_eq!(group.local_registry().len(), 2);
    }

    #[test]
    fn test_dropping_a_node_unregisters_it() {
        let group = NodeGroup::new();
        {
            let _node = group.build_node(SchedulerConfig::named("alpha"));
        }
        assert!(group.local_registry().find("alpha").is_none());
    }
}
