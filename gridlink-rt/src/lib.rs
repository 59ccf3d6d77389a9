//! # gridlink-rt - In-Process Messaging and Job-Dispatch Runtime
//!
//! A single-threaded cooperative runtime for actor-style messaging: nodes
//! expose command interfaces, clients post named commands to symbolic
//! addresses, and a per-node scheduler routes each command to a matching
//! handler (a long-lived task or a stateless module), collects its
//! response and delivers it back. On top of this substrate sit work queues
//! with several dispatch disciplines, durable retry, and a
//! keep-alive/registration protocol.
//!
//! # Quick Start
//!
//! ```rust
//! use gridlink_rt::prelude::*;
//! use std::rc::Rc;
//!
//! struct PrintHandler;
//!
//! impl RequestHandler for PrintHandler {
//!     fn on_result(&self, _ctx: &mut SchedulerContext, _m: &MessagePayload, r: &ResponsePayload) {
//!         println!("echo answered: {}", r.status);
//!     }
//!     fn on_error(&self, _ctx: &mut SchedulerContext, _m: &MessagePayload, r: &ResponsePayload) {
//!         println!("echo failed: {}", r.status);
//!     }
//! }
//!
//! # fn main() -> Result<(), gridlink_rt::scheduler::SchedulerError> {
//! let group = NodeGroup::new();
//! let mut node = group.build_node(SchedulerConfig::named("alpha"))?;
//!
//! let handler: HandlerRef = Rc::new(PrintHandler);
//! node.post_message("@this", "core.echo", None, 1, Some(handler))?;
//! for _ in 0..4 {
//!     node.tick();
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! ## Message model
//! - [`message`] - addresses, parameter trees, events, envelopes, statuses
//!
//! ## Routing
//! - [`registry`] - node registry, command map, shared local-node map
//! - [`gate`] - transport adapters (in-process pair built in)
//! - [`scheduler`] - the router: resolution, dispatch, request matching,
//!   timeouts
//!
//! ## Handlers
//! - [`module`] - stateless command handlers and the `core` interface
//! - [`task`] - cooperative tasks with timeslicing and sleep
//! - [`queue`] - simple queues: six dispatch variants, durable retry,
//!   keep-alive
//!
//! ## Infrastructure
//! - [`codec`] - JSON envelope marshalling
//! - [`system`] - node-group builder and async tick driver
//! - [`util`] - synchronized FIFO and id helpers
//!
//! # Concurrency model
//!
//! Everything belonging to one scheduler runs on one thread; no step
//! blocks. Several schedulers may run on separate threads within one
//! [`system::NodeGroup`]; the only structures crossing threads are the
//! synchronized node inboxes behind the in-process gates.

pub mod codec;
pub mod gate;
pub mod message;
pub mod module;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod system;
pub mod task;
pub mod util;

// Re-export commonly used types
pub use message::{
    Address, AddressFormat, Envelope, Event, MessagePayload, ParamValue, Params, RequestId,
    ResponsePayload, StatusCode,
};
pub use module::{CoreModule, HandlerError, Module};
pub use queue::{QueueConfig, QueueKind, QueueModule};
pub use registry::{LocalNodeRegistry, NodeRegistry, RegisterOptions};
pub use scheduler::{
    HandlerRef, RequestHandler, Scheduler, SchedulerConfig, SchedulerContext, SchedulerError,
    SchedulerStatus,
};
pub use system::NodeGroup;
pub use task::{Task, TaskControl, TaskStatus};

/// The usual imports for embedding the runtime.
pub mod prelude {
    pub use crate::message::{
        Address, Envelope, Event, MessagePayload, ParamValue, Params, ResponsePayload, StatusCode,
    };
    pub use crate::module::{HandlerError, Module};
    pub use crate::scheduler::{
        HandlerRef, RequestHandler, Scheduler, SchedulerConfig, SchedulerContext, SchedulerStatus,
    };
    pub use crate::system::NodeGroup;
    pub use crate::task::{Task, TaskControl, TaskStatus};
}
