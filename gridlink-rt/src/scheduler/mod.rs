//! The scheduler: address resolution, envelope routing, request/response
//! matching, timeouts and cancellation.

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod request;
pub mod resolve;

pub use config::{SchedulerConfig, DEFAULT_CLEANUP_PERIOD};
pub use context::{SchedulerContext, SchedulerStatus, TaskAction};
pub use core::{Scheduler, SchedulerStats};
pub use error::SchedulerError;
pub use request::{HandlerRef, RequestHandler, RequestItem};
pub use resolve::ResolveHandler;
