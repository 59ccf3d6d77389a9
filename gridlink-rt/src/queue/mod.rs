//! Simple queues: manager and reader tasks, dispatch variants, durable
//! retry bookkeeping and keep-alive.

pub mod config;
pub mod core;
pub mod error;
pub mod keepalive;
pub mod manager;
pub mod module;
pub mod reader;

pub use config::{QueueConfig, QueueKind};
pub use core::{DurableRequestInfo, InFlightRequest, QueueCore, ReaderSlot};
pub use error::QueueError;
pub use keepalive::{KeepAliveJob, KeepAliveTask};
pub use manager::ManagerTask;
pub use module::QueueModule;
pub use reader::ReaderTask;
