//! Transport gates; the in-process pair is the built-in transport.

pub mod inproc;
pub mod traits;

pub use inproc::{InprocInGate, InprocOutGate};
pub use traits::Gate;
