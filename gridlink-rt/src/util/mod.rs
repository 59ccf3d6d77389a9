//! Utilities: the synchronized FIFO and id helpers.

pub mod fifo;
pub mod ids;

pub use fifo::SyncFifo;
pub use ids::{default_registration_id, gen_registration_id};
