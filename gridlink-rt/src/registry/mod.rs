//! Registries: symbolic-address resolution, command routing defaults, and
//! the shared local-node map used by in-process gates.

pub mod command_map;
pub mod local;
pub mod node;

pub use command_map::{CommandMap, CommandMapError, DEFAULT_COMMAND_TARGET};
pub use local::{LocalNodeRegistry, NodeInbox};
pub use node::{EntryKey, NodeRegistry, RegisterOptions, RegistryEntry, ResolveOutcome};
