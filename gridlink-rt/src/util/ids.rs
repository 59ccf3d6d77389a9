//! Id generation helpers.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use uuid::Uuid;

// Layer 3: Internal module imports
// (none)

/// Fresh role id for a node registered without a source name.
///
/// Uses the simple (dash-free) uuid form so the id stays a plain word in
/// address strings.
pub fn gen_registration_id() -> String {
    format!("N{}", Uuid::new_v4().simple())
}

/// Registration key of a scheduler at a central directory: node name plus
/// process id, so several processes hosting the same node name stay
/// distinguishable.
pub fn default_registration_id(node_name: &str) -> String {
    format!("{}_{}", node_name, std::process::id())
}
