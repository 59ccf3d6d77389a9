//! Structured message addresses.
//!
//! An address names a destination across up to seven dimensions: protocol,
//! host, node, task, virtual path and role, plus a format tag recording
//! which surface form the address was written in. Five surface forms exist:
//!
//! - empty string - no destination;
//! - raw name, e.g. `worker1`;
//! - default form, `[protocol://][host/]node[#task]`;
//! - role reference, `@role` (the special role `@this` is the owning
//!   scheduler);
//! - virtual path, `#/a/b/`.
//!
//! A task component may itself be a role reference (`node#@pool`), which
//! makes the address *indirect*: the role is resolved against the registry
//! of the node that owns it.

// Layer 1: Standard library imports
use std::fmt::{self, Display};
use std::str::FromStr;

// Layer 2: Third-party crate imports
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// Layer 3: Internal module imports
// (none)

/// Protocol name of the built-in in-process transport.
pub const PROTOCOL_INPROC: &str = "inproc";

/// Role name that always resolves to the owning scheduler.
pub const THIS_ROLE: &str = "this";

/// Surface form an address was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressFormat {
    /// No destination.
    #[default]
    Empty,
    /// Bare name resolved through the registry, falling back to a node name.
    Raw,
    /// `[protocol://][host/]node[#task]`.
    Default,
    /// `@role`.
    Role,
    /// `#/a/b/`.
    VirtualPath,
}

/// Structured destination of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Address {
    protocol: String,
    host: String,
    node: String,
    task: String,
    path: String,
    role: String,
    format: AddressFormat,
}

impl Address {
    /// Empty address.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse an address from its string form. Every string maps to one of
    /// the five surface forms, so parsing cannot fail.
    pub fn parse(input: &str) -> Self {
        let text = input.trim();
        if text.is_empty() {
            return Self::empty();
        }
        if let Some(role) = text.strip_prefix('@') {
            return Self {
                role: role.to_owned(),
                format: AddressFormat::Role,
                ..Self::default()
            };
        }
        if let Some(path) = text.strip_prefix("#/") {
            return Self {
                path: path.trim_matches('/').to_owned(),
                format: AddressFormat::VirtualPath,
                ..Self::default()
            };
        }

        let (protocol, rest) = match text.split_once("://") {
            Some((proto, rest)) => (proto.to_owned(), rest),
            None => (String::new(), text),
        };

        if protocol.is_empty() && !rest.contains('/') && !rest.contains('#') {
            // Bare name: resolved through the registry first.
            return Self {
                node: rest.to_owned(),
                format: AddressFormat::Raw,
                ..Self::default()
            };
        }

        let (host, node_part) = match rest.split_once('/') {
            Some((host, node_part)) => (host.to_owned(), node_part),
            None => (String::new(), rest),
        };
        let (node, task) = match node_part.split_once('#') {
            Some((node, task)) => (node.to_owned(), task.to_owned()),
            None => (node_part.to_owned(), String::new()),
        };

        Self {
            protocol,
            host,
            node,
            task,
            path: String::new(),
            role: String::new(),
            format: AddressFormat::Default,
        }
    }

    /// Default-form address naming a node.
    pub fn node(name: impl Into<String>) -> Self {
        Self {
            node: name.into(),
            format: AddressFormat::Default,
            ..Self::default()
        }
    }

    /// Role-form address (`@role`).
    pub fn role(name: impl Into<String>) -> Self {
        Self {
            role: name.into(),
            format: AddressFormat::Role,
            ..Self::default()
        }
    }

    /// The `@this` address.
    pub fn this() -> Self {
        Self::role(THIS_ROLE)
    }

    /// Virtual-path address (`#/a/b/`).
    pub fn virtual_path(path: impl Into<String>) -> Self {
        let path: String = path.into();
        Self {
            path: path.trim_matches('/').to_owned(),
            format: AddressFormat::VirtualPath,
            ..Self::default()
        }
    }

    pub fn format(&self) -> AddressFormat {
        self.format
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn node_name(&self) -> &str {
        &self.node
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn role_name(&self) -> &str {
        &self.role
    }

    pub fn is_empty(&self) -> bool {
        self.format == AddressFormat::Empty
    }

    pub fn set_protocol(&mut self, protocol: impl Into<String>) {
        self.protocol = protocol.into();
    }

    /// Replace the task component. Promotes a raw address to default form so
    /// the task is representable.
    pub fn set_task(&mut self, task: impl Into<String>) {
        self.task = task.into();
        if matches!(self.format, AddressFormat::Raw | AddressFormat::Empty) {
            self.format = AddressFormat::Default;
        }
    }

    /// Same address with the task component stripped.
    pub fn without_task(&self) -> Self {
        let mut out = self.clone();
        out.task.clear();
        out
    }

    /// True when `name` is written as a role reference (`@...`).
    pub fn is_role_name(name: &str) -> bool {
        name.starts_with('@')
    }

    /// True when the task component is itself a role reference that still
    /// needs registry resolution.
    pub fn is_indirect(&self) -> bool {
        matches!(self.format, AddressFormat::Default | AddressFormat::Raw)
            && Self::is_role_name(&self.task)
    }

    /// Protocols compare equal when both denote the in-process transport.
    pub fn is_same_protocol(a: &str, b: &str) -> bool {
        let inproc_a = a.is_empty() || a == PROTOCOL_INPROC;
        let inproc_b = b.is_empty() || b == PROTOCOL_INPROC;
        (inproc_a && inproc_b) || (a == b)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format {
            AddressFormat::Empty => Ok(()),
            AddressFormat::Raw => write!(f, "{}", self.node),
            AddressFormat::Role => write!(f, "@{}", self.role),
            AddressFormat::VirtualPath => write!(f, "#/{}/", self.path),
            AddressFormat::Default => {
                if !self.protocol.is_empty() {
                    write!(f, "{}://", self.protocol)?;
                }
                if !self.host.is_empty() {
                    write!(f, "{}/", self.host)?;
                }
                write!(f, "{}", self.node)?;
                if !self.task.is_empty() {
                    write!(f, "#{}", self.task)?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for Address {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AddressVisitor;

        impl Visitor<'_> for AddressVisitor {
            type Value = Address;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an address string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Address, E> {
                Ok(Address::parse(v))
            }
        }

        deserializer.deserialize_str(AddressVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let addr = Address::parse("");
        assert!(addr.is_empty());
        assert_eq!(addr.to_string(), "");
    }

    #[test]
    fn test_parse_role() {
        let addr = Address::parse("@worker");
        assert_eq!(addr.format(), AddressFormat::Role);
        assert_eq!(addr.role_name(), "worker");
        assert_eq!(addr.to_string(), "@worker");
    }

    #[test]
    fn test_parse_virtual_path() {
        let addr = Address::parse("#/cluster/a/");
        assert_eq!(addr.format(), AddressFormat::VirtualPath);
        assert_eq!(addr.path(), "cluster/a");
        assert_eq!(addr.to_string(), "#/cluster/a/");
    }

    #[test]
    fn test_parse_default_with_all_parts() {
        let addr = Address::parse("inproc://hostA/node1#taskX");
        assert_eq!(addr.format(), AddressFormat::Default);
        assert_eq!(addr.protocol(), "inproc");
        assert_eq!(addr.host(), "hostA");
        assert_eq!(addr.node_name(), "node1");
        assert_eq!(addr.task(), "taskX");
        assert_eq!(addr.to_string(), "inproc://hostA/node1#taskX");
    }

    #[test]
    fn test_parse_node_and_task() {
        let addr = Address::parse("node1#Q");
        assert_eq!(addr.format(), AddressFormat::Default);
        assert_eq!(addr.node_name(), "node1");
        assert_eq!(addr.task(), "Q");
    }

    #[test]
    fn test_parse_raw_name() {
        let addr = Address::parse("worker1");
        assert_eq!(addr.format(), AddressFormat::Raw);
        assert_eq!(addr.node_name(), "worker1");
        assert_eq!(addr.to_string(), "worker1");
    }

    #[test]
    fn test_indirect_address() {
        let addr = Address::parse("node1#@pool");
        assert!(addr.is_indirect());
        assert_eq!(addr.task(), "@pool");
        assert!(!Address::parse("node1#Q").is_indirect());
    }

    #[test]
    fn test_without_task() {
        let addr = Address::parse("node1#Q");
        assert_eq!(addr.without_task().to_string(), "node1");
    }

    #[test]
    fn test_set_task_on_raw_promotes_format() {
        let mut addr = Address::parse("node1");
        addr.set_task("Q");
        assert_eq!(addr.format(), AddressFormat::Default);
        assert_eq!(addr.to_string(), "node1#Q");
    }

    #[test]
    fn test_same_protocol_treats_empty_as_inproc() {
        assert!(Address::is_same_protocol("", "inproc"));
        assert!(Address::is_same_protocol("", ""));
        assert!(!Address::is_same_protocol("inproc", "tcp"));
    }

    #[test]
    fn test_this_role() {
        assert_eq!(Address::this().to_string(), "@this");
    }
}
